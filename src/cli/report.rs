use std::collections::BTreeSet;

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::{FilterArgs, OutputFormat, Session, SourceArgs, NOTHING_TO_REPORT};
use crate::domains::FilterDomains;
use crate::error::{ReportError, Result};
use crate::filters::{FilterSelection, YearChoice};
use crate::fmt::{count, percent, text_bar};
use crate::models::Dataset;
use crate::reports::{self, ReportViews, ShareRow};
use crate::settings::Settings;

const BAR_WIDTH: usize = 30;

pub fn run(source: &SourceArgs, filters: &FilterArgs, format: OutputFormat) -> Result<()> {
    let session = Session::open(source)?;
    let selection = build_selection(
        &session.domains,
        &session.settings.generation_default_segments,
        filters,
    )?;
    let views = reports::compute(&session.dataset, &selection, &session.domains.trend_years);
    let out = match format {
        OutputFormat::Text => format_report(
            &session.settings,
            &session.dataset,
            &session.domains,
            &selection,
            &views,
        ),
        OutputFormat::Json => to_json(&session.dataset, &session.domains, &selection, &views)?,
    };
    println!("{out}");
    Ok(())
}

/// Start from the dashboard defaults and apply command-line overrides.
pub fn build_selection(
    domains: &FilterDomains,
    generation_defaults: &[String],
    args: &FilterArgs,
) -> Result<FilterSelection> {
    let mut sel = FilterSelection::defaults(domains, generation_defaults);
    if let Some(from) = args.from_date {
        sel.start = from;
    }
    if let Some(to) = args.to_date {
        sel.end = to;
    }
    if !args.segments.is_empty() {
        sel.segments = args.segments.iter().cloned().collect();
    }
    if !args.onboarding_types.is_empty() {
        sel.onboarding_types = args.onboarding_types.iter().cloned().collect();
    }
    if let Some(min) = args.min_age {
        sel.age_min = min;
    }
    if let Some(max) = args.max_age {
        sel.age_max = max;
    }
    if !args.years.is_empty() {
        sel.years = args
            .years
            .iter()
            .map(|raw| {
                YearChoice::parse(raw).ok_or_else(|| {
                    ReportError::InvalidFilter(format!("'{raw}' is not a year or 'all'"))
                })
            })
            .collect::<Result<BTreeSet<_>>>()?;
    }
    if !args.generation_segments.is_empty() {
        sel.generation_segments = args.generation_segments.iter().cloned().collect();
    }
    sel.validate(domains)?;
    Ok(sel)
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

fn heading(text: &str) -> String {
    format!("{}", text.yellow().bold())
}

fn join_set(set: &BTreeSet<String>) -> String {
    if set.is_empty() {
        "(none)".to_string()
    } else {
        set.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn years_label(selection: &FilterSelection, domains: &FilterDomains) -> String {
    let labels: Vec<String> = selection
        .years
        .iter()
        .map(|c| domains.year_choice_label(*c))
        .collect();
    if labels.is_empty() {
        "(none)".to_string()
    } else {
        labels.join(", ")
    }
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

fn share_table(label_header: &str, rows: &[ShareRow]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![label_header, "Percentage", ""]);
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.label),
            right(percent(row.percent)),
            Cell::new(text_bar(row.percent, 100.0, BAR_WIDTH)),
        ]);
    }
    table
}

pub fn format_report(
    settings: &Settings,
    dataset: &Dataset,
    domains: &FilterDomains,
    selection: &FilterSelection,
    views: &ReportViews,
) -> String {
    let mut out = Vec::new();
    out.push(heading(&settings.title));
    if !settings.note.is_empty() {
        out.push(settings.note.clone());
    }
    out.push(String::new());

    // 01 -- static overview
    out.push(heading(&format!(
        "01. Overview of the accounts opened from {} to {}",
        domains.first_date.format("%-d %B %Y"),
        domains.last_date.format("%-d %B %Y"),
    )));
    let total = dataset.overview_total() as f64;
    let mut table = Table::new();
    table.set_header(vec!["Retail segment", "Accounts", "Share", ""]);
    for slice in &dataset.overview {
        let share = if total > 0.0 {
            slice.accounts as f64 / total * 100.0
        } else {
            0.0
        };
        table.add_row(vec![
            Cell::new(&slice.segment),
            right(count(slice.accounts as usize)),
            right(percent(share)),
            Cell::new(text_bar(share, 100.0, BAR_WIDTH)),
        ]);
    }
    out.push(table.to_string());
    out.push(String::new());

    // 02 -- segment breakdown
    out.push(heading("02. A breakdown of account opening"));
    out.push(format!(
        "Filters: {} to {}; segments: {}; onboarding types: {}; age {}-{}",
        selection.start,
        selection.end,
        join_set(&selection.segments),
        join_set(&selection.onboarding_types),
        selection.age_min,
        selection.age_max,
    ));
    out.push(format!("Number of Accounts: {}", count(views.total_accounts)));
    if views.segments.is_empty() {
        out.push(NOTHING_TO_REPORT.to_string());
    } else {
        let max = views.segments.iter().map(|s| s.count).max().unwrap_or(0) as f64;
        let mut table = Table::new();
        table.set_header(vec!["Market Segment Description", "Number of Accounts", ""]);
        for row in &views.segments {
            table.add_row(vec![
                Cell::new(&row.label),
                right(count(row.count)),
                Cell::new(text_bar(row.count as f64, max, BAR_WIDTH)),
            ]);
        }
        out.push(table.to_string());
    }
    out.push(String::new());

    // 03 -- monthly trend
    out.push(heading(&format!(
        "03. Monthly account opening ({})",
        years_label(selection, domains)
    )));
    if views.monthly.is_empty() {
        out.push(NOTHING_TO_REPORT.to_string());
    } else {
        let max = views.monthly.iter().map(|m| m.count).max().unwrap_or(0) as f64;
        let mut table = Table::new();
        table.set_header(vec!["Month and Year", "Number of Accounts", ""]);
        for row in &views.monthly {
            table.add_row(vec![
                Cell::new(&row.label),
                right(count(row.count)),
                Cell::new(text_bar(row.count as f64, max, BAR_WIDTH)),
            ]);
        }
        out.push(table.to_string());
    }
    out.push(String::new());

    // 04 -- generation and attach rate
    out.push(heading(&format!(
        "04. Generation breakdown and Juice usage (segments: {})",
        join_set(&selection.generation_segments)
    )));
    if views.generations.is_empty() {
        out.push(NOTHING_TO_REPORT.to_string());
    } else {
        out.push(share_table("Generation", &views.generations).to_string());
        out.push(share_table("Juice", &views.attach_rate).to_string());
    }

    out.join("\n")
}

// ---------------------------------------------------------------------------
// JSON rendering
// ---------------------------------------------------------------------------

pub fn to_json(
    dataset: &Dataset,
    domains: &FilterDomains,
    selection: &FilterSelection,
    views: &ReportViews,
) -> Result<String> {
    let years: Vec<String> = selection
        .years
        .iter()
        .map(|c| domains.year_choice_label(*c))
        .collect();
    let value = serde_json::json!({
        "source": dataset.source.display().to_string(),
        "sheet": dataset.sheet,
        "overview": dataset.overview,
        "filters": {
            "from": selection.start,
            "to": selection.end,
            "segments": selection.segments,
            "onboarding_types": selection.onboarding_types,
            "age_min": selection.age_min,
            "age_max": selection.age_max,
            "years": years,
            "generation_segments": selection.generation_segments,
        },
        "views": views,
    });
    serde_json::to_string_pretty(&value).map_err(|e| ReportError::Other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::derive;
    use crate::models::fixtures::{dataset, date, record};

    fn fixture() -> (Dataset, FilterDomains) {
        let mut rows = vec![
            record("A", 20, date(2022, 1, 4)),
            record("A", 30, date(2022, 2, 4)),
            record("B", 40, date(2023, 3, 4)),
        ];
        rows[0].days_to_subscription = Some(5);
        let ds = dataset(rows);
        let domains = derive(&ds, &[2022, 2023]).unwrap();
        (ds, domains)
    }

    #[test]
    fn test_build_selection_applies_overrides() {
        let (_, domains) = fixture();
        let args = FilterArgs {
            segments: vec!["B".into()],
            min_age: Some(25),
            years: vec!["2023".into()],
            ..FilterArgs::default()
        };
        let sel = build_selection(&domains, &[], &args).unwrap();
        assert_eq!(sel.segments, BTreeSet::from(["B".to_string()]));
        assert_eq!((sel.age_min, sel.age_max), (25, 40));
        assert_eq!(sel.years, BTreeSet::from([YearChoice::Year(2023)]));
        assert_eq!(sel.start, date(2022, 1, 4));
    }

    #[test]
    fn test_build_selection_rejects_bad_values() {
        let (_, domains) = fixture();
        let args = FilterArgs {
            years: vec!["someday".into()],
            ..FilterArgs::default()
        };
        assert!(build_selection(&domains, &[], &args).is_err());

        let args = FilterArgs {
            onboarding_types: vec!["Carrier pigeon".into()],
            ..FilterArgs::default()
        };
        assert!(build_selection(&domains, &[], &args).is_err());

        let args = FilterArgs {
            from_date: Some(date(2023, 1, 1)),
            to_date: Some(date(2022, 1, 1)),
            ..FilterArgs::default()
        };
        assert!(build_selection(&domains, &[], &args).is_err());
    }

    #[test]
    fn test_format_report_sections_in_order() {
        let (ds, domains) = fixture();
        let sel = build_selection(&domains, &[], &FilterArgs::default()).unwrap();
        let views = reports::compute(&ds, &sel, &domains.trend_years);
        let out = format_report(&Settings::default(), &ds, &domains, &sel, &views);

        let positions: Vec<usize> = ["01. Overview", "02. A breakdown", "03. Monthly", "04. Generation"]
            .iter()
            .map(|h| out.find(h).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(out.contains("Number of Accounts: 3"));
        assert!(out.contains("January 2022"));
        assert!(out.contains("Has Juice"));
        assert!(out.contains("33.3%"));
    }

    #[test]
    fn test_format_report_empty_restriction() {
        let (ds, domains) = fixture();
        let args = FilterArgs {
            from_date: Some(date(2021, 1, 1)),
            to_date: Some(date(2021, 12, 31)),
            ..FilterArgs::default()
        };
        let sel = build_selection(&domains, &[], &args).unwrap();
        let views = reports::compute(&ds, &sel, &domains.trend_years);
        let out = format_report(&Settings::default(), &ds, &domains, &sel, &views);
        assert!(out.contains("Number of Accounts: 0"));
        assert_eq!(out.matches(NOTHING_TO_REPORT).count(), 3);
        assert!(!out.contains("Has Juice"));
    }

    #[test]
    fn test_json_contains_views() {
        let (ds, domains) = fixture();
        let sel = build_selection(&domains, &[], &FilterArgs::default()).unwrap();
        let views = reports::compute(&ds, &sel, &domains.trend_years);
        let json = to_json(&ds, &domains, &sel, &views).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["views"]["total_accounts"], 3);
        assert_eq!(value["views"]["segments"][0]["label"], "A");
        assert_eq!(value["filters"]["years"][0], "2022 & 2023");
        assert_eq!(value["overview"][0]["segment"], "MASS");
    }
}
