use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::filters::{FilterSelection, RowFilter};
use crate::models::{Dataset, Record, HAS_SUBSCRIPTION, NO_SUBSCRIPTION};

// ---------------------------------------------------------------------------
// View rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountRow {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthRow {
    pub year: i32,
    pub month: u32,
    /// "February 2022"
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareRow {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

/// All filter-dependent views for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportViews {
    /// Rows in the segment-breakdown restricted set.
    pub total_accounts: usize,
    pub segments: Vec<CountRow>,
    pub monthly: Vec<MonthRow>,
    /// Rows in the generation-view restricted set.
    pub generation_total: usize,
    pub generations: Vec<ShareRow>,
    pub attach_rate: Vec<ShareRow>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub fn restrict<'a>(dataset: &'a Dataset, scope: &RowFilter<'_>) -> Vec<&'a Record> {
    dataset.records.iter().filter(|r| scope.matches(r)).collect()
}

/// Count per segment, in ascending segment order.
pub fn segment_breakdown(rows: &[&Record]) -> Vec<CountRow> {
    let mut groups: BTreeMap<&str, usize> = BTreeMap::new();
    for r in rows {
        *groups.entry(r.segment.as_str()).or_default() += 1;
    }
    groups
        .into_iter()
        .map(|(label, count)| CountRow {
            label: label.to_string(),
            count,
        })
        .collect()
}

/// Count per calendar month for rows in `years`, oldest month first.
pub fn monthly_trend(rows: &[&Record], years: &BTreeSet<i32>) -> Vec<MonthRow> {
    let mut groups: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for r in rows.iter().filter(|r| years.contains(&r.year())) {
        *groups.entry(r.month_key()).or_default() += 1;
    }
    groups
        .into_iter()
        .map(|((year, month), count)| MonthRow {
            year,
            month,
            label: month_label(year, month),
            count,
        })
        .collect()
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|| format!("{year}-{month:02}"))
}

/// Percentage of `rows` per key. Empty input yields no rows.
fn shares<'a>(rows: &[&'a Record], key: impl Fn(&'a Record) -> &'a str) -> Vec<ShareRow> {
    let total = rows.len();
    if total == 0 {
        return Vec::new();
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in rows {
        *counts.entry(key(*r)).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(label, count)| ShareRow {
            label: label.to_string(),
            count,
            percent: count as f64 / total as f64 * 100.0,
        })
        .collect()
}

/// Share of each generation, largest first.
pub fn generation_breakdown(rows: &[&Record]) -> Vec<ShareRow> {
    let mut out = shares(rows, |r| r.generation.as_str());
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    out
}

/// Share of accounts with and without the add-on subscription.
pub fn attach_rate(rows: &[&Record]) -> Vec<ShareRow> {
    let mut out = shares(rows, |r| r.subscription_class());
    let rank = |label: &str| match label {
        HAS_SUBSCRIPTION => 0,
        NO_SUBSCRIPTION => 1,
        _ => 2,
    };
    out.sort_by_key(|row| rank(&row.label));
    out
}

/// Recompute every view from scratch for `selection`.
pub fn compute(dataset: &Dataset, selection: &FilterSelection, trend_years: &[i32]) -> ReportViews {
    let breakdown_rows = restrict(dataset, &selection.breakdown_scope());
    let generation_rows = restrict(dataset, &selection.generation_scope());
    let years = selection.effective_years(trend_years);

    let views = ReportViews {
        total_accounts: breakdown_rows.len(),
        segments: segment_breakdown(&breakdown_rows),
        monthly: monthly_trend(&breakdown_rows, &years),
        generation_total: generation_rows.len(),
        generations: generation_breakdown(&generation_rows),
        attach_rate: attach_rate(&generation_rows),
    };
    tracing::debug!(
        total_accounts = views.total_accounts,
        months = views.monthly.len(),
        generation_total = views.generation_total,
        "recomputed report views"
    );
    views
}
