use comfy_table::{Cell, Table};

use crate::cli::{Session, SourceArgs};
use crate::domains::FilterDomains;
use crate::error::Result;

pub fn run(source: &SourceArgs) -> Result<()> {
    let session = Session::open(source)?;
    println!("{}", format_domains(&session.domains));
    Ok(())
}

pub fn format_domains(domains: &FilterDomains) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Filter", "Values"]);
    table.add_row(vec![
        Cell::new("Creation date"),
        Cell::new(format!("{} to {}", domains.first_date, domains.last_date)),
    ]);
    table.add_row(vec![
        Cell::new("Market segment"),
        Cell::new(domains.segments.join(", ")),
    ]);
    table.add_row(vec![
        Cell::new("Onboarding type"),
        Cell::new(domains.onboarding_types.join(", ")),
    ]);
    table.add_row(vec![
        Cell::new("Age"),
        Cell::new(format!("{} to {}", domains.age_min(), domains.age_max())),
    ]);
    let years: Vec<String> = domains
        .year_choices()
        .into_iter()
        .map(|c| domains.year_choice_label(c))
        .collect();
    table.add_row(vec![Cell::new("Trend years"), Cell::new(years.join(", "))]);
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::derive;
    use crate::models::fixtures::{dataset, date, record};

    #[test]
    fn test_format_domains_lists_every_filter() {
        let ds = dataset(vec![
            record("MASS", 20, date(2022, 1, 4)),
            record("PRESTIGE", 64, date(2023, 5, 31)),
        ]);
        let out = format_domains(&derive(&ds, &[2022, 2023]).unwrap());
        assert!(out.contains("2022-01-04 to 2023-05-31"));
        assert!(out.contains("MASS, PRESTIGE"));
        assert!(out.contains("20 to 64"));
        assert!(out.contains("2022 & 2023"));
    }
}
