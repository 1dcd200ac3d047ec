use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{ReportError, Result};
use crate::filters::YearChoice;
use crate::models::Dataset;

/// Value ranges offered by the filter widgets, derived once from the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterDomains {
    /// Distinct segments in first-seen order.
    pub segments: Vec<String>,
    /// Distinct onboarding types in first-seen order.
    pub onboarding_types: Vec<String>,
    /// Distinct ages, ascending.
    pub ages: Vec<i64>,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub trend_years: Vec<i32>,
}

impl FilterDomains {
    pub fn age_min(&self) -> i64 {
        self.ages.first().copied().unwrap_or(0)
    }

    pub fn age_max(&self) -> i64 {
        self.ages.last().copied().unwrap_or(0)
    }

    /// Options for the year selector: each trend year, then "all of them".
    pub fn year_choices(&self) -> Vec<YearChoice> {
        let mut choices: Vec<YearChoice> =
            self.trend_years.iter().copied().map(YearChoice::Year).collect();
        choices.push(YearChoice::AllTrendYears);
        choices
    }

    pub fn year_choice_label(&self, choice: YearChoice) -> String {
        choice.label(&self.trend_years)
    }
}

fn distinct_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for v in values {
        if seen.insert(v) {
            out.push(v.to_string());
        }
    }
    out
}

pub fn derive(dataset: &Dataset, trend_years: &[i32]) -> Result<FilterDomains> {
    let (first_date, last_date) = match (
        dataset.records.iter().map(|r| r.created).min(),
        dataset.records.iter().map(|r| r.created).max(),
    ) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(ReportError::EmptyDataset(
                dataset.source.display().to_string(),
            ))
        }
    };

    let ages: BTreeSet<i64> = dataset.records.iter().map(|r| r.age).collect();
    let trend_years: BTreeSet<i32> = trend_years.iter().copied().collect();

    Ok(FilterDomains {
        segments: distinct_in_order(dataset.records.iter().map(|r| r.segment.as_str())),
        onboarding_types: distinct_in_order(
            dataset.records.iter().map(|r| r.onboarding_type.as_str()),
        ),
        ages: ages.into_iter().collect(),
        first_date,
        last_date,
        trend_years: trend_years.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{dataset, date, record};

    #[test]
    fn test_domains_preserve_first_seen_order() {
        let mut b = record("PRESTIGE", 40, date(2022, 3, 1));
        b.onboarding_type = "Online".into();
        let ds = dataset(vec![
            b,
            record("MASS", 20, date(2022, 1, 4)),
            record("PRESTIGE", 30, date(2023, 5, 31)),
        ]);
        let d = derive(&ds, &[2023, 2022]).unwrap();
        assert_eq!(d.segments, vec!["PRESTIGE", "MASS"]);
        assert_eq!(d.onboarding_types, vec!["Online", "Branch"]);
        assert_eq!(d.ages, vec![20, 30, 40]);
        assert_eq!((d.age_min(), d.age_max()), (20, 40));
        assert_eq!(d.first_date, date(2022, 1, 4));
        assert_eq!(d.last_date, date(2023, 5, 31));
        assert_eq!(d.trend_years, vec![2022, 2023]);
    }

    #[test]
    fn test_year_choices_end_with_all() {
        let ds = dataset(vec![record("MASS", 20, date(2022, 1, 4))]);
        let d = derive(&ds, &[2022, 2023]).unwrap();
        let labels: Vec<String> = d
            .year_choices()
            .into_iter()
            .map(|c| d.year_choice_label(c))
            .collect();
        assert_eq!(labels, vec!["2022", "2023", "2022 & 2023"]);
    }

    #[test]
    fn test_empty_dataset_is_an_error() {
        let ds = dataset(vec![]);
        assert!(matches!(
            derive(&ds, &[2022]),
            Err(ReportError::EmptyDataset(_))
        ));
    }
}
