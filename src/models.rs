use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

pub const HAS_SUBSCRIPTION: &str = "Has Juice";
pub const NO_SUBSCRIPTION: &str = "No Juice";

/// One onboarded account.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub segment: String,
    pub age: i64,
    pub onboarding_type: String,
    pub created: NaiveDate,
    pub generation: String,
    /// Days between account creation and the add-on subscription; `None` when
    /// the customer never subscribed.
    pub days_to_subscription: Option<i64>,
}

impl Record {
    pub fn year(&self) -> i32 {
        self.created.year()
    }

    /// Calendar month key used for chronological grouping.
    pub fn month_key(&self) -> (i32, u32) {
        (self.created.year(), self.created.month())
    }

    pub fn has_subscription(&self) -> bool {
        self.days_to_subscription.is_some()
    }

    pub fn subscription_class(&self) -> &'static str {
        if self.has_subscription() {
            HAS_SUBSCRIPTION
        } else {
            NO_SUBSCRIPTION
        }
    }
}

/// Row of the static overview table (segment name, account count).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentAccounts {
    pub segment: String,
    pub accounts: u64,
}

/// Everything loaded from the data file. Read-only for the whole session.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<Record>,
    pub overview: Vec<SegmentAccounts>,
    pub source: PathBuf,
    pub sheet: String,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn overview_total(&self) -> u64 {
        self.overview.iter().map(|s| s.accounts).sum()
    }
}

/// Cohort for a birth year, used when the sheet leaves the generation blank.
pub fn generation_for_birth_year(year: i32) -> &'static str {
    match year {
        i32::MIN..=1945 => "Silent Generation",
        1946..=1964 => "Baby Boomers",
        1965..=1980 => "Gen X",
        1981..=1996 => "Millennials",
        1997..=2012 => "Gen Z",
        _ => "Gen Alpha",
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_month_key() {
        let r = record("MASS", 30, date(2022, 2, 14));
        assert_eq!(r.month_key(), (2022, 2));
        assert_eq!(r.year(), 2022);
    }

    #[test]
    fn test_subscription_class() {
        let mut r = record("MASS", 30, date(2022, 2, 14));
        assert_eq!(r.subscription_class(), NO_SUBSCRIPTION);
        r.days_to_subscription = Some(0);
        assert_eq!(r.subscription_class(), HAS_SUBSCRIPTION);
    }

    #[test]
    fn test_generation_boundaries() {
        assert_eq!(generation_for_birth_year(1945), "Silent Generation");
        assert_eq!(generation_for_birth_year(1964), "Baby Boomers");
        assert_eq!(generation_for_birth_year(1965), "Gen X");
        assert_eq!(generation_for_birth_year(1996), "Millennials");
        assert_eq!(generation_for_birth_year(1997), "Gen Z");
        assert_eq!(generation_for_birth_year(2013), "Gen Alpha");
    }

    #[test]
    fn test_overview_total() {
        let ds = dataset(vec![]);
        assert_eq!(ds.overview_total(), 150);
        assert!(ds.is_empty());
    }
}
