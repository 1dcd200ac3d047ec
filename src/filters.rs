use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domains::FilterDomains;
use crate::error::{ReportError, Result};
use crate::models::Record;

/// One entry of the year selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum YearChoice {
    Year(i32),
    AllTrendYears,
}

impl YearChoice {
    pub fn label(self, trend_years: &[i32]) -> String {
        match self {
            YearChoice::Year(y) => y.to_string(),
            YearChoice::AllTrendYears => trend_years
                .iter()
                .map(|y| y.to_string())
                .collect::<Vec<_>>()
                .join(" & "),
        }
    }

    /// Accepts a year ("2022") or "all".
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("all") {
            return Some(YearChoice::AllTrendYears);
        }
        raw.parse().ok().map(YearChoice::Year)
    }
}

/// Row predicate for one aggregate view. Bounds are inclusive; `None` means
/// the dimension is not restricted in this view.
#[derive(Debug, Clone, Copy)]
pub struct RowFilter<'a> {
    pub dates: (NaiveDate, NaiveDate),
    pub segments: &'a BTreeSet<String>,
    pub onboarding_types: Option<&'a BTreeSet<String>>,
    pub ages: Option<(i64, i64)>,
}

impl RowFilter<'_> {
    pub fn matches(&self, record: &Record) -> bool {
        let (start, end) = self.dates;
        if record.created < start || record.created > end {
            return false;
        }
        if !self.segments.contains(&record.segment) {
            return false;
        }
        if let Some(types) = self.onboarding_types {
            if !types.contains(&record.onboarding_type) {
                return false;
            }
        }
        if let Some((lo, hi)) = self.ages {
            if record.age < lo || record.age > hi {
                return false;
            }
        }
        true
    }
}

/// Everything the user has picked in the filter widgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSelection {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub segments: BTreeSet<String>,
    pub onboarding_types: BTreeSet<String>,
    pub age_min: i64,
    pub age_max: i64,
    pub years: BTreeSet<YearChoice>,
    /// Segments feeding the generation and attach-rate views.
    pub generation_segments: BTreeSet<String>,
}

impl FilterSelection {
    /// Full domain everywhere, except the generation view which starts on the
    /// configured segments (all segments if none of them exist).
    pub fn defaults(domains: &FilterDomains, generation_defaults: &[String]) -> Self {
        let all_segments: BTreeSet<String> = domains.segments.iter().cloned().collect();
        let mut generation_segments: BTreeSet<String> = generation_defaults
            .iter()
            .filter(|s| all_segments.contains(*s))
            .cloned()
            .collect();
        if generation_segments.is_empty() {
            generation_segments = all_segments.clone();
        }
        Self {
            start: domains.first_date,
            end: domains.last_date,
            segments: all_segments,
            onboarding_types: domains.onboarding_types.iter().cloned().collect(),
            age_min: domains.age_min(),
            age_max: domains.age_max(),
            years: BTreeSet::from([YearChoice::AllTrendYears]),
            generation_segments,
        }
    }

    /// Scope of the segment breakdown and the monthly trend.
    pub fn breakdown_scope(&self) -> RowFilter<'_> {
        RowFilter {
            dates: (self.start, self.end),
            segments: &self.segments,
            onboarding_types: Some(&self.onboarding_types),
            ages: Some((self.age_min, self.age_max)),
        }
    }

    /// Scope of the generation and attach-rate views: dates and their own
    /// segment selection only.
    pub fn generation_scope(&self) -> RowFilter<'_> {
        RowFilter {
            dates: (self.start, self.end),
            segments: &self.generation_segments,
            onboarding_types: None,
            ages: None,
        }
    }

    /// Calendar years the monthly trend keeps.
    pub fn effective_years(&self, trend_years: &[i32]) -> BTreeSet<i32> {
        if self.years.contains(&YearChoice::AllTrendYears) {
            return trend_years.iter().copied().collect();
        }
        self.years
            .iter()
            .filter_map(|c| match c {
                YearChoice::Year(y) if trend_years.contains(y) => Some(*y),
                _ => None,
            })
            .collect()
    }

    /// Reject values the widgets would never produce. Used for selections
    /// built from command-line arguments.
    pub fn validate(&self, domains: &FilterDomains) -> Result<()> {
        if self.start > self.end {
            return Err(ReportError::InvalidFilter(format!(
                "start date {} is after end date {}",
                self.start, self.end
            )));
        }
        if self.age_min > self.age_max {
            return Err(ReportError::InvalidFilter(format!(
                "minimum age {} is above maximum age {}",
                self.age_min, self.age_max
            )));
        }
        for segment in self.segments.iter().chain(&self.generation_segments) {
            if !domains.segments.contains(segment) {
                return Err(ReportError::InvalidFilter(format!(
                    "unknown segment '{segment}' (known: {})",
                    domains.segments.join(", ")
                )));
            }
        }
        for kind in &self.onboarding_types {
            if !domains.onboarding_types.contains(kind) {
                return Err(ReportError::InvalidFilter(format!(
                    "unknown onboarding type '{kind}' (known: {})",
                    domains.onboarding_types.join(", ")
                )));
            }
        }
        for choice in &self.years {
            if let YearChoice::Year(y) = choice {
                if !domains.trend_years.contains(y) {
                    return Err(ReportError::InvalidFilter(format!(
                        "year {y} is not one of the trend years"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Add `value` to the set if absent, remove it otherwise.
pub fn toggle<T: Ord>(set: &mut BTreeSet<T>, value: T) {
    if !set.remove(&value) {
        set.insert(value);
    }
}
