pub mod dashboard;
pub mod domains;
pub mod load;
pub mod report;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domains::{derive, FilterDomains};
use crate::error::Result;
use crate::loader::load_dataset;
use crate::models::Dataset;
use crate::settings::{load_settings, Settings};

pub(crate) const NOTHING_TO_REPORT: &str = "No accounts match the current filters.";

#[derive(Parser)]
#[command(
    name = "onboard",
    version,
    about = "Interactive report of customer-onboarding trends."
)]
pub struct Cli {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where the onboarding data comes from. Overrides the settings file.
#[derive(Args, Clone, Debug, Default)]
pub struct SourceArgs {
    /// Spreadsheet (.xlsx/.xls/.ods) or CSV file with onboarding records
    #[arg(long, global = true)]
    pub file: Option<String>,
    /// Sheet holding the records (ignored for CSV)
    #[arg(long, global = true)]
    pub sheet: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive dashboard.
    Dashboard,
    /// Print the report once with the given filters.
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show the values available to each filter.
    Domains,
    /// Remember a data file for future runs.
    Load {
        /// Path to the spreadsheet or CSV file
        path: String,
    },
    /// Generate shell completions.
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Filter overrides; anything left out keeps the dashboard default.
#[derive(Args, Clone, Debug, Default)]
pub struct FilterArgs {
    /// First creation date to include (YYYY-MM-DD)
    #[arg(long = "from")]
    pub from_date: Option<chrono::NaiveDate>,
    /// Last creation date to include (YYYY-MM-DD)
    #[arg(long = "to")]
    pub to_date: Option<chrono::NaiveDate>,
    /// Market segment to include (repeatable)
    #[arg(long = "segment")]
    pub segments: Vec<String>,
    /// Onboarding type to include (repeatable)
    #[arg(long = "type")]
    pub onboarding_types: Vec<String>,
    /// Youngest age to include
    #[arg(long)]
    pub min_age: Option<i64>,
    /// Oldest age to include
    #[arg(long)]
    pub max_age: Option<i64>,
    /// Trend year to chart: a year or "all" (repeatable)
    #[arg(long = "year")]
    pub years: Vec<String>,
    /// Segment for the generation and attach-rate views (repeatable)
    #[arg(long = "generation-segment")]
    pub generation_segments: Vec<String>,
}

/// Settings plus command-line overrides, and the data they point at.
pub struct Session {
    pub settings: Settings,
    pub dataset: Dataset,
    pub domains: FilterDomains,
}

impl Session {
    pub fn open(source: &SourceArgs) -> Result<Self> {
        let mut settings = load_settings();
        if let Some(file) = &source.file {
            settings.data_file = file.clone();
        }
        if let Some(sheet) = &source.sheet {
            settings.sheet_name = sheet.clone();
        }
        let path = PathBuf::from(&settings.data_file);
        let dataset = load_dataset(&path, &settings.sheet_name, settings.overview_rows)?;
        let domains = derive(&dataset, &settings.trend_years)?;
        Ok(Self {
            settings,
            dataset,
            domains,
        })
    }
}
