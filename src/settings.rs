use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_file")]
    pub data_file: String,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    /// Maximum number of rows read from the overview table.
    #[serde(default = "default_overview_rows")]
    pub overview_rows: usize,
    /// Calendar years the monthly trend is limited to.
    #[serde(default = "default_trend_years")]
    pub trend_years: Vec<i32>,
    #[serde(default = "default_generation_segments")]
    pub generation_default_segments: Vec<String>,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub note: String,
    #[serde(default = "default_accent_color")]
    pub accent_color: String,
    #[serde(default = "default_pie_colors")]
    pub pie_colors: Vec<String>,
}

fn default_data_file() -> String {
    "onboarding.xlsx".to_string()
}

fn default_sheet_name() -> String {
    "clientsOnboarding".to_string()
}

fn default_overview_rows() -> usize {
    10
}

fn default_trend_years() -> Vec<i32> {
    vec![2022, 2023]
}

fn default_generation_segments() -> Vec<String> {
    vec!["MASS".to_string()]
}

fn default_title() -> String {
    "Account opening trends in the retail segment".to_string()
}

fn default_accent_color() -> String {
    "#DD133D".to_string()
}

fn default_pie_colors() -> Vec<String> {
    ["#850C24", "#DD133D", "#CFCDCD", "#F99211"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            sheet_name: default_sheet_name(),
            overview_rows: default_overview_rows(),
            trend_years: default_trend_years(),
            generation_default_segments: default_generation_segments(),
            title: default_title(),
            note: String::new(),
            accent_color: default_accent_color(),
            pie_colors: default_pie_colors(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("onboard")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
                Settings::default()
            }
        }
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path(), settings)
}

fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| ReportError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}
