use std::path::Path;

use crate::error::{ReportError, Result};
use crate::loader::load_dataset;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(path: &str, sheet: Option<&str>) -> Result<()> {
    let resolved = shellexpand_path(path);
    let p = Path::new(&resolved);
    if !p.exists() {
        return Err(ReportError::SourceNotFound(resolved));
    }

    let mut settings = load_settings();
    if let Some(sheet) = sheet {
        settings.sheet_name = sheet.to_string();
    }
    // Validate before remembering it.
    let dataset = load_dataset(p, &settings.sheet_name, settings.overview_rows)?;

    settings.data_file = resolved.clone();
    save_settings(&settings)?;
    println!("Loaded {} records from {resolved}", dataset.len());
    Ok(())
}
