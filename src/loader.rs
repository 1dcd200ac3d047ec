use std::path::Path;

use chrono::{Datelike, NaiveDate};

use crate::error::{ReportError, Result};
use crate::models::{generation_for_birth_year, Dataset, Record, SegmentAccounts};

pub const COL_SEGMENT: &str = "Market Segment Description";
pub const COL_AGE: &str = "Age";
pub const COL_ONBOARDING_TYPE: &str = "Customer On Boarding Type";
pub const COL_CREATION_DATE: &str = "Creation Date";
pub const COL_GENERATION: &str = "Generation";
pub const COL_DAYS_TO_SUBSCRIPTION: &str =
    "No. of days between CIR creation and Juice Subscription";
/// The production workbook spells this header "Retail sgement".
pub const COL_OVERVIEW_SEGMENT: &[&str] = &["Retail Segment", "Retail sgement"];
pub const COL_OVERVIEW_ACCOUNTS: &str = "Accounts";

const UNKNOWN: &str = "Unknown";
static EMPTY_CELL: Cell = Cell::Empty;
const DATE_FORMAT: &str = "%d %b %Y";
const MAX_AGE: i64 = 150;
/// 9999-12-31 in the 1900 date system.
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;
/// Largest float that still converts to an integer exactly.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

// ---------------------------------------------------------------------------
// Raw sheet representation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl Cell {
    /// CSV fields stay text; numbers are parsed only where a column expects one.
    fn from_csv_field(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(raw.to_string())
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => match float_to_integer(*f) {
                Some(i) => i.to_string(),
                None => f.to_string(),
            },
            Cell::Bool(b) => b.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            Cell::Float(f) => float_to_integer(*f),
            Cell::Text(s) => {
                let s = s.trim();
                s.parse()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(float_to_integer))
            }
            _ => None,
        }
    }
}

fn float_to_integer(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT {
        Some(f as i64)
    } else {
        None
    }
}

/// A header row plus data rows, independent of the file format.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Index of the first header matching any of `names` (trimmed, case-insensitive).
    pub fn column(&self, names: &[&str]) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
            .ok_or_else(|| ReportError::MissingColumn {
                column: names[0].to_string(),
                sheet: self.name.clone(),
            })
    }

    fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows[row].get(col).unwrap_or(&EMPTY_CELL)
    }
}

/// Spreadsheet row number (1-based, header on row 1) of a data row index.
fn sheet_row(idx: usize) -> usize {
    idx + 2
}

// ---------------------------------------------------------------------------
// File readers
// ---------------------------------------------------------------------------

pub fn read_sheet(path: &Path, sheet: &str) -> Result<Sheet> {
    if !path.exists() {
        return Err(ReportError::SourceNotFound(path.display().to_string()));
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => read_csv(path),
        _ => read_workbook(path, sheet),
    }
}

fn read_csv(path: &Path) -> Result<Sheet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::from_csv_field).collect());
    }
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(Sheet { name, headers, rows })
}

#[cfg(feature = "xlsx")]
fn read_workbook(path: &Path, sheet: &str) -> Result<Sheet> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| ReportError::Workbook(format!("Failed to open {}: {e}", path.display())))?;
    ensure_sheet(&workbook.sheet_names(), sheet)?;
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| ReportError::Workbook(format!("Failed to read sheet '{sheet}': {e}")))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|r| r.iter().map(|c| workbook_cell(c).display()).collect())
        .unwrap_or_default();
    let rows = rows.map(|r| r.iter().map(workbook_cell).collect()).collect();
    Ok(Sheet {
        name: sheet.to_string(),
        headers,
        rows,
    })
}

#[cfg(feature = "xlsx")]
fn ensure_sheet(names: &[String], sheet: &str) -> Result<()> {
    if names.iter().any(|n| n == sheet) {
        Ok(())
    } else {
        Err(ReportError::SheetNotFound {
            sheet: sheet.to_string(),
            available: names.join(", "),
        })
    }
}

#[cfg(not(feature = "xlsx"))]
fn read_workbook(path: &Path, _sheet: &str) -> Result<Sheet> {
    Err(ReportError::Workbook(format!(
        "{}: spreadsheet support requires the 'xlsx' feature",
        path.display()
    )))
}

#[cfg(feature = "xlsx")]
fn workbook_cell(cell: &calamine::Data) -> Cell {
    use calamine::Data;

    match cell {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match excel_serial_to_date(dt.as_f64()) {
            Some(d) => Cell::Date(d),
            None => Cell::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match parse_iso_date(s) {
            Some(d) => Cell::Date(d),
            None => Cell::Text(s.clone()),
        },
        other => Cell::Text(other.to_string()),
    }
}

/// Date of an Excel serial number. `None` for serials outside 1..=9999-12-31.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::try_days(serial.floor() as i64)?)
}

fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

// ---------------------------------------------------------------------------
// Typed parsing
// ---------------------------------------------------------------------------

/// Parse a creation-date cell. Text must look like "04 Jan 2022"; numeric
/// cells only come from workbooks and are read as Excel serials.
pub fn parse_creation_date(cell: &Cell, row: usize) -> Result<NaiveDate> {
    let invalid = || ReportError::InvalidDate {
        row,
        value: cell.display(),
    };
    match cell {
        Cell::Date(d) => Ok(*d),
        Cell::Int(i) => excel_serial_to_date(*i as f64).ok_or_else(invalid),
        Cell::Float(f) => excel_serial_to_date(*f).ok_or_else(invalid),
        Cell::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .ok()
            .or_else(|| parse_iso_date(s))
            .ok_or_else(invalid),
        Cell::Empty | Cell::Bool(_) => Err(invalid()),
    }
}

fn parse_integer(cell: &Cell, row: usize, column: &str) -> Result<i64> {
    cell.as_integer().ok_or_else(|| ReportError::InvalidNumber {
        row,
        column: column.to_string(),
        value: cell.display(),
    })
}

fn parse_age(cell: &Cell, row: usize) -> Result<i64> {
    let age = parse_integer(cell, row, COL_AGE)?;
    if (0..=MAX_AGE).contains(&age) {
        Ok(age)
    } else {
        Err(ReportError::InvalidNumber {
            row,
            column: COL_AGE.to_string(),
            value: cell.display(),
        })
    }
}

fn parse_category(cell: &Cell) -> String {
    if cell.is_empty() {
        UNKNOWN.to_string()
    } else {
        cell.display()
    }
}

struct RecordColumns {
    segment: usize,
    age: usize,
    onboarding_type: usize,
    created: usize,
    generation: usize,
    days: usize,
}

impl RecordColumns {
    fn resolve(sheet: &Sheet) -> Result<Self> {
        Ok(Self {
            segment: sheet.column(&[COL_SEGMENT])?,
            age: sheet.column(&[COL_AGE])?,
            onboarding_type: sheet.column(&[COL_ONBOARDING_TYPE])?,
            created: sheet.column(&[COL_CREATION_DATE])?,
            generation: sheet.column(&[COL_GENERATION])?,
            days: sheet.column(&[COL_DAYS_TO_SUBSCRIPTION])?,
        })
    }

    fn all(&self) -> [usize; 6] {
        [
            self.segment,
            self.age,
            self.onboarding_type,
            self.created,
            self.generation,
            self.days,
        ]
    }
}

pub fn parse_records(sheet: &Sheet) -> Result<Vec<Record>> {
    let cols = RecordColumns::resolve(sheet)?;
    let mut records = Vec::with_capacity(sheet.rows.len());
    let mut derived = 0usize;

    for idx in 0..sheet.rows.len() {
        if cols.all().iter().all(|&c| sheet.cell(idx, c).is_empty()) {
            continue;
        }
        let row = sheet_row(idx);
        let age = parse_age(sheet.cell(idx, cols.age), row)?;
        let created = parse_creation_date(sheet.cell(idx, cols.created), row)?;
        let days_cell = sheet.cell(idx, cols.days);
        let days_to_subscription = if days_cell.is_empty() {
            None
        } else {
            Some(parse_integer(days_cell, row, COL_DAYS_TO_SUBSCRIPTION)?)
        };
        let generation_cell = sheet.cell(idx, cols.generation);
        let generation = if generation_cell.is_empty() {
            derived += 1;
            let birth_year = i32::try_from(age)
                .ok()
                .and_then(|a| created.year().checked_sub(a))
                .ok_or_else(|| ReportError::InvalidNumber {
                    row,
                    column: COL_AGE.to_string(),
                    value: age.to_string(),
                })?;
            generation_for_birth_year(birth_year).to_string()
        } else {
            generation_cell.display()
        };

        records.push(Record {
            segment: parse_category(sheet.cell(idx, cols.segment)),
            age,
            onboarding_type: parse_category(sheet.cell(idx, cols.onboarding_type)),
            created,
            generation,
            days_to_subscription,
        });
    }

    if derived > 0 {
        tracing::warn!(derived, "generation derived from age for rows with a blank cell");
    }
    Ok(records)
}

/// Read the small (segment, accounts) table that feeds the overview pie.
pub fn parse_overview(sheet: &Sheet, limit: usize) -> Result<Vec<SegmentAccounts>> {
    let name_col = sheet.column(COL_OVERVIEW_SEGMENT)?;
    let accounts_col = sheet.column(&[COL_OVERVIEW_ACCOUNTS])?;

    let mut overview = Vec::new();
    for idx in 0..sheet.rows.len().min(limit) {
        let name = sheet.cell(idx, name_col);
        if name.is_empty() {
            continue;
        }
        let cell = sheet.cell(idx, accounts_col);
        let accounts = parse_integer(cell, sheet_row(idx), COL_OVERVIEW_ACCOUNTS)?;
        let accounts = u64::try_from(accounts).map_err(|_| ReportError::InvalidNumber {
            row: sheet_row(idx),
            column: COL_OVERVIEW_ACCOUNTS.to_string(),
            value: cell.display(),
        })?;
        overview.push(SegmentAccounts {
            segment: name.display(),
            accounts,
        });
    }
    Ok(overview)
}

/// Load the whole dataset. Fails on the first missing column or bad value.
pub fn load_dataset(path: &Path, sheet_name: &str, overview_rows: usize) -> Result<Dataset> {
    let sheet = read_sheet(path, sheet_name)?;
    let records = parse_records(&sheet)?;
    let overview = parse_overview(&sheet, overview_rows)?;
    tracing::info!(
        path = %path.display(),
        sheet = %sheet.name,
        records = records.len(),
        overview_segments = overview.len(),
        "loaded onboarding data"
    );
    Ok(Dataset {
        records,
        overview,
        source: path.to_path_buf(),
        sheet: sheet.name,
    })
}
