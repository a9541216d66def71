//! Tabular input: spreadsheets and delimited text.
//!
//! Input files are laid out as:
//!
//! ```text
//! row 1            free-form headers
//! control row      one location string per column (default: row 2)
//! following rows   one record per row
//! ```
//!
//! [`DataHandler`] loads the whole sheet, then hands out the control row
//! and data rows with every cell coerced to text. Cells in date columns
//! are normalized on the way out.

pub mod workbook;

use std::fs;
use std::path::Path;

use chrono::{NaiveDateTime, Timelike};
use encoding_rs::{Encoding, UTF_8};
use serde::{Deserialize, Serialize};

use crate::error::{SourceError, SourceResult};
use crate::transform::dates::normalize_cell;
use crate::transform::location;

/// `displayLabel` marking the identifier column used to name records.
pub const DEFAULT_ID_MARKER: &str = "PN_DB_id";

// =============================================================================
// Cells
// =============================================================================

/// A raw input cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl Cell {
    fn from_field(field: &str) -> Self {
        if field.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(field.to_string())
        }
    }

    /// Text form of the cell.
    ///
    /// Whole numbers lose their fractional part (`1591.0` -> `1591`) and
    /// dates without a time become `YYYY-MM-DD`.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
            Cell::Float(f) => f.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Date(dt) if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 => {
                dt.format("%Y-%m-%d").to_string()
            }
            Cell::Date(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

// =============================================================================
// Options
// =============================================================================

/// How to read an input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceOptions {
    /// Sheet number in a workbook (starting at 1)
    pub sheet: usize,

    /// Row holding the location strings (starting at 1)
    pub control_row: usize,

    /// Encoding label for delimited text, or `auto` to detect it
    pub input_encoding: String,

    /// Field delimiter for delimited text (auto-detect if not specified)
    pub delimiter: Option<char>,

    /// Normalize dates with two-digit years too
    pub force_dates: bool,

    /// `displayLabel` of the identifier column
    pub id_marker: String,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            sheet: 1,
            control_row: 2,
            input_encoding: "utf-8".to_string(),
            delimiter: None,
            force_dates: false,
            id_marker: DEFAULT_ID_MARKER.to_string(),
        }
    }
}

// =============================================================================
// Data Handler
// =============================================================================

/// One data row, with its 1-based row number in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataRow {
    pub number: usize,
    pub cells: Vec<String>,
}

/// Loaded tabular input.
#[derive(Debug, Clone)]
pub struct DataHandler {
    rows: Vec<Vec<Cell>>,
    control: Vec<String>,
    date_columns: Vec<bool>,
    control_row: usize,
    force_dates: bool,
    id_marker: String,
    encoding: Option<String>,
}

impl DataHandler {
    /// Open a workbook or delimited-text file.
    pub fn open<P: AsRef<Path>>(path: P, options: &SourceOptions) -> SourceResult<Self> {
        let path = path.as_ref();
        if workbook::is_workbook(path) {
            let rows = workbook::read_sheet(path, options.sheet)?;
            Self::from_rows(rows, options, None)
        } else {
            let bytes = fs::read(path)?;
            Self::from_bytes(&bytes, options)
        }
    }

    /// Load delimited text from raw bytes.
    pub fn from_bytes(bytes: &[u8], options: &SourceOptions) -> SourceResult<Self> {
        let (content, encoding) = decode_content(bytes, &options.input_encoding)?;
        let delimiter = options
            .delimiter
            .unwrap_or_else(|| detect_delimiter(&content));
        let rows = parse_delimited(&content, delimiter)?;
        Self::from_rows(rows, options, Some(encoding.name().to_string()))
    }

    fn from_rows(
        rows: Vec<Vec<Cell>>,
        options: &SourceOptions,
        encoding: Option<String>,
    ) -> SourceResult<Self> {
        if rows.is_empty() {
            return Err(SourceError::EmptyFile);
        }
        let control: Vec<String> = options
            .control_row
            .checked_sub(1)
            .and_then(|i| rows.get(i))
            .ok_or(SourceError::MissingControlRow(options.control_row))?
            .iter()
            .map(Cell::to_text)
            .collect();
        let date_columns = control.iter().map(|loc| is_date_location(loc)).collect();

        Ok(Self {
            rows,
            control,
            date_columns,
            control_row: options.control_row,
            force_dates: options.force_dates,
            id_marker: options.id_marker.clone(),
            encoding,
        })
    }

    /// Location strings, one per column, exactly as written.
    pub fn control_row(&self) -> &[String] {
        &self.control
    }

    /// 0-based index of the identifier column, if any.
    pub fn id_col(&self) -> Option<usize> {
        self.control.iter().position(|loc| {
            location::parse(loc)
                .map(|l| l.base.attributes.get("displayLabel") == Some(self.id_marker.as_str()))
                .unwrap_or(false)
        })
    }

    /// Any row by 1-based number, cells coerced to text.
    pub fn row(&self, number: usize) -> SourceResult<Vec<String>> {
        number
            .checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .map(|cells| self.coerce(cells))
            .ok_or(SourceError::RowOutOfRange {
                row: number,
                rows: self.rows.len(),
            })
    }

    /// Non-blank rows after the control row.
    pub fn data_rows(&self) -> impl Iterator<Item = DataRow> + '_ {
        self.rows
            .iter()
            .enumerate()
            .skip(self.control_row)
            .filter(|(_, cells)| !cells.iter().all(|c| c.to_text().trim().is_empty()))
            .map(|(i, cells)| DataRow {
                number: i + 1,
                cells: self.coerce(cells),
            })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Encoding used for delimited text (`None` for workbooks).
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Coerce cells to text, padded to the control row's width.
    fn coerce(&self, cells: &[Cell]) -> Vec<String> {
        let width = cells.len().max(self.control.len());
        (0..width)
            .map(|i| match cells.get(i) {
                Some(cell) if self.date_columns.get(i).copied().unwrap_or(false) => {
                    normalize_cell(cell.clone(), self.force_dates).to_text()
                }
                Some(cell) => cell.to_text(),
                None => String::new(),
            })
            .collect()
    }
}

/// Columns whose location mentions a date get date normalization.
pub fn is_date_location(location: &str) -> bool {
    location.to_lowercase().contains("date")
}

// =============================================================================
// Delimited Text
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes with the encoding named by `label` (`auto` to detect).
///
/// Unknown labels and bytes that are invalid in the chosen encoding are
/// both encoding errors.
pub fn decode_content(bytes: &[u8], label: &str) -> SourceResult<(String, &'static Encoding)> {
    let encoding = if label.trim().eq_ignore_ascii_case("auto") {
        Encoding::for_label(detect_encoding(bytes).as_bytes()).unwrap_or(UTF_8)
    } else {
        Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| SourceError::Encoding(format!("unknown encoding '{}'", label)))?
    };

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(SourceError::Encoding(format!(
            "input is not valid {}",
            used.name()
        )));
    }
    Ok((text.into_owned(), used))
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Split delimited text into rows; quoted fields may hold delimiters,
/// quotes and newlines.
pub fn parse_delimited(content: &str, delimiter: char) -> SourceResult<Vec<Vec<Cell>>> {
    if !delimiter.is_ascii() {
        return Err(SourceError::Csv(format!(
            "delimiter '{}' is not an ASCII character",
            delimiter
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| SourceError::Csv(format!("record {}: {}", idx + 1, e)))?;
        rows.push(record.iter().map(Cell::from_field).collect());
    }
    Ok(rows)
}
