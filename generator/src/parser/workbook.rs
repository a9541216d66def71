//! Spreadsheet input (xls, xlsx, xlsm, xlsb, ods) via calamine.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use super::Cell;
use crate::error::{SourceError, SourceResult};

/// File extensions read as workbooks; everything else is delimited text.
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm", "xlsb", "ods"];

pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| WORKBOOK_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

/// Read every row of a sheet (1-based), anchored at cell A1.
pub fn read_sheet(path: &Path, sheet: usize) -> SourceResult<Vec<Vec<Cell>>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| SourceError::Workbook(format!("{}: {}", path.display(), e)))?;

    let index = sheet.checked_sub(1).ok_or(SourceError::SheetNotFound(sheet))?;
    let range = workbook
        .worksheet_range_at(index)
        .ok_or(SourceError::SheetNotFound(sheet))?
        .map_err(|e| SourceError::Workbook(e.to_string()))?;

    // Ranges start at the first used cell, not at A1
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_offset];
        cells.extend(row.iter().map(cell_from_data));
        rows.push(cells);
    }
    Ok(rows)
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Float(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        _ => Cell::Empty,
    }
}
