//! First-sheet reader shared by contact import and history re-import.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};

/// Cells of the first worksheet rendered as text.
pub(crate) struct SheetRows {
    /// Zero-based index of the first used row in the sheet.
    pub first_row: usize,
    pub rows: Vec<Vec<String>>,
}

pub(crate) fn read_first_sheet(path: &Path) -> Result<SheetRows, calamine::Error> {
    let mut workbook = open_workbook_auto(path)?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(SheetRows {
            first_row: 0,
            rows: Vec::new(),
        });
    };
    let range = range?;

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    Ok(SheetRows { first_row, rows })
}

/// Integral floats print without a fraction so phone numbers typed as numbers survive.
pub(crate) fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            (*value as i64).to_string()
        }
        Data::Bool(value) => value.to_string(),
        other => other.to_string(),
    }
}
