//! Spreadsheet import.
//!
//! The first worksheet is read with calamine. Its first row names the
//! columns; every later non-blank row becomes one header→text map, which
//! `books_from_rows` then turns into ballot entries.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use thiserror::Error;
use tracing::debug;

use crate::types::Book;

pub const TITLE_COLUMN: &str = "Title";
pub const AUTHOR_COLUMN: &str = "Author";
pub const COVER_COLUMN: &str = "Cover";

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_AUTHOR: &str = "Unknown";

/// One spreadsheet row keyed by column header. Empty cells are absent.
pub type Row = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot read upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("unreadable workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("workbook has no sheets")]
    NoSheets,
}

/// Read every data row of the first worksheet at `path`.
///
/// The format (xlsx, xlsb, xls or ods) is detected from the content, so
/// the file name does not matter.
pub fn read_rows(path: &Path) -> Result<Vec<Row>, ImportError> {
    let bytes = std::fs::read(path)?;
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::NoSheets)??;

    let mut rows = range.rows();
    let headers: Vec<Option<String>> = match rows.next() {
        Some(first) => first.iter().map(cell_text).collect(),
        None => return Ok(Vec::new()),
    };

    let parsed: Vec<Row> = rows
        .map(|cells| {
            headers
                .iter()
                .zip(cells)
                .filter_map(|(header, cell)| Some((header.clone()?, cell_text(cell)?)))
                .collect::<Row>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    debug!(?path, rows = parsed.len(), "worksheet read");
    Ok(parsed)
}

/// Text of a cell, or `None` for empty and error cells.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some((*f as i64).to_string()),
        other => Some(other.to_string()),
    }
}

/// Map rows to books, filling in defaults for missing columns.
pub fn books_from_rows(rows: &[Row]) -> Vec<Book> {
    rows.iter()
        .map(|row| Book {
            title: column(row, TITLE_COLUMN).unwrap_or(DEFAULT_TITLE).to_string(),
            author: column(row, AUTHOR_COLUMN).unwrap_or(DEFAULT_AUTHOR).to_string(),
            cover: column(row, COVER_COLUMN).unwrap_or_default().to_string(),
        })
        .collect()
}

fn column<'a>(row: &'a Row, name: &str) -> Option<&'a str> {
    row.get(name).map(String::as_str).filter(|v| !v.is_empty())
}

/// Lower-cased extension of `file_name`, without the dot.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}
