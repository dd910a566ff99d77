//! Spreadsheet loading.
//!
//! Reads a survey export (xlsx/xls/ods) into a [`SurveyTable`] using
//! calamine. The first sheet row is taken as the header row; every cell is
//! normalized to text at load time so the rest of the pipeline only deals
//! with strings.

use crate::models::SurveyTable;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Fatal loading failure; the run aborts, no partial report is produced.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open workbook {path}: {source}")]
    Workbook {
        path: String,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to read sheet '{name}': {source}")]
    Sheet {
        name: String,
        #[source]
        source: calamine::Error,
    },

    #[error("sheet '{0}' not found in workbook")]
    SheetNotFound(String),

    #[error("workbook has no sheets")]
    NoSheets,

    #[error("sheet '{0}' has no header row")]
    EmptySheet(String),
}

/// Load a survey table from a spreadsheet file.
///
/// When `sheet` is `None` the first sheet of the workbook is used.
pub fn load_survey(path: &Path, sheet: Option<&str>) -> Result<SurveyTable, LoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| LoadError::Workbook {
        path: path.display().to_string(),
        source,
    })?;

    let sheet_name = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(LoadError::SheetNotFound(name.to_string()));
            }
            name.to_string()
        }
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(LoadError::NoSheets)?,
    };

    debug!("Reading sheet '{}'", sheet_name);

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|source| LoadError::Sheet {
            name: sheet_name.clone(),
            source,
        })?;

    let mut rows = range.rows();

    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| LoadError::EmptySheet(sheet_name.clone()))?
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::EmptySheet(sheet_name));
    }

    let data: Vec<Vec<Option<String>>> = rows
        .map(|row| row.iter().map(normalize_cell).collect())
        .collect();

    let table = SurveyTable::new(headers, data);
    info!(
        "Loaded {} rows x {} columns from '{}'",
        table.row_count(),
        table.headers().len(),
        sheet_name
    );

    Ok(table)
}

/// Normalize a spreadsheet cell to text.
///
/// Empty and whitespace-only cells become missing. Floats with no fractional
/// part print as integers, so numeric answer codes survive the float round
/// trip that spreadsheet formats impose.
fn normalize_cell(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.is_finite() {
                Some(format!("{}", *f as i64))
            } else {
                Some(f.to_string())
            }
        }
        Data::Bool(b) => Some(b.to_string()),
        Data::Error(_) => None,
        other => {
            let text = other.to_string();
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
    }
}
