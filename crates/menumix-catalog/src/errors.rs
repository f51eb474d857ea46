use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Position of a cell in the catalog sheet, rendered the way a spreadsheet user reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub column: &'static str,
    pub row_index: usize,
}

impl CellRef {
    pub fn new(column: &'static str, row_index: usize) -> Self {
        Self { column, row_index }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row_index + 1)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to open workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("workbook {path} does not contain any worksheets")]
    NoWorksheets { path: PathBuf },

    #[error("worksheet '{sheet}' could not be read: {source}")]
    Worksheet {
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    #[error("catalog header row {} is missing (sheet has {rows} rows)", .row_index + 1)]
    MissingHeaderRow { row_index: usize, rows: usize },

    #[error("catalog header at {cell} mismatch: expected {expected:?}, found {found:?}")]
    HeaderMismatch {
        cell: CellRef,
        expected: &'static str,
        found: String,
    },

    #[error("catalog contains {} duplicate item ids: {ids:?}", .ids.len())]
    DuplicateItemIds { ids: Vec<String> },
}
