use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};

use crate::errors::{CatalogError, CellRef};
use crate::layout::{column_for, CatalogField, CATALOG_COLUMNS, HEADER_ROW_INDEX};
use crate::model::{DuplicatePolicy, LoadedCatalog, MasterCatalog, MasterEntry};

/// Absolute sheet grid: `grid[row][column]`, blank cells as `None`.
pub type SheetGrid = Vec<Vec<Option<String>>>;

#[derive(Debug, Clone, Default)]
pub struct CatalogOptions {
    /// Worksheet to read; the first sheet when unset.
    pub sheet: Option<String>,
    pub duplicates: DuplicatePolicy,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogRows {
    pub entries: Vec<MasterEntry>,
    pub data_rows: usize,
    pub rows_without_id: usize,
}

pub fn load_master_catalog(
    path: &Path,
    options: &CatalogOptions,
) -> Result<LoadedCatalog, CatalogError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| CatalogError::Workbook {
        path: path.to_path_buf(),
        source,
    })?;

    let sheet_name = match &options.sheet {
        Some(name) => name.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| CatalogError::NoWorksheets {
                path: path.to_path_buf(),
            })?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|source| CatalogError::Worksheet {
            sheet: sheet_name.clone(),
            source,
        })?;

    let rows = parse_catalog_grid(&range_to_grid(&range))?;
    let catalog = MasterCatalog::from_entries(rows.entries, options.duplicates)?;

    Ok(LoadedCatalog {
        catalog,
        sheet_name,
        data_rows: rows.data_rows,
        rows_without_id: rows.rows_without_id,
    })
}

/// Reads the positional columns below the header row. Product Class is carried down from the
/// last non-blank value; rows with no item id are dropped after the carry so group header rows
/// still seed the class for the items beneath them.
pub fn parse_catalog_grid(grid: &[Vec<Option<String>>]) -> Result<CatalogRows, CatalogError> {
    let header = grid
        .get(HEADER_ROW_INDEX)
        .ok_or(CatalogError::MissingHeaderRow {
            row_index: HEADER_ROW_INDEX,
            rows: grid.len(),
        })?;

    for column in CATALOG_COLUMNS.iter() {
        let found = cell(header, column.index).unwrap_or_default();
        if !column.header_matches(found) {
            return Err(CatalogError::HeaderMismatch {
                cell: CellRef::new(column.letter, HEADER_ROW_INDEX),
                expected: column.header,
                found: found.to_string(),
            });
        }
    }

    let class_idx = column_for(CatalogField::ProductClass).index;
    let id_idx = column_for(CatalogField::ItemId).index;
    let name_idx = column_for(CatalogField::ItemName).index;
    let category_idx = column_for(CatalogField::RevenueCategory).index;
    let group_idx = column_for(CatalogField::ItemGroup).index;

    let mut rows = CatalogRows::default();
    let mut last_class: Option<String> = None;

    for row in grid.iter().skip(HEADER_ROW_INDEX + 1) {
        rows.data_rows += 1;

        if let Some(class) = cell(row, class_idx) {
            last_class = Some(class.to_string());
        }

        let item_id = match cell(row, id_idx).map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                rows.rows_without_id += 1;
                continue;
            }
        };

        rows.entries.push(MasterEntry {
            item_id,
            item_name: cell(row, name_idx).map(str::to_string),
            product_class: last_class.clone(),
            revenue_category: cell(row, category_idx).map(str::to_string),
            item_group: cell(row, group_idx).map(str::to_string),
        });
    }

    Ok(rows)
}

pub fn range_to_grid(range: &Range<Data>) -> SheetGrid {
    let Some((end_row, end_col)) = range.end() else {
        return Vec::new();
    };

    (0..=end_row)
        .map(|row| {
            (0..=end_col)
                .map(|col| range.get_value((row, col)).and_then(data_to_text))
                .collect()
        })
        .collect()
}

fn cell(row: &[Option<String>], index: usize) -> Option<&str> {
    row.get(index).and_then(|value| value.as_deref())
}

/// Spreadsheet cells as text. Integral floats drop the fractional part so numeric item ids
/// come through as `1001`, never `1001.0`.
pub fn data_to_text(value: &Data) -> Option<String> {
    let text = match value {
        Data::Empty => return None,
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() <= 9_007_199_254_740_992.0 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => {
            if *b {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
        Data::DateTime(serial) => serial.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => return None,
    };

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
