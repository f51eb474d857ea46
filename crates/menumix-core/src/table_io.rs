use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use thiserror::Error;

/// Byte-order mark written ahead of the enriched CSV so spreadsheet tools pick UTF-8.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
pub const XLSX_SHEET_NAME: &str = "Sheet1";

#[derive(Debug, Error)]
pub enum TableIoError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error("failed to write workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf8Bom,
}

/// Reads a delimited file with every column kept as text. Empty cells become nulls so ids
/// with leading zeros and free-form codes are never reinterpreted as numbers.
pub fn read_delimited(path: &Path) -> Result<DataFrame, TableIoError> {
    let file = File::open(path).map_err(|source| TableIoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_delimited_from_reader(BufReader::new(file))
}

pub fn read_delimited_from_reader<R: Read>(reader: R) -> Result<DataFrame, TableIoError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = unique_headers(csv_reader.headers()?.iter());
    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    for record in csv_reader.records() {
        let record = record?;
        for (idx, column) in values.iter_mut().enumerate() {
            let cell = record
                .get(idx)
                .filter(|value| !value.is_empty())
                .map(str::to_string);
            column.push(cell);
        }
    }

    let columns: Vec<Column> = headers
        .into_iter()
        .zip(values)
        .map(|(name, data)| Series::new(name.into(), data).into())
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// Blank headers become `Unnamed: {position}` and repeats get a `.1`, `.2` suffix, matching the
/// names analysts already see when they open these extracts in a notebook.
fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::new();

    for (position, header) in raw.enumerate() {
        let header = header.trim_start_matches('\u{feff}');
        let base = if header.is_empty() {
            format!("Unnamed: {position}")
        } else {
            header.to_string()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{base}.{suffix}");
            suffix += 1;
        }
        seen.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}

pub fn write_csv(df: &DataFrame, path: &Path, encoding: TextEncoding) -> Result<(), TableIoError> {
    let file = File::create(path).map_err(|source| TableIoError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    write_csv_to_writer(df, BufWriter::new(file), encoding)
}

pub fn write_csv_to_writer<W: Write>(
    df: &DataFrame,
    mut writer: W,
    encoding: TextEncoding,
) -> Result<(), TableIoError> {
    if encoding == TextEncoding::Utf8Bom {
        writer.write_all(UTF8_BOM)?;
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(df.get_column_names().iter().map(|name| name.as_str()))?;

    let columns = df.get_columns();
    let mut record: Vec<String> = Vec::with_capacity(columns.len());
    for idx in 0..df.height() {
        record.clear();
        for column in columns {
            record.push(cell_text(column, idx)?.unwrap_or_default());
        }
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn csv_bytes(df: &DataFrame) -> Result<Vec<u8>, TableIoError> {
    let mut buffer = Vec::new();
    write_csv_to_writer(df, &mut buffer, TextEncoding::Utf8)?;
    Ok(buffer)
}

/// Writes the frame to the first sheet of a new workbook: a header row, then one row per
/// record. Text cells are stored as strings so ids keep their leading zeros.
pub fn write_xlsx(df: &DataFrame, path: &Path) -> Result<(), TableIoError> {
    let mut book = umya_spreadsheet::new_file();
    let sheet =
        book.get_sheet_by_name_mut(XLSX_SHEET_NAME)
            .ok_or_else(|| TableIoError::Workbook {
                path: path.to_path_buf(),
                message: format!("new workbook has no sheet named {XLSX_SHEET_NAME}"),
            })?;

    for (col_idx, column) in df.get_columns().iter().enumerate() {
        let col = col_idx as u32 + 1;
        sheet
            .get_cell_mut((col, 1))
            .set_value_string(column.name().as_str());

        for idx in 0..df.height() {
            let row = idx as u32 + 2;
            match column.dtype() {
                DataType::Float64 => {
                    if let Some(value) = column.f64()?.get(idx) {
                        sheet.get_cell_mut((col, row)).set_value_number(value);
                    }
                }
                DataType::Int32 => {
                    if let Some(value) = column.i32()?.get(idx) {
                        sheet.get_cell_mut((col, row)).set_value_number(value);
                    }
                }
                _ => {
                    if let Some(value) = cell_text(column, idx)? {
                        sheet.get_cell_mut((col, row)).set_value_string(value);
                    }
                }
            }
        }
    }

    umya_spreadsheet::writer::xlsx::write(&book, path).map_err(|err| TableIoError::Workbook {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Text rendering of one cell for delimited and workbook output.
pub fn cell_text(column: &Column, idx: usize) -> PolarsResult<Option<String>> {
    let text = match column.dtype() {
        DataType::String => column.str()?.get(idx).map(str::to_string),
        DataType::Float64 => column.f64()?.get(idx).map(|value| value.to_string()),
        DataType::Int32 => column.i32()?.get(idx).map(|value| value.to_string()),
        DataType::Int64 => column.i64()?.get(idx).map(|value| value.to_string()),
        DataType::Boolean => column
            .bool()?
            .get(idx)
            .map(|value| if value { "True" } else { "False" }.to_string()),
        DataType::Null => None,
        other => {
            return Err(PolarsError::ComputeError(
                format!("column '{}' has unsupported type {other}", column.name()).into(),
            ))
        }
    };
    Ok(text)
}
