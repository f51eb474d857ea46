use std::collections::BTreeSet;

use chrono::NaiveDate;
use polars::prelude::*;

use crate::calendar::{BUSINESS_DATE_COLUMN, ISO_DATE_FORMAT, TEXT_COLUMNS};
use crate::table_io::cell_text;

/// Selectable values for one filterable column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOptions {
    pub column: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub columns: Vec<ColumnOptions>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl FilterOptions {
    pub fn values_for(&self, column: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|options| options.column == column)
            .map(|options| options.values.as_slice())
    }
}

/// Sorted distinct non-null values of each filterable column present, plus the date span.
pub fn filter_options(df: &DataFrame) -> PolarsResult<FilterOptions> {
    let mut columns = Vec::new();

    for name in TEXT_COLUMNS {
        let Ok(column) = df.column(name) else {
            continue;
        };
        let mut values: BTreeSet<String> = BTreeSet::new();
        for idx in 0..column.len() {
            if let Some(value) = cell_text(column, idx)? {
                values.insert(value);
            }
        }
        columns.push(ColumnOptions {
            column: name.to_string(),
            values: values.into_iter().collect(),
        });
    }

    let mut first_date: Option<NaiveDate> = None;
    let mut last_date: Option<NaiveDate> = None;
    if let Ok(column) = df.column(BUSINESS_DATE_COLUMN) {
        for raw in column.str()?.into_iter().flatten() {
            let Ok(date) = NaiveDate::parse_from_str(raw, ISO_DATE_FORMAT) else {
                continue;
            };
            first_date = Some(first_date.map_or(date, |current| current.min(date)));
            last_date = Some(last_date.map_or(date, |current| current.max(date)));
        }
    }

    Ok(FilterOptions {
        columns,
        first_date,
        last_date,
    })
}
