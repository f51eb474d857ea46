use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use polars::prelude::*;
use serde::Deserialize;
use thiserror::Error;

use crate::calendar::{BUSINESS_DATE_COLUMN, ISO_DATE_FORMAT};
use crate::table_io::cell_text;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("cannot filter on unknown column '{0}'")]
    UnknownColumn(String),
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
}

/// Inclusive business-date bounds; a missing bound leaves that side open. A start after the end
/// matches nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

/// Column → allowed values. A column with no selected values does not constrain anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    columns: BTreeMap<String, BTreeSet<String>>,
    pub date_range: DateRange,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, S>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow(column, values);
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = range;
        self
    }

    pub fn allow<I, S>(&mut self, column: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns
            .entry(column.to_string())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    /// Constraints that actually narrow the rows.
    pub fn active(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.columns
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(column, values)| (column.as_str(), values))
    }

    pub fn is_empty(&self) -> bool {
        self.active().next().is_none() && self.date_range.is_unbounded()
    }
}

/// Rows that satisfy every column constraint and fall inside the date range.
///
/// Null cells never match a non-empty value set. An empty result is returned as an empty frame
/// with the input's columns.
pub fn apply_filters(df: &DataFrame, filters: &FilterSet) -> Result<DataFrame, FilterError> {
    let mut mask = vec![true; df.height()];

    for (name, allowed) in filters.active() {
        let column = df
            .column(name)
            .map_err(|_| FilterError::UnknownColumn(name.to_string()))?;
        for (idx, keep) in mask.iter_mut().enumerate() {
            if !*keep {
                continue;
            }
            *keep = match cell_text(column, idx)? {
                Some(value) => allowed.contains(&value),
                None => false,
            };
        }
    }

    if !filters.date_range.is_unbounded() {
        let dates = df
            .column(BUSINESS_DATE_COLUMN)
            .map_err(|_| FilterError::UnknownColumn(BUSINESS_DATE_COLUMN.to_string()))?
            .str()?;
        for (idx, keep) in mask.iter_mut().enumerate() {
            if !*keep {
                continue;
            }
            *keep = dates
                .get(idx)
                .and_then(|raw| NaiveDate::parse_from_str(raw, ISO_DATE_FORMAT).ok())
                .is_some_and(|date| filters.date_range.contains(date));
        }
    }

    Ok(df.filter(&BooleanChunked::from_slice("filter".into(), &mask))?)
}
