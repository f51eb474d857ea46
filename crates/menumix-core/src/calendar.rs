use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use polars::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::enrichment::{
    ITEM_GROUP_COLUMN, ITEM_NAME_COLUMN, PRODUCT_CLASS_COLUMN, REVENUE_CATEGORY_COLUMN,
};
use crate::table_io::cell_text;

pub const BUSINESS_DATE_COLUMN: &str = "BusinessDate";
pub const PROFIT_CENTER_COLUMN: &str = "ProfitCenterName";
pub const YEAR_COLUMN: &str = "Year";
pub const MONTH_COLUMN: &str = "Month";
pub const ISO_YEAR_COLUMN: &str = "ISO_Year";
pub const ISO_WEEK_COLUMN: &str = "ISO_Week";
pub const WEEK_LABEL_COLUMN: &str = "WeekLabel";
pub const WEEK_START_COLUMN: &str = "WeekStart";
pub const DAY_OF_WEEK_COLUMN: &str = "DayOfWeek";
pub const SKI_SEASON_COLUMN: &str = "SkiSeason";
pub const IN_SKI_SEASON_COLUMN: &str = "InSkiSeason";

/// Text columns trimmed on load.
pub const TEXT_COLUMNS: [&str; 5] = [
    PROFIT_CENTER_COLUMN,
    PRODUCT_CLASS_COLUMN,
    REVENUE_CATEGORY_COLUMN,
    ITEM_GROUP_COLUMN,
    ITEM_NAME_COLUMN,
];

/// Numeric measures coerced to floats on load.
pub const MEASURE_COLUMNS: [&str; 3] = ["ItemsSold", "NetRevenue", "AvgNetPrice"];

pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// ISO calendar dates are written as `YYYY-MM-DD` everywhere downstream.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 9] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
];

// Ski season window: Nov 10 through Apr 20 of the following year, both inclusive.
const SEASON_START: (u32, u32) = (11, 10);
const SEASON_END: (u32, u32) = (4, 20);

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("required column '{0}' is missing")]
    MissingColumn(&'static str),
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
}

pub fn parse_business_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.date_naive());
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|timestamp| timestamp.date())
        })
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// First year of the ski season containing `date`, or `None` off-season.
///
/// The month/day test only picks a candidate; the candidate window is then checked against
/// the date so Nov 1–9 and Apr 21–30 always land off-season.
pub fn ski_season_start_year(date: NaiveDate) -> Option<i32> {
    let (year, month, day) = (date.year(), date.month(), date.day());

    let start_year = if month == 12 || (month == 11 && day >= SEASON_START.1) {
        year
    } else if month < SEASON_END.0 || (month == SEASON_END.0 && day <= SEASON_END.1) {
        year - 1
    } else {
        return None;
    };

    let start = NaiveDate::from_ymd_opt(start_year, SEASON_START.0, SEASON_START.1)?;
    let end = NaiveDate::from_ymd_opt(start_year + 1, SEASON_END.0, SEASON_END.1)?;
    (start..=end).contains(&date).then_some(start_year)
}

pub fn ski_season_label(date: NaiveDate) -> Option<String> {
    ski_season_start_year(date).map(|start| format!("{}-{}", start, start + 1))
}

pub fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    WEEKDAY_NAMES[weekday.num_days_from_monday() as usize]
}

/// Position of a weekday name in Monday-first order.
pub fn weekday_rank(name: &str) -> Option<usize> {
    WEEKDAY_NAMES.iter().position(|day| *day == name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarFeatures {
    pub year: i32,
    pub month_start: NaiveDate,
    pub iso_year: i32,
    pub iso_week: u32,
    pub week_label: String,
    pub week_start: NaiveDate,
    pub day_of_week: &'static str,
    pub ski_season: Option<String>,
}

impl CalendarFeatures {
    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: date.year(),
            month_start: month_start(date),
            iso_year: iso.year(),
            iso_week: iso.week(),
            week_label: week_label(date),
            week_start: week_start(date),
            day_of_week: weekday_name(date.weekday()),
            ski_season: ski_season_label(date),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeatureFrame {
    pub dataframe: DataFrame,
    pub unparseable_dates: usize,
}

/// Prepares an enriched extract for reporting.
///
/// Rows whose `BusinessDate` cannot be parsed are dropped. The remaining dates are rewritten
/// as ISO dates, text columns are trimmed, measures become floats (unparseable values turn
/// null), and the calendar and ski-season columns are appended.
pub fn derive_features(df: &DataFrame) -> Result<FeatureFrame, CalendarError> {
    let date_column = df
        .column(BUSINESS_DATE_COLUMN)
        .map_err(|_| CalendarError::MissingColumn(BUSINESS_DATE_COLUMN))?;

    let mut dates: Vec<Option<NaiveDate>> = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let parsed = cell_text(date_column, idx)?.and_then(|raw| parse_business_date(&raw));
        dates.push(parsed);
    }

    let keep: Vec<bool> = dates.iter().map(Option::is_some).collect();
    let unparseable_dates = keep.iter().filter(|keep| !**keep).count();
    if unparseable_dates > 0 {
        debug!(rows = unparseable_dates, "dropping rows with unparseable business dates");
    }

    let mut out = df.filter(&BooleanChunked::from_slice("keep".into(), &keep))?;
    let dates: Vec<NaiveDate> = dates.into_iter().flatten().collect();

    trim_text_columns(&mut out)?;
    coerce_measures(&mut out)?;

    let features: Vec<CalendarFeatures> =
        dates.iter().copied().map(CalendarFeatures::from_date).collect();

    let iso_dates: Vec<String> = dates.iter().copied().map(format_iso_date).collect();
    out.with_column(Series::new(BUSINESS_DATE_COLUMN.into(), iso_dates))?;

    let years: Vec<i32> = features.iter().map(|f| f.year).collect();
    let months: Vec<String> = features
        .iter()
        .map(|f| format_iso_date(f.month_start))
        .collect();
    let iso_years: Vec<i32> = features.iter().map(|f| f.iso_year).collect();
    let iso_weeks: Vec<i32> = features.iter().map(|f| f.iso_week as i32).collect();
    let week_labels: Vec<String> = features.iter().map(|f| f.week_label.clone()).collect();
    let week_starts: Vec<String> = features
        .iter()
        .map(|f| format_iso_date(f.week_start))
        .collect();
    let weekdays: Vec<&str> = features.iter().map(|f| f.day_of_week).collect();
    let seasons: Vec<Option<String>> = features.iter().map(|f| f.ski_season.clone()).collect();
    let in_season: Vec<bool> = seasons.iter().map(Option::is_some).collect();

    out.with_column(Series::new(YEAR_COLUMN.into(), years))?;
    out.with_column(Series::new(MONTH_COLUMN.into(), months))?;
    out.with_column(Series::new(ISO_YEAR_COLUMN.into(), iso_years))?;
    out.with_column(Series::new(ISO_WEEK_COLUMN.into(), iso_weeks))?;
    out.with_column(Series::new(WEEK_LABEL_COLUMN.into(), week_labels))?;
    out.with_column(Series::new(WEEK_START_COLUMN.into(), week_starts))?;
    out.with_column(Series::new(DAY_OF_WEEK_COLUMN.into(), weekdays))?;
    out.with_column(Series::new(SKI_SEASON_COLUMN.into(), seasons))?;
    out.with_column(Series::new(IN_SKI_SEASON_COLUMN.into(), in_season))?;

    Ok(FeatureFrame {
        dataframe: out,
        unparseable_dates,
    })
}

fn trim_text_columns(df: &mut DataFrame) -> PolarsResult<()> {
    for name in TEXT_COLUMNS {
        let Ok(column) = df.column(name) else {
            continue;
        };
        let mut values: Vec<Option<String>> = Vec::with_capacity(column.len());
        for idx in 0..column.len() {
            values.push(cell_text(column, idx)?.map(|value| value.trim().to_string()));
        }
        df.with_column(Series::new(name.into(), values))?;
    }
    Ok(())
}

fn coerce_measures(df: &mut DataFrame) -> PolarsResult<()> {
    for name in MEASURE_COLUMNS {
        let Ok(column) = df.column(name) else {
            continue;
        };
        let mut values: Vec<Option<f64>> = Vec::with_capacity(column.len());
        for idx in 0..column.len() {
            values.push(cell_text(column, idx)?.and_then(|raw| parse_measure(&raw)));
        }
        df.with_column(Series::new(name.into(), values))?;
    }
    Ok(())
}

pub fn parse_measure(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| !value.is_nan())
}
