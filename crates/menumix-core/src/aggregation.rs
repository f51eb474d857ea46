use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::Deserialize;
use thiserror::Error;

use crate::calendar::{
    weekday_rank, DAY_OF_WEEK_COLUMN, MONTH_COLUMN, SKI_SEASON_COLUMN, WEEKDAY_NAMES,
    WEEK_START_COLUMN,
};
use crate::table_io::cell_text;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("column '{0}' is missing from the data")]
    MissingColumn(String),
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
}

/// Time axis of an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum TimeSlice {
    #[default]
    Month,
    Week,
    DayOfWeek,
    SkiSeason,
}

impl TimeSlice {
    pub const ALL: [TimeSlice; 4] = [
        TimeSlice::Month,
        TimeSlice::Week,
        TimeSlice::DayOfWeek,
        TimeSlice::SkiSeason,
    ];

    /// Column holding the bucket key for this slice.
    pub fn key_column(&self) -> &'static str {
        match self {
            TimeSlice::Month => MONTH_COLUMN,
            TimeSlice::Week => WEEK_START_COLUMN,
            TimeSlice::DayOfWeek => DAY_OF_WEEK_COLUMN,
            TimeSlice::SkiSeason => SKI_SEASON_COLUMN,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeSlice::Month => "Month",
            TimeSlice::Week => "Week",
            TimeSlice::DayOfWeek => "Day of Week",
            TimeSlice::SkiSeason => "Ski Season",
        }
    }
}

impl fmt::Display for TimeSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeSlice {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key: String = value
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "month" => Ok(TimeSlice::Month),
            "week" => Ok(TimeSlice::Week),
            "dayofweek" | "weekday" => Ok(TimeSlice::DayOfWeek),
            "skiseason" | "season" => Ok(TimeSlice::SkiSeason),
            _ => Err(format!(
                "unknown time slice '{value}' (expected month, week, day-of-week or ski-season)"
            )),
        }
    }
}

impl TryFrom<String> for TimeSlice {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Numeric measure being summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Metric {
    #[default]
    NetRevenue,
    ItemsSold,
    AvgNetPrice,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::NetRevenue, Metric::ItemsSold, Metric::AvgNetPrice];

    pub fn column(&self) -> &'static str {
        match self {
            Metric::NetRevenue => "NetRevenue",
            Metric::ItemsSold => "ItemsSold",
            Metric::AvgNetPrice => "AvgNetPrice",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key: String = value
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "netrevenue" | "revenue" => Ok(Metric::NetRevenue),
            "itemssold" | "items" => Ok(Metric::ItemsSold),
            "avgnetprice" | "price" => Ok(Metric::AvgNetPrice),
            _ => Err(format!(
                "unknown metric '{value}' (expected NetRevenue, ItemsSold or AvgNetPrice)"
            )),
        }
    }
}

impl TryFrom<String> for Metric {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Grouped sums, sorted by time bucket then comparison value.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub dataframe: DataFrame,
    pub time_slice: TimeSlice,
    pub compare_by: Option<String>,
    pub metric: Metric,
}

impl Aggregation {
    pub fn time_key(&self) -> &'static str {
        self.time_slice.key_column()
    }

    pub fn title(&self) -> String {
        match &self.compare_by {
            Some(compare_by) => format!("{} by {} and {}", self.metric, self.time_key(), compare_by),
            None => format!("{} by {}", self.metric, self.time_key()),
        }
    }
}

// Field order is the output sort order: weekday rank (0 for other slices), bucket label, then
// comparison value with nulls last.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    rank: usize,
    bucket: String,
    compare_missing: bool,
    compare: String,
}

/// Sums `metric` per (time bucket[, comparison value]).
///
/// A group whose metric values are all null sums to null rather than zero. Rows with no ski
/// season label are left out of the `SkiSeason` slice, and weekdays sort Monday first.
pub fn aggregate(
    df: &DataFrame,
    time_slice: TimeSlice,
    compare_by: Option<&str>,
    metric: Metric,
) -> Result<Aggregation, AggregationError> {
    let time_key = time_slice.key_column();
    let buckets = df
        .column(time_key)
        .map_err(|_| AggregationError::MissingColumn(time_key.to_string()))?
        .str()?;
    let values = df
        .column(metric.column())
        .map_err(|_| AggregationError::MissingColumn(metric.column().to_string()))?
        .f64()?;
    let compare_column = compare_by
        .map(|name| {
            df.column(name)
                .map_err(|_| AggregationError::MissingColumn(name.to_string()))
        })
        .transpose()?;

    let mut groups: BTreeMap<GroupKey, Option<f64>> = BTreeMap::new();

    for idx in 0..df.height() {
        let Some(bucket) = buckets.get(idx) else {
            continue;
        };

        let rank = match time_slice {
            TimeSlice::DayOfWeek => weekday_rank(bucket).unwrap_or(WEEKDAY_NAMES.len()),
            _ => 0,
        };
        let compare = match compare_column {
            Some(column) => cell_text(column, idx)?,
            None => None,
        };

        let key = GroupKey {
            rank,
            bucket: bucket.to_string(),
            compare_missing: compare.is_none(),
            compare: compare.unwrap_or_default(),
        };

        let total = groups.entry(key).or_insert(None);
        if let Some(value) = values.get(idx) {
            *total = Some(total.unwrap_or(0.0) + value);
        }
    }

    let mut bucket_values: Vec<String> = Vec::with_capacity(groups.len());
    let mut compare_values: Vec<Option<String>> = Vec::with_capacity(groups.len());
    let mut totals: Vec<Option<f64>> = Vec::with_capacity(groups.len());

    for (key, total) in groups {
        bucket_values.push(key.bucket);
        compare_values.push((!key.compare_missing).then_some(key.compare));
        totals.push(total);
    }

    let mut columns: Vec<Column> = vec![Series::new(time_key.into(), bucket_values).into()];
    if let Some(name) = compare_by {
        columns.push(Series::new(name.into(), compare_values).into());
    }
    columns.push(Series::new(metric.column().into(), totals).into());

    Ok(Aggregation {
        dataframe: DataFrame::new(columns)?,
        time_slice,
        compare_by: compare_by.map(str::to_string),
        metric,
    })
}
