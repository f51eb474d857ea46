use std::collections::{BTreeMap, HashSet};

use polars::prelude::*;

use crate::aggregation::Aggregation;
use crate::table_io::cell_text;

/// One comparison value and its total across all time buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedValue {
    pub value: Option<String>,
    pub total: f64,
}

/// Comparison values by total, largest first.
///
/// Null sums count as zero here. Totals are gathered in ascending value order (null last) and
/// the descending sort is stable, so ties keep that order.
pub fn rank_comparison_values(
    df: &DataFrame,
    compare_by: &str,
    metric_column: &str,
) -> PolarsResult<Vec<RankedValue>> {
    let compare = df.column(compare_by)?;
    let values = df.column(metric_column)?.f64()?;

    let mut totals: BTreeMap<(bool, String), f64> = BTreeMap::new();
    for idx in 0..df.height() {
        let value = cell_text(compare, idx)?;
        let key = (value.is_none(), value.unwrap_or_default());
        *totals.entry(key).or_insert(0.0) += values.get(idx).unwrap_or(0.0);
    }

    let mut ranked: Vec<RankedValue> = totals
        .into_iter()
        .map(|((missing, value), total)| RankedValue {
            value: (!missing).then_some(value),
            total,
        })
        .collect();
    ranked.sort_by(|a, b| b.total.total_cmp(&a.total));
    Ok(ranked)
}

/// The charted/exported view: only rows whose comparison value is among the top `n` totals.
///
/// The aggregation itself is left untouched; without a comparison dimension the view is the
/// whole table.
pub fn top_n_view(aggregation: &Aggregation, n: usize) -> PolarsResult<DataFrame> {
    let Some(compare_by) = aggregation.compare_by.as_deref() else {
        return Ok(aggregation.dataframe.clone());
    };

    let df = &aggregation.dataframe;
    let keep: HashSet<Option<String>> =
        rank_comparison_values(df, compare_by, aggregation.metric.column())?
            .into_iter()
            .take(n)
            .map(|ranked| ranked.value)
            .collect();

    let compare = df.column(compare_by)?;
    let mut mask = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        mask.push(keep.contains(&cell_text(compare, idx)?));
    }

    df.filter(&BooleanChunked::from_slice("top_n".into(), &mask))
}
