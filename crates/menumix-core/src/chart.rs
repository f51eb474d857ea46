use std::fmt;
use std::path::Path;
use std::str::FromStr;

use plotters::coord::Shift;
use plotters::prelude::*;
use polars::prelude::*;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::aggregation::Aggregation;
use crate::ranking::rank_comparison_values;
use crate::table_io::cell_text;

pub const CHART_SIZE: (u32, u32) = (1400, 700);

/// File name used when the caller does not pick one. Bitmap output needs a font backend to
/// draw labels, so without the `chart-fonts` feature charts are written as SVG.
#[cfg(feature = "chart-fonts")]
pub const DEFAULT_CHART_FILE: &str = "chart.png";
#[cfg(not(feature = "chart-fonts"))]
pub const DEFAULT_CHART_FILE: &str = "chart.svg";

const BLANK_LABEL: &str = "(blank)";
const MAX_X_LABELS: usize = 40;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("nothing to chart: the aggregated view is empty")]
    NoData,
    #[error("PNG charts need the `chart-fonts` feature; write an .svg file instead")]
    FontsUnavailable,
    #[error("failed to render chart: {0}")]
    Render(String),
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKind::Bar => f.write_str("bar"),
            ChartKind::Line => f.write_str("line"),
        }
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bar" => Ok(ChartKind::Bar),
            "line" => Ok(ChartKind::Line),
            other => Err(format!("unknown chart type '{other}' (expected bar or line)")),
        }
    }
}

/// Chart-ready shape of an aggregated view: buckets along x, one series per comparison value.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub buckets: Vec<String>,
    pub series: Vec<ChartSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

impl ChartData {
    /// Series follow comparison-value ranking (largest total first); buckets keep view order.
    pub fn from_view(aggregation: &Aggregation, view: &DataFrame) -> PolarsResult<Self> {
        let metric_column = aggregation.metric.column();
        let buckets_column = view.column(aggregation.time_key())?.str()?;
        let metrics = view.column(metric_column)?.f64()?;

        let mut buckets: Vec<String> = Vec::new();
        let mut bucket_index: Vec<usize> = Vec::with_capacity(view.height());
        for idx in 0..view.height() {
            let bucket = buckets_column.get(idx).unwrap_or_default();
            let position = match buckets.iter().position(|known| known == bucket) {
                Some(position) => position,
                None => {
                    buckets.push(bucket.to_string());
                    buckets.len() - 1
                }
            };
            bucket_index.push(position);
        }

        let series = match aggregation.compare_by.as_deref() {
            None => {
                let mut values = vec![None; buckets.len()];
                for (idx, bucket) in bucket_index.iter().enumerate() {
                    values[*bucket] = metrics.get(idx);
                }
                vec![ChartSeries {
                    label: metric_column.to_string(),
                    values,
                }]
            }
            Some(compare_by) => {
                let compare = view.column(compare_by)?;
                let ranked = rank_comparison_values(view, compare_by, metric_column)?;
                let mut series: Vec<ChartSeries> = ranked
                    .iter()
                    .map(|ranked| ChartSeries {
                        label: ranked
                            .value
                            .clone()
                            .unwrap_or_else(|| BLANK_LABEL.to_string()),
                        values: vec![None; buckets.len()],
                    })
                    .collect();

                for (idx, bucket) in bucket_index.iter().enumerate() {
                    let value = cell_text(compare, idx)?;
                    if let Some(slot) = ranked.iter().position(|ranked| ranked.value == value) {
                        series[slot].values[*bucket] = metrics.get(idx);
                    }
                }
                series
            }
        };

        Ok(Self { buckets, series })
    }

    fn value_bounds(&self) -> (f64, f64) {
        let (min, max) = self
            .series
            .iter()
            .flat_map(|series| series.values.iter().flatten().copied())
            .fold((0.0_f64, 0.0_f64), |(lo, hi), value| (lo.min(value), hi.max(value)));
        let pad = ((max - min) * 0.08).max(1.0);
        (if min < 0.0 { min - pad } else { 0.0 }, max + pad)
    }
}

/// Draws the view as a grouped bar or line chart. `.svg` paths use the SVG backend, anything
/// else is rendered as a PNG bitmap.
pub fn render_chart(
    aggregation: &Aggregation,
    view: &DataFrame,
    kind: ChartKind,
    path: &Path,
) -> Result<(), ChartError> {
    if view.height() == 0 {
        return Err(ChartError::NoData);
    }

    let data = ChartData::from_view(aggregation, view)?;
    let title = aggregation.title();
    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

    debug!(
        path = %path.display(),
        chart = %kind,
        buckets = data.buckets.len(),
        series = data.series.len(),
        "rendering chart"
    );

    if is_svg {
        let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
        draw(root, &data, kind, &title, aggregation).map_err(|e| ChartError::Render(e.to_string()))
    } else {
        if !cfg!(feature = "chart-fonts") {
            return Err(ChartError::FontsUnavailable);
        }
        let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
        draw(root, &data, kind, &title, aggregation).map_err(|e| ChartError::Render(e.to_string()))
    }
}

fn draw<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    data: &ChartData,
    kind: ChartKind,
    title: &str,
    aggregation: &Aggregation,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let bucket_count = data.buckets.len();
    let (y_min, y_max) = data.value_bounds();

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(16)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5_f64..(bucket_count as f64 - 0.5), y_min..y_max)?;

    let labels = &data.buckets;
    let bucket_label = |x: &f64| {
        let nearest = x.round();
        if (x - nearest).abs() > 1e-6 || nearest < 0.0 {
            return String::new();
        }
        labels.get(nearest as usize).cloned().unwrap_or_default()
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bucket_count.min(MAX_X_LABELS))
        .x_label_formatter(&bucket_label)
        .x_desc(aggregation.time_key())
        .y_desc(aggregation.metric.column())
        .draw()?;

    let series_count = data.series.len().max(1);
    for (series_idx, series) in data.series.iter().enumerate() {
        let color = Palette99::pick(series_idx).to_rgba();

        match kind {
            ChartKind::Bar => {
                let width = 0.8 / series_count as f64;
                let offset = -0.4 + width * series_idx as f64;
                let bars = series
                    .values
                    .iter()
                    .enumerate()
                    .filter_map(|(bucket, value)| value.map(|value| (bucket, value)))
                    .map(move |(bucket, value)| {
                        let x0 = bucket as f64 + offset;
                        Rectangle::new([(x0, 0.0), (x0 + width, value)], color.filled())
                    });
                chart
                    .draw_series(bars)?
                    .label(series.label.as_str())
                    .legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled())
                    });
            }
            ChartKind::Line => {
                let points: Vec<(f64, f64)> = series
                    .values
                    .iter()
                    .enumerate()
                    .filter_map(|(bucket, value)| value.map(|value| (bucket as f64, value)))
                    .collect();
                chart
                    .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
                    .label(series.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
                chart.draw_series(
                    points
                        .into_iter()
                        .map(move |point| Circle::new(point, 4, color.filled())),
                )?;
            }
        }
    }

    if aggregation.compare_by.is_some() {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.85))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}
