use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregation::{aggregate, Aggregation, Metric, TimeSlice};
use crate::cache::DatasetCache;
use crate::calendar::derive_features;
use crate::chart::{render_chart, ChartKind, DEFAULT_CHART_FILE};
use crate::error::{MenumixError, Result};
use crate::filters::{apply_filters, FilterSet};
use crate::kpi::KpiSummary;
use crate::pipeline::ensure_parent;
use crate::ranking::top_n_view;
use crate::table_io::{read_delimited, write_csv, TextEncoding};

pub const FILTERED_ROWS_FILE: &str = "filtered_rows.csv";
pub const AGGREGATED_VIEW_FILE: &str = "aggregated_view.csv";

/// Reads an enriched extract and derives the calendar features the report works on.
pub fn load_report_data(path: &Path) -> Result<DataFrame> {
    let raw = read_delimited(path)?;
    let features = derive_features(&raw)?;
    info!(
        path = %path.display(),
        rows = features.dataframe.height(),
        dropped = features.unparseable_dates,
        "loaded report dataset"
    );
    Ok(features.dataframe)
}

/// Like [`load_report_data`], but served from `cache` while the file is unchanged.
///
/// Library entry point for long-lived callers that report on the same extract repeatedly; the
/// one-shot CLI loads directly.
pub fn load_report_data_cached(
    cache: &mut DatasetCache,
    path: &Path,
) -> Result<std::sync::Arc<DataFrame>> {
    let (data, outcome) = cache.get_or_load(path, load_report_data)?;
    info!(path = %path.display(), ?outcome, "report dataset ready");
    Ok(data)
}

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub filters: FilterSet,
    pub metric: Metric,
    pub time_slice: TimeSlice,
    pub compare_by: Option<String>,
    pub top_n: usize,
}

impl Default for ReportRequest {
    fn default() -> Self {
        Self {
            filters: FilterSet::default(),
            metric: Metric::default(),
            time_slice: TimeSlice::default(),
            compare_by: None,
            top_n: crate::config::DEFAULT_TOP_N,
        }
    }
}

/// Everything one report selection produces.
#[derive(Debug, Clone)]
pub struct Report {
    pub filtered: DataFrame,
    pub kpis: KpiSummary,
    pub aggregation: Aggregation,
    /// Aggregation restricted to the top-N comparison values; what gets charted and exported.
    pub view: DataFrame,
}

pub fn build_report(data: &DataFrame, request: &ReportRequest) -> Result<Report> {
    if request.top_n == 0 {
        return Err(MenumixError::InvalidRequest(
            "top-n must be at least 1".to_string(),
        ));
    }

    let filtered = apply_filters(data, &request.filters)?;
    if filtered.height() == 0 {
        warn!("no rows match the current filters");
    }

    let kpis = KpiSummary::from_frame(&filtered)?;
    let aggregation = aggregate(
        &filtered,
        request.time_slice,
        request.compare_by.as_deref(),
        request.metric,
    )?;
    let view = top_n_view(&aggregation, request.top_n)?;

    info!(
        rows = filtered.height(),
        groups = aggregation.dataframe.height(),
        view_rows = view.height(),
        metric = %request.metric,
        time_slice = %request.time_slice,
        compare_by = request.compare_by.as_deref().unwrap_or("-"),
        "report built"
    );

    Ok(Report {
        filtered,
        kpis,
        aggregation,
        view,
    })
}

/// Which export files to write into the output directory.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub out_dir: PathBuf,
    pub filtered_rows: bool,
    pub aggregated_view: bool,
    pub chart: Option<ChartKind>,
    /// Chart file name inside `out_dir`; the extension picks PNG or SVG.
    pub chart_file: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("exports"),
            filtered_rows: true,
            aggregated_view: true,
            chart: Some(ChartKind::default()),
            chart_file: DEFAULT_CHART_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    pub written: Vec<PathBuf>,
    /// Set when the chart could not be produced; the other exports are unaffected.
    pub chart_notice: Option<String>,
}

pub fn export_report(report: &Report, options: &ExportOptions) -> Result<ExportSummary> {
    std::fs::create_dir_all(&options.out_dir)?;
    let mut summary = ExportSummary::default();

    if options.filtered_rows {
        let path = options.out_dir.join(FILTERED_ROWS_FILE);
        write_csv(&report.filtered, &path, TextEncoding::Utf8)?;
        summary.written.push(path);
    }

    if options.aggregated_view {
        let path = options.out_dir.join(AGGREGATED_VIEW_FILE);
        write_csv(&report.view, &path, TextEncoding::Utf8)?;
        summary.written.push(path);
    }

    if let Some(kind) = options.chart {
        let path = options.out_dir.join(&options.chart_file);
        ensure_parent(&path)?;
        match render_chart(&report.aggregation, &report.view, kind, &path) {
            Ok(()) => summary.written.push(path),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "chart export skipped");
                summary.chart_notice = Some(err.to_string());
            }
        }
    }

    info!(
        out_dir = %options.out_dir.display(),
        files = summary.written.len(),
        "exports written"
    );
    Ok(summary)
}
