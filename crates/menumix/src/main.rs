use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use menumix_catalog::{CatalogOptions, DuplicatePolicy};
use menumix_core::aggregation::{Metric, TimeSlice};
use menumix_core::chart::{ChartKind, DEFAULT_CHART_FILE};
use menumix_core::config::{config_path, load_config, AppConfig};
use menumix_core::filters::{DateRange, FilterSet};
use menumix_core::options::filter_options;
use menumix_core::pipeline::{run_enrichment, EnrichRequest};
use menumix_core::report::{
    build_report, export_report, load_report_data, ExportOptions, Report, ReportRequest,
};
use menumix_core::table_io::cell_text;
use polars::prelude::DataFrame;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Menu mix enrichment and reporting", long_about = None)]
struct Cli {
    /// Config file (defaults to $MENUMIX_CONFIG, then ./menumix.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print a JSON summary instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Join a menu mix extract to the master catalog and write the enriched tables
    Enrich(EnrichArgs),
    /// Filter, aggregate and export an enriched extract
    Report(ReportArgs),
    /// List the values available to `report --filter`
    Options(OptionsArgs),
}

#[derive(Args, Debug, Default)]
struct EnrichArgs {
    /// Menu mix CSV extract
    #[arg(long)]
    mix: Option<PathBuf>,
    /// Master catalog workbook
    #[arg(long)]
    master: Option<PathBuf>,
    /// Catalog worksheet (first sheet when omitted)
    #[arg(long)]
    sheet: Option<String>,
    #[arg(long)]
    out_xlsx: Option<PathBuf>,
    #[arg(long)]
    out_csv: Option<PathBuf>,
    /// Skip the workbook output
    #[arg(long)]
    no_xlsx: bool,
    /// Skip the CSV output
    #[arg(long)]
    no_csv: bool,
    /// keep-first, keep-last or error
    #[arg(long)]
    duplicates: Option<DuplicatePolicy>,
}

#[derive(Args, Debug, Default)]
struct ReportArgs {
    /// Enriched CSV to report on
    #[arg(long)]
    data: Option<PathBuf>,
    /// COLUMN=VALUE; repeat to allow several values or constrain several columns
    #[arg(long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,
    /// First business date to include (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Last business date to include (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,
    /// NetRevenue, ItemsSold or AvgNetPrice
    #[arg(long)]
    metric: Option<Metric>,
    /// month, week, day-of-week or ski-season
    #[arg(long)]
    time_slice: Option<TimeSlice>,
    /// Comparison column, or `none`
    #[arg(long)]
    compare_by: Option<String>,
    #[arg(long)]
    top_n: Option<usize>,
    /// bar or line
    #[arg(long)]
    chart: Option<ChartKind>,
    /// Chart file name inside the output directory (.png or .svg)
    #[arg(long)]
    chart_file: Option<String>,
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Skip filtered_rows.csv
    #[arg(long)]
    no_raw: bool,
    /// Skip aggregated_view.csv
    #[arg(long)]
    no_aggregated: bool,
    /// Skip the chart
    #[arg(long)]
    no_chart: bool,
}

#[derive(Args, Debug, Default)]
struct OptionsArgs {
    /// Enriched CSV to inspect
    #[arg(long)]
    data: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let path = cli.config.clone().unwrap_or_else(config_path);
    let config = load_config(&path)?;

    match cli.command {
        Command::Enrich(args) => enrich(&config, args, cli.json),
        Command::Report(args) => report(&config, args, cli.json),
        Command::Options(args) => options(&config, args, cli.json),
    }
}

fn enrich(config: &AppConfig, args: EnrichArgs, as_json: bool) -> Result<()> {
    let defaults = &config.enrich;
    let request = EnrichRequest {
        mix: args.mix.unwrap_or_else(|| defaults.mix.clone()),
        master: args.master.unwrap_or_else(|| defaults.master.clone()),
        catalog: CatalogOptions {
            sheet: args.sheet.or_else(|| defaults.sheet.clone()),
            duplicates: args.duplicates.unwrap_or(defaults.duplicates),
        },
        out_xlsx: (!args.no_xlsx)
            .then(|| args.out_xlsx.unwrap_or_else(|| defaults.out_xlsx.clone())),
        out_csv: (!args.no_csv)
            .then(|| args.out_csv.unwrap_or_else(|| defaults.out_csv.clone())),
    };

    let (_, summary) = run_enrichment(&request).with_context(|| {
        format!(
            "failed to enrich '{}' with '{}'",
            request.mix.display(),
            request.master.display()
        )
    })?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let mut table = new_table(vec!["Enrichment", ""]);
    table.add_row(vec!["Catalog sheet".to_string(), summary.catalog.sheet.clone()]);
    table.add_row(vec!["Catalog entries".to_string(), summary.catalog.entries.to_string()]);
    table.add_row(vec![
        "Duplicate ids".to_string(),
        summary.catalog.duplicate_ids.len().to_string(),
    ]);
    table.add_row(vec!["Rows".to_string(), summary.enrichment.rows.to_string()]);
    table.add_row(vec![
        "Rows with a name".to_string(),
        summary.enrichment.rows_with_name.to_string(),
    ]);
    table.add_row(vec![
        "Unmatched ids".to_string(),
        summary.enrichment.unmatched_item_ids.to_string(),
    ]);
    table.add_row(vec![
        "Ids without a name".to_string(),
        summary.enrichment.unnamed_item_ids.to_string(),
    ]);
    println!("{table}");
    for path in &summary.written {
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn report(config: &AppConfig, args: ReportArgs, as_json: bool) -> Result<()> {
    let defaults = &config.report;
    let data_path = args.data.unwrap_or_else(|| defaults.data.clone());
    let data = load_report_data(&data_path)
        .with_context(|| format!("failed to load report data from '{}'", data_path.display()))?;

    let mut filters = FilterSet::new().with_date_range(DateRange::new(args.start, args.end));
    for (column, value) in args.filters {
        filters.allow(&column, [value]);
    }

    let compare_by = match args.compare_by {
        Some(value) if value.trim().is_empty() || value.trim().eq_ignore_ascii_case("none") => {
            None
        }
        Some(value) => Some(value.trim().to_string()),
        None => defaults.compare_by().map(str::to_string),
    };

    let request = ReportRequest {
        filters,
        metric: args.metric.unwrap_or(defaults.metric),
        time_slice: args.time_slice.unwrap_or(defaults.time_slice),
        compare_by,
        top_n: args.top_n.unwrap_or(defaults.top_n),
    };
    let built = build_report(&data, &request).context("failed to build report")?;

    let export = ExportOptions {
        out_dir: args.out_dir.unwrap_or_else(|| defaults.out_dir.clone()),
        filtered_rows: !args.no_raw,
        aggregated_view: !args.no_aggregated,
        chart: (!args.no_chart).then(|| args.chart.unwrap_or(defaults.chart)),
        chart_file: args
            .chart_file
            .unwrap_or_else(|| DEFAULT_CHART_FILE.to_string()),
    };
    let exported = export_report(&built, &export)
        .with_context(|| format!("failed to write exports to '{}'", export.out_dir.display()))?;

    if as_json {
        let summary = json!({
            "rows": built.filtered.height(),
            "kpis": built.kpis,
            "title": built.aggregation.title(),
            "groups": built.aggregation.dataframe.height(),
            "view_rows": built.view.height(),
            "exports": exported,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_report(&built)?;
    for path in &exported.written {
        println!("wrote {}", path.display());
    }
    if let Some(notice) = &exported.chart_notice {
        println!("chart not written: {notice}");
    }
    info!(files = exported.written.len(), "report finished");
    Ok(())
}

fn print_report(built: &Report) -> Result<()> {
    let mut kpis = new_table(vec!["Total Net Revenue", "Total Items Sold", "Avg Net Price"]);
    kpis.add_row(vec![
        built.kpis.net_revenue_display(),
        built.kpis.items_sold_display(),
        built.kpis.avg_net_price_display(),
    ]);
    println!("{kpis}");

    if built.filtered.height() == 0 {
        println!("No rows match the current filters.");
        return Ok(());
    }

    println!("{}", built.aggregation.title());
    println!("{}", render_frame(&built.view)?);
    Ok(())
}

fn options(config: &AppConfig, args: OptionsArgs, as_json: bool) -> Result<()> {
    let data_path = args.data.unwrap_or_else(|| config.report.data.clone());
    let data = load_report_data(&data_path)
        .with_context(|| format!("failed to load report data from '{}'", data_path.display()))?;
    let available = filter_options(&data)?;

    if as_json {
        let columns: serde_json::Map<String, serde_json::Value> = available
            .columns
            .iter()
            .map(|options| (options.column.clone(), json!(options.values)))
            .collect();
        let summary = json!({
            "columns": columns,
            "first_date": available.first_date,
            "last_date": available.last_date,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let mut table = new_table(vec!["Column", "Values", "Count"]);
    for options in &available.columns {
        table.add_row(vec![
            options.column.clone(),
            options.values.join(", "),
            options.values.len().to_string(),
        ]);
    }
    println!("{table}");

    if let (Some(first), Some(last)) = (available.first_date, available.last_date) {
        println!("Business dates: {first} to {last}");
    }
    Ok(())
}

fn new_table<H: Into<comfy_table::Row>>(header: H) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn parse_filter(raw: &str) -> std::result::Result<(String, String), String> {
    let (column, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got '{raw}'"))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("missing column name in '{raw}'"));
    }
    Ok((column.to_string(), value.trim().to_string()))
}

fn render_frame(df: &DataFrame) -> Result<Table> {
    let header: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut table = new_table(header);
    for idx in 0..df.height() {
        let mut row = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            row.push(cell_text(column, idx)?.unwrap_or_default());
        }
        table.add_row(row);
    }
    Ok(table)
}
