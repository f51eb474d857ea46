use std::fs;
use std::path::Path;

use menumix_catalog::CatalogOptions;
use menumix_core::aggregation::{Metric, TimeSlice};
use menumix_core::chart::ChartKind;
use menumix_core::config::parse_config;
use chrono::NaiveDate;
use menumix_core::filters::{DateRange, FilterSet};
use menumix_core::pipeline::{run_enrichment, EnrichRequest};
use menumix_core::report::{
    build_report, export_report, load_report_data, ExportOptions, ReportRequest,
    AGGREGATED_VIEW_FILE, FILTERED_ROWS_FILE,
};
use menumix_core::table_io::UTF8_BOM;
use tempfile::tempdir;

const MIX: &str = "\
BusinessDate,ProfitCenterName,ItemID,ItemName,ItemsSold,NetRevenue,AvgNetPrice
2024-12-02,Spoons,1001,CHZBRGR,2,24.00,12.00
2024-12-02,Lobby Bar,00123,LAGER,4,28.00,7.00
2024-12-09,Spoons,1001,CHZBRGR,1,12.00,12.00
2025-01-06,Spoons,5555,Daily Soup,3,18.00,6.00
not-a-date,Spoons,1001,CHZBRGR,1,12.00,12.00
";

fn write_master(path: &Path) {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_sheet_by_name_mut("Sheet1").expect("default sheet");

    sheet.get_cell_mut((3, 7)).set_value_string("Item ID");
    sheet.get_cell_mut((4, 7)).set_value_string("Item Name");
    sheet.get_cell_mut((10, 7)).set_value_string("Default Revenue Category");
    sheet.get_cell_mut((12, 7)).set_value_string("Item Group");

    sheet.get_cell_mut((1, 8)).set_value_string("Food");
    sheet.get_cell_mut((3, 9)).set_value_number(1001);
    sheet.get_cell_mut((4, 9)).set_value_string("Cheeseburger");
    sheet.get_cell_mut((10, 9)).set_value_string("Grill");
    sheet.get_cell_mut((12, 9)).set_value_string("Burgers");

    sheet.get_cell_mut((1, 10)).set_value_string("Beverage");
    sheet.get_cell_mut((3, 10)).set_value_string("00123");
    sheet.get_cell_mut((4, 10)).set_value_string("House Lager");
    sheet.get_cell_mut((10, 10)).set_value_string("Beer");
    sheet.get_cell_mut((12, 10)).set_value_string("Draft");

    umya_spreadsheet::writer::xlsx::write(&book, path).expect("write master workbook");
}

#[test]
fn enrich_then_report_end_to_end() {
    let dir = tempdir().expect("tempdir");
    let mix = dir.path().join("mix.csv");
    let master = dir.path().join("master.xlsx");
    let out_csv = dir.path().join("out").join("enriched.csv");
    let out_xlsx = dir.path().join("out").join("enriched.xlsx");
    fs::write(&mix, MIX).expect("write mix");
    write_master(&master);

    let request = EnrichRequest {
        mix: mix.clone(),
        master,
        catalog: CatalogOptions::default(),
        out_xlsx: Some(out_xlsx.clone()),
        out_csv: Some(out_csv.clone()),
    };
    let (enriched, summary) = run_enrichment(&request).expect("enrichment");

    assert_eq!(enriched.height(), 5);
    assert_eq!(summary.enrichment.rows, 5);
    assert_eq!(summary.enrichment.unmatched_item_ids, 1);
    assert_eq!(summary.catalog.entries, 2);
    assert_eq!(summary.written, vec![out_xlsx.clone(), out_csv.clone()]);
    assert!(out_xlsx.exists());
    assert!(fs::read(&out_csv).expect("read csv").starts_with(UTF8_BOM));

    let data = load_report_data(&out_csv).expect("report data");
    assert_eq!(data.height(), 4);

    let report = build_report(
        &data,
        &ReportRequest {
            filters: FilterSet::new().with_values("ProfitCenterName", ["Spoons"]),
            metric: Metric::NetRevenue,
            time_slice: TimeSlice::Month,
            compare_by: Some("ItemName".to_string()),
            top_n: 20,
        },
    )
    .expect("report");

    assert_eq!(report.filtered.height(), 3);
    assert_eq!(report.kpis.total_net_revenue, Some(54.0));
    assert_eq!(report.kpis.total_items_sold, Some(6.0));
    assert_eq!(report.kpis.avg_net_price, Some(10.0));

    let names: Vec<Option<&str>> = report
        .view
        .column("ItemName")
        .expect("ItemName")
        .str()
        .expect("str")
        .into_iter()
        .collect();
    assert_eq!(names, vec![Some("Cheeseburger"), Some("Daily Soup")]);

    let out_dir = dir.path().join("exports");
    let exported = export_report(
        &report,
        &ExportOptions {
            out_dir: out_dir.clone(),
            filtered_rows: true,
            aggregated_view: true,
            chart: Some(ChartKind::Line),
            chart_file: "chart.svg".to_string(),
        },
    )
    .expect("exports");

    assert_eq!(exported.chart_notice, None);
    assert_eq!(exported.written.len(), 3);
    let aggregated = fs::read_to_string(out_dir.join(AGGREGATED_VIEW_FILE)).expect("view csv");
    assert_eq!(
        aggregated,
        "Month,ItemName,NetRevenue\n2024-12-01,Cheeseburger,36\n2025-01-01,Daily Soup,18\n"
    );
    let filtered = fs::read(out_dir.join(FILTERED_ROWS_FILE)).expect("rows csv");
    assert!(!filtered.starts_with(UTF8_BOM));
    let svg = fs::read_to_string(out_dir.join("chart.svg")).expect("svg");
    assert!(svg.contains("<svg"));
}

#[test]
fn chart_failure_does_not_block_other_exports() {
    let dir = tempdir().expect("tempdir");
    let data_path = dir.path().join("data.csv");
    fs::write(&data_path, MIX).expect("write data");
    let data = load_report_data(&data_path).expect("data");

    let report = build_report(
        &data,
        &ReportRequest {
            filters: FilterSet::new().with_values("ItemName", ["Nothing Matches"]),
            ..ReportRequest::default()
        },
    )
    .expect("empty selections are not errors");
    assert_eq!(report.filtered.height(), 0);
    assert_eq!(report.kpis.total_net_revenue, Some(0.0));
    assert_eq!(report.kpis.avg_net_price, None);

    let out_dir = dir.path().join("exports");
    let exported = export_report(
        &report,
        &ExportOptions {
            out_dir: out_dir.clone(),
            ..ExportOptions::default()
        },
    )
    .expect("exports");

    assert!(exported.chart_notice.is_some());
    assert_eq!(exported.written.len(), 2);
    assert!(out_dir.join(FILTERED_ROWS_FILE).exists());
}

#[test]
fn inverted_date_range_reports_on_nothing() {
    let dir = tempdir().expect("tempdir");
    let data_path = dir.path().join("data.csv");
    fs::write(&data_path, MIX).expect("write data");
    let data = load_report_data(&data_path).expect("data");

    let report = build_report(
        &data,
        &ReportRequest {
            filters: FilterSet::new().with_date_range(DateRange::new(
                NaiveDate::from_ymd_opt(2025, 1, 2),
                NaiveDate::from_ymd_opt(2025, 1, 1),
            )),
            ..ReportRequest::default()
        },
    )
    .expect("an inverted range is an empty selection");

    assert_eq!(report.filtered.height(), 0);
    assert_eq!(report.aggregation.dataframe.height(), 0);
    assert_eq!(report.view.height(), 0);
    assert_eq!(report.kpis.total_items_sold, Some(0.0));
}

#[test]
fn zero_top_n_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let data_path = dir.path().join("data.csv");
    fs::write(&data_path, MIX).expect("write data");
    let data = load_report_data(&data_path).expect("data");

    let request = ReportRequest {
        top_n: 0,
        ..ReportRequest::default()
    };
    assert!(build_report(&data, &request).is_err());
}

#[test]
fn config_sections_fill_defaults() {
    let config = parse_config(
        r#"
        [enrich]
        mix = "exports/pmix.csv"
        duplicates = "keep-last"

        [report]
        metric = "ItemsSold"
        time_slice = "ski-season"
        compare_by = "none"
        chart = "line"
        top_n = 5
        "#,
    )
    .expect("config");

    assert_eq!(config.enrich.mix, Path::new("exports/pmix.csv"));
    assert_eq!(config.enrich.out_csv, Path::new("menu_mix_daily_enriched.csv"));
    assert_eq!(
        config.enrich.duplicates,
        menumix_catalog::DuplicatePolicy::KeepLast
    );
    assert_eq!(config.report.metric, Metric::ItemsSold);
    assert_eq!(config.report.time_slice, TimeSlice::SkiSeason);
    assert_eq!(config.report.compare_by(), None);
    assert_eq!(config.report.chart, ChartKind::Line);
    assert_eq!(config.report.top_n, 5);

    assert!(parse_config("[report]\nunknown = 1\n").is_err());
}
