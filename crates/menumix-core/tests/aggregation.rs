use chrono::NaiveDate;
use polars::prelude::*;

use menumix_core::aggregation::{aggregate, AggregationError, Metric, TimeSlice};
use menumix_core::calendar::derive_features;
use menumix_core::filters::{apply_filters, DateRange, FilterError, FilterSet};
use menumix_core::options::filter_options;

fn prepared() -> DataFrame {
    let raw = df![
        "BusinessDate" => &[
            "2024-11-09", "2024-11-10", "2024-11-11", "2024-12-02",
            "2024-12-02", "2025-04-21", "2025-01-06", "2024-12-03",
        ],
        "ProfitCenterName" => &[
            Some("Spoons"), Some("Spoons"), Some("Lobby Bar"), Some("Spoons"),
            Some("Lobby Bar"), Some("Spoons"), None, Some("Lobby Bar"),
        ],
        "Product Class" => &[
            Some("Food"), Some("Food"), Some("Beverage"), Some("Food"),
            Some("Beverage"), Some("Food"), Some("Food"), None,
        ],
        "ItemName" => &["Fries", "Burger", "Lager", "Burger", "Lager", "Soup", "Soup", "Cider"],
        "NetRevenue" => &[
            Some("5"), Some("12"), Some("7"), Some("24"),
            Some("14"), Some("6"), Some("6"), None,
        ],
        "ItemsSold" => &[
            Some("1"), Some("1"), Some("1"), Some("2"),
            Some("2"), Some("1"), Some("1"), None,
        ],
    ]
    .unwrap();
    derive_features(&raw).unwrap().dataframe
}

fn text_column(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect()
}

fn float_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name).unwrap().f64().unwrap().into_iter().collect()
}

#[test]
fn monthly_sums_by_comparison_value() -> Result<(), Box<dyn std::error::Error>> {
    let df = prepared();
    let agg = aggregate(&df, TimeSlice::Month, Some("Product Class"), Metric::NetRevenue)?;

    assert_eq!(agg.time_key(), "Month");
    assert_eq!(agg.title(), "NetRevenue by Month and Product Class");
    assert_eq!(
        text_column(&agg.dataframe, "Month"),
        vec![
            Some("2024-11-01".to_string()),
            Some("2024-11-01".to_string()),
            Some("2024-12-01".to_string()),
            Some("2024-12-01".to_string()),
            Some("2024-12-01".to_string()),
            Some("2025-01-01".to_string()),
            Some("2025-04-01".to_string()),
        ]
    );
    assert_eq!(
        text_column(&agg.dataframe, "Product Class"),
        vec![
            Some("Beverage".to_string()),
            Some("Food".to_string()),
            Some("Beverage".to_string()),
            Some("Food".to_string()),
            None,
            Some("Food".to_string()),
            Some("Food".to_string()),
        ]
    );
    assert_eq!(
        float_column(&agg.dataframe, "NetRevenue"),
        vec![
            Some(7.0),
            Some(17.0),
            Some(14.0),
            Some(24.0),
            // Only contributing row had no revenue.
            None,
            Some(6.0),
            Some(6.0),
        ]
    );
    Ok(())
}

#[test]
fn empty_filters_reproduce_unfiltered_sums() -> Result<(), Box<dyn std::error::Error>> {
    let df = prepared();
    let filtered = apply_filters(&df, &FilterSet::new().with_values("ItemName", Vec::<String>::new()))?;
    assert_eq!(filtered.height(), df.height());

    let direct = aggregate(&df, TimeSlice::Week, Some("ItemName"), Metric::ItemsSold)?;
    let via_filters = aggregate(&filtered, TimeSlice::Week, Some("ItemName"), Metric::ItemsSold)?;
    assert!(direct.dataframe.equals_missing(&via_filters.dataframe));
    Ok(())
}

#[test]
fn weekday_buckets_sort_monday_first() -> Result<(), Box<dyn std::error::Error>> {
    let df = prepared();
    let agg = aggregate(&df, TimeSlice::DayOfWeek, None, Metric::NetRevenue)?;

    // Nov 10 is a Sunday, Nov 11/Dec 2/Jan 6/Apr 21 Mondays, Dec 3 a Tuesday, Nov 9 a Saturday.
    assert_eq!(
        text_column(&agg.dataframe, "DayOfWeek"),
        vec![
            Some("Monday".to_string()),
            Some("Tuesday".to_string()),
            Some("Saturday".to_string()),
            Some("Sunday".to_string()),
        ]
    );
    assert_eq!(
        float_column(&agg.dataframe, "NetRevenue"),
        vec![Some(57.0), None, Some(5.0), Some(12.0)]
    );
    Ok(())
}

#[test]
fn ski_season_slice_skips_off_season_rows() -> Result<(), Box<dyn std::error::Error>> {
    let df = prepared();
    let agg = aggregate(&df, TimeSlice::SkiSeason, None, Metric::NetRevenue)?;

    assert_eq!(
        text_column(&agg.dataframe, "SkiSeason"),
        vec![Some("2024-2025".to_string())]
    );
    // Nov 9 (5.0) and Apr 21 (6.0) are outside the window.
    assert_eq!(float_column(&agg.dataframe, "NetRevenue"), vec![Some(63.0)]);
    Ok(())
}

#[test]
fn filters_compose_and_nulls_never_match() -> Result<(), Box<dyn std::error::Error>> {
    let df = prepared();
    let filters = FilterSet::new()
        .with_values("ProfitCenterName", ["Spoons", "Lobby Bar"])
        .with_values("Product Class", ["Food"]);

    let filtered = apply_filters(&df, &filters)?;
    assert_eq!(
        text_column(&filtered, "ItemName"),
        vec![
            Some("Fries".to_string()),
            Some("Burger".to_string()),
            Some("Burger".to_string()),
            Some("Soup".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn date_range_is_inclusive_and_open_ended() -> Result<(), Box<dyn std::error::Error>> {
    let df = prepared();
    let december = DateRange::new(
        NaiveDate::from_ymd_opt(2024, 12, 2),
        NaiveDate::from_ymd_opt(2024, 12, 3),
    );
    let filtered = apply_filters(&df, &FilterSet::new().with_date_range(december))?;
    assert_eq!(filtered.height(), 3);

    let from_new_year = DateRange::new(NaiveDate::from_ymd_opt(2025, 1, 1), None);
    let filtered = apply_filters(&df, &FilterSet::new().with_date_range(from_new_year))?;
    assert_eq!(
        text_column(&filtered, "BusinessDate"),
        vec![Some("2025-04-21".to_string()), Some("2025-01-06".to_string())]
    );
    Ok(())
}

#[test]
fn empty_selection_aggregates_to_empty_table() -> Result<(), Box<dyn std::error::Error>> {
    let df = prepared();
    let filtered = apply_filters(&df, &FilterSet::new().with_values("ItemName", ["Nachos"]))?;
    assert_eq!(filtered.height(), 0);

    let agg = aggregate(&filtered, TimeSlice::Month, Some("ItemName"), Metric::NetRevenue)?;
    assert_eq!(agg.dataframe.height(), 0);
    assert_eq!(agg.dataframe.width(), 3);
    Ok(())
}

#[test]
fn start_after_end_selects_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let df = prepared();
    let inverted = DateRange::new(
        NaiveDate::from_ymd_opt(2025, 1, 2),
        NaiveDate::from_ymd_opt(2025, 1, 1),
    );

    let filtered = apply_filters(&df, &FilterSet::new().with_date_range(inverted))?;
    assert_eq!(filtered.height(), 0);
    assert_eq!(filtered.width(), df.width());
    Ok(())
}

#[test]
fn invalid_selections_are_reported() {
    let df = prepared();

    let err = apply_filters(&df, &FilterSet::new().with_values("Station", ["Grill"])).unwrap_err();
    assert!(matches!(err, FilterError::UnknownColumn(ref name) if name == "Station"));

    let err = aggregate(&df, TimeSlice::Month, Some("Station"), Metric::NetRevenue).unwrap_err();
    assert!(matches!(err, AggregationError::MissingColumn(ref name) if name == "Station"));
}

#[test]
fn selector_names_parse_leniently() {
    assert_eq!("Day of Week".parse::<TimeSlice>(), Ok(TimeSlice::DayOfWeek));
    assert_eq!("ski-season".parse::<TimeSlice>(), Ok(TimeSlice::SkiSeason));
    assert_eq!("items_sold".parse::<Metric>(), Ok(Metric::ItemsSold));
    assert!("quarter".parse::<TimeSlice>().is_err());
}

#[test]
fn filter_options_list_sorted_distinct_values() -> PolarsResult<()> {
    let options = filter_options(&prepared())?;

    let columns: Vec<&str> = options.columns.iter().map(|c| c.column.as_str()).collect();
    assert_eq!(columns, vec!["ProfitCenterName", "Product Class", "ItemName"]);
    assert_eq!(
        options.values_for("ProfitCenterName"),
        Some(&["Lobby Bar".to_string(), "Spoons".to_string()][..])
    );
    assert_eq!(
        options.values_for("ItemName").map(<[String]>::len),
        Some(5)
    );
    assert_eq!(options.first_date, NaiveDate::from_ymd_opt(2024, 11, 9));
    assert_eq!(options.last_date, NaiveDate::from_ymd_opt(2025, 4, 21));
    Ok(())
}
