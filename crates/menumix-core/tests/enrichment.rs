use polars::prelude::*;

use menumix_catalog::{DuplicatePolicy, MasterCatalog, MasterEntry};
use menumix_core::enrichment::{
    enrich_transactions, ITEM_GROUP_COLUMN, ITEM_NAME_COLUMN, PRODUCT_CLASS_COLUMN,
    REVENUE_CATEGORY_COLUMN,
};
use menumix_core::keys::{reconcile_item_id_column, KeyError, ITEM_ID_COLUMN};

fn entry(id: &str, name: Option<&str>, class: &str, category: &str, group: &str) -> MasterEntry {
    MasterEntry {
        item_id: id.to_string(),
        item_name: name.map(str::to_string),
        product_class: Some(class.to_string()),
        revenue_category: Some(category.to_string()),
        item_group: Some(group.to_string()),
    }
}

fn catalog() -> MasterCatalog {
    MasterCatalog::from_entries(
        vec![
            entry("1001", Some("Cheeseburger"), "Food", "Grill", "Burgers"),
            entry("00123", Some("House Lager"), "Beverage", "Beer", "Draft"),
            entry("2002", None, "Food", "Grill", "Sides"),
        ],
        DuplicatePolicy::KeepFirst,
    )
    .unwrap()
}

fn text(df: &DataFrame, column: &str) -> Vec<Option<String>> {
    df.column(column)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect()
}

#[test]
fn enrichment_keeps_every_row_and_prefers_master_names() -> Result<(), Box<dyn std::error::Error>> {
    let mut mix = df![
        "BusinessDate" => &["2024-12-01", "2024-12-01", "2024-12-02", "2024-12-02"],
        " Item ID " => &[" 1001", "9999", "1001", "2002"],
        "ItemName" => &["CHZBRGR", "Mystery Special", "CHZBRGR", "Fries"],
        "ItemsSold" => &["3", "1", "2", "5"],
    ]?;

    reconcile_item_id_column(&mut mix)?;
    let result = enrich_transactions(&mix, &catalog())?;
    let enriched = &result.dataframe;

    assert_eq!(enriched.height(), mix.height());
    assert_eq!(
        text(enriched, ITEM_ID_COLUMN),
        vec![
            Some("1001".to_string()),
            Some("9999".to_string()),
            Some("1001".to_string()),
            Some("2002".to_string()),
        ]
    );
    assert_eq!(
        text(enriched, ITEM_NAME_COLUMN),
        vec![
            Some("Cheeseburger".to_string()),
            Some("Mystery Special".to_string()),
            Some("Cheeseburger".to_string()),
            // Master row has no name, so the extract's name survives.
            Some("Fries".to_string()),
        ]
    );
    assert_eq!(
        text(enriched, PRODUCT_CLASS_COLUMN),
        vec![
            Some("Food".to_string()),
            None,
            Some("Food".to_string()),
            Some("Food".to_string()),
        ]
    );

    assert_eq!(result.summary.rows, 4);
    assert_eq!(result.summary.rows_with_name, 4);
    assert_eq!(result.summary.unmatched_item_ids, 1);
    assert_eq!(result.summary.unnamed_item_ids, 0);
    Ok(())
}

#[test]
fn classification_columns_follow_item_name() -> Result<(), Box<dyn std::error::Error>> {
    let mut mix = df![
        "ItemID" => &["1001"],
        "ItemName" => &["CHZBRGR"],
        "Product Class" => &["stale"],
        "NetRevenue" => &["12.50"],
    ]?;

    reconcile_item_id_column(&mut mix)?;
    let enriched = enrich_transactions(&mix, &catalog())?.dataframe;

    let names: Vec<&str> = enriched
        .get_column_names()
        .iter()
        .map(|name| name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "ItemID",
            "ItemName",
            PRODUCT_CLASS_COLUMN,
            REVENUE_CATEGORY_COLUMN,
            ITEM_GROUP_COLUMN,
            "NetRevenue",
        ]
    );
    assert_eq!(text(&enriched, PRODUCT_CLASS_COLUMN), vec![Some("Food".to_string())]);
    Ok(())
}

#[test]
fn extract_without_names_gets_columns_appended() -> Result<(), Box<dyn std::error::Error>> {
    let mut mix = df![
        "ItemId" => &["1001", "4040"],
        "ItemsSold" => &["1", "2"],
    ]?;

    reconcile_item_id_column(&mut mix)?;
    let result = enrich_transactions(&mix, &catalog())?;
    let enriched = &result.dataframe;

    let names: Vec<&str> = enriched
        .get_column_names()
        .iter()
        .map(|name| name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "ItemID",
            "ItemsSold",
            ITEM_NAME_COLUMN,
            PRODUCT_CLASS_COLUMN,
            REVENUE_CATEGORY_COLUMN,
            ITEM_GROUP_COLUMN,
        ]
    );
    assert_eq!(
        text(enriched, ITEM_NAME_COLUMN),
        vec![Some("Cheeseburger".to_string()), None]
    );
    assert_eq!(result.summary.unnamed_item_ids, 1);
    Ok(())
}

#[test]
fn leading_zero_ids_only_match_exactly() -> Result<(), Box<dyn std::error::Error>> {
    let mut mix = df![
        "ItemID" => &["00123", "123"],
        "ItemName" => &["LAGER", "LAGER?"],
    ]?;

    reconcile_item_id_column(&mut mix)?;
    let enriched = enrich_transactions(&mix, &catalog())?.dataframe;

    assert_eq!(
        text(&enriched, ITEM_NAME_COLUMN),
        vec![Some("House Lager".to_string()), Some("LAGER?".to_string())]
    );
    Ok(())
}

#[test]
fn numeric_id_columns_are_coerced_to_text() -> Result<(), Box<dyn std::error::Error>> {
    let mut mix = df![
        "ItemID" => &[1001i64, 2002],
        "ItemName" => &["a", "b"],
    ]?;

    reconcile_item_id_column(&mut mix)?;
    assert_eq!(mix.column(ITEM_ID_COLUMN)?.dtype(), &DataType::String);
    assert_eq!(
        text(&mix, ITEM_ID_COLUMN),
        vec![Some("1001".to_string()), Some("2002".to_string())]
    );
    Ok(())
}

#[test]
fn missing_id_column_is_fatal() {
    let mut mix = df![
        "Item Code" => &["1001"],
        "ItemName" => &["CHZBRGR"],
    ]
    .unwrap();

    let err = reconcile_item_id_column(&mut mix).unwrap_err();
    match err {
        KeyError::MissingKeyColumn { aliases, columns } => {
            assert_eq!(aliases, vec!["ItemID", "Item ID", "ItemId"]);
            assert_eq!(columns, vec!["Item Code".to_string(), "ItemName".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn alias_priority_prefers_canonical_spelling() -> Result<(), Box<dyn std::error::Error>> {
    let mut mix = df![
        "Item ID" => &["2002"],
        "ItemID" => &["1001"],
    ]?;

    reconcile_item_id_column(&mut mix)?;
    assert_eq!(text(&mix, ITEM_ID_COLUMN), vec![Some("1001".to_string())]);
    assert!(mix.column("Item ID").is_ok());
    Ok(())
}

#[test]
fn padded_duplicate_id_header_does_not_shadow_exact_one() -> Result<(), Box<dyn std::error::Error>> {
    let mut mix = df![
        "ItemID" => &[" 1001 "],
        "ItemID " => &["2002"],
        " ItemName" => &["CHZBRGR"],
    ]?;

    reconcile_item_id_column(&mut mix)?;
    assert_eq!(text(&mix, ITEM_ID_COLUMN), vec![Some("1001".to_string())]);
    assert!(mix.column("ItemID ").is_ok());
    assert!(mix.column("ItemName").is_ok());
    Ok(())
}
