use std::collections::BTreeSet;

use menumix_catalog::MasterCatalog;
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::keys::ITEM_ID_COLUMN;

pub const ITEM_NAME_COLUMN: &str = "ItemName";
pub const PRODUCT_CLASS_COLUMN: &str = "Product Class";
pub const REVENUE_CATEGORY_COLUMN: &str = "Revenue Category";
pub const ITEM_GROUP_COLUMN: &str = "Item Group";

/// Classification columns, in the order they are placed after `ItemName`.
pub const CLASSIFICATION_COLUMNS: [&str; 3] = [
    PRODUCT_CLASS_COLUMN,
    REVENUE_CATEGORY_COLUMN,
    ITEM_GROUP_COLUMN,
];

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error("enriched frame has {found} rows but the extract had {expected}")]
    RowCountMismatch { expected: usize, found: usize },
}

/// Informational counts reported after every enrichment run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentSummary {
    pub rows: usize,
    pub rows_with_name: usize,
    pub unnamed_item_ids: usize,
    pub unmatched_item_ids: usize,
}

#[derive(Debug, Clone)]
pub struct EnrichmentResult {
    pub dataframe: DataFrame,
    pub summary: EnrichmentSummary,
}

/// Left-joins the extract to the catalog on `ItemID`.
///
/// Every transaction row is kept in its original order. The catalog name replaces `ItemName`
/// wherever the id matched and the catalog has a name; the extract's own name is kept
/// otherwise. `Product Class`, `Revenue Category` and `Item Group` are placed directly after
/// `ItemName`. Any classification columns the extract already carried are replaced.
///
/// The extract must already have gone through [`crate::keys::reconcile_item_id_column`].
pub fn enrich_transactions(
    transactions: &DataFrame,
    catalog: &MasterCatalog,
) -> Result<EnrichmentResult, EnrichmentError> {
    let height = transactions.height();
    let item_ids = transactions.column(ITEM_ID_COLUMN)?.str()?;
    let original_names = match transactions.column(ITEM_NAME_COLUMN) {
        Ok(column) => Some(column.str()?),
        Err(_) => None,
    };

    let mut names: Vec<Option<String>> = Vec::with_capacity(height);
    let mut product_classes: Vec<Option<String>> = Vec::with_capacity(height);
    let mut revenue_categories: Vec<Option<String>> = Vec::with_capacity(height);
    let mut item_groups: Vec<Option<String>> = Vec::with_capacity(height);
    let mut unmatched: BTreeSet<&str> = BTreeSet::new();
    let mut unnamed: BTreeSet<&str> = BTreeSet::new();

    for idx in 0..height {
        let item_id = item_ids.get(idx);
        let entry = item_id.and_then(|id| catalog.get(id));
        let original = original_names.and_then(|column| column.get(idx));

        let name = entry
            .and_then(|entry| entry.item_name.clone())
            .or_else(|| original.map(str::to_string));

        if let Some(id) = item_id {
            if entry.is_none() {
                unmatched.insert(id);
            }
            if name.is_none() {
                unnamed.insert(id);
            }
        }

        names.push(name);
        product_classes.push(entry.and_then(|entry| entry.product_class.clone()));
        revenue_categories.push(entry.and_then(|entry| entry.revenue_category.clone()));
        item_groups.push(entry.and_then(|entry| entry.item_group.clone()));
    }

    let rows_with_name = names.iter().filter(|name| name.is_some()).count();

    let mut classification: Vec<Column> = vec![
        Series::new(PRODUCT_CLASS_COLUMN.into(), product_classes).into(),
        Series::new(REVENUE_CATEGORY_COLUMN.into(), revenue_categories).into(),
        Series::new(ITEM_GROUP_COLUMN.into(), item_groups).into(),
    ];
    let name_column: Column = Series::new(ITEM_NAME_COLUMN.into(), names).into();

    let mut columns: Vec<Column> = Vec::with_capacity(transactions.width() + 4);
    let mut placed = false;
    for column in transactions.get_columns() {
        let column_name = column.name().as_str();
        if CLASSIFICATION_COLUMNS.contains(&column_name) {
            continue;
        }
        if column_name == ITEM_NAME_COLUMN {
            columns.push(name_column.clone());
            columns.append(&mut classification);
            placed = true;
        } else {
            columns.push(column.clone());
        }
    }
    if !placed {
        columns.push(name_column);
        columns.append(&mut classification);
    }

    let dataframe = DataFrame::new(columns)?;
    if dataframe.height() != height {
        return Err(EnrichmentError::RowCountMismatch {
            expected: height,
            found: dataframe.height(),
        });
    }

    let summary = EnrichmentSummary {
        rows: height,
        rows_with_name,
        unnamed_item_ids: unnamed.len(),
        unmatched_item_ids: unmatched.len(),
    };

    Ok(EnrichmentResult { dataframe, summary })
}
