use polars::prelude::*;
use thiserror::Error;
use tracing::warn;

pub const ITEM_ID_COLUMN: &str = "ItemID";

/// Header spellings seen in POS extracts, tried in order.
pub const ITEM_ID_ALIASES: [&str; 3] = ["ItemID", "Item ID", "ItemId"];

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("no item id column found (looked for {aliases:?}; columns were {columns:?})")]
    MissingKeyColumn {
        aliases: Vec<&'static str>,
        columns: Vec<String>,
    },
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
}

/// Join-key form of an item id: trimmed text, never a number.
pub fn normalize_item_id(raw: &str) -> String {
    raw.trim().to_string()
}

/// Trims whitespace around every header.
///
/// A header whose trimmed form is already taken keeps its raw spelling, so `"ItemID "` next to
/// `"ItemID"` never shadows the exact column.
pub fn strip_column_names(df: &mut DataFrame) -> PolarsResult<()> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    for name in &names {
        let stripped = name.trim();
        if stripped == name {
            continue;
        }
        let taken = df
            .get_column_names()
            .iter()
            .any(|existing| existing.as_str() == stripped);
        if taken {
            warn!(column = %name, trimmed = stripped, "header collides once trimmed; kept as is");
            continue;
        }
        df.rename(name, stripped.into())?;
    }
    Ok(())
}

/// Returns the first alias present in `columns`.
pub fn find_item_id_column<'a>(columns: impl IntoIterator<Item = &'a str>) -> Option<&'static str> {
    let columns: Vec<&str> = columns.into_iter().collect();
    ITEM_ID_ALIASES
        .iter()
        .copied()
        .find(|alias| columns.contains(alias))
}

/// Strips header whitespace, renames the id column to `ItemID`, and trims every id value.
pub fn reconcile_item_id_column(df: &mut DataFrame) -> Result<(), KeyError> {
    strip_column_names(df)?;

    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let found = find_item_id_column(names.iter().map(String::as_str)).ok_or_else(|| {
        KeyError::MissingKeyColumn {
            aliases: ITEM_ID_ALIASES.to_vec(),
            columns: names.clone(),
        }
    })?;

    if found != ITEM_ID_COLUMN {
        df.rename(found, ITEM_ID_COLUMN.into())?;
    }

    normalize_item_id_column(df)?;
    Ok(())
}

/// Coerces `ItemID` to trimmed text whatever its current type. Blank ids become null.
pub fn normalize_item_id_column(df: &mut DataFrame) -> PolarsResult<()> {
    let column = df.column(ITEM_ID_COLUMN)?;
    let mut ids: Vec<Option<String>> = Vec::with_capacity(column.len());

    for idx in 0..column.len() {
        let raw = crate::table_io::cell_text(column, idx)?;
        ids.push(raw.map(|value| normalize_item_id(&value)).filter(|id| !id.is_empty()));
    }

    df.with_column(Series::new(ITEM_ID_COLUMN.into(), ids))?;
    Ok(())
}
