use std::path::{Path, PathBuf};

use menumix_catalog::{load_master_catalog, CatalogOptions};
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::enrichment::{enrich_transactions, EnrichmentSummary};
use crate::error::Result;
use crate::keys::reconcile_item_id_column;
use crate::table_io::{read_delimited, write_csv, write_xlsx, TextEncoding};

/// Inputs and destinations for one enrichment run.
#[derive(Debug, Clone)]
pub struct EnrichRequest {
    pub mix: PathBuf,
    pub master: PathBuf,
    pub catalog: CatalogOptions,
    pub out_xlsx: Option<PathBuf>,
    pub out_csv: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogSummary {
    pub sheet: String,
    pub data_rows: usize,
    pub rows_without_id: usize,
    pub entries: usize,
    pub duplicate_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichReport {
    pub catalog: CatalogSummary,
    pub enrichment: EnrichmentSummary,
    pub written: Vec<PathBuf>,
}

/// Loads the extract and the catalog, enriches, and writes whichever outputs were requested.
pub fn run_enrichment(request: &EnrichRequest) -> Result<(DataFrame, EnrichReport)> {
    let mut transactions = read_delimited(&request.mix)?;
    reconcile_item_id_column(&mut transactions)?;
    info!(
        path = %request.mix.display(),
        rows = transactions.height(),
        columns = transactions.width(),
        "loaded menu mix extract"
    );

    let loaded = load_master_catalog(&request.master, &request.catalog)?;
    if loaded.rows_without_id > 0 {
        debug!(
            rows = loaded.rows_without_id,
            "dropped master rows without an item id"
        );
    }
    if !loaded.catalog.duplicate_ids().is_empty() {
        warn!(
            policy = %request.catalog.duplicates,
            count = loaded.catalog.duplicate_ids().len(),
            ids = ?loaded.catalog.duplicate_ids(),
            "master catalog repeats item ids"
        );
    }
    info!(
        path = %request.master.display(),
        sheet = %loaded.sheet_name,
        entries = loaded.catalog.len(),
        "loaded master catalog"
    );

    let enriched = enrich_transactions(&transactions, &loaded.catalog)?;

    let mut written = Vec::new();
    if let Some(path) = &request.out_xlsx {
        ensure_parent(path)?;
        write_xlsx(&enriched.dataframe, path)?;
        written.push(path.clone());
    }
    if let Some(path) = &request.out_csv {
        ensure_parent(path)?;
        write_csv(&enriched.dataframe, path, TextEncoding::Utf8Bom)?;
        written.push(path.clone());
    }

    let summary = &enriched.summary;
    info!(
        rows = summary.rows,
        rows_with_name = summary.rows_with_name,
        unnamed_item_ids = summary.unnamed_item_ids,
        unmatched_item_ids = summary.unmatched_item_ids,
        outputs = written.len(),
        "enrichment complete"
    );

    let report = EnrichReport {
        catalog: CatalogSummary {
            sheet: loaded.sheet_name,
            data_rows: loaded.data_rows,
            rows_without_id: loaded.rows_without_id,
            entries: loaded.catalog.len(),
            duplicate_ids: loaded.catalog.duplicate_ids().to_vec(),
        },
        enrichment: enriched.summary,
        written,
    };

    Ok((enriched.dataframe, report))
}

pub(crate) fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
