use menumix_catalog::CatalogError;
use thiserror::Error;

use crate::aggregation::AggregationError;
use crate::calendar::CalendarError;
use crate::enrichment::EnrichmentError;
use crate::filters::FilterError;
use crate::keys::KeyError;
use crate::table_io::TableIoError;

#[derive(Error, Debug)]
pub enum MenumixError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    TableIo(#[from] TableIoError),

    #[error("Master catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("Enrichment failed: {0}")]
    Enrichment(#[from] EnrichmentError),

    #[error("Feature derivation failed: {0}")]
    Calendar(#[from] CalendarError),

    #[error("Filtering failed: {0}")]
    Filter(#[from] FilterError),

    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Invalid report request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, MenumixError>;
