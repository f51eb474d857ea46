pub mod errors;
pub mod layout;
pub mod loader;
pub mod model;

pub use errors::{CatalogError, CellRef};
pub use layout::{CatalogColumn, CatalogField, CATALOG_COLUMNS, HEADER_ROW_INDEX};
pub use loader::{load_master_catalog, parse_catalog_grid, CatalogOptions, CatalogRows};
pub use model::{DuplicatePolicy, LoadedCatalog, MasterCatalog, MasterEntry};
