//! Positional contract of the item-master export.
//!
//! The report carries six title/blank rows before the real header on row 7, and the fields we
//! need live at fixed column letters. Header text at each position is checked before any data
//! row is read so a reshuffled export fails instead of silently reading the wrong column.

/// Zero-based index of the header row (row 7 in the sheet).
pub const HEADER_ROW_INDEX: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogField {
    ProductClass,
    ItemId,
    ItemName,
    RevenueCategory,
    ItemGroup,
}

impl CatalogField {
    /// Column name used for the field once it leaves the spreadsheet.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            CatalogField::ProductClass => "Product Class",
            CatalogField::ItemId => "ItemID",
            CatalogField::ItemName => "Item Name",
            CatalogField::RevenueCategory => "Revenue Category",
            CatalogField::ItemGroup => "Item Group",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CatalogColumn {
    pub letter: &'static str,
    pub index: usize,
    pub field: CatalogField,
    /// Header text expected at this position.
    pub header: &'static str,
    /// The product-class column has no header in the export.
    pub allow_blank_header: bool,
}

impl CatalogColumn {
    pub fn header_matches(&self, found: &str) -> bool {
        let found = found.trim();
        (self.allow_blank_header && found.is_empty()) || found.eq_ignore_ascii_case(self.header)
    }
}

pub static CATALOG_COLUMNS: [CatalogColumn; 5] = [
    CatalogColumn {
        letter: "A",
        index: 0,
        field: CatalogField::ProductClass,
        header: "Product Class",
        allow_blank_header: true,
    },
    CatalogColumn {
        letter: "C",
        index: 2,
        field: CatalogField::ItemId,
        header: "Item ID",
        allow_blank_header: false,
    },
    CatalogColumn {
        letter: "D",
        index: 3,
        field: CatalogField::ItemName,
        header: "Item Name",
        allow_blank_header: false,
    },
    CatalogColumn {
        letter: "J",
        index: 9,
        field: CatalogField::RevenueCategory,
        header: "Default Revenue Category",
        allow_blank_header: false,
    },
    CatalogColumn {
        letter: "L",
        index: 11,
        field: CatalogField::ItemGroup,
        header: "Item Group",
        allow_blank_header: false,
    },
];

pub fn column_for(field: CatalogField) -> &'static CatalogColumn {
    let position = match field {
        CatalogField::ProductClass => 0,
        CatalogField::ItemId => 1,
        CatalogField::ItemName => 2,
        CatalogField::RevenueCategory => 3,
        CatalogField::ItemGroup => 4,
    };
    &CATALOG_COLUMNS[position]
}
