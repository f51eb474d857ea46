use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::CatalogError;

/// One item row of the master catalog after positional extraction and forward-fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterEntry {
    pub item_id: String,
    pub item_name: Option<String>,
    pub product_class: Option<String>,
    pub revenue_category: Option<String>,
    pub item_group: Option<String>,
}

/// What to do when the same item id appears on more than one catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    #[default]
    KeepFirst,
    KeepLast,
    Error,
}

impl DuplicatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicatePolicy::KeepFirst => "keep-first",
            DuplicatePolicy::KeepLast => "keep-last",
            DuplicatePolicy::Error => "error",
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keep-first" | "first" => Ok(DuplicatePolicy::KeepFirst),
            "keep-last" | "last" => Ok(DuplicatePolicy::KeepLast),
            "error" | "fail" => Ok(DuplicatePolicy::Error),
            other => Err(format!(
                "unknown duplicate policy '{other}' (expected keep-first, keep-last or error)"
            )),
        }
    }
}

/// Master catalog keyed by trimmed item id. Each id maps to exactly one entry, so a left join
/// against it can never multiply transaction rows.
#[derive(Debug, Clone, Default)]
pub struct MasterCatalog {
    entries: Vec<MasterEntry>,
    index: HashMap<String, usize>,
    duplicate_ids: Vec<String>,
}

impl MasterCatalog {
    pub fn from_entries(
        entries: Vec<MasterEntry>,
        policy: DuplicatePolicy,
    ) -> Result<Self, CatalogError> {
        let mut kept: Vec<MasterEntry> = Vec::with_capacity(entries.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(entries.len());
        let mut duplicate_ids: Vec<String> = Vec::new();

        for entry in entries {
            match index.get(&entry.item_id) {
                Some(&position) => {
                    if !duplicate_ids.contains(&entry.item_id) {
                        duplicate_ids.push(entry.item_id.clone());
                    }
                    if policy == DuplicatePolicy::KeepLast {
                        kept[position] = entry;
                    }
                }
                None => {
                    index.insert(entry.item_id.clone(), kept.len());
                    kept.push(entry);
                }
            }
        }

        if policy == DuplicatePolicy::Error && !duplicate_ids.is_empty() {
            return Err(CatalogError::DuplicateItemIds { ids: duplicate_ids });
        }

        Ok(Self {
            entries: kept,
            index,
            duplicate_ids,
        })
    }

    pub fn get(&self, item_id: &str) -> Option<&MasterEntry> {
        self.index.get(item_id).map(|&position| &self.entries[position])
    }

    pub fn entries(&self) -> &[MasterEntry] {
        &self.entries
    }

    /// Ids that appeared on more than one catalog row, in first-seen order.
    pub fn duplicate_ids(&self) -> &[String] {
        &self.duplicate_ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of reading a catalog sheet, with the bookkeeping callers log.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub catalog: MasterCatalog,
    pub sheet_name: String,
    pub data_rows: usize,
    pub rows_without_id: usize,
}
