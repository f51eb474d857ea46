use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use menumix_catalog::DuplicatePolicy;
use serde::Deserialize;

use crate::aggregation::{Metric, TimeSlice};
use crate::chart::ChartKind;
use crate::enrichment::ITEM_NAME_COLUMN;

pub const CONFIG_ENV_VAR: &str = "MENUMIX_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "menumix.toml";
pub const DEFAULT_TOP_N: usize = 20;

/// Defaults for the `enrich` and `report` commands, usually read from `menumix.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub enrich: EnrichConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnrichConfig {
    pub mix: PathBuf,
    pub master: PathBuf,
    pub sheet: Option<String>,
    pub out_xlsx: PathBuf,
    pub out_csv: PathBuf,
    pub duplicates: DuplicatePolicy,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            mix: PathBuf::from("menu_mix_daily_aggregated.csv"),
            master: PathBuf::from("MenuItemMasterName_0.xlsx"),
            sheet: None,
            out_xlsx: PathBuf::from("menu_mix_daily_enriched.xlsx"),
            out_csv: PathBuf::from("menu_mix_daily_enriched.csv"),
            duplicates: DuplicatePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub data: PathBuf,
    pub metric: Metric,
    pub time_slice: TimeSlice,
    /// Empty string disables the comparison dimension.
    pub compare_by: String,
    pub top_n: usize,
    pub chart: ChartKind,
    pub out_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::from("menu_mix_daily_enriched.csv"),
            metric: Metric::default(),
            time_slice: TimeSlice::default(),
            compare_by: ITEM_NAME_COLUMN.to_string(),
            top_n: DEFAULT_TOP_N,
            chart: ChartKind::default(),
            out_dir: PathBuf::from("exports"),
        }
    }
}

impl ReportConfig {
    pub fn compare_by(&self) -> Option<&str> {
        let value = self.compare_by.trim();
        (!value.is_empty() && !value.eq_ignore_ascii_case("none")).then_some(value)
    }
}

pub fn parse_config(toml_str: &str) -> Result<AppConfig> {
    toml::from_str::<AppConfig>(toml_str).context("failed to parse menumix configuration TOML")
}

/// Reads `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    parse_config(&content).with_context(|| format!("invalid config file '{}'", path.display()))
}

/// Config path from `MENUMIX_CONFIG`, else `menumix.toml` in the working directory.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}
