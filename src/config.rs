//! Catalog configuration, loaded from TOML.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::SortColumn;
use crate::client::{DRIVE_API_BASE, UPLOAD_API_BASE};
use crate::error::{CatalogError, CatalogResult};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "DRIVE_CATALOG_CONFIG";

/// Cap on records held after an unfiltered refresh.
pub const DEFAULT_MAX_RECORDS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortOrder {
    pub column: SortColumn,
    pub ascending: bool,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            column: SortColumn::Id,
            ascending: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub max_records: usize,
    pub page_size: u32,
    pub download_dir: PathBuf,
    pub api_base: String,
    pub upload_base: String,
    pub upload_description: String,
    pub default_sort: SortOrder,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            page_size: 100,
            download_dir: PathBuf::from("."),
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: UPLOAD_API_BASE.to_string(),
            upload_description: "uploaded by drive_catalog".to_string(),
            default_sort: SortOrder::default(),
        }
    }
}

impl CatalogConfig {
    pub fn from_toml_str(content: &str) -> CatalogResult<Self> {
        let config: CatalogConfig =
            toml::from_str(content).map_err(|e| CatalogError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogError::LocalIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config: an explicit path must exist; otherwise
    /// `$DRIVE_CATALOG_CONFIG`, then the platform config dir, then defaults.
    pub fn load(explicit: Option<&Path>) -> CatalogResult<Self> {
        if let Some(path) = explicit {
            tracing::info!("Loading config from {:?}", path);
            return Self::from_file(path);
        }

        if let Some(path) = std::env::var_os(CONFIG_ENV).map(PathBuf::from) {
            tracing::info!("Loading config from {:?} ({})", path, CONFIG_ENV);
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::info!("Loading config from {:?}", path);
                Self::from_file(path)
            }
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// `config.toml` in the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "drive_catalog")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn validate(&self) -> CatalogResult<()> {
        if self.max_records == 0 {
            return Err(CatalogError::Config("max_records must be at least 1".to_string()));
        }
        if !(1..=1000).contains(&self.page_size) {
            return Err(CatalogError::Config(format!(
                "page_size must be within 1..=1000, got {}",
                self.page_size
            )));
        }
        Ok(())
    }
}
