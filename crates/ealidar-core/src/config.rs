//! Run configuration.
//!
//! Every field has a default, so a configuration file only needs to name
//! what it changes:
//!
//! ```yaml
//! catalog:
//!   on_error: skip
//! fetch:
//!   workers: 4
//! ```

use crate::features::DEFAULT_TILE_NAME_FIELD;
use crate::plan::CatalogErrorPolicy;
use crate::resolver::BoundaryRule;
use crate::tile_id::CoarseKey;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment Agency survey catalog REST root.
pub const DEFAULT_CATALOG_BASE_URL: &str = "http://www.geostore.com/environment-agency/rest/product";

/// Grid the catalog is keyed by (10 km Ordnance Survey cells).
pub const DEFAULT_GRID: &str = "OS_GB_10KM";

/// Catalog name passed as a query parameter.
pub const DEFAULT_CATALOG_NAME: &str = "Survey";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Remote catalog endpoints and policy.
    pub catalog: CatalogConfig,
    /// Tile resolution settings.
    pub resolver: ResolverConfig,
    /// Download executor settings.
    pub fetch: FetchConfig,
}

impl Config {
    /// Parse a YAML document. `origin` labels it in error messages.
    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::Config {
            origin: origin.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::Config {
            origin: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml_str(&text, &path.display().to_string())
    }
}

/// Remote catalog settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// REST root shared by product listings and downloads.
    pub base_url: String,
    /// Grid product the listing is keyed by.
    pub grid: String,
    /// Value of the `catalogName` query parameter.
    pub catalog_name: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Extra attempts after a transport error or 5xx response.
    pub retries: u32,
    /// What to do when the query for one coarse key fails.
    pub on_error: CatalogErrorPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CATALOG_BASE_URL.to_string(),
            grid: DEFAULT_GRID.to_string(),
            catalog_name: DEFAULT_CATALOG_NAME.to_string(),
            timeout_secs: 60,
            retries: 2,
            on_error: CatalogErrorPolicy::default(),
        }
    }
}

impl CatalogConfig {
    /// Product listing URL for a coarse key.
    pub fn query_url(&self, key: &CoarseKey) -> String {
        format!(
            "{}/{}/{}?catalogName={}",
            self.base_url.trim_end_matches('/'),
            self.grid,
            key,
            self.catalog_name
        )
    }

    /// Download URL for a resource handle (catalog `guid`).
    pub fn download_url(&self, guid: &str) -> String {
        format!("{}/download/{}", self.base_url.trim_end_matches('/'), guid)
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Tile resolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Tile layer property holding the grid reference.
    pub tile_name_field: String,
    /// Treatment of tiles that only touch the AOI.
    pub boundary: BoundaryRule,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            tile_name_field: DEFAULT_TILE_NAME_FIELD.to_string(),
            boundary: BoundaryRule::default(),
        }
    }
}

/// Download executor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Parallel downloads; 0 means one per CPU.
    pub workers: usize,
    /// Per-archive timeout in seconds.
    pub timeout_secs: u64,
    /// Leave archives already present in the output folder alone.
    pub skip_existing: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            timeout_secs: 600,
            skip_existing: true,
        }
    }
}

impl FetchConfig {
    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
