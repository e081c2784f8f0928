//! Download plan: joins catalog listings against the requested tiles.
//!
//! For every coarse key the catalog is queried once. A listed archive becomes
//! a [`DownloadTask`] when its product family equals the requested product
//! and its file name contains the formatted name of a requested tile with
//! the same prefix. A single archive matched by several requested ids yields
//! one task per match; deduplication is left to the executor.

use crate::catalog::{reduce, Catalog};
use crate::tile_id::{CoarseKey, TileId};
use crate::{Error, Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Handling of a catalog failure for one coarse key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogErrorPolicy {
    /// Fail the whole plan.
    #[default]
    Abort,
    /// Log a warning, record the key as skipped and carry on.
    Skip,
}

/// A resolved archive to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Requested tile the archive was matched for.
    pub tile: TileId,
    /// Catalog resource handle.
    pub guid: String,
    /// Full source locator.
    pub url: String,
    /// Output folder joined with the catalog file name.
    pub destination: PathBuf,
}

/// A coarse key left out of the plan because its catalog query failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedKey {
    /// The key that could not be listed.
    pub key: CoarseKey,
    /// Error message.
    pub reason: String,
}

/// Result of planning.
#[derive(Debug, Clone, Default)]
pub struct DownloadPlan {
    /// Tasks in key order, then catalog order.
    pub tasks: Vec<DownloadTask>,
    /// Keys dropped under [`CatalogErrorPolicy::Skip`].
    pub skipped: Vec<SkippedKey>,
    /// Number of catalog queries issued.
    pub keys_queried: usize,
}

impl DownloadPlan {
    /// True when every key was listed successfully.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Check that a folder exists, is a directory and accepts new files.
pub fn validate_output_dir(path: &Path) -> std::result::Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::OutputDir {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let metadata = std::fs::metadata(path).map_err(|e| invalid(&e.to_string()))?;
    if !metadata.is_dir() {
        return Err(invalid("not a directory"));
    }
    tempfile::NamedTempFile::new_in(path).map_err(|e| invalid(&format!("not writable: {e}")))?;
    Ok(())
}

/// Whether a catalog file name is a bare file name, so joining it to the
/// output folder stays inside that folder.
fn is_plain_file_name(name: &str) -> bool {
    Path::new(name).file_name() == Some(OsStr::new(name))
}

/// Builds download plans against a catalog for one product and output folder.
pub struct PlanBuilder<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    product: String,
    output_dir: PathBuf,
    on_catalog_error: CatalogErrorPolicy,
}

impl<'a, C: Catalog + ?Sized> PlanBuilder<'a, C> {
    /// Create a builder. Catalog failures abort by default.
    pub fn new(catalog: &'a C, product: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            product: product.into(),
            output_dir: output_dir.into(),
            on_catalog_error: CatalogErrorPolicy::default(),
        }
    }

    /// Set the catalog failure policy.
    pub fn on_catalog_error(mut self, policy: CatalogErrorPolicy) -> Self {
        self.on_catalog_error = policy;
        self
    }

    /// Plan downloads for `requested`, querying each distinct prefix once.
    pub fn build_for(&self, requested: &[TileId]) -> Result<DownloadPlan> {
        self.build(&reduce(requested), requested)
    }

    /// Plan downloads for `requested`, querying the catalog once per key in `keys`.
    ///
    /// The output folder is checked before any query is sent. Requested ids
    /// whose prefix is not among `keys` match nothing.
    pub fn build(&self, keys: &BTreeSet<CoarseKey>, requested: &[TileId]) -> Result<DownloadPlan> {
        validate_output_dir(&self.output_dir)?;

        let mut by_key: BTreeMap<CoarseKey, Vec<(&TileId, String)>> = BTreeMap::new();
        for tile in requested {
            by_key
                .entry(tile.coarse_key())
                .or_default()
                .push((tile, tile.formatted_name()));
        }

        let mut plan = DownloadPlan::default();

        for key in keys {
            plan.keys_queried += 1;
            let entries = match self.catalog.query(key) {
                Ok(entries) => entries,
                Err(e) => match self.on_catalog_error {
                    CatalogErrorPolicy::Abort => return Err(Error::Catalog(e)),
                    CatalogErrorPolicy::Skip => {
                        warn!("skipping {}: {}", key, e);
                        plan.skipped.push(SkippedKey {
                            key: key.clone(),
                            reason: e.to_string(),
                        });
                        continue;
                    }
                },
            };

            let Some(tiles) = by_key.get(key) else {
                debug!("no requested tiles under {}", key);
                continue;
            };

            let before = plan.tasks.len();
            for entry in entries.iter().filter(|e| e.pyramid == self.product) {
                if !is_plain_file_name(&entry.file_name) {
                    warn!("ignoring {} archive with unsafe file name {:?}", key, entry.file_name);
                    continue;
                }
                for (tile, formatted) in tiles {
                    if entry.file_name.contains(formatted.as_str()) {
                        plan.tasks.push(DownloadTask {
                            tile: (*tile).clone(),
                            guid: entry.guid.clone(),
                            url: self.catalog.download_url(&entry.guid),
                            destination: self.output_dir.join(&entry.file_name),
                        });
                    }
                }
            }
            debug!(
                "{}: {} listed, {} matched {}",
                key,
                entries.len(),
                plan.tasks.len() - before,
                self.product
            );
        }

        info!(
            "planned {} downloads from {} catalog queries ({} skipped)",
            plan.tasks.len(),
            plan.keys_queried,
            plan.skipped.len()
        );
        Ok(plan)
    }
}
