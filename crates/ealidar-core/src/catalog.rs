//! Remote product catalog: listing records, the query reducer and the HTTP client.
//!
//! The catalog is organised by 10 km cells. One query returns every product
//! archive published for the cell, across all product families, so fine
//! tiles sharing a prefix are served by a single request.
//!
//! Listing URL:
//! `{base}/OS_GB_10KM/{coarseKey}?catalogName=Survey`, answered with a JSON
//! array of `{ "pyramid", "guid", "fileName", ... }` records.

use crate::config::CatalogConfig;
use crate::tile_id::{CoarseKey, TileId};
use crate::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// One downloadable archive listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Product family label, e.g. `LIDAR-DTM-1M-ENGLAND-EA`.
    pub pyramid: String,
    /// Resource handle used to build the download URL.
    pub guid: String,
    /// Archive file name, containing the fine tile name.
    #[serde(rename = "fileName")]
    pub file_name: String,
}

/// Source of product listings per coarse key.
pub trait Catalog {
    /// List every archive published for a coarse key.
    fn query(&self, key: &CoarseKey) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Full source locator for a resource handle.
    fn download_url(&self, guid: &str) -> String;
}

/// Reduce tile ids to the distinct catalog keys covering them.
///
/// The result holds exactly one key per distinct prefix, in sorted order, so
/// iterating it issues one catalog query per coarse cell.
pub fn reduce<'a, I>(ids: I) -> BTreeSet<CoarseKey>
where
    I: IntoIterator<Item = &'a TileId>,
{
    ids.into_iter().map(TileId::coarse_key).collect()
}

/// Distinct product family labels available for a coarse key.
pub fn list_products<C: Catalog + ?Sized>(
    catalog: &C,
    key: &CoarseKey,
) -> Result<BTreeSet<String>, CatalogError> {
    Ok(catalog
        .query(key)?
        .into_iter()
        .map(|entry| entry.pyramid)
        .collect())
}

/// Decode a listing response body.
pub fn parse_listing(key: &CoarseKey, body: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
    serde_json::from_str(body).map_err(|source| CatalogError::Parse {
        key: key.to_string(),
        source,
    })
}

/// Catalog client over HTTP.
///
/// Transport errors and 5xx responses are retried `retries` times with a
/// doubling back-off starting at half a second. Other failures are returned
/// immediately.
pub struct HttpCatalog {
    config: CatalogConfig,
    client: reqwest::blocking::Client,
    queries: AtomicUsize,
}

impl std::fmt::Debug for HttpCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCatalog")
            .field("base_url", &self.config.base_url)
            .field("grid", &self.config.grid)
            .finish()
    }
}

impl HttpCatalog {
    /// Create a client for the configured catalog.
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(CatalogError::Client)?;

        Ok(Self {
            config,
            client,
            queries: AtomicUsize::new(0),
        })
    }

    /// Number of listing requests sent (retries included).
    pub fn queries_sent(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    fn fetch_listing(&self, key: &CoarseKey) -> Result<String, CatalogError> {
        let url = self.config.query_url(key);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let can_retry = attempt <= self.config.retries;
            self.queries.fetch_add(1, Ordering::Relaxed);
            debug!("catalog query {} (attempt {})", url, attempt);

            match self.client.get(&url).send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.text().map_err(|source| CatalogError::Request {
                            key: key.to_string(),
                            source,
                        });
                    }
                    if !(status.is_server_error() && can_retry) {
                        return Err(CatalogError::Status {
                            key: key.to_string(),
                            status: status.as_u16(),
                        });
                    }
                    warn!("catalog query for {} returned HTTP {}, retrying", key, status);
                }
                Err(source) => {
                    if !can_retry {
                        return Err(CatalogError::Request {
                            key: key.to_string(),
                            source,
                        });
                    }
                    warn!("catalog query for {} failed: {}, retrying", key, source);
                }
            }

            thread::sleep(Duration::from_millis(500 << (attempt - 1).min(6)));
        }
    }
}

impl Catalog for HttpCatalog {
    fn query(&self, key: &CoarseKey) -> Result<Vec<CatalogEntry>, CatalogError> {
        let body = self.fetch_listing(key)?;
        let entries = parse_listing(key, &body)?;
        debug!("catalog lists {} archives for {}", entries.len(), key);
        Ok(entries)
    }

    fn download_url(&self, guid: &str) -> String {
        self.config.download_url(guid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixedCatalog(HashMap<String, Vec<CatalogEntry>>);

    impl Catalog for FixedCatalog {
        fn query(&self, key: &CoarseKey) -> Result<Vec<CatalogEntry>, CatalogError> {
            Ok(self.0.get(key.as_str()).cloned().unwrap_or_default())
        }

        fn download_url(&self, guid: &str) -> String {
            format!("mem://{guid}")
        }
    }

    fn entry(pyramid: &str, guid: &str, file_name: &str) -> CatalogEntry {
        CatalogEntry {
            pyramid: pyramid.to_string(),
            guid: guid.to_string(),
            file_name: file_name.to_string(),
        }
    }

    fn ids(names: &[&str]) -> Vec<TileId> {
        names.iter().map(|n| TileId::parse(n).unwrap()).collect()
    }

    #[test]
    fn test_reduce_across_prefixes() {
        let tiles = ids(&["TQ28ne", "TQ28se", "TL42nw"]);
        let keys: Vec<String> = reduce(&tiles).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["TL42", "TQ28"]);
    }

    #[test]
    fn test_reduce_single_prefix() {
        let tiles = ids(&["TQ28ne", "TQ28se", "TQ28sw", "TQ28nw", "TQ28NE"]);
        assert_eq!(reduce(&tiles).len(), 1);
        assert!(reduce(&Vec::<TileId>::new()).is_empty());
    }

    #[test]
    fn test_parse_listing() {
        let key = TileId::parse("TQ28").unwrap().coarse_key();
        let body = r#"[
            {"pyramid": "LIDAR-DTM-1M-ENGLAND-EA", "guid": "abc", "fileName": "TQ28ne.zip", "year": 2017},
            {"pyramid": "LIDAR-DSM-1M-ENGLAND-EA", "guid": "def", "fileName": "TQ28ne_DSM.zip"}
        ]"#;
        let entries = parse_listing(&key, body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], entry("LIDAR-DTM-1M-ENGLAND-EA", "abc", "TQ28ne.zip"));
    }

    #[test]
    fn test_parse_listing_rejects_bad_body() {
        let key = TileId::parse("TQ28").unwrap().coarse_key();
        let err = parse_listing(&key, "<html>maintenance</html>").unwrap_err();
        assert!(matches!(err, CatalogError::Parse { ref key, .. } if key == "TQ28"));

        let err = parse_listing(&key, r#"[{"pyramid": "X"}]"#).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }

    #[test]
    fn test_list_products() {
        let mut listings = HashMap::new();
        listings.insert(
            "TQ28".to_string(),
            vec![
                entry("LIDAR-DTM-1M-ENGLAND-EA", "a", "TQ28ne.zip"),
                entry("LIDAR-DTM-1M-ENGLAND-EA", "b", "TQ28se.zip"),
                entry("LIDAR-DSM-2M-ENGLAND-EA", "c", "TQ28se.zip"),
            ],
        );
        let catalog = FixedCatalog(listings);
        let key = TileId::parse("TQ28").unwrap().coarse_key();
        let products: Vec<String> = list_products(&catalog, &key).unwrap().into_iter().collect();
        assert_eq!(products, ["LIDAR-DSM-2M-ENGLAND-EA", "LIDAR-DTM-1M-ENGLAND-EA"]);
    }
}
