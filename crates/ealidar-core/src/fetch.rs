//! Concurrent archive fetcher.
//!
//! Runs a [`DownloadTask`] list on a dedicated rayon pool. Each task yields its
//! own `Result`, so one unavailable archive never stops the batch.
//!
//! ## Deduplication
//!
//! Tasks are independent except when two of them share a destination (the
//! plan builder emits one task per matching tile id). The first task for a
//! destination is fetched and the rest report [`FetchOutcome::Duplicate`].
//!
//! ## Partial files
//!
//! The body is streamed into `<destination>.part` and renamed once complete,
//! so an interrupted run never leaves a truncated archive under its final name.

use crate::config::FetchConfig;
use crate::plan::DownloadTask;
use crate::FetchError;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{info, warn};

/// What happened to a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The archive was downloaded.
    Downloaded {
        /// Final path.
        path: PathBuf,
        /// Bytes written.
        bytes: u64,
    },
    /// The destination already existed and was left alone.
    Existing {
        /// Final path.
        path: PathBuf,
    },
    /// An earlier task in the batch targets the same destination.
    Duplicate {
        /// Final path.
        path: PathBuf,
    },
}

impl FetchOutcome {
    /// Destination the outcome refers to.
    pub fn path(&self) -> &Path {
        match self {
            FetchOutcome::Downloaded { path, .. }
            | FetchOutcome::Existing { path }
            | FetchOutcome::Duplicate { path } => path,
        }
    }
}

/// Download statistics for the executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadStats {
    /// Number of archives downloaded this session.
    pub archives_downloaded: usize,
    /// Total bytes downloaded this session.
    pub bytes_downloaded: u64,
}

/// Per-batch tally of task results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Archives fetched.
    pub downloaded: usize,
    /// Destinations already present.
    pub existing: usize,
    /// Tasks sharing an earlier task's destination.
    pub duplicate: usize,
    /// Tasks that failed.
    pub failed: usize,
}

impl FetchSummary {
    /// Tally a result list returned by [`FetchExecutor::execute`].
    pub fn from_results(results: &[Result<FetchOutcome, FetchError>]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result {
                Ok(FetchOutcome::Downloaded { .. }) => summary.downloaded += 1,
                Ok(FetchOutcome::Existing { .. }) => summary.existing += 1,
                Ok(FetchOutcome::Duplicate { .. }) => summary.duplicate += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// True when no task failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Path the body is streamed to before the final rename.
pub fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Downloads task lists on a bounded worker pool.
pub struct FetchExecutor {
    client: reqwest::blocking::Client,
    pool: rayon::ThreadPool,
    skip_existing: bool,
    archives_downloaded: AtomicUsize,
    bytes_downloaded: AtomicU64,
}

impl std::fmt::Debug for FetchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchExecutor")
            .field("workers", &self.pool.current_num_threads())
            .field("skip_existing", &self.skip_existing)
            .finish()
    }
}

impl FetchExecutor {
    /// Create an executor. `workers == 0` uses one thread per CPU.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FetchError::Setup(e.to_string()))?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("ealidar-fetch-{i}"))
            .build()
            .map_err(|e| FetchError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            pool,
            skip_existing: config.skip_existing,
            archives_downloaded: AtomicUsize::new(0),
            bytes_downloaded: AtomicU64::new(0),
        })
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Get download statistics for this session.
    pub fn download_stats(&self) -> DownloadStats {
        DownloadStats {
            archives_downloaded: self.archives_downloaded.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
        }
    }

    /// Fetch every task. The result list is aligned with `tasks`.
    pub fn execute(&self, tasks: &[DownloadTask]) -> Vec<Result<FetchOutcome, FetchError>> {
        let mut seen = HashSet::new();
        let first: Vec<bool> = tasks
            .iter()
            .map(|task| seen.insert(task.destination.as_path()))
            .collect();

        let results: Vec<_> = self.pool.install(|| {
            tasks
                .par_iter()
                .zip(first.par_iter())
                .map(|(task, &first)| {
                    if !first {
                        return Ok(FetchOutcome::Duplicate {
                            path: task.destination.clone(),
                        });
                    }
                    self.fetch(task)
                })
                .collect()
        });

        let summary = FetchSummary::from_results(&results);
        info!(
            "fetch finished: {} downloaded, {} already present, {} duplicate, {} failed",
            summary.downloaded, summary.existing, summary.duplicate, summary.failed
        );
        results
    }

    /// Fetch a single task.
    pub fn fetch(&self, task: &DownloadTask) -> Result<FetchOutcome, FetchError> {
        if self.skip_existing && task.destination.exists() {
            info!("{} already present, skipping", task.destination.display());
            return Ok(FetchOutcome::Existing {
                path: task.destination.clone(),
            });
        }

        info!("Downloading from {}", task.url);
        match self.download(&task.url, &task.destination) {
            Ok(bytes) => {
                self.archives_downloaded.fetch_add(1, Ordering::Relaxed);
                self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
                info!("Download complete {} ({} bytes)", task.destination.display(), bytes);
                Ok(FetchOutcome::Downloaded {
                    path: task.destination.clone(),
                    bytes,
                })
            }
            Err(e) => {
                warn!("{}: {}", task.tile, e);
                Err(e)
            }
        }
    }

    fn download(&self, url: &str, destination: &Path) -> Result<u64, FetchError> {
        let mut response = self.client.get(url).send().map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let partial = part_path(destination);
        let written = fs::File::create(&partial)
            .and_then(|mut file| io::copy(&mut response, &mut file));
        let bytes = match written {
            Ok(bytes) => bytes,
            Err(source) => {
                let _ = fs::remove_file(&partial);
                return Err(FetchError::Io { path: partial, source });
            }
        };

        if let Err(source) = fs::rename(&partial, destination) {
            let _ = fs::remove_file(&partial);
            return Err(FetchError::Io {
                path: destination.to_path_buf(),
                source,
            });
        }

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_id::TileId;

    fn task(dir: &Path, tile: &str, file_name: &str, url: &str) -> DownloadTask {
        DownloadTask {
            tile: TileId::parse(tile).unwrap(),
            guid: "g".to_string(),
            url: url.to_string(),
            destination: dir.join(file_name),
        }
    }

    fn executor(workers: usize) -> FetchExecutor {
        FetchExecutor::new(&FetchConfig {
            workers,
            timeout_secs: 5,
            skip_existing: true,
        })
        .unwrap()
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/data/TQ28ne.zip")),
            PathBuf::from("/data/TQ28ne.zip.part")
        );
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(executor(3).workers(), 3);
        assert!(executor(0).workers() >= 1);
    }

    #[test]
    fn test_existing_and_duplicate_without_network() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("TQ28ne.zip"), b"zip").unwrap();

        let tasks = vec![
            task(dir.path(), "TQ28", "TQ28ne.zip", "http://127.0.0.1:9/a"),
            task(dir.path(), "TQ28ne", "TQ28ne.zip", "http://127.0.0.1:9/a"),
        ];
        let results = executor(2).execute(&tasks);

        assert!(matches!(results[0], Ok(FetchOutcome::Existing { .. })));
        assert!(matches!(results[1], Ok(FetchOutcome::Duplicate { .. })));
        assert_eq!(results[1].as_ref().unwrap().path(), dir.path().join("TQ28ne.zip"));
    }

    #[test]
    fn test_transport_failure_is_per_task() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("TQ28se.zip"), b"zip").unwrap();

        let tasks = vec![
            task(dir.path(), "TQ28ne", "TQ28ne.zip", "http://127.0.0.1:9/ne"),
            task(dir.path(), "TQ28se", "TQ28se.zip", "http://127.0.0.1:9/se"),
        ];
        let exec = executor(2);
        let results = exec.execute(&tasks);

        assert!(matches!(results[0], Err(FetchError::Request { .. })));
        assert!(results[1].is_ok());
        assert!(!dir.path().join("TQ28ne.zip").exists());
        assert!(!part_path(&dir.path().join("TQ28ne.zip")).exists());

        let summary = FetchSummary::from_results(&results);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.existing, 1);
        assert!(!summary.is_success());
        assert_eq!(exec.download_stats().archives_downloaded, 0);
    }
}
