//! Bounded pool of download workers.
//!
//! At most `size` downloads run at once; submissions beyond that queue inside
//! the runtime without blocking the submitter.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::worker::{DownloadOutcome, DownloadWorker};
use crate::catalog::MediaItem;

/// Fixed-size pool executing [`DownloadWorker::process`] jobs.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    worker: Arc<DownloadWorker>,
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Creates a pool running at most `size` downloads concurrently.
    ///
    /// A `size` of 0 is treated as 1.
    #[must_use]
    pub fn new(size: usize, worker: Arc<DownloadWorker>) -> Self {
        let size = size.max(1);
        Self {
            worker,
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Maximum number of concurrent downloads.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of free worker slots right now.
    #[must_use]
    pub fn idle_workers(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Queues `item` for download and returns immediately.
    ///
    /// The returned handle resolves to the job's outcome once a worker slot
    /// frees up and the download finishes.
    pub fn submit(&self, item: MediaItem) -> JoinHandle<DownloadOutcome> {
        let worker = Arc::clone(&self.worker);
        let semaphore = Arc::clone(&self.semaphore);

        tokio::spawn(async move {
            // Only fails if the semaphore is closed, which this pool never does.
            let Ok(_permit) = semaphore.acquire_owned().await else {
                warn!(item_id = %item.id, "worker pool closed; dropping job");
                return DownloadOutcome::Failed {
                    item_id: item.id,
                    error: "worker pool closed".to_string(),
                };
            };
            debug!(item_id = %item.id, "worker slot acquired");
            worker.process(&item).await
        })
    }

    /// Awaits every handle and collects the outcomes.
    ///
    /// A panicked or cancelled job is logged and left out of the result.
    pub async fn join_all(handles: Vec<JoinHandle<DownloadOutcome>>) -> Vec<DownloadOutcome> {
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(error = %e, "download task failed to complete"),
            }
        }
        outcomes
    }
}
