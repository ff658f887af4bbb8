//! The paginate, filter, submit loop.

use std::collections::HashSet;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::error::DispatchError;
use super::throttle::{ThrottleAction, ThrottleLimits, ThrottleState};
use crate::catalog::{CatalogClient, MediaItem};
use crate::download::{DownloadOutcome, MediaScope, WorkerPool};
use crate::store::DownloadedItems;

/// Totals of one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Catalog pages fetched.
    pub pages: u64,
    /// Items handed to the worker pool.
    pub submitted: u64,
    /// Items saved and recorded.
    pub downloaded: u64,
    /// Items the worker skipped as outside the media scope.
    pub skipped: u64,
    /// Items whose download failed; they stay unrecorded.
    pub failed: u64,
    /// Whether dispatching stopped at the submission cap.
    pub cap_reached: bool,
}

impl RunSummary {
    fn tally(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded { .. } => self.downloaded += 1,
            DownloadOutcome::Skipped { .. } => self.skipped += 1,
            DownloadOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Drives one backup run from the first catalog page to the exit barrier.
#[derive(Debug)]
pub struct Dispatcher {
    catalog: CatalogClient,
    store: DownloadedItems,
    pool: WorkerPool,
    limits: ThrottleLimits,
    scope: MediaScope,
    count_archived_toward_cap: bool,
}

impl Dispatcher {
    #[must_use]
    pub fn new(catalog: CatalogClient, store: DownloadedItems, pool: WorkerPool) -> Self {
        Self {
            catalog,
            store,
            pool,
            limits: ThrottleLimits::default(),
            scope: MediaScope::All,
            count_archived_toward_cap: false,
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ThrottleLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Media kinds to submit; out-of-scope items are filtered before submission.
    #[must_use]
    pub fn with_scope(mut self, scope: MediaScope) -> Self {
        self.scope = scope;
        self
    }

    /// Seed the cap counter with the number of already-recorded items.
    #[must_use]
    pub fn count_archived_toward_cap(mut self, enabled: bool) -> Self {
        self.count_archived_toward_cap = enabled;
        self
    }

    /// Runs the loop until the last page or the cap, then waits for every
    /// submitted download.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Remote`] if a catalog page cannot be listed
    /// - [`DispatchError::Storage`] if the dedup store cannot be queried
    ///
    /// Downloads already submitted when an error occurs keep running to
    /// completion before the error is returned.
    #[instrument(skip(self), fields(scope = ?self.scope, workers = self.pool.size()))]
    pub async fn run(&self) -> Result<RunSummary, DispatchError> {
        let initial_total = if self.count_archived_toward_cap {
            self.store.count().await?
        } else {
            0
        };
        let mut throttle = ThrottleState::new(initial_total, Instant::now(), self.limits);
        let mut summary = RunSummary::default();
        let mut handles = Vec::new();

        let scan = self
            .scan(&mut throttle, &mut summary, &mut handles)
            .await;

        info!(submitted = summary.submitted, "waiting for in-flight downloads");
        for outcome in WorkerPool::join_all(handles).await {
            if let DownloadOutcome::Failed { error, .. } = &outcome {
                debug!(item_id = outcome.item_id(), %error, "left for a later run");
            }
            summary.tally(&outcome);
        }
        scan?;

        info!(
            pages = summary.pages,
            submitted = summary.submitted,
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            failed = summary.failed,
            cap_reached = summary.cap_reached,
            "run complete"
        );
        Ok(summary)
    }

    async fn scan(
        &self,
        throttle: &mut ThrottleState,
        summary: &mut RunSummary,
        handles: &mut Vec<JoinHandle<DownloadOutcome>>,
    ) -> Result<(), DispatchError> {
        if throttle.cap_reached() {
            warn!(total = throttle.total(), "submission cap already reached; nothing to do");
            summary.cap_reached = true;
            return Ok(());
        }

        let mut submitted_ids: HashSet<String> = HashSet::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.catalog.list_page(cursor.as_deref()).await?;
            summary.pages += 1;
            let listed = page.items.len();
            let is_last = page.is_last();
            let next = page.next_page_token;

            let pending = self.pending(page.items, &submitted_ids).await?;
            debug!(page = summary.pages, listed, pending = pending.len(), "page filtered");

            for item in pending {
                submitted_ids.insert(item.id.clone());
                handles.push(self.pool.submit(item));
                summary.submitted += 1;

                match throttle.record_submission(Instant::now()) {
                    ThrottleAction::Continue => {}
                    ThrottleAction::Pause(wait) => {
                        info!(
                            window_count = throttle.window_count(),
                            idle_workers = self.pool.idle_workers(),
                            wait_secs = wait.as_secs_f64(),
                            "submission window full; pausing"
                        );
                        tokio::time::sleep(wait).await;
                        throttle.start_new_window(Instant::now());
                    }
                    ThrottleAction::CapReached => {
                        warn!(total = throttle.total(), "submission cap reached; stopping");
                        summary.cap_reached = true;
                        return Ok(());
                    }
                }
            }

            if throttle.roll_day(Instant::now()) {
                debug!("day deadline passed; cap counter reset");
            }

            if is_last {
                debug!(pages = summary.pages, "last page reached");
                return Ok(());
            }
            cursor = next;
        }
    }

    /// Drops items already stored, already submitted this run, or outside
    /// the media scope.
    async fn pending(
        &self,
        items: Vec<MediaItem>,
        submitted: &HashSet<String>,
    ) -> Result<Vec<MediaItem>, DispatchError> {
        let mut pending = Vec::with_capacity(items.len());
        for item in items {
            if !self.scope.admits(item.kind()) || submitted.contains(&item.id) {
                continue;
            }
            if self.store.exists(&item.id).await? {
                debug!(item_id = %item.id, "already downloaded");
                continue;
            }
            pending.push(item);
        }
        Ok(pending)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_tally() {
        let mut summary = RunSummary::default();
        summary.tally(&DownloadOutcome::Downloaded {
            item_id: "a".to_string(),
            path: "x.jpg".into(),
            bytes: 3,
        });
        summary.tally(&DownloadOutcome::Skipped {
            item_id: "b".to_string(),
        });
        summary.tally(&DownloadOutcome::Failed {
            item_id: "c".to_string(),
            error: "HTTP 500".to_string(),
        });
        assert_eq!(
            summary,
            RunSummary {
                downloaded: 1,
                skipped: 1,
                failed: 1,
                ..RunSummary::default()
            }
        );
    }
}
