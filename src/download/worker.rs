//! Single-item download: pick a directory, resolve a free name, stream the
//! bytes, record the id.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use super::error::DownloadError;
use super::filename::create_unique_file;
use super::policy::{FailurePolicy, MediaScope};
use crate::catalog::{MediaItem, MediaKind};
use crate::store::DownloadedItems;

/// Output directories, one per media kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirs {
    pub photos: PathBuf,
    pub videos: PathBuf,
}

impl OutputDirs {
    #[must_use]
    pub fn new(photos: impl Into<PathBuf>, videos: impl Into<PathBuf>) -> Self {
        Self {
            photos: photos.into(),
            videos: videos.into(),
        }
    }

    /// Directory for items of `kind`.
    #[must_use]
    pub fn for_kind(&self, kind: MediaKind) -> &Path {
        match kind {
            MediaKind::Photo => &self.photos,
            MediaKind::Video => &self.videos,
        }
    }

    /// Creates the directories needed by `scope` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] if a directory cannot be created.
    pub async fn ensure_exist(&self, scope: MediaScope) -> Result<(), DownloadError> {
        let mut dirs = vec![&self.videos];
        if scope.admits(MediaKind::Photo) {
            dirs.push(&self.photos);
        }
        for dir in dirs {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| DownloadError::io(dir.clone(), e))?;
        }
        Ok(())
    }
}

/// Result of one submitted download job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Bytes saved and id recorded.
    Downloaded {
        item_id: String,
        path: PathBuf,
        bytes: u64,
    },
    /// Item outside the run's media scope; nothing fetched.
    Skipped { item_id: String },
    /// Fetch or record failed; the item stays unrecorded.
    Failed { item_id: String, error: String },
}

impl DownloadOutcome {
    /// Remote id of the item this outcome belongs to.
    #[must_use]
    pub fn item_id(&self) -> &str {
        match self {
            Self::Downloaded { item_id, .. }
            | Self::Skipped { item_id }
            | Self::Failed { item_id, .. } => item_id,
        }
    }
}

/// Downloads single media items and records them in the dedup store.
#[derive(Debug, Clone)]
pub struct DownloadWorker {
    http: Client,
    store: DownloadedItems,
    dirs: OutputDirs,
    scope: MediaScope,
    failure_policy: FailurePolicy,
    url_suffix: Option<String>,
}

impl DownloadWorker {
    #[must_use]
    pub fn new(http: Client, store: DownloadedItems, dirs: OutputDirs) -> Self {
        Self {
            http,
            store,
            dirs,
            scope: MediaScope::All,
            failure_policy: FailurePolicy::RetryLater,
            url_suffix: None,
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: MediaScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Suffix appended to every `baseUrl` (e.g. `=d` for full resolution).
    #[must_use]
    pub fn with_url_suffix(mut self, suffix: Option<String>) -> Self {
        self.url_suffix = suffix.filter(|s| !s.is_empty());
        self
    }

    /// The URL actually requested for `item`.
    #[must_use]
    pub fn download_url(&self, item: &MediaItem) -> String {
        match &self.url_suffix {
            Some(suffix) => format!("{}{suffix}", item.base_url),
            None => item.base_url.clone(),
        }
    }

    /// Downloads `item` and applies the failure policy. Never errors: the
    /// outcome says what happened.
    #[instrument(skip(self, item), fields(item_id = %item.id, filename = %item.filename))]
    pub async fn process(&self, item: &MediaItem) -> DownloadOutcome {
        let kind = item.kind();
        if !self.scope.admits(kind) {
            debug!(kind = kind.as_str(), "item outside media scope; skipping");
            return DownloadOutcome::Skipped {
                item_id: item.id.clone(),
            };
        }

        match self.fetch(item).await {
            Ok((path, bytes)) => DownloadOutcome::Downloaded {
                item_id: item.id.clone(),
                path,
                bytes,
            },
            Err(error) => {
                self.handle_failure(&error).await;
                DownloadOutcome::Failed {
                    item_id: item.id.clone(),
                    error: error.to_string(),
                }
            }
        }
    }

    /// Fetches `item` into its directory and records it.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] on transport, status, IO or record failure.
    pub async fn fetch(&self, item: &MediaItem) -> Result<(PathBuf, u64), DownloadError> {
        let dir = self.dirs.for_kind(item.kind());
        // Claim the name before the request so same-named items in flight
        // cannot pick it too.
        let (path, mut file) = create_unique_file(dir, &item.filename)
            .await
            .map_err(|e| DownloadError::io(dir.to_path_buf(), e))?;
        let url = self.download_url(item);
        debug!(path = %path.display(), "downloading");

        let response = match self.request(&url).await {
            Ok(response) => response,
            Err(error) => {
                drop(file);
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    debug!(path = %path.display(), error = %e, "failed to release claimed name");
                }
                return Err(error);
            }
        };
        let bytes = stream_to_file(&mut file, response, &url, &path).await?;

        self.store
            .record(&item.id)
            .await
            .map_err(|e| DownloadError::record(&item.id, &path, e))?;

        info!(path = %path.display(), bytes, "saved");
        Ok((path, bytes))
    }

    async fn request(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }

    async fn handle_failure(&self, error: &DownloadError) {
        match self.failure_policy {
            FailurePolicy::RetryLater => {
                warn!(error = %error, "download failed; item left for a later run");
                if let Some(path) = error.partial_file()
                    && tokio::fs::metadata(path)
                        .await
                        .is_ok_and(|meta| meta.is_file())
                {
                    debug!(path = %path.display(), "removing partial file");
                    let _ = tokio::fs::remove_file(path).await;
                }
            }
            FailurePolicy::DropSilently => {
                debug!(error = %error, "download failed; dropped");
            }
        }
    }
}

/// Streams the response body to `file` and returns the byte count.
///
/// Transfer errors mid-body are reported as [`DownloadError::Io`] on `file_path`
/// so the caller knows a partial file exists.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| {
            DownloadError::io(
                file_path.to_path_buf(),
                std::io::Error::other(format!("body transfer from {url} failed: {e}")),
            )
        })?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}
