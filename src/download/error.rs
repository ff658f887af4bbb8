//! Error types for the download module.
//!
//! This module defines structured errors for single-item downloads,
//! providing context-rich error messages for logs.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::StorageError;

/// Errors that can occur while fetching one media item.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error during download (create file, write, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file was written but the item could not be recorded as done.
    #[error("downloaded {path} but failed to record item {item_id}: {source}")]
    Record {
        /// Remote item id.
        item_id: String,
        /// File that was written.
        path: PathBuf,
        /// The store failure.
        #[source]
        source: StorageError,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a record-after-download error.
    pub fn record(item_id: impl Into<String>, path: impl Into<PathBuf>, source: StorageError) -> Self {
        Self::Record {
            item_id: item_id.into(),
            path: path.into(),
            source,
        }
    }

    /// Path of a file this failure may have left behind, if any.
    ///
    /// A [`DownloadError::Record`] file is complete, so it is not reported.
    #[must_use]
    pub fn partial_file(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Network { .. } | Self::HttpStatus { .. } | Self::Record { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StorageErrorKind;

    #[test]
    fn test_download_error_http_status_display() {
        let error = DownloadError::http_status("https://lh3.example.com/abc=d", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("lh3.example.com"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_download_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = DownloadError::io(PathBuf::from("/tmp/photo.jpg"), io_error);
        let msg = error.to_string();
        assert!(msg.contains("/tmp/photo.jpg"), "Expected path in: {msg}");
        assert_eq!(error.partial_file(), Some(&PathBuf::from("/tmp/photo.jpg")));
    }

    #[test]
    fn test_download_error_record_display() {
        let error = DownloadError::record(
            "AF1",
            "/tmp/photo.jpg",
            StorageError {
                kind: StorageErrorKind::PoolClosed,
                message: "pool closed".to_string(),
            },
        );
        let msg = error.to_string();
        assert!(msg.contains("AF1"));
        assert!(msg.contains("pool_closed"));
        assert_eq!(error.partial_file(), None);
    }
}
