//! Errors that abort a dispatch run.

use thiserror::Error;

use crate::catalog::RemoteError;
use crate::store::StorageError;

/// A fatal failure of the paginate-filter-submit loop.
///
/// Individual download failures are not errors here; they are reported as
/// outcomes in the run summary.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Listing a catalog page failed; the scan stops.
    #[error("catalog scan aborted: {0}")]
    Remote(#[from] RemoteError),

    /// The dedup store could not be queried.
    #[error("dedup store unavailable: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StorageErrorKind;

    #[test]
    fn test_remote_error_converts() {
        let err: DispatchError = RemoteError::Status {
            url: "https://photos.example.com/v1/mediaItems".to_string(),
            status: 503,
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("catalog scan aborted"), "{msg}");
        assert!(msg.contains("503"), "{msg}");
    }

    #[test]
    fn test_storage_error_converts() {
        let err: DispatchError = StorageError {
            kind: StorageErrorKind::PoolClosed,
            message: "closed".to_string(),
        }
        .into();
        assert!(matches!(err, DispatchError::Storage(_)));
    }
}
