//! Errors returned by the remote catalog API.

use thiserror::Error;

/// A catalog request failed. The scan is aborted; nothing is retried.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status} listing {url}")]
    Status {
        /// The request URL (without credentials).
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// DNS, connect, TLS or body transfer failure.
    #[error("network error listing {url}: {source}")]
    Network {
        /// The request URL.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The body was not a valid listing response.
    #[error("malformed listing response from {url}: {source}")]
    Decode {
        /// The request URL.
        url: String,
        /// The JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The configured API base URL could not be turned into a request URL.
    #[error("invalid catalog URL: {url}")]
    InvalidUrl {
        /// The offending URL string.
        url: String,
    },
}

impl RemoteError {
    /// HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network { .. } | Self::Decode { .. } | Self::InvalidUrl { .. } => None,
        }
    }

    /// Whether the server rejected the access token.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_status_display() {
        let err = RemoteError::Status {
            url: "https://api.example.com/v1/mediaItems".to_string(),
            status: 503,
        };
        let msg = err.to_string();
        assert!(msg.contains("503"), "Expected status in: {msg}");
        assert!(msg.contains("mediaItems"), "Expected URL in: {msg}");
        assert_eq!(err.status(), Some(503));
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_remote_error_unauthorized() {
        let err = RemoteError::Status {
            url: "https://api.example.com".to_string(),
            status: 401,
        };
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_remote_error_decode_has_no_status() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = RemoteError::Decode {
            url: "https://api.example.com".to_string(),
            source,
        };
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("malformed"));
    }
}
