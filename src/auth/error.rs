//! Error types for credential loading, refresh and authorization.

use std::path::PathBuf;

use thiserror::Error;

/// Authentication failures. All of them abort the run.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The OAuth client descriptor could not be read or understood.
    #[error("invalid client secrets file {path}: {reason}")]
    ClientSecrets {
        /// Path of the descriptor.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Reading or writing a credential-related file failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The token endpoint refused the refresh token (revoked, expired, or
    /// issued to another client). The interactive flow has to be run again.
    #[error(
        "token refresh rejected (HTTP {status}): {description}\n  Suggestion: re-run with --reauthorize to sign in again"
    )]
    RefreshRejected {
        /// HTTP status returned by the token endpoint.
        status: u16,
        /// OAuth error code and description, when the server sent one.
        description: String,
    },

    /// The token endpoint failed for a reason other than a rejected grant.
    #[error("token endpoint returned HTTP {status}: {body}")]
    TokenEndpoint {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// Transport failure talking to the token endpoint.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// The endpoint URL.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The token endpoint returned something that is not a token response.
    #[error("malformed token response: {0}")]
    MalformedResponse(String),

    /// No usable token and interactive sign-in is disabled.
    #[error(
        "no valid credential in {path} and interactive authorization is disabled\n  Suggestion: run once without --no-interactive to sign in"
    )]
    InteractionRequired {
        /// Credential artifact path that was checked.
        path: PathBuf,
    },

    /// The user denied access, or the redirect was not the one we asked for.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// Failed to bind or serve the loopback redirect listener.
    #[error("loopback redirect listener failed: {0}")]
    Listener(#[source] std::io::Error),
}

impl AuthError {
    /// Creates an IO error with file context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a client secrets error.
    pub fn client_secrets(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ClientSecrets {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether recovering requires the user to sign in again.
    #[must_use]
    pub fn requires_reauthorization(&self) -> bool {
        matches!(
            self,
            Self::RefreshRejected { .. } | Self::InteractionRequired { .. }
        )
    }
}
