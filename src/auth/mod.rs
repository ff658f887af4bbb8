//! OAuth credential management.
//!
//! This module loads the persisted token artifact, refreshes expired access
//! tokens, runs the interactive loopback sign-in when there is nothing to
//! refresh, and writes the result back to disk.

mod credential;
mod error;
mod flow;
mod oauth;
mod provider;
mod secrets;

pub use credential::{Credential, CredentialState, EXPIRY_SKEW_SECS};
pub use error::AuthError;
pub use flow::{AuthorizationFlow, LoopbackFlow, UrlPresenter};
pub use oauth::{OAuthClient, PHOTOS_READONLY_SCOPE};
pub use provider::{CredentialProvider, DEFAULT_CLIENT_SECRETS_FILE, DEFAULT_TOKEN_FILE};
pub use secrets::{ClientSecrets, DEFAULT_AUTH_URI, DEFAULT_TOKEN_URI};
