//! OAuth client descriptor (`credentials.json`) as downloaded from the
//! provider's developer console.

use std::path::Path;

use serde::Deserialize;

use super::error::AuthError;

/// Authorization endpoint used when the descriptor does not name one.
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Token endpoint used when the descriptor does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Identity of the OAuth client this tool signs in as.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The descriptor nests the client under `installed` (desktop apps) or `web`.
#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parses a descriptor from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ClientSecrets`] if the JSON is invalid or has
    /// neither an `installed` nor a `web` section.
    pub fn from_json(path: &Path, json: &str) -> Result<Self, AuthError> {
        let file: SecretsFile =
            serde_json::from_str(json).map_err(|e| AuthError::client_secrets(path, e.to_string()))?;
        let secrets = file
            .installed
            .or(file.web)
            .ok_or_else(|| AuthError::client_secrets(path, "expected an `installed` or `web` section"))?;
        if secrets.client_id.trim().is_empty() {
            return Err(AuthError::client_secrets(path, "client_id is empty"));
        }
        Ok(secrets)
    }

    /// Reads and parses the descriptor at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Io`] if the file cannot be read, otherwise the
    /// errors of [`ClientSecrets::from_json`].
    pub async fn load(path: &Path) -> Result<Self, AuthError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AuthError::io(path, e))?;
        Self::from_json(path, &json)
    }
}
