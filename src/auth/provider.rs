//! Credential provider: load → (refresh | authorize) → persist.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use super::credential::{Credential, CredentialState};
use super::error::AuthError;
use super::flow::{AuthorizationFlow, LoopbackFlow};
use super::oauth::{OAuthClient, PHOTOS_READONLY_SCOPE};
use super::secrets::ClientSecrets;

/// Default credential artifact path.
pub const DEFAULT_TOKEN_FILE: &str = "token.json";

/// Default OAuth client descriptor path.
pub const DEFAULT_CLIENT_SECRETS_FILE: &str = "credentials.json";

/// Produces a usable access token for the run.
///
/// Walks the `NoToken → Valid → Expired` states: a valid artifact is used
/// as is, an expired one is refreshed silently, and a missing one (or an
/// expired one without refresh token) triggers the interactive flow. Any new
/// token is written back to the artifact.
#[derive(Clone)]
pub struct CredentialProvider {
    oauth: OAuthClient,
    token_file: PathBuf,
    client_secrets_file: PathBuf,
    scopes: Vec<String>,
    flow: Option<Arc<dyn AuthorizationFlow>>,
    force_reauthorize: bool,
}

impl std::fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("token_file", &self.token_file)
            .field("client_secrets_file", &self.client_secrets_file)
            .field("scopes", &self.scopes)
            .field("interactive", &self.flow.is_some())
            .field("force_reauthorize", &self.force_reauthorize)
            .finish_non_exhaustive()
    }
}

impl CredentialProvider {
    /// Provider with the loopback flow and the read-only photos scope.
    #[must_use]
    pub fn new(
        oauth: OAuthClient,
        token_file: impl Into<PathBuf>,
        client_secrets_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            oauth,
            token_file: token_file.into(),
            client_secrets_file: client_secrets_file.into(),
            scopes: vec![PHOTOS_READONLY_SCOPE.to_string()],
            flow: Some(Arc::new(LoopbackFlow::default())),
            force_reauthorize: false,
        }
    }

    /// Replaces the interactive flow.
    #[must_use]
    pub fn with_flow(mut self, flow: Arc<dyn AuthorizationFlow>) -> Self {
        self.flow = Some(flow);
        self
    }

    /// Disables the interactive flow; a missing token becomes
    /// [`AuthError::InteractionRequired`].
    #[must_use]
    pub fn non_interactive(mut self) -> Self {
        self.flow = None;
        self
    }

    /// Ignores any stored token and signs in again.
    #[must_use]
    pub fn force_reauthorize(mut self, force: bool) -> Self {
        self.force_reauthorize = force;
        self
    }

    /// Returns a credential whose access token is currently valid.
    ///
    /// # Errors
    ///
    /// - [`AuthError::RefreshRejected`] if a stored refresh token was refused;
    ///   no sign-in is attempted in that case
    /// - [`AuthError::InteractionRequired`] if sign-in is needed but disabled
    /// - flow, token endpoint and IO errors otherwise
    #[instrument(skip(self), fields(token_file = %self.token_file.display()))]
    pub async fn obtain(&self) -> Result<Credential, AuthError> {
        let state = if self.force_reauthorize {
            CredentialState::NoToken
        } else {
            CredentialState::load(&self.token_file, Utc::now()).await
        };
        info!(state = state.as_str(), "credential state");

        let credential = match state {
            CredentialState::Valid(credential) => return Ok(credential),
            CredentialState::Expired(credential) if credential.can_refresh() => {
                info!("access token expired; refreshing");
                self.oauth.refresh(&credential).await?
            }
            CredentialState::Expired(_) => {
                warn!("access token expired and no refresh token stored; signing in again");
                self.authorize().await?
            }
            CredentialState::NoToken => self.authorize().await?,
        };

        credential.save(&self.token_file).await?;
        info!(path = %self.token_file.display(), "credential saved");
        Ok(credential)
    }

    async fn authorize(&self) -> Result<Credential, AuthError> {
        let Some(flow) = &self.flow else {
            return Err(AuthError::InteractionRequired {
                path: self.token_file.clone(),
            });
        };
        let secrets = ClientSecrets::load(&self.client_secrets_file).await?;
        flow.authorize(&self.oauth, &secrets, &self.scopes).await
    }
}
