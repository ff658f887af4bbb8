//! Token endpoint calls: authorization-code exchange and refresh.

use chrono::{Duration, Utc};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use super::credential::Credential;
use super::error::AuthError;
use super::secrets::ClientSecrets;

/// Scope granting read-only access to the photo library.
pub const PHOTOS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/photoslibrary.readonly";

/// Longest error body kept in [`AuthError::TokenEndpoint`].
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenErrorResponse {
    fn describe(&self) -> String {
        match (&self.error, &self.error_description) {
            (Some(code), Some(desc)) => format!("{code}: {desc}"),
            (Some(code), None) => code.clone(),
            (None, Some(desc)) => desc.clone(),
            (None, None) => "no error description".to_string(),
        }
    }
}

/// Thin client for the OAuth 2.0 authorization and token endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: Client,
}

impl OAuthClient {
    #[must_use]
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Builds the consent URL the user opens in a browser.
    ///
    /// Requests offline access with a forced consent prompt so the grant
    /// always carries a refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ClientSecrets`] if `auth_uri` is not a valid URL.
    pub fn authorization_url(
        &self,
        secrets: &ClientSecrets,
        redirect_uri: &str,
        state: &str,
        scopes: &[String],
    ) -> Result<Url, AuthError> {
        let mut url = Url::parse(&secrets.auth_uri).map_err(|e| {
            AuthError::client_secrets("auth_uri", format!("{}: {e}", secrets.auth_uri))
        })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &secrets.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &scopes.join(" "))
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        Ok(url)
    }

    /// Exchanges an authorization code for a fresh credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenEndpoint`] / [`AuthError::Authorization`]
    /// when the endpoint refuses the code, [`AuthError::Network`] on
    /// transport failure.
    #[instrument(skip(self, secrets, code), fields(token_uri = %secrets.token_uri))]
    pub async fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        code: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<Credential, AuthError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "authorization_code")
            .append_pair("code", code)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("client_id", &secrets.client_id)
            .append_pair("client_secret", &secrets.client_secret)
            .finish();

        let token = match self.post_form(&secrets.token_uri, body).await? {
            Ok(token) => token,
            Err((status, error)) if (400..500).contains(&status) => {
                return Err(AuthError::Authorization(format!(
                    "code exchange rejected (HTTP {status}): {}",
                    error.describe()
                )));
            }
            Err((status, error)) => {
                return Err(AuthError::TokenEndpoint {
                    status,
                    body: error.describe(),
                });
            }
        };

        info!("authorization code exchanged for credential");
        Ok(Credential {
            token: token.access_token,
            refresh_token: token.refresh_token,
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            scopes: token
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_else(|| scopes.to_vec()),
            expiry: token
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }

    /// Refreshes `credential` without user interaction.
    ///
    /// The refresh token is carried over when the response does not rotate it.
    ///
    /// # Errors
    ///
    /// - [`AuthError::RefreshRejected`] if there is no refresh token or the
    ///   endpoint answers 4xx (revoked or expired grant)
    /// - [`AuthError::TokenEndpoint`] on 5xx
    /// - [`AuthError::Network`] on transport failure
    #[instrument(skip(self, credential), fields(token_uri = %credential.token_uri))]
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError> {
        let Some(refresh_token) = credential.refresh_token.as_deref().filter(|t| !t.is_empty())
        else {
            return Err(AuthError::RefreshRejected {
                status: 0,
                description: "credential has no refresh token".to_string(),
            });
        };

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "refresh_token")
            .append_pair("refresh_token", refresh_token)
            .append_pair("client_id", &credential.client_id)
            .append_pair("client_secret", &credential.client_secret)
            .finish();

        let token = match self.post_form(&credential.token_uri, body).await? {
            Ok(token) => token,
            Err((status, error)) if (400..500).contains(&status) => {
                return Err(AuthError::RefreshRejected {
                    status,
                    description: error.describe(),
                });
            }
            Err((status, error)) => {
                return Err(AuthError::TokenEndpoint {
                    status,
                    body: error.describe(),
                });
            }
        };

        debug!(rotated = token.refresh_token.is_some(), "access token refreshed");
        let mut refreshed = credential.clone();
        refreshed.token = token.access_token;
        if let Some(rotated) = token.refresh_token {
            refreshed.refresh_token = Some(rotated);
        }
        if let Some(scope) = token.scope {
            refreshed.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
        refreshed.expiry = token
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        Ok(refreshed)
    }

    /// POSTs a form body. The outer `Result` is transport/decoding; the inner
    /// one separates a token from an endpoint error response.
    async fn post_form(
        &self,
        token_uri: &str,
        body: String,
    ) -> Result<Result<TokenResponse, (u16, TokenErrorResponse)>, AuthError> {
        let response = self
            .http
            .post(token_uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|source| AuthError::Network {
                url: token_uri.to_string(),
                source,
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| AuthError::Network {
            url: token_uri.to_string(),
            source,
        })?;

        if status.is_success() {
            let token = serde_json::from_str::<TokenResponse>(&text)
                .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
            return Ok(Ok(token));
        }

        let error = serde_json::from_str::<TokenErrorResponse>(&text).unwrap_or_else(|_| {
            TokenErrorResponse {
                error: None,
                error_description: Some(text.chars().take(MAX_ERROR_BODY_CHARS).collect()),
            }
        });
        Ok(Err((status.as_u16(), error)))
    }
}
