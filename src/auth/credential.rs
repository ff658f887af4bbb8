//! The persisted access/refresh token and its lifecycle state.
//!
//! The artifact uses the same JSON field names as the "authorized user" token
//! files written by the common OAuth client libraries, so an existing
//! `token.json` keeps working.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::AuthError;

/// A token is treated as expired this long before its actual expiry, so it
/// does not lapse between the check and the first request.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// OAuth credential as stored on disk.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer access token.
    pub token: String,
    /// Long-lived refresh token, if the grant issued one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Endpoint the refresh request goes to.
    pub token_uri: String,
    /// OAuth client the token was issued to.
    pub client_id: String,
    /// Secret of that client.
    pub client_secret: String,
    /// Scopes granted.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Access token expiry (UTC). Absent means "never checked".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl Credential {
    /// Whether the access token is unusable at `now` (including the skew).
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry <= now + Duration::seconds(EXPIRY_SKEW_SECS),
            None => false,
        }
    }

    /// Whether this credential can be refreshed without user interaction.
    #[must_use]
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Reads the artifact at `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Io`] on read failures and
    /// [`AuthError::MalformedResponse`] when the JSON does not parse.
    pub async fn load(path: &Path) -> Result<Option<Self>, AuthError> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::io(path, e)),
        };
        let credential = serde_json::from_str(&contents).map_err(|e| {
            AuthError::MalformedResponse(format!("{}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "loaded credential artifact");
        Ok(Some(credential))
    }

    /// Writes the artifact to `path`, replacing any previous one.
    ///
    /// Written to a sibling temporary file, then renamed into place.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Io`] if the directory or file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<(), AuthError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AuthError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| AuthError::io(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| AuthError::io(path, e))?;

        debug!(path = %path.display(), "saved credential artifact");
        Ok(())
    }
}

/// Where the credential stands before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    /// No artifact, or one that could not be read.
    NoToken,
    /// Token usable as is.
    Valid(Credential),
    /// Token past its expiry.
    Expired(Credential),
}

impl CredentialState {
    /// Classifies a loaded credential at time `now`.
    #[must_use]
    pub fn classify(credential: Option<Credential>, now: DateTime<Utc>) -> Self {
        match credential {
            None => Self::NoToken,
            Some(c) if c.token.is_empty() || c.is_expired_at(now) => Self::Expired(c),
            Some(c) => Self::Valid(c),
        }
    }

    /// Loads the artifact at `path` and classifies it. An unreadable or
    /// corrupt artifact is logged and treated as [`CredentialState::NoToken`].
    pub async fn load(path: &Path, now: DateTime<Utc>) -> Self {
        match Credential::load(path).await {
            Ok(credential) => Self::classify(credential, now),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unusable credential artifact");
                Self::NoToken
            }
        }
    }

    /// Stable lowercase label for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoToken => "no_token",
            Self::Valid(_) => "valid",
            Self::Expired(_) => "expired",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn sample(expiry: Option<DateTime<Utc>>) -> Credential {
        Credential {
            token: "ya29.access".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            token_uri: "https://oauth2.example.com/token".to_string(),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/photoslibrary.readonly".to_string()],
            expiry,
        }
    }

    #[test]
    fn test_expiry_respects_skew() {
        let now = Utc::now();
        assert!(sample(Some(now - Duration::seconds(1))).is_expired_at(now));
        assert!(sample(Some(now + Duration::seconds(30))).is_expired_at(now));
        assert!(!sample(Some(now + Duration::seconds(600))).is_expired_at(now));
        assert!(!sample(None).is_expired_at(now));
    }

    #[test]
    fn test_classify_states() {
        let now = Utc::now();
        assert_eq!(CredentialState::classify(None, now), CredentialState::NoToken);

        let valid = sample(Some(now + Duration::hours(1)));
        assert_eq!(
            CredentialState::classify(Some(valid.clone()), now),
            CredentialState::Valid(valid)
        );

        let expired = sample(Some(now - Duration::hours(1)));
        assert_eq!(
            CredentialState::classify(Some(expired.clone()), now).as_str(),
            "expired"
        );
    }

    #[test]
    fn test_classify_empty_token_is_expired() {
        let mut c = sample(None);
        c.token.clear();
        assert_eq!(CredentialState::classify(Some(c), Utc::now()).as_str(), "expired");
    }

    #[test]
    fn test_can_refresh_requires_non_empty_refresh_token() {
        let mut c = sample(None);
        assert!(c.can_refresh());
        c.refresh_token = Some(String::new());
        assert!(!c.can_refresh());
        c.refresh_token = None;
        assert!(!c.can_refresh());
    }

    #[test]
    fn test_parses_authorized_user_artifact() {
        let json = r#"{
            "token": "ya29.a0",
            "refresh_token": "1//0g",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "123.apps.googleusercontent.com",
            "client_secret": "GOCSPX-x",
            "scopes": ["https://www.googleapis.com/auth/photoslibrary.readonly"],
            "universe_domain": "googleapis.com",
            "account": "",
            "expiry": "2024-06-01T12:00:00.123456Z"
        }"#;
        let c: Credential = serde_json::from_str(json).unwrap();
        assert_eq!(c.token, "ya29.a0");
        assert_eq!(c.refresh_token.as_deref(), Some("1//0g"));
        assert_eq!(
            c.expiry.unwrap().to_rfc3339(),
            "2024-06-01T12:00:00.123456+00:00"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", sample(None));
        assert!(!rendered.contains("ya29.access"));
        assert!(!rendered.contains("1//refresh"));
    }

    #[tokio::test]
    async fn test_save_then_load_preserves_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("token.json");
        let credential = sample(Some(Utc::now() + Duration::hours(1)));

        credential.save(&path).await.unwrap();
        let loaded = Credential::load(&path).await.unwrap().unwrap();

        assert_eq!(loaded, credential);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = Credential::load(&temp_dir.path().join("absent.json"))
            .await
            .unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_state_load_corrupt_artifact_is_no_token() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token.json");
        std::fs::write(&path, b"{not json").unwrap();

        let state = CredentialState::load(&path, Utc::now()).await;
        assert_eq!(state, CredentialState::NoToken);
    }
}
