//! Integration tests for the credential provider: stored tokens, refresh
//! against a mock token endpoint, and the loopback sign-in flow.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use media_backup::auth::{
    AuthError, AuthorizationFlow, ClientSecrets, Credential, CredentialProvider, LoopbackFlow,
    OAuthClient,
};
use serde_json::json;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credential(token_uri: &str, expires_in_secs: i64, refresh_token: Option<&str>) -> Credential {
    Credential {
        token: "old-access".to_string(),
        refresh_token: refresh_token.map(str::to_string),
        token_uri: token_uri.to_string(),
        client_id: "cid".to_string(),
        client_secret: "csecret".to_string(),
        scopes: vec!["scope-a".to_string()],
        expiry: Some(Utc::now() + Duration::seconds(expires_in_secs)),
    }
}

fn write_client_secrets(dir: &Path, token_uri: &str) -> std::path::PathBuf {
    let path = dir.join("credentials.json");
    let body = json!({
        "installed": {
            "client_id": "cid",
            "client_secret": "csecret",
            "auth_uri": "https://accounts.example.com/o/oauth2/auth",
            "token_uri": token_uri
        }
    });
    std::fs::write(&path, body.to_string()).expect("write client secrets");
    path
}

fn provider(dir: &Path) -> CredentialProvider {
    CredentialProvider::new(
        OAuthClient::new(reqwest::Client::new()),
        dir.join("token.json"),
        dir.join("credentials.json"),
    )
}

/// Flow double that hands out a fixed credential and counts invocations.
struct StaticFlow {
    calls: AtomicUsize,
}

#[async_trait]
impl AuthorizationFlow for StaticFlow {
    async fn authorize(
        &self,
        _oauth: &OAuthClient,
        secrets: &ClientSecrets,
        scopes: &[String],
    ) -> Result<Credential, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Credential {
            token: "interactive-access".to_string(),
            refresh_token: Some("interactive-refresh".to_string()),
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            scopes: scopes.to_vec(),
            expiry: Some(Utc::now() + Duration::hours(1)),
        })
    }
}

#[tokio::test]
async fn test_valid_token_is_used_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let token_uri = format!("{}/token", server.uri());
    credential(&token_uri, 3600, Some("r"))
        .save(&temp.path().join("token.json"))
        .await
        .unwrap();

    let credential = provider(temp.path()).obtain().await.unwrap();
    assert_eq!(credential.token, "old-access");
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=stored-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let token_file = temp.path().join("token.json");
    let token_uri = format!("{}/token", server.uri());
    credential(&token_uri, -10, Some("stored-refresh"))
        .save(&token_file)
        .await
        .unwrap();

    let refreshed = provider(temp.path()).obtain().await.unwrap();

    assert_eq!(refreshed.token, "new-access");
    assert_eq!(refreshed.refresh_token.as_deref(), Some("stored-refresh"));
    assert!(!refreshed.is_expired_at(Utc::now()));

    let on_disk = Credential::load(&token_file).await.unwrap().unwrap();
    assert_eq!(on_disk, refreshed);
}

#[tokio::test]
async fn test_rejected_refresh_is_fatal_and_leaves_artifact() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let token_file = temp.path().join("token.json");
    let token_uri = format!("{}/token", server.uri());
    let stored = credential(&token_uri, -10, Some("revoked"));
    stored.save(&token_file).await.unwrap();

    let flow = Arc::new(StaticFlow {
        calls: AtomicUsize::new(0),
    });
    let err = provider(temp.path())
        .with_flow(flow.clone())
        .obtain()
        .await
        .unwrap_err();

    match &err {
        AuthError::RefreshRejected { status, description } => {
            assert_eq!(*status, 400);
            assert!(description.contains("invalid_grant"));
        }
        other => panic!("expected RefreshRejected, got {other:?}"),
    }
    assert!(err.requires_reauthorization());
    assert_eq!(flow.calls.load(Ordering::SeqCst), 0, "must not fall back to sign-in");
    assert_eq!(Credential::load(&token_file).await.unwrap().unwrap(), stored);
}

#[tokio::test]
async fn test_token_endpoint_outage_is_not_a_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let token_uri = format!("{}/token", server.uri());
    credential(&token_uri, -10, Some("r"))
        .save(&temp.path().join("token.json"))
        .await
        .unwrap();

    let err = provider(temp.path()).obtain().await.unwrap_err();
    assert!(matches!(err, AuthError::TokenEndpoint { status: 503, .. }), "got {err:?}");
}

#[tokio::test]
async fn test_missing_token_non_interactive_requires_interaction() {
    let temp = TempDir::new().unwrap();
    let err = provider(temp.path())
        .non_interactive()
        .obtain()
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InteractionRequired { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_missing_token_runs_flow_and_saves_result() {
    let temp = TempDir::new().unwrap();
    write_client_secrets(temp.path(), "https://oauth.example.com/token");
    let flow = Arc::new(StaticFlow {
        calls: AtomicUsize::new(0),
    });

    let credential = provider(temp.path())
        .with_flow(flow.clone())
        .obtain()
        .await
        .unwrap();

    assert_eq!(flow.calls.load(Ordering::SeqCst), 1);
    assert_eq!(credential.token, "interactive-access");
    assert_eq!(credential.token_uri, "https://oauth.example.com/token");
    let on_disk = Credential::load(&temp.path().join("token.json"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(on_disk.token, "interactive-access");
}

#[tokio::test]
async fn test_expired_without_refresh_token_runs_flow() {
    let temp = TempDir::new().unwrap();
    write_client_secrets(temp.path(), "https://oauth.example.com/token");
    credential("https://oauth.example.com/token", -10, None)
        .save(&temp.path().join("token.json"))
        .await
        .unwrap();
    let flow = Arc::new(StaticFlow {
        calls: AtomicUsize::new(0),
    });

    let credential = provider(temp.path())
        .with_flow(flow.clone())
        .obtain()
        .await
        .unwrap();
    assert_eq!(flow.calls.load(Ordering::SeqCst), 1);
    assert_eq!(credential.token, "interactive-access");
}

#[tokio::test]
async fn test_reauthorize_ignores_valid_token() {
    let temp = TempDir::new().unwrap();
    write_client_secrets(temp.path(), "https://oauth.example.com/token");
    credential("https://oauth.example.com/token", 3600, Some("r"))
        .save(&temp.path().join("token.json"))
        .await
        .unwrap();
    let flow = Arc::new(StaticFlow {
        calls: AtomicUsize::new(0),
    });

    let credential = provider(temp.path())
        .with_flow(flow.clone())
        .force_reauthorize(true)
        .obtain()
        .await
        .unwrap();
    assert_eq!(flow.calls.load(Ordering::SeqCst), 1);
    assert_eq!(credential.token, "interactive-access");
}

#[tokio::test]
async fn test_missing_client_secrets_is_reported() {
    let temp = TempDir::new().unwrap();
    let flow = Arc::new(StaticFlow {
        calls: AtomicUsize::new(0),
    });
    let err = provider(temp.path()).with_flow(flow).obtain().await.unwrap_err();
    assert!(matches!(err, AuthError::Io { .. }), "got {err:?}");
}

/// Sends a raw browser-style GET to the loopback listener and returns the
/// response text.
async fn hit_redirect(redirect_uri: &str, query: &str) -> String {
    let url = Url::parse(redirect_uri).unwrap();
    let port = url.port().unwrap();
    let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .unwrap();
    let request = format!(
        "GET /?{query} HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

fn query_value(url: &Url, key: &str) -> String {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .unwrap()
}

#[tokio::test]
async fn test_loopback_flow_exchanges_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-access",
            "refresh_token": "fresh-refresh",
            "expires_in": 3600,
            "scope": "scope-x scope-y"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    write_client_secrets(temp.path(), &format!("{}/token", server.uri()));

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Url>();
    let flow = LoopbackFlow::with_presenter(Arc::new(move |url: &Url| {
        let _ = tx.send(url.clone());
    }));
    let provider = provider(temp.path()).with_flow(Arc::new(flow));
    let task = tokio::spawn(async move { provider.obtain().await });

    let consent = rx.recv().await.expect("consent URL presented");
    assert_eq!(query_value(&consent, "access_type"), "offline");
    let redirect_uri = query_value(&consent, "redirect_uri");
    let state = query_value(&consent, "state");

    // Stray requests are answered and ignored.
    let stray = hit_redirect(&redirect_uri, "ignored=1").await;
    assert!(stray.starts_with("HTTP/1.1 404"), "{stray}");

    let response = hit_redirect(&redirect_uri, &format!("code=auth-code-123&state={state}")).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");

    let credential = task.await.unwrap().unwrap();
    assert_eq!(credential.token, "fresh-access");
    assert_eq!(credential.refresh_token.as_deref(), Some("fresh-refresh"));
    assert_eq!(credential.scopes, vec!["scope-x", "scope-y"]);
    assert!(temp.path().join("token.json").exists());
}

#[tokio::test]
async fn test_loopback_flow_state_mismatch_is_rejected() {
    let temp = TempDir::new().unwrap();
    write_client_secrets(temp.path(), "http://127.0.0.1:9/token");

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Url>();
    let flow = LoopbackFlow::with_presenter(Arc::new(move |url: &Url| {
        let _ = tx.send(url.clone());
    }));
    let provider = provider(temp.path()).with_flow(Arc::new(flow));
    let task = tokio::spawn(async move { provider.obtain().await });

    let consent = rx.recv().await.expect("consent URL presented");
    let redirect_uri = query_value(&consent, "redirect_uri");
    let response = hit_redirect(&redirect_uri, "code=stolen&state=forged").await;
    assert!(response.starts_with("HTTP/1.1 400"), "{response}");

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, AuthError::Authorization(_)), "got {err:?}");
    assert!(!temp.path().join("token.json").exists());
}

#[tokio::test]
async fn test_loopback_flow_idle_preconnect_does_not_block_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "after-preconnect",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    write_client_secrets(temp.path(), &format!("{}/token", server.uri()));

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Url>();
    let flow = LoopbackFlow::with_presenter(Arc::new(move |url: &Url| {
        let _ = tx.send(url.clone());
    }));
    let provider = provider(temp.path()).with_flow(Arc::new(flow));
    let task = tokio::spawn(async move { provider.obtain().await });

    let consent = rx.recv().await.expect("consent URL presented");
    let redirect_uri = query_value(&consent, "redirect_uri");
    let state = query_value(&consent, "state");
    let port = Url::parse(&redirect_uri).unwrap().port().unwrap();

    // Browsers open speculative sockets that never send a request.
    let _idle = tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .unwrap();

    let response = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        hit_redirect(&redirect_uri, &format!("code=c&state={state}")),
    )
    .await
    .expect("redirect answered while another socket is idle");
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");

    let credential = tokio::time::timeout(std::time::Duration::from_secs(10), task)
        .await
        .expect("sign-in finishes with the idle socket still open")
        .unwrap()
        .unwrap();
    assert_eq!(credential.token, "after-preconnect");
}
