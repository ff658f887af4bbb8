//! Interactive sign-in: the installed-app loopback redirect flow.
//!
//! The user opens the consent URL in a browser; the provider redirects back to
//! a small axum server on `127.0.0.1` carrying the authorization code.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::credential::Credential;
use super::error::AuthError;
use super::oauth::OAuthClient;
use super::secrets::ClientSecrets;

const STATE_LEN: usize = 32;

/// How long the redirect server may take to finish answering after the
/// outcome is known. Idle browser connections are cut off after this.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const SUCCESS_PAGE: &str = "<html><body><h1>Authorization complete</h1>\
    <p>You can close this window and return to the terminal.</p></body></html>";

const FAILURE_PAGE: &str =
    "<html><body><h1>Authorization failed</h1><p>Check the terminal for details.</p></body></html>";

/// A way of obtaining a brand-new credential with user involvement.
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    /// Runs the flow to completion and returns the granted credential.
    async fn authorize(
        &self,
        oauth: &OAuthClient,
        secrets: &ClientSecrets,
        scopes: &[String],
    ) -> Result<Credential, AuthError>;
}

/// Receives the consent URL; the default logs it for the user to open.
pub type UrlPresenter = Arc<dyn Fn(&Url) + Send + Sync>;

/// Loopback redirect flow on an ephemeral local port.
#[derive(Clone)]
pub struct LoopbackFlow {
    presenter: UrlPresenter,
}

impl std::fmt::Debug for LoopbackFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackFlow").finish_non_exhaustive()
    }
}

impl Default for LoopbackFlow {
    fn default() -> Self {
        Self::with_presenter(Arc::new(|url: &Url| {
            info!("Open this URL in a browser to authorize access:");
            info!("{url}");
        }))
    }
}

impl LoopbackFlow {
    /// Uses `presenter` to hand the consent URL to the user.
    #[must_use]
    pub fn with_presenter(presenter: UrlPresenter) -> Self {
        Self { presenter }
    }
}

#[async_trait]
impl AuthorizationFlow for LoopbackFlow {
    #[instrument(skip_all)]
    async fn authorize(
        &self,
        oauth: &OAuthClient,
        secrets: &ClientSecrets,
        scopes: &[String],
    ) -> Result<Credential, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(AuthError::Listener)?;
        let port = listener.local_addr().map_err(AuthError::Listener)?.port();
        let redirect_uri = format!("http://127.0.0.1:{port}/");
        let state = random_state();

        let url = oauth.authorization_url(secrets, &redirect_uri, &state, scopes)?;
        debug!(port, "waiting for authorization redirect");
        (self.presenter)(&url);

        let code = receive_code(listener, state).await?;
        oauth
            .exchange_code(secrets, &code, &redirect_uri, scopes)
            .await
    }
}

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

/// Query parameters the provider may put on the redirect.
#[derive(Debug, Default, Deserialize)]
struct RedirectParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// What a single redirect request carried.
#[derive(Debug, PartialEq, Eq)]
enum Redirect {
    Code(String),
    Denied(String),
    StateMismatch,
    /// Not a redirect at all (health checks, bare reloads); keep listening.
    Unrelated,
}

fn classify(params: RedirectParams, expected_state: &str) -> Redirect {
    if params.code.is_none() && params.error.is_none() {
        return Redirect::Unrelated;
    }
    if params.state.as_deref() != Some(expected_state) {
        return Redirect::StateMismatch;
    }
    match (params.code, params.error) {
        (_, Some(error)) => Redirect::Denied(error),
        (Some(code), None) => Redirect::Code(code),
        (None, None) => Redirect::Unrelated,
    }
}

struct RedirectState {
    expected_state: String,
    outcome: Mutex<Option<oneshot::Sender<Redirect>>>,
}

async fn handle_redirect(
    State(shared): State<Arc<RedirectState>>,
    Query(params): Query<RedirectParams>,
) -> (StatusCode, Html<&'static str>) {
    let redirect = classify(params, &shared.expected_state);
    let (status, page) = match &redirect {
        Redirect::Unrelated => {
            debug!("ignoring non-redirect request");
            return (StatusCode::NOT_FOUND, Html(""));
        }
        Redirect::Code(_) => (StatusCode::OK, SUCCESS_PAGE),
        Redirect::Denied(_) => (StatusCode::OK, FAILURE_PAGE),
        Redirect::StateMismatch => (StatusCode::BAD_REQUEST, FAILURE_PAGE),
    };

    // Only the first real redirect decides the outcome.
    match shared.outcome.lock().await.take() {
        Some(tx) => {
            let _ = tx.send(redirect);
        }
        None => debug!("redirect arrived after the outcome was decided"),
    }
    (status, Html(page))
}

/// Serves `GET /` on `listener` until one redirect decides the outcome.
///
/// Connections are served concurrently, so an idle speculative socket from
/// the browser cannot hold up the real redirect.
async fn receive_code(listener: TcpListener, expected_state: String) -> Result<String, AuthError> {
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let shared = Arc::new(RedirectState {
        expected_state,
        outcome: Mutex::new(Some(outcome_tx)),
    });
    let app = Router::new()
        .route("/", get(handle_redirect))
        .with_state(shared);

    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    let outcome = tokio::select! {
        outcome = outcome_rx => outcome.ok(),
        finished = &mut server => {
            return Err(match finished {
                Ok(Err(e)) => AuthError::Listener(e),
                _ => AuthError::Authorization("redirect listener stopped unexpectedly".to_string()),
            });
        }
    };

    let _ = shutdown_tx.send(());
    if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
        debug!("closing lingering redirect connections");
        server.abort();
    }

    match outcome {
        Some(Redirect::Code(code)) => Ok(code),
        Some(Redirect::Denied(reason)) => {
            Err(AuthError::Authorization(format!("access denied: {reason}")))
        }
        Some(Redirect::StateMismatch) => Err(AuthError::Authorization(
            "redirect state did not match the request".to_string(),
        )),
        Some(Redirect::Unrelated) | None => {
            warn!("redirect listener closed without an outcome");
            Err(AuthError::Authorization(
                "no authorization redirect was received".to_string(),
            ))
        }
    }
}
