//! One-shot localhost listener for the OAuth redirect.
//!
//! Only GET can complete the flow; HEAD is answered with 405 and ignored.
//! Requests whose `state` does not match are answered with 400 and ignored;
//! listening continues until a matching request delivers a code (or a provider
//! error), at which point the outcome is handed to the waiting flow once and
//! the listener is shut down.

use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::{net::TcpListener, sync::oneshot};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::AuthError;

pub const SUCCESS_MESSAGE: &str = "Authorization complete. You can close this window.";
const MISSING_CODE_MESSAGE: &str = "Missing authorization code";
const ALREADY_COMPLETED_MESSAGE: &str = "Authorization already completed";
const METHOD_NOT_ALLOWED_MESSAGE: &str = "Use GET to complete authorization";

/// How long in-flight responses get to finish once the code has arrived
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type Outcome = Result<String, AuthError>;

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<str>,
    sender: Arc<Mutex<Option<oneshot::Sender<Outcome>>>>,
}

pub struct CallbackServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl CallbackServer {
    /// Bind the redirect listener. No fallback port: the redirect URI registered
    /// with the provider points at this exact address.
    pub async fn bind(addr: &str) -> Result<Self, AuthError> {
        let bind_err = |source| AuthError::Bind {
            addr: addr.to_string(),
            source,
        };

        let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;
        debug!("OAuth redirect listener bound on {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve `/` until a request carrying `expected_state` arrives, then return
    /// its code. Blocks forever when `timeout` is `None` and no such request comes.
    pub async fn wait_for_code(
        self,
        expected_state: &str,
        timeout: Option<Duration>,
    ) -> Result<String, AuthError> {
        let (code_tx, code_rx) = oneshot::channel::<Outcome>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = router(CallbackState {
            expected_state: Arc::from(expected_state),
            sender: Arc::new(Mutex::new(Some(code_tx))),
        });

        let listener = self.listener;
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
        });

        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, code_rx).await {
                Ok(received) => received.unwrap_or_else(|_| Err(AuthError::CallbackClosed)),
                Err(_) => Err(AuthError::CallbackTimeout(limit)),
            },
            None => code_rx
                .await
                .unwrap_or_else(|_| Err(AuthError::CallbackClosed)),
        };

        // Release the port before the flow continues
        let _ = shutdown_tx.send(());
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
            Ok(Ok(Err(e))) => warn!("OAuth redirect listener exited with error: {}", e),
            Ok(_) => debug!("OAuth redirect listener closed"),
            Err(_) => {
                warn!("OAuth redirect listener did not drain in time, aborting");
                server.abort();
            }
        }

        outcome
    }
}

fn router(state: CallbackState) -> Router {
    Router::new()
        .route("/", get(callback_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /?state=...&code=...
async fn callback_handler(
    method: Method,
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, String) {
    // The `get` route also answers HEAD, which must not consume the hand-off
    if method != Method::GET {
        debug!("Ignored {} request on the OAuth redirect listener", method);
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            METHOD_NOT_ALLOWED_MESSAGE.to_string(),
        );
    }

    if params.state.as_deref() != Some(state.expected_state.as_ref()) {
        warn!("Rejected OAuth redirect with mismatched state");
        return (StatusCode::BAD_REQUEST, AuthError::StateMismatch.to_string());
    }

    let code = params.code.filter(|c| !c.is_empty());
    let (outcome, status, body) = match (code, params.error) {
        (_, Some(error)) => {
            let body = format!("Authorization failed: {}", error);
            let outcome = Err(AuthError::Provider {
                error,
                description: params.error_description,
            });
            (outcome, StatusCode::BAD_REQUEST, body)
        }
        (Some(code), None) => (Ok(code), StatusCode::OK, SUCCESS_MESSAGE.to_string()),
        (None, None) => {
            warn!("OAuth redirect carried no code");
            return (StatusCode::BAD_REQUEST, MISSING_CODE_MESSAGE.to_string());
        }
    };

    let sender = state
        .sender
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();

    let Some(sender) = sender else {
        return (StatusCode::CONFLICT, ALREADY_COMPLETED_MESSAGE.to_string());
    };

    if sender.send(outcome).is_err() {
        debug!("OAuth flow stopped waiting before the redirect arrived");
    } else {
        info!("OAuth redirect received");
    }

    (status, body)
}
