// OAuth login: local redirect listener, code exchange and token cache

pub mod callback_server;
pub mod client;
pub mod client_secrets;
pub mod flow;
pub mod google_oauth;
pub mod token_store;

pub use callback_server::CallbackServer;
pub use client::AuthenticatedClient;
pub use client_secrets::ClientSecrets;
pub use flow::OAuthFlow;
pub use google_oauth::{AuthorizationRequest, GoogleOAuth};
pub use token_store::TokenStore;

use std::{io, path::PathBuf, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Unable to read client secret file {path}: {source}")]
    ReadCredentials {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to parse client secret file: {0}")]
    InvalidCredentials(String),

    #[error("Invalid OAuth endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Unable to start local server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("State does not match")]
    StateMismatch,

    #[error("Authorization denied by provider: {error}{}", detail(.description))]
    Provider {
        error: String,
        description: Option<String>,
    },

    #[error("Timed out after {0:?} waiting for the OAuth redirect")]
    CallbackTimeout(Duration),

    #[error("OAuth redirect listener stopped before a code was received")]
    CallbackClosed,

    #[error("Unable to exchange code for token: {0}")]
    Exchange(String),

    #[error("Home directory not found")]
    NoHomeDir,

    #[error("Unable to cache oauth token at {path}: {source}")]
    TokenStore {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Token cache is not valid JSON: {0}")]
    TokenFormat(#[from] serde_json::Error),

    #[error("Access token cannot be used as a header value")]
    InvalidToken,

    #[error("Unable to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

fn detail(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default()
}
