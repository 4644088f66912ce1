/// Interactive login: redirect listener -> browser consent -> code exchange -> token cache
use std::time::Duration;
use tracing::{info, warn};

use super::{
    AuthError, AuthenticatedClient, CallbackServer, ClientSecrets, GoogleOAuth, TokenStore,
};
use crate::config::OAuthConfig;

pub struct OAuthFlow {
    oauth: GoogleOAuth,
    store: TokenStore,
    state: Option<String>,
    open_browser: bool,
    callback_timeout: Option<Duration>,
}

impl OAuthFlow {
    pub fn new(oauth: GoogleOAuth, store: TokenStore) -> Self {
        Self {
            oauth,
            store,
            state: None,
            open_browser: false,
            callback_timeout: None,
        }
    }

    /// Read the client secret file and token location named by the config
    pub fn from_config(config: &OAuthConfig) -> Result<Self, AuthError> {
        let secrets = ClientSecrets::from_file(&config.credentials_file)?;
        let oauth = GoogleOAuth::new(&secrets, &config.redirect_uri, config.scopes.clone())?;
        let store = TokenStore::from_config(config)?;

        let mut flow = Self::new(oauth, store)
            .with_open_browser(config.open_browser)
            .with_callback_timeout(config.callback_timeout_secs.map(Duration::from_secs));
        flow.state = config.state.clone();
        Ok(flow)
    }

    /// Use a fixed state instead of a random one
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_open_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.callback_timeout = timeout;
        self
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Bind the redirect listener on `bind` and run the whole login
    pub async fn acquire_client(&self, bind: &str) -> Result<AuthenticatedClient, AuthError> {
        let server = CallbackServer::bind(bind).await?;
        self.complete(server).await
    }

    /// Run the login against an already bound listener
    pub async fn complete(&self, server: CallbackServer) -> Result<AuthenticatedClient, AuthError> {
        let state = self.state.clone().unwrap_or_else(GoogleOAuth::generate_state);
        let request = self.oauth.build_auth_url(&state);

        println!("Open the following URL in the browser:\n{}\n", request.url);
        if self.open_browser {
            if let Err(e) = opener::open(request.url.as_str()) {
                warn!("Could not open browser: {}", e);
            }
        }

        info!("Waiting for OAuth redirect on {}", server.local_addr());
        let code = server
            .wait_for_code(&request.state, self.callback_timeout)
            .await?;

        let token = self.oauth.exchange_code(&code).await?;

        self.store.save(&token)?;
        println!("Token saved to {}", self.store.path().display());

        AuthenticatedClient::new(token)
    }
}
