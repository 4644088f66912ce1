/// Google OAuth2 authorization code flow (installed-app client, loopback redirect)
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl,
    RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use tracing::debug;
use url::Url;

use super::{AuthError, ClientSecrets};
use crate::types::TokenRecord;

/// One login attempt: the state it was built with and the URL to visit
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub state: String,
    pub url: Url,
}

pub struct GoogleOAuth {
    client: BasicClient,
    scopes: Vec<String>,
}

impl GoogleOAuth {
    pub fn new(
        secrets: &ClientSecrets,
        redirect_uri: &str,
        scopes: Vec<String>,
    ) -> Result<Self, AuthError> {
        let auth_url = AuthUrl::new(secrets.auth_uri.clone())
            .map_err(|e| AuthError::InvalidUrl(format!("{}: {}", secrets.auth_uri, e)))?;
        let token_url = TokenUrl::new(secrets.token_uri.clone())
            .map_err(|e| AuthError::InvalidUrl(format!("{}: {}", secrets.token_uri, e)))?;
        let redirect_url = RedirectUrl::new(redirect_uri.to_string())
            .map_err(|e| AuthError::InvalidUrl(format!("{}: {}", redirect_uri, e)))?;

        let client = BasicClient::new(
            ClientId::new(secrets.client_id.clone()),
            secrets.client_secret.clone().map(ClientSecret::new),
            auth_url,
            Some(token_url),
        )
        // Google expects the client credentials in the form body
        .set_auth_type(AuthType::RequestBody)
        .set_redirect_uri(redirect_url);

        Ok(Self { client, scopes })
    }

    /// Generate random state for CSRF protection
    pub fn generate_state() -> String {
        use rand::RngCore;
        let mut rng = rand::thread_rng();
        let mut random_bytes = vec![0u8; 32];
        rng.fill_bytes(&mut random_bytes);
        URL_SAFE_NO_PAD.encode(random_bytes)
    }

    /// Build authorization URL requesting offline access (refresh token)
    pub fn build_auth_url(&self, state: &str) -> AuthorizationRequest {
        let csrf = state.to_string();
        let (url, csrf_token) = self
            .client
            .authorize_url(move || CsrfToken::new(csrf))
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .add_extra_param("access_type", "offline")
            .url();

        AuthorizationRequest {
            state: csrf_token.secret().clone(),
            url,
        }
    }

    /// Exchange authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<TokenRecord, AuthError> {
        debug!("Exchanging authorization code at token endpoint");

        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|err| match err {
                RequestTokenError::ServerResponse(resp) => AuthError::Exchange(resp.to_string()),
                other => AuthError::Exchange(other.to_string()),
            })?;

        let expiry = response
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Utc::now() + d);

        Ok(TokenRecord {
            access_token: response.access_token().secret().clone(),
            token_type: response.token_type().as_ref().to_string(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expiry,
        })
    }
}
