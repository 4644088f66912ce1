use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use super::AuthError;
use crate::types::TokenRecord;

/// HTTP client that sends the OAuth access token with every request
#[derive(Clone)]
pub struct AuthenticatedClient {
    http: reqwest::Client,
    token: TokenRecord,
}

impl AuthenticatedClient {
    pub fn new(token: TokenRecord) -> Result<Self, AuthError> {
        let mut auth_value = HeaderValue::from_str(&token.authorization_header())
            .map_err(|_| AuthError::InvalidToken)?;
        auth_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth_value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("calsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, token })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn token(&self) -> &TokenRecord {
        &self.token
    }
}
