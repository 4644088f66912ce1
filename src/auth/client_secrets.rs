/// Google client secret file (`credentials.json`) as downloaded from the Cloud console
use serde::Deserialize;
use std::{fs, path::Path};

use super::AuthError;

const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String { GOOGLE_AUTH_URI.to_string() }
fn default_token_uri() -> String { GOOGLE_TOKEN_URI.to_string() }

// Either "installed" (desktop app) or "web" client
#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| AuthError::ReadCredentials {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, AuthError> {
        let file: SecretsFile =
            serde_json::from_str(raw).map_err(|e| AuthError::InvalidCredentials(e.to_string()))?;

        let secrets = file.installed.or(file.web).ok_or_else(|| {
            AuthError::InvalidCredentials("expected an \"installed\" or \"web\" section".to_string())
        })?;

        if secrets.client_id.trim().is_empty() {
            return Err(AuthError::InvalidCredentials("client_id is empty".to_string()));
        }

        Ok(secrets)
    }
}
