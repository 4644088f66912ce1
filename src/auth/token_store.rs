/// JSON token cache under `~/.credentials`
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

use super::AuthError;
use crate::config::OAuthConfig;
use crate::types::TokenRecord;

const TOKEN_DIR: &str = ".credentials";
const TOKEN_FILE: &str = "calendar-token.json";

pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<home>/.credentials/calendar-token.json`
    pub fn default_location() -> Result<Self, AuthError> {
        let home = dirs::home_dir().ok_or(AuthError::NoHomeDir)?;
        Ok(Self::new(home.join(TOKEN_DIR).join(TOKEN_FILE)))
    }

    pub fn from_config(config: &OAuthConfig) -> Result<Self, AuthError> {
        match &config.token_file {
            Some(path) => Ok(Self::new(path)),
            None => Self::default_location(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the token, creating the parent directory owner-only if absent
    pub fn save(&self, token: &TokenRecord) -> Result<(), AuthError> {
        if let Some(dir) = self.path.parent() {
            create_private_dir(dir).map_err(|source| AuthError::TokenStore {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string(token)?;
        write_private_file(&self.path, json.as_bytes()).map_err(|source| {
            AuthError::TokenStore {
                path: self.path.clone(),
                source,
            }
        })?;

        debug!("Token written to {}", self.path.display());
        Ok(())
    }

    /// Read the cached token, `None` if nothing has been saved yet
    pub fn load(&self) -> Result<Option<TokenRecord>, AuthError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(AuthError::TokenStore {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

fn write_private_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.write_all(b"\n")?;
    file.sync_all()
}
