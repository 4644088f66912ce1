use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// Upper bound for `start_offset_hours` and `duration_hours` (ten years)
pub const MAX_SLOT_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Address the redirect listener binds to
    #[serde(default = "default_redirect_bind")]
    pub redirect_bind: String,
    /// Redirect URI registered with the provider; must reach `redirect_bind`
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// Fixed state value. A random one is generated per login when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_true")]
    pub open_browser: bool,
    /// Give up waiting for the redirect after this many seconds. Waits forever when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_timeout_secs: Option<u64>,
    #[serde(default = "default_credentials_file")]
    pub credentials_file: String,
    /// Overrides `~/.credentials/calendar-token.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_calendar_base_url")]
    pub base_url: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    #[serde(default = "default_summary")]
    pub summary: String,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_start_offset_hours")]
    pub start_offset_hours: i64,
    #[serde(default = "default_duration_hours")]
    pub duration_hours: i64,
}

// Defaults
fn default_log_level() -> String { "info".to_string() }
fn default_redirect_bind() -> String { "localhost:8080".to_string() }
fn default_redirect_uri() -> String { "http://localhost:8080".to_string() }
fn default_scopes() -> Vec<String> { vec![CALENDAR_SCOPE.to_string()] }
fn default_true() -> bool { true }
fn default_credentials_file() -> String { "credentials.json".to_string() }
fn default_calendar_base_url() -> String { "https://www.googleapis.com/calendar/v3".to_string() }
fn default_calendar_id() -> String { "primary".to_string() }
fn default_time_zone() -> String { "Asia/Kolkata".to_string() }
fn default_summary() -> String { "Updated Event Title".to_string() }
fn default_location() -> String { "Updated Location".to_string() }
fn default_description() -> String { "Updated Description".to_string() }
fn default_start_offset_hours() -> i64 { 48 }
fn default_duration_hours() -> i64 { 1 }

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            oauth: OAuthConfig::default(),
            calendar: CalendarConfig::default(),
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            redirect_bind: default_redirect_bind(),
            redirect_uri: default_redirect_uri(),
            state: None,
            scopes: default_scopes(),
            open_browser: true,
            callback_timeout_secs: None,
            credentials_file: default_credentials_file(),
            token_file: None,
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            base_url: default_calendar_base_url(),
            calendar_id: default_calendar_id(),
            time_zone: default_time_zone(),
            summary: default_summary(),
            location: default_location(),
            description: default_description(),
            start_offset_hours: default_start_offset_hours(),
            duration_hours: default_duration_hours(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment. A missing file yields defaults.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config_path = match env::var("CALSYNC_CONFIG") {
            Ok(path) => Some(path),
            Err(_) => {
                let home_config = dirs::config_dir()
                    .map(|dir| dir.join("calsync").join("config.toml"))
                    .map(|p| p.to_string_lossy().into_owned());

                ["./calsync.toml".to_string()]
                    .into_iter()
                    .chain(home_config)
                    .find(|path| Path::new(path).exists())
            }
        };

        let Some(config_path) = config_path else {
            tracing::debug!("No config file found, using defaults");
            return Ok(Self::default());
        };

        Self::from_file(&config_path)
    }

    /// Parse a TOML config file, substituting `${VAR}` references first
    pub fn from_file(config_path: &str) -> Result<Self> {
        #[cfg(unix)]
        Self::validate_file_permissions(config_path)?;

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;

        let config_content = Self::substitute_env_vars(&config_content);

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file: {}", config_path))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", config_path))?;

        tracing::debug!("Loaded config from {}", config_path);
        Ok(config)
    }

    /// Check values that would otherwise fail later, mid-flow
    pub fn validate(&self) -> Result<()> {
        let calendar = &self.calendar;

        if calendar.duration_hours <= 0 || calendar.duration_hours > MAX_SLOT_HOURS {
            anyhow::bail!(
                "calendar.duration_hours must be between 1 and {}, got {}",
                MAX_SLOT_HOURS,
                calendar.duration_hours
            );
        }

        if calendar.start_offset_hours.abs() > MAX_SLOT_HOURS {
            anyhow::bail!(
                "calendar.start_offset_hours must be within +/-{}, got {}",
                MAX_SLOT_HOURS,
                calendar.start_offset_hours
            );
        }

        Ok(())
    }

    /// Substitute ${VAR_NAME} with environment variable values.
    /// Substituted values are not scanned again.
    fn substitute_env_vars(content: &str) -> String {
        let mut result = content.to_string();
        let mut cursor = 0;

        while let Some(offset) = result[cursor..].find("${") {
            let start = cursor + offset;
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 2..start + end];
                let value = env::var(var_name).unwrap_or_default();
                result.replace_range(start..start + end + 1, &value);
                cursor = start + value.len();
            } else {
                break;
            }
        }

        result
    }

    /// Warn on group/world readable config, refuse group/world writable (Unix only)
    #[cfg(unix)]
    fn validate_file_permissions(path: &str) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let path_obj = Path::new(path);
        if !path_obj.exists() {
            return Ok(());
        }

        let metadata = fs::metadata(path_obj)
            .with_context(|| format!("Failed to read metadata for config file: {}", path))?;
        let mode = metadata.permissions().mode();

        if mode & 0o044 != 0 {
            tracing::warn!(
                "Config file {} is readable by other users (mode: {:o}). Recommended: chmod 600 {}",
                path,
                mode & 0o777,
                path
            );
        }

        if mode & 0o022 != 0 {
            anyhow::bail!(
                "Config file {} is writable by group or others (mode: {:o}). \
                This is a security risk. Run: chmod 600 {}",
                path,
                mode & 0o777,
                path
            );
        }

        Ok(())
    }
}
