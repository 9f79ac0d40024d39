//! Connection settings for [`LibsqlStorage`](crate::LibsqlStorage).

use serde::Deserialize;

/// Environment variable holding the database URL or path.
pub const URL_VAR: &str = "ROWMAP_DATABASE_URL";
/// Environment variable holding the SQLite busy timeout in milliseconds.
pub const BUSY_TIMEOUT_VAR: &str = "ROWMAP_BUSY_TIMEOUT_MS";

/// Where and how to open the database.
///
/// Deserializes from any serde format; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LibsqlConfig {
    /// `:memory:`, a file path, or a `file:` URL.
    pub url: String,
    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl Default for LibsqlConfig {
    fn default() -> Self {
        Self {
            url: ":memory:".to_string(),
            busy_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("`{var}` must be a number of milliseconds, got `{value}`")]
    InvalidNumber { var: &'static str, value: String },
}

impl LibsqlConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Read [`URL_VAR`] and [`BUSY_TIMEOUT_VAR`], falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup(URL_VAR).filter(|u| !u.trim().is_empty()) {
            config.url = url;
        }
        if let Some(raw) = lookup(BUSY_TIMEOUT_VAR) {
            config.busy_timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                var: BUSY_TIMEOUT_VAR,
                value: raw.clone(),
            })?;
        }
        Ok(config)
    }
}
