use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::error::FlowError;

/// Runtime configuration loaded from environment variables.
///
/// Every field has a default, so an empty environment yields a usable config
/// (in-memory storage, no remote API).
#[derive(Debug, Clone)]
pub struct Config {
    // Persistence
    pub storage_dir: Option<PathBuf>,

    // Checklist table API
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub http_timeout: Duration,

    // Logging
    pub log_filter: String,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: None,
            api_base_url: None,
            api_token: None,
            http_timeout: Duration::from_secs(30),
            log_filter: "widgetflow=info".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, FlowError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads from an arbitrary lookup, so
    /// tests don't have to touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, FlowError> {
        let defaults = Self::default();

        let http_timeout = match lookup("WIDGETFLOW_HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse().map_err(|_| {
                FlowError::Config(format!(
                    "WIDGETFLOW_HTTP_TIMEOUT_SECS must be a number, got {raw:?}"
                ))
            })?),
            None => defaults.http_timeout,
        };

        let log_json = match lookup("WIDGETFLOW_LOG_JSON") {
            Some(raw) => parse_bool("WIDGETFLOW_LOG_JSON", &raw)?,
            None => defaults.log_json,
        };

        Ok(Self {
            storage_dir: lookup("WIDGETFLOW_STORAGE_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            api_base_url: lookup("WIDGETFLOW_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            api_token: lookup("WIDGETFLOW_API_TOKEN").filter(|s| !s.is_empty()),
            http_timeout,
            log_filter: lookup("WIDGETFLOW_LOG").unwrap_or(defaults.log_filter),
            log_json,
        })
    }

    /// Log the effective configuration with secrets masked.
    pub fn log_redacted(&self) {
        info!(
            storage_dir = ?self.storage_dir,
            api_base_url = ?self.api_base_url,
            api_token = if self.api_token.is_some() { "[set]" } else { "[unset]" },
            http_timeout_secs = self.http_timeout.as_secs(),
            log_filter = self.log_filter.as_str(),
            log_json = self.log_json,
            "Loaded widgetflow config"
        );
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, FlowError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(FlowError::Config(format!(
            "{key} must be a boolean, got {raw:?}"
        ))),
    }
}
