//! Process-wide logging configuration.
//!
//! ```text
//! TOML / Settings literal
//!     → Settings      (serde: syntactic checks, every key defaulted)
//!     → validate()    (semantic checks: level names, header names, logger)
//!     → LoggingConfig (immutable, shared via Arc by every request)
//! ```
//!
//! Validation runs once, before the middleware exists. A bad value stops the
//! process at startup instead of surfacing on the first request.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::Level;

pub const DEFAULT_MAX_BODY_LENGTH: usize = 50_000;
pub const DEFAULT_LOGGER_NAME: &str = "http.request";
pub const DEFAULT_SENSITIVE_HEADERS: [&str; 2] = ["Authorization", "Proxy-Authorization"];

/// Errors raised while building a [`LoggingConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Wrong type or unknown key, e.g. `colorize = "yes"` or
    /// `max_body_length = "lots"`.
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown log level `{value}` in `{key}`")]
    InvalidLevel { key: &'static str, value: String },

    #[error("invalid `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Raw, unvalidated settings as they appear in a config file.
///
/// ```toml
/// data_log_level = "debug"
/// http_4xx_log_level = "error"
/// colorize = true
/// max_body_length = 50000
/// sensitive_headers = ["Authorization", "Proxy-Authorization"]
/// logger_name = "http.request"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Severity for header and body records.
    pub data_log_level: String,

    /// Severity for data records of 4xx responses. Left at `error`, client
    /// errors are logged exactly like server errors.
    pub http_4xx_log_level: String,

    /// Wrap every line in an ANSI colour.
    pub colorize: bool,

    /// Bodies are cut to this many characters (bytes for multipart).
    pub max_body_length: usize,

    /// Header names whose values are masked. Matched exactly against the
    /// canonical `Title-Case` form.
    pub sensitive_headers: Vec<String>,

    pub logger_name: String,

    /// Route defaults, overridable per handler with an annotation.
    pub log_headers: bool,
    pub log_body: bool,
    pub log_response: bool,

    /// Emit a `(truncated)` record after a body that was cut.
    pub truncation_notice: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_log_level: "debug".to_owned(),
            http_4xx_log_level: "error".to_owned(),
            colorize: true,
            max_body_length: DEFAULT_MAX_BODY_LENGTH,
            sensitive_headers: DEFAULT_SENSITIVE_HEADERS.iter().map(|h| (*h).to_owned()).collect(),
            logger_name: DEFAULT_LOGGER_NAME.to_owned(),
            log_headers: true,
            log_body: true,
            log_response: true,
            truncation_notice: false,
        }
    }
}

impl Settings {
    /// Checks every value and freezes the result.
    pub fn validate(self) -> Result<LoggingConfig, ConfigError> {
        let data_level = parse_level("data_log_level", &self.data_log_level)?;
        let http_4xx_level = parse_level("http_4xx_log_level", &self.http_4xx_log_level)?;

        if let Some(bad) = self.sensitive_headers.iter().find(|h| h.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                key: "sensitive_headers",
                reason: format!("empty header name {bad:?}"),
            });
        }

        if self.logger_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "logger_name",
                reason: "must not be empty".to_owned(),
            });
        }

        Ok(LoggingConfig {
            data_level,
            http_4xx_level,
            colorize: self.colorize,
            max_body_length: self.max_body_length,
            sensitive_headers: self.sensitive_headers.into_iter().collect(),
            logger_name: self.logger_name,
            log_headers: self.log_headers,
            log_body: self.log_body,
            log_response: self.log_response,
            truncation_notice: self.truncation_notice,
        })
    }
}

/// Validated, read-only logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    data_level: Level,
    http_4xx_level: Level,
    colorize: bool,
    max_body_length: usize,
    sensitive_headers: HashSet<String>,
    logger_name: String,
    log_headers: bool,
    log_body: bool,
    log_response: bool,
    truncation_notice: bool,
}

impl LoggingConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(s)?;
        settings.validate()
    }

    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn data_level(&self) -> Level { self.data_level }
    pub fn http_4xx_level(&self) -> Level { self.http_4xx_level }
    pub fn colorize(&self) -> bool { self.colorize }
    pub fn max_body_length(&self) -> usize { self.max_body_length }
    pub fn sensitive_headers(&self) -> &HashSet<String> { &self.sensitive_headers }
    pub fn logger_name(&self) -> &str { &self.logger_name }
    pub fn log_headers(&self) -> bool { self.log_headers }
    pub fn log_body(&self) -> bool { self.log_body }
    pub fn log_response(&self) -> bool { self.log_response }
    pub fn truncation_notice(&self) -> bool { self.truncation_notice }

    /// `true` when 4xx responses keep the default "treat like 5xx" policy.
    pub(crate) fn http_4xx_is_error(&self) -> bool {
        self.http_4xx_level == Level::ERROR
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let defaults = Settings::default();
        Self {
            data_level: Level::DEBUG,
            http_4xx_level: Level::ERROR,
            colorize: defaults.colorize,
            max_body_length: defaults.max_body_length,
            sensitive_headers: defaults.sensitive_headers.into_iter().collect(),
            logger_name: defaults.logger_name,
            log_headers: defaults.log_headers,
            log_body: defaults.log_body,
            log_response: defaults.log_response,
            truncation_notice: defaults.truncation_notice,
        }
    }
}

fn parse_level(key: &'static str, value: &str) -> Result<Level, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" | "critical" => Ok(Level::ERROR),
        _ => Err(ConfigError::InvalidLevel { key, value: value.to_owned() }),
    }
}
