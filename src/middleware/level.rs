//! Severity and colour by response status.
//!
//! | Status | Summary line | Data records |
//! |---|---|---|
//! | 1xx–3xx | INFO | `data_log_level` |
//! | 4xx, `http_4xx_log_level` left at ERROR | ERROR, error colour | ERROR |
//! | 4xx, `http_4xx_log_level` configured | INFO | `http_4xx_log_level` |
//! | 5xx | ERROR, error colour | ERROR |

use http::StatusCode;
use tracing::Level;

use crate::config::LoggingConfig;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Classification {
    /// Severity of the `"<METHOD> <path> - <status>"` line.
    pub level: Level,
    /// Force the error colour on the summary line.
    pub error_color: bool,
    /// Severity of response headers and body.
    pub data_level: Level,
}

pub fn classify(status: StatusCode, config: &LoggingConfig) -> Classification {
    let error = Classification { level: Level::ERROR, error_color: true, data_level: Level::ERROR };

    if status.is_server_error() {
        error
    } else if status.is_client_error() {
        if config.http_4xx_is_error() {
            error
        } else {
            Classification { level: Level::INFO, error_color: false, data_level: config.http_4xx_level() }
        }
    } else {
        Classification { level: Level::INFO, error_color: false, data_level: config.data_level() }
    }
}
