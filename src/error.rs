//! Unified error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::middleware::AnnotationConflict;

/// The error type returned by reqlog's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. Request logging
/// itself never fails mid-request: everything here surfaces at startup, while
/// the configuration is read, routes are annotated or the listener is bound.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    Addr(String),

    #[error("route: {0}")]
    Route(String),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("annotation: {0}")]
    Annotation(#[from] AnnotationConflict),
}
