//! # reqlog
//!
//! A minimal HTTP framework whose dispatch path logs every request and
//! response: method, path, headers, body, status.
//!
//! ## What gets logged
//!
//! ```text
//! INFO   POST /users
//! DEBUG  Content-Type: application/json
//! DEBUG  Authorization: *****
//! DEBUG  {"name":"alice"}
//! INFO   POST /users - 201
//! DEBUG  Content-Type: application/json
//! DEBUG  {"id":"99"}
//! ```
//!
//! - Sensitive headers are masked, bodies are cut to a maximum length,
//!   multipart uploads keep their structure but lose binary payloads.
//! - 4xx and 5xx responses are logged at ERROR by default.
//! - Streaming responses are never read; they log `(data_stream)`.
//! - Routes opt out, or drop single concerns, with an [`Annotation`].
//!
//! Logging only observes. It never changes a request or a response, and it
//! never fails a request: what cannot be rendered becomes a placeholder.
//! Configuration and annotation mistakes fail at startup instead.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use reqlog::{Annotation, LoggingConfig, Request, RequestLogging, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reqlog::Error> {
//!     let config = LoggingConfig::from_toml_str(r#"max_body_length = 4096"#)?;
//!
//!     let app = Router::new()
//!         .on(Method::GET,  "/users/{id}", get_user)
//!         .on_annotated(Method::POST, "/login", login, Annotation::no_logging_because("credentials"));
//!
//!     Server::bind("0.0.0.0:3000")?
//!         .with_logging(RequestLogging::new(config))
//!         .serve(app)
//!         .await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn login(_req: Request) -> StatusCode {
//!     StatusCode::NO_CONTENT
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod config;
pub mod middleware;

pub use config::{ConfigError, LoggingConfig, Settings};
pub use error::Error;
pub use handler::Handler;
pub use middleware::{Annotation, AnnotationConflict, LogSink, LoggingContext, RequestLogging, TracingSink};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response};
pub use router::{Router, View, ViewSet};
pub use server::Server;
