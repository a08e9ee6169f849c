//! Request/response logging middleware.
//!
//! [`RequestLogging`] sits between the server's request dispatch and the
//! route handlers. For every request it:
//!
//! ```text
//! resolve route ─► resolve policy
//!   ├─ suppressed: announce once (or stay silent)
//!   └─ logged:     "<METHOD> <path>" ─► headers? ─► body?
//! run handler on its own task
//!   ├─ suppressed: "<METHOD> <path> - <status>" (or nothing)
//!   └─ logged:     "<METHOD> <path> - <status>" ─► headers? ─► body | (data_stream)
//! ```
//!
//! The request body was read into memory before dispatch; what gets rendered
//! is that cached copy. Logging never alters the request or the response and
//! never fails: undecodable bodies become placeholders.

pub mod annotation;
pub mod body;
pub mod emit;
pub mod level;
pub mod policy;
pub mod redact;

use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use tracing::Level;

use crate::config::LoggingConfig;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

pub use annotation::{Annotation, AnnotationConflict, AnnotationRegistry, HandlerId, RouteAnnotation};
pub use emit::{Emitter, LogSink, LoggingContext, RequestHead, ResponseHead, TracingSink};
pub use policy::{Concern, Policy};

/// Builds the caller-supplied part of a [`LoggingContext`].
pub type ContextFn = Arc<dyn Fn(&RequestHead, Option<&ResponseHead>) -> Vec<(String, String)> + Send + Sync>;

/// The logging middleware. Cheap to clone; all state is read-only.
#[derive(Clone)]
pub struct RequestLogging {
    config: Arc<LoggingConfig>,
    emitter: Emitter,
    context: Option<ContextFn>,
}

impl RequestLogging {
    /// Logs through `tracing`, named after the configured logger.
    pub fn new(config: LoggingConfig) -> Self {
        let sink = Arc::new(TracingSink::new(config.logger_name()));
        Self::with_sink(config, sink)
    }

    pub fn with_sink(config: LoggingConfig, sink: Arc<dyn LogSink>) -> Self {
        let emitter = Emitter::new(sink, config.colorize());
        Self { config: Arc::new(config), emitter, context: None }
    }

    /// Adds key/value pairs of your own to every record.
    ///
    /// ```rust
    /// use reqlog::{LoggingConfig, RequestLogging};
    ///
    /// let logging = RequestLogging::new(LoggingConfig::default())
    ///     .with_context(|_req, _resp| vec![("service".into(), "billing".into())]);
    /// ```
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestHead, Option<&ResponseHead>) -> Vec<(String, String)> + Send + Sync + 'static,
    {
        self.context = Some(Arc::new(f));
        self
    }

    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    /// Routes `req` through `router`, logging both phases.
    ///
    /// Unmatched paths answer 404, matched paths without a handler for the
    /// verb answer 405, and a panicking handler answers 500. All three are
    /// logged like any other response.
    pub async fn dispatch(&self, router: &Router, req: Request) -> Response {
        let head = RequestHead::from(&req);
        let headers = req.headers().to_vec();
        let body = req.body().clone();

        let route = router.resolve(req.method(), req.path());
        let policy = match &route {
            Some(m) => policy::resolve(&self.config, router.annotations(), &m.candidates),
            None => Policy::defaults(&self.config),
        };

        self.log_request(&policy, &head, &headers, &body);

        let response = match route {
            Some(m) => match m.handler {
                Some(handler) => {
                    let req = req.with_params(m.params);
                    match tokio::spawn(handler.call(req)).await {
                        Ok(response) => Some(response),
                        Err(e) => {
                            tracing::error!(method = %head.method, path = %head.full_path, "handler failed: {e}");
                            None
                        }
                    }
                }
                None => Some(Response::status(StatusCode::METHOD_NOT_ALLOWED)),
            },
            None => Some(Response::status(StatusCode::NOT_FOUND)),
        };

        self.log_response(&policy, &head, response.as_ref());
        response.unwrap_or_else(|| Response::status(StatusCode::INTERNAL_SERVER_ERROR))
    }

    /// Request phase: summary line, headers and body.
    pub fn log_request(&self, policy: &Policy, head: &RequestHead, headers: &[(String, String)], body: &Bytes) {
        let method_path = format!("{} {}", head.method, head.full_path);

        if !policy.log_route() {
            if let Some(reason) = policy.reason() {
                let ctx = self.skip_context(head, None, reason);
                self.emitter.log(Level::INFO, &format!("{method_path} (not logged because '{reason}')"), &ctx);
            }
            return;
        }

        let ctx = self.context(head, None);
        self.emitter.log(Level::INFO, &method_path, &ctx);

        let level = self.config.data_level();
        self.log_headers(level, &policy.headers, headers, &ctx);
        self.log_body(level, &policy.body, body, &head.content_type, &ctx);
    }

    /// Response phase. `None` means the handler never produced a response.
    pub fn log_response(&self, policy: &Policy, head: &RequestHead, response: Option<&Response>) {
        let method_path = format!("{} {}", head.method, head.full_path);

        let Some(response) = response else {
            let ctx = match policy.reason() {
                _ if policy.log_route() => self.context(head, None),
                Some(reason) => self.skip_context(head, None, reason),
                None => return,
            };
            self.emitter.log_error(Level::ERROR, &format!("{method_path} - (no response)"), &ctx);
            return;
        };

        let summary = format!("{method_path} - {}", response.status_code().as_u16());
        let resp_head = ResponseHead::from(response);

        if !policy.log_route() {
            if let Some(reason) = policy.reason() {
                let ctx = self.skip_context(head, Some(resp_head), reason);
                self.emitter.log_error(Level::INFO, &summary, &ctx);
            }
            return;
        }

        let ctx = self.context(head, Some(resp_head));
        let class = level::classify(response.status_code(), &self.config);
        if class.error_color {
            self.emitter.log_error(class.level, &summary, &ctx);
        } else {
            self.emitter.log(class.level, &summary, &ctx);
        }

        if !policy.response.enabled {
            self.log_note(class.data_level, "response", &policy.response, &ctx);
            return;
        }

        self.log_headers(class.data_level, &policy.headers, response.headers(), &ctx);

        match response.body() {
            None if policy.body.enabled => {
                self.emitter.log(class.data_level, body::STREAM_PLACEHOLDER, &ctx);
            }
            None => self.log_note(class.data_level, "body", &policy.body, &ctx),
            Some(bytes) => self.log_body(class.data_level, &policy.body, bytes, response.content_type(), &ctx),
        }
    }

    fn log_headers(&self, level: Level, concern: &Concern, headers: &[(String, String)], ctx: &LoggingContext) {
        if !concern.enabled {
            self.log_note(level, "headers", concern, ctx);
            return;
        }
        if headers.is_empty() {
            return;
        }

        let lines = redact::redact(headers, self.config.sensitive_headers())
            .into_iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("\n");
        self.emitter.log(level, &lines, ctx);
    }

    fn log_body(&self, level: Level, concern: &Concern, bytes: &Bytes, content_type: &str, ctx: &LoggingContext) {
        if !concern.enabled {
            self.log_note(level, "body", concern, ctx);
            return;
        }

        let rendered = body::render(bytes, content_type, self.config.max_body_length());
        for segment in rendered.segments() {
            self.emitter.log(level, segment, ctx);
        }
        if rendered.is_truncated() && self.config.truncation_notice() {
            self.emitter.log(level, body::TRUNCATED_NOTICE, ctx);
        }
    }

    /// `(<what> not logged because '<reason>')`, only when a reason exists.
    fn log_note(&self, level: Level, what: &str, concern: &Concern, ctx: &LoggingContext) {
        if let Some(reason) = &concern.reason {
            self.emitter.log(level, &format!("({what} not logged because '{reason}')"), ctx);
        }
    }

    fn context(&self, head: &RequestHead, response: Option<ResponseHead>) -> LoggingContext {
        let extra = match &self.context {
            Some(f) => f(head, response.as_ref()),
            None => Vec::new(),
        };
        LoggingContext { request: head.clone(), response, no_logging: None, extra }
    }

    fn skip_context(&self, head: &RequestHead, response: Option<ResponseHead>, reason: &str) -> LoggingContext {
        LoggingContext { no_logging: Some(reason.to_owned()), ..self.context(head, response) }
    }
}

impl Default for RequestLogging {
    fn default() -> Self {
        Self::new(LoggingConfig::default())
    }
}
