//! Log emission.
//!
//! [`Emitter`] splits messages into lines, optionally colours them, and
//! hands each line to a [`LogSink`] together with the request's
//! [`LoggingContext`]. The default sink forwards to `tracing`.

use std::sync::{Arc, LazyLock};

use colored::Color;
use http::{Method, StatusCode};
use regex::Regex;
use tracing::Level;

use crate::request::Request;
use crate::response::Response;

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n").expect("valid line regex"));

const INFO_COLOR: Color = Color::Cyan;
const ERROR_COLOR: Color = Color::Magenta;

/// What a log record knows about the request it belongs to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestHead {
    pub method: Method,
    pub full_path: String,
    pub content_type: String,
}

impl From<&Request> for RequestHead {
    fn from(req: &Request) -> Self {
        Self {
            method: req.method().clone(),
            full_path: req.full_path(),
            content_type: req.content_type().to_owned(),
        }
    }
}

/// What a log record knows about the response it belongs to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub content_type: String,
    pub streaming: bool,
}

impl From<&Response> for ResponseHead {
    fn from(resp: &Response) -> Self {
        Self {
            status: resp.status_code(),
            content_type: resp.content_type().to_owned(),
            streaming: resp.is_streaming(),
        }
    }
}

/// Side-channel metadata attached to every record of one request/response
/// pair. Built fresh for each phase; never shared between requests.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoggingContext {
    pub request: RequestHead,
    pub response: Option<ResponseHead>,
    /// Suppression notice, set only on the records of a suppressed route.
    pub no_logging: Option<String>,
    /// Caller-supplied key/value pairs.
    pub extra: Vec<(String, String)>,
}

/// Destination for rendered log lines.
pub trait LogSink: Send + Sync + 'static {
    /// `line` never contains a line break.
    fn log(&self, level: Level, line: &str, ctx: &LoggingContext);
}

/// Forwards every line as a `tracing` event with target `http.request`.
///
/// `tracing` targets are fixed at compile time, so the configured logger
/// name is recorded in the `logger` field instead.
pub struct TracingSink {
    logger: String,
}

impl TracingSink {
    pub fn new(logger: impl Into<String>) -> Self {
        Self { logger: logger.into() }
    }
}

macro_rules! http_event {
    ($level:expr, $logger:expr, $line:expr, $ctx:expr) => {
        tracing::event!(
            target: "http.request",
            $level,
            logger = %$logger,
            method = %$ctx.request.method,
            path = %$ctx.request.full_path,
            status = $ctx.response.as_ref().map(|r| r.status.as_u16()),
            no_logging = $ctx.no_logging.as_deref(),
            extra = ?$ctx.extra,
            "{}",
            $line
        )
    };
}

impl LogSink for TracingSink {
    fn log(&self, level: Level, line: &str, ctx: &LoggingContext) {
        match level {
            Level::ERROR => http_event!(Level::ERROR, self.logger, line, ctx),
            Level::WARN => http_event!(Level::WARN, self.logger, line, ctx),
            Level::INFO => http_event!(Level::INFO, self.logger, line, ctx),
            Level::DEBUG => http_event!(Level::DEBUG, self.logger, line, ctx),
            _ => http_event!(Level::TRACE, self.logger, line, ctx),
        }
    }
}

/// Splits, colours and forwards messages to a [`LogSink`].
#[derive(Clone)]
pub struct Emitter {
    sink: Arc<dyn LogSink>,
    colorize: bool,
}

impl Emitter {
    /// `colorize` wraps every line in an ANSI colour whatever the sink
    /// writes to. `colored`'s process-wide switch is left alone.
    pub fn new(sink: Arc<dyn LogSink>, colorize: bool) -> Self {
        Self { sink, colorize }
    }

    /// Logs `msg` line by line, in the error colour from ERROR up.
    pub fn log(&self, level: Level, msg: &str, ctx: &LoggingContext) {
        let color = if level == Level::ERROR { ERROR_COLOR } else { INFO_COLOR };
        self.emit(level, msg, color, ctx);
    }

    /// Logs `msg` in the error colour whatever `level` is.
    pub fn log_error(&self, level: Level, msg: &str, ctx: &LoggingContext) {
        self.emit(level, msg, ERROR_COLOR, ctx);
    }

    fn emit(&self, level: Level, msg: &str, color: Color, ctx: &LoggingContext) {
        for line in LINE_BREAK.split(msg) {
            if self.colorize {
                self.sink.log(level, &paint(line, color), ctx);
            } else {
                self.sink.log(level, line, ctx);
            }
        }
    }
}

fn paint(line: &str, color: Color) -> String {
    format!("\x1b[{}m{line}\x1b[0m", color.to_fg_str())
}
