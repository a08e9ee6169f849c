//! Shared utilities for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use http::Method;
use reqlog::{LogSink, LoggingContext, Request, RequestLogging, Settings};
use tracing::Level;

#[derive(Clone, Debug)]
pub struct Record {
    pub level: Level,
    pub line: String,
    pub ctx: LoggingContext,
}

/// Keeps every record in memory.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, line: &str, ctx: &LoggingContext) {
        self.records.lock().unwrap().push(Record { level, line: line.to_owned(), ctx: ctx.clone() });
    }
}

impl MemorySink {
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.line).collect()
    }

    /// Every line joined with `\n`.
    pub fn text(&self) -> String {
        self.lines().join("\n")
    }

    pub fn find(&self, line: &str) -> Option<Record> {
        self.records().into_iter().find(|r| r.line == line)
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

/// Middleware logging into a fresh [`MemorySink`]. Colour is off unless
/// `settings` turns it on.
pub fn recording(settings: Settings) -> (RequestLogging, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    let config = settings.validate().unwrap();
    (RequestLogging::with_sink(config, sink.clone()), sink)
}

pub fn plain() -> Settings {
    Settings { colorize: false, ..Settings::default() }
}

pub fn request(method: Method, uri: &str, headers: &[(&str, &str)], body: &str) -> Request {
    let headers = headers.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned()));
    Request::new(method, uri.parse().unwrap(), headers.collect::<Vec<_>>(), body.to_owned())
}
