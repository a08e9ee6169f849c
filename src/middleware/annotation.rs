//! Per-route logging annotations.
//!
//! An [`Annotation`] is attached to a handler when the route is registered.
//! Annotations live out of band in an [`AnnotationRegistry`], keyed by the
//! [`HandlerId`] the router hands out at registration, and are frozen once
//! the router is built.
//!
//! ```rust
//! use reqlog::{Annotation, Request, Response, Router};
//! use http::Method;
//!
//! # async fn login(_: Request) -> Response { Response::text("") }
//! # async fn upload(_: Request) -> Response { Response::text("") }
//! let app = Router::new()
//!     .on_annotated(Method::POST, "/login", login, Annotation::no_logging_because("credentials"))
//!     .on_annotated(Method::POST, "/upload", upload, Annotation::log().no_body_because("large files"));
//! ```
//!
//! Stacking annotations on one handler is allowed as long as they agree.
//! A handler that is both suppressed and explicitly logged is rejected at
//! registration with an [`AnnotationConflict`].

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Suppression notice used when [`Annotation::no_logging`] is given no message.
pub const DEFAULT_SUPPRESS_MESSAGE: &str = "No logging for this endpoint";

/// Identity of a registered handler: an index assigned by the router plus a
/// qualified name used in diagnostics.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct HandlerId(usize);

impl HandlerId {
    pub fn index(self) -> usize { self.0 }
}

/// How a suppressed route announces itself.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Suppression {
    /// Logs `"<METHOD> <path> (not logged because '<reason>')"`.
    Announced(String),
    /// Logs nothing at all.
    Silent,
}

/// An explicit per-concern override.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Toggle {
    pub enabled: bool,
    pub reason: Option<String>,
}

/// A logging annotation, built with the constructors below and attached to
/// a handler at registration time.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Annotation {
    suppress: Option<Suppression>,
    opt_in: bool,
    headers: Option<Toggle>,
    body: Option<Toggle>,
    response: Option<Toggle>,
}

impl Annotation {
    /// Suppress logging with the default notice.
    pub fn no_logging() -> Self {
        Self::no_logging_because(DEFAULT_SUPPRESS_MESSAGE)
    }

    /// Suppress logging, announcing `reason` instead of the default notice.
    /// A blank `reason` keeps the default notice.
    pub fn no_logging_because(reason: impl Into<String>) -> Self {
        let mut reason = reason.into();
        if reason.trim().is_empty() {
            reason = DEFAULT_SUPPRESS_MESSAGE.to_owned();
        }
        Self { suppress: Some(Suppression::Announced(reason)), ..Self::default() }
    }

    /// Suppress logging without announcing it.
    pub fn silent() -> Self {
        Self { suppress: Some(Suppression::Silent), ..Self::default() }
    }

    /// Explicitly opt the route in. Useful as a base for per-concern
    /// overrides and to guard against a stray suppression.
    pub fn log() -> Self {
        Self { opt_in: true, ..Self::default() }
    }

    pub fn log_headers(mut self, enabled: bool) -> Self {
        self.headers = Some(Toggle { enabled, reason: None });
        self
    }

    pub fn no_headers_because(mut self, reason: impl Into<String>) -> Self {
        self.headers = Some(Toggle { enabled: false, reason: Some(reason.into()) });
        self
    }

    pub fn log_body(mut self, enabled: bool) -> Self {
        self.body = Some(Toggle { enabled, reason: None });
        self
    }

    pub fn no_body_because(mut self, reason: impl Into<String>) -> Self {
        self.body = Some(Toggle { enabled: false, reason: Some(reason.into()) });
        self
    }

    pub fn log_response(mut self, enabled: bool) -> Self {
        self.response = Some(Toggle { enabled, reason: None });
        self
    }

    pub fn no_response_because(mut self, reason: impl Into<String>) -> Self {
        self.response = Some(Toggle { enabled: false, reason: Some(reason.into()) });
        self
    }
}

/// Everything known about one handler's logging policy after all of its
/// annotations were merged. Unset concerns fall back to the configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RouteAnnotation {
    suppress: Option<Suppression>,
    opt_in: bool,
    headers: Option<Toggle>,
    body: Option<Toggle>,
    response: Option<Toggle>,
}

impl RouteAnnotation {
    pub fn suppression(&self) -> Option<&Suppression> { self.suppress.as_ref() }
    pub fn headers(&self) -> Option<&Toggle> { self.headers.as_ref() }
    pub fn body(&self) -> Option<&Toggle> { self.body.as_ref() }
    pub fn response(&self) -> Option<&Toggle> { self.response.as_ref() }

    fn merge(&mut self, a: Annotation) -> Result<(), ConflictKind> {
        let mut merged = self.clone();

        merged.suppress = match (merged.suppress.take(), a.suppress) {
            (Some(old), Some(new)) if old != new => return Err(ConflictKind::Suppression),
            (old, new) => new.or(old),
        };
        merged.opt_in |= a.opt_in;
        merged.headers = merge_toggle("headers", merged.headers.take(), a.headers)?;
        merged.body = merge_toggle("body", merged.body.take(), a.body)?;
        merged.response = merge_toggle("response", merged.response.take(), a.response)?;

        let explicitly_logged = merged.opt_in
            || [&merged.headers, &merged.body, &merged.response]
                .into_iter()
                .any(|t| t.as_ref().is_some_and(|t| t.enabled));
        if merged.suppress.is_some() && explicitly_logged {
            return Err(ConflictKind::SuppressedAndLogged);
        }

        *self = merged;
        Ok(())
    }
}

fn merge_toggle(
    concern: &'static str,
    old: Option<Toggle>,
    new: Option<Toggle>,
) -> Result<Option<Toggle>, ConflictKind> {
    match (old, new) {
        (Some(old), Some(new)) if old.enabled != new.enabled => Err(ConflictKind::Concern(concern)),
        (Some(old), Some(new)) => Ok(Some(Toggle { enabled: new.enabled, reason: new.reason.or(old.reason) })),
        (old, new) => Ok(new.or(old)),
    }
}

/// Why two annotations on one handler cannot both hold.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConflictKind {
    #[error("suppressed and explicitly logged")]
    SuppressedAndLogged,
    #[error("suppressed twice with different notices")]
    Suppression,
    #[error("`{0}` both enabled and disabled")]
    Concern(&'static str),
}

/// Two incompatible annotations were applied to the same handler.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("conflicting logging annotations on `{handler}`: {kind}")]
pub struct AnnotationConflict {
    pub handler: String,
    pub kind: ConflictKind,
}

/// Out-of-band store of handler annotations, populated while routes are
/// registered and read-only afterwards.
#[derive(Default)]
pub struct AnnotationRegistry {
    names: Vec<String>,
    annotations: HashMap<HandlerId, RouteAnnotation>,
}

impl AnnotationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a fresh identity for a handler called `name`.
    pub fn register(&mut self, name: impl Into<String>) -> HandlerId {
        self.names.push(name.into());
        HandlerId(self.names.len() - 1)
    }

    pub fn name(&self, id: HandlerId) -> &str {
        self.names.get(id.0).map(String::as_str).unwrap_or("<unknown>")
    }

    /// Merges `annotation` into whatever `id` already carries.
    pub fn annotate(&mut self, id: HandlerId, annotation: Annotation) -> Result<(), AnnotationConflict> {
        let mut merged = self.annotations.get(&id).cloned().unwrap_or_default();
        merged.merge(annotation).map_err(|kind| AnnotationConflict {
            handler: self.name(id).to_owned(),
            kind,
        })?;
        self.annotations.insert(id, merged);
        Ok(())
    }

    pub fn get(&self, id: HandlerId) -> Option<&RouteAnnotation> {
        self.annotations.get(&id)
    }
}

impl fmt::Debug for AnnotationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.annotations.iter().map(|(id, a)| (self.name(*id), a)))
            .finish()
    }
}
