//! Per-request logging policy.
//!
//! Walks the candidate handler identities of a matched route (most specific
//! first) and takes the first annotation found as a whole. Anything the
//! annotation leaves unset comes from [`LoggingConfig`].

use crate::config::LoggingConfig;

use super::annotation::{AnnotationRegistry, HandlerId, RouteAnnotation, Suppression, Toggle};

/// Whether one concern (headers, body, response) is logged, and the note to
/// print when it is not.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Concern {
    pub enabled: bool,
    pub reason: Option<String>,
}

impl Concern {
    fn resolve(toggle: Option<&Toggle>, default: bool) -> Self {
        match toggle {
            Some(t) => Self { enabled: t.enabled, reason: t.reason.clone() },
            None => Self { enabled: default, reason: None },
        }
    }
}

/// The resolved policy for one request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Policy {
    log_route: bool,
    reason: Option<String>,
    pub headers: Concern,
    pub body: Concern,
    pub response: Concern,
}

impl Policy {
    /// Policy of a route without annotation, or of an unmatched path.
    pub fn defaults(config: &LoggingConfig) -> Self {
        Self::from_annotation(None, config)
    }

    pub fn from_annotation(annotation: Option<&RouteAnnotation>, config: &LoggingConfig) -> Self {
        let (log_route, reason) = match annotation.and_then(RouteAnnotation::suppression) {
            Some(Suppression::Announced(reason)) => (false, Some(reason.clone())),
            Some(Suppression::Silent) => (false, None),
            None => (true, None),
        };

        Self {
            log_route,
            reason,
            headers: Concern::resolve(annotation.and_then(RouteAnnotation::headers), config.log_headers()),
            body: Concern::resolve(annotation.and_then(RouteAnnotation::body), config.log_body()),
            response: Concern::resolve(annotation.and_then(RouteAnnotation::response), config.log_response()),
        }
    }

    /// `false` when the route is suppressed.
    pub fn log_route(&self) -> bool { self.log_route }

    /// Suppression notice. `None` on a suppressed route means silent.
    pub fn reason(&self) -> Option<&str> { self.reason.as_deref() }
}

/// Resolves the policy for a matched route. `candidates` is ordered most
/// specific first: a method's own annotation shadows its class annotation.
pub fn resolve(config: &LoggingConfig, registry: &AnnotationRegistry, candidates: &[HandlerId]) -> Policy {
    let annotation = candidates.iter().find_map(|id| registry.get(*id));
    Policy::from_annotation(annotation, config)
}
