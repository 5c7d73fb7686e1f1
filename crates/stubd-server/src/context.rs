//! Per-Request Tracking Context
//!
//! A [`RequestContext`] travels with every request from the router, across
//! the execution bridge into the worker pool, and back out to the transport.
//! Handlers record what they touched (scenario, session) and may override the
//! response status or request a deferred finish; the classifier reads and
//! writes the same context when mapping failures.

use std::collections::HashMap;

use stubd_core::Envelope;

/// Mutable per-request state shared between the router, the handler, and the
/// outcome classifier.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Host namespace the request operates in
    pub host: String,
    /// Refined operation label for metrics and logs; handlers set it when one
    /// route fans out to several operations
    pub function: Option<String>,
    /// Scenario the handler resolved, when any
    pub scenario: Option<String>,
    /// Session the handler resolved, when any
    pub session: Option<String>,
    /// Request headers with lowercased names
    pub request_headers: HashMap<String, String>,
    /// The response envelope, once the classifier has produced one
    pub response: Option<Envelope>,
    /// Deferred-finish delay in milliseconds, when a delay policy applied
    pub delay: Option<u64>,
    /// Status override; `None` means the 200 default
    status: Option<u16>,
}

impl RequestContext {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            function: None,
            scenario: None,
            session: None,
            request_headers: HashMap::new(),
            response: None,
            delay: None,
            status: None,
        }
    }

    /// Looks up a request header by (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request_headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Finds a header whose name contains `tag` as a substring. Deployed
    /// legacy agents prefix the tag (e.g. `x-stb_session`), so an exact-name
    /// lookup would miss them.
    pub fn header_containing(&self, tag: &str) -> Option<&str> {
        let tag = tag.to_ascii_lowercase();
        self.request_headers
            .iter()
            .find(|(name, _)| name.contains(&tag))
            .map(|(_, value)| value.as_str())
    }

    pub fn set_status(&mut self, code: u16) {
        self.status = Some(code);
    }

    /// Whether a handler or the classifier has overridden the default status.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// The response status to write: the override when one was set, 200
    /// otherwise.
    pub fn status_or_default(&self) -> u16 {
        self.status.unwrap_or(200)
    }
}
