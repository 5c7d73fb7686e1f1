//! Uniform Response Envelope
//!
//! Every stubd response, success or failure, is wrapped in an [`Envelope`]:
//!
//! - Success: `{"version": "<ver>", "data": <json>}`
//! - Failure: `{"version": "<ver>", "error": <json>}`
//!
//! The `error` member is deliberately loose (`serde_json::Value`) because
//! three shapes exist on the wire:
//!
//! - The classifier's structured `{code, message, traceback?}` body
//! - The rename short-circuit's bare string
//! - The rename protocol's partial-failure object with `database` / `cache`
//!   sub-fields
//!
//! Additional top-level members (e.g. `"Remapped sessions"` from the rename
//! protocol) are carried in the flattened `extra` map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server version stamped into every envelope and the `x-stubd-version` header.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Uniform response wrapper carrying the server version plus either `data`
/// or `error` (or, for partial-failure protocols, both `error` sub-fields and
/// extra top-level members).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Server version string
    pub version: String,
    /// Success payload (absent on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure payload (structured body, bare string, or sub-field object)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    /// Additional top-level members, e.g. `"Remapped sessions"`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Structured error body produced by the classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    /// HTTP status code for the failure
    pub code: u16,
    /// Human-readable failure description
    pub message: String,
    /// Diagnostic trace, when one was captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl Envelope {
    /// Creates an envelope carrying only the version.
    pub fn new() -> Self {
        Self {
            version: VERSION.into(),
            data: None,
            error: None,
            extra: Map::new(),
        }
    }

    /// Creates a success envelope wrapping `data`.
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::new()
        }
    }

    /// Creates a failure envelope from a structured error body.
    pub fn failure(body: ErrorBody) -> Self {
        let error = serde_json::to_value(&body).unwrap_or_else(|_| Value::String(body.message));
        Self {
            error: Some(error),
            ..Self::new()
        }
    }

    /// Creates a failure envelope whose `error` member is a bare string.
    ///
    /// Used by the scenario-rename short-circuit, which reports
    /// "Scenario not found" as plain text rather than a structured body.
    pub fn error_text(message: impl Into<String>) -> Self {
        Self {
            error: Some(Value::String(message.into())),
            ..Self::new()
        }
    }

    /// Records a named failure under the `error` object, creating the object
    /// if necessary.
    ///
    /// The rename protocol uses this to report its two independent failure
    /// domains as `error.database` and `error.cache` without aborting.
    pub fn record_error_field(&mut self, field: &str, message: impl Into<String>) {
        let error = self
            .error
            .get_or_insert_with(|| Value::Object(Map::new()));
        if !error.is_object() {
            // A previous stage left a non-object error; replace it so the
            // named field is not silently dropped.
            *error = Value::Object(Map::new());
        }
        if let Some(obj) = error.as_object_mut() {
            obj.insert(field.to_string(), Value::String(message.into()));
        }
    }

    /// Inserts an additional top-level member.
    pub fn insert_extra(&mut self, key: &str, value: Value) {
        self.extra.insert(key.to_string(), value);
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}
