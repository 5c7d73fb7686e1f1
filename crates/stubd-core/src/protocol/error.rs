//! Failure Taxonomy
//!
//! [`ServiceError`] is the single failure type that crosses the async
//! execution bridge. It distinguishes:
//!
//! - **Domain failures**: raised by domain collaborators with an explicit
//!   status code and a human-readable title (validation, state conflicts).
//!   The response status becomes that code.
//! - **Unclassified failures**: anything else. These carry a tagged
//!   [`FailureKind`] plus a free-text detail instead of embedding runtime
//!   type names, and surface as 500 with `"<kind>: <detail>"` — unless the
//!   handler already set a non-default status, which is preserved.

use crate::protocol::envelope::ErrorBody;
use std::fmt;
use thiserror::Error;

/// Tagged kind for unclassified failures.
///
/// The wire message is `"<kind>: <detail>"`, so classification logic never
/// depends on runtime type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Persistent scenario/stub store failure
    Storage,
    /// Session cache failure
    Cache,
    /// JSON encode/decode failure
    Codec,
    /// Worker-pool task failure (e.g. a panicking handler body)
    Task,
    /// I/O failure
    Io,
    /// Anything else
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Storage => "storage",
            FailureKind::Cache => "cache",
            FailureKind::Codec => "codec",
            FailureKind::Task => "task",
            FailureKind::Io => "io",
            FailureKind::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    /// A failure with an explicit status code and title, raised by domain
    /// collaborators and only formatted by the classifier.
    #[error("{title}")]
    Domain {
        code: u16,
        title: String,
        traceback: Option<String>,
    },

    /// Any other failure; classified as 500.
    #[error("{kind}: {detail}")]
    Unclassified {
        kind: FailureKind,
        detail: String,
        traceback: Option<String>,
    },
}

impl ServiceError {
    /// Creates a domain failure with the given status code and title.
    pub fn domain(code: u16, title: impl Into<String>) -> Self {
        ServiceError::Domain {
            code,
            title: title.into(),
            traceback: None,
        }
    }

    /// Creates an unclassified failure with a tagged kind.
    pub fn unclassified(kind: FailureKind, detail: impl Into<String>) -> Self {
        ServiceError::Unclassified {
            kind,
            detail: detail.into(),
            traceback: None,
        }
    }

    /// Attaches a diagnostic trace.
    pub fn with_traceback(mut self, trace: impl Into<String>) -> Self {
        match &mut self {
            ServiceError::Domain { traceback, .. }
            | ServiceError::Unclassified { traceback, .. } => *traceback = Some(trace.into()),
        }
        self
    }

    /// The status code the classifier assigns to this failure, ignoring any
    /// earlier status override (that rule lives in the classifier).
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::Domain { code, .. } => *code,
            ServiceError::Unclassified { .. } => 500,
        }
    }

    /// Builds the structured error body for the response envelope.
    pub fn error_body(&self) -> ErrorBody {
        match self {
            ServiceError::Domain {
                code,
                title,
                traceback,
            } => ErrorBody {
                code: *code,
                message: title.clone(),
                traceback: traceback.clone(),
            },
            ServiceError::Unclassified {
                kind,
                detail,
                traceback,
            } => ErrorBody {
                code: 500,
                message: format!("{}: {}", kind, detail),
                traceback: traceback.clone(),
            },
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::unclassified(FailureKind::Codec, err.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::unclassified(FailureKind::Io, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
