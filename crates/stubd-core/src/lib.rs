//! stubd Protocol Types and HTTP Transport
//!
//! This crate provides the response envelope, the failure taxonomy, and the
//! HTTP transport helpers shared by every stubd component.
//!
//! # Overview
//!
//! stubd is a service-virtualization server: clients record request/response
//! traffic against a named scenario and replay it later, optionally with
//! injected delay. This crate contains the wire-facing pieces the rest of the
//! system agrees on:
//!
//! - **Protocol layer**: the uniform response [`Envelope`], the structured
//!   [`ErrorBody`], and the [`ServiceError`] failure type that crosses the
//!   execution bridge.
//! - **Transport layer**: conversion between envelopes and hyper responses,
//!   including the `x-stubd-version` header every response carries.
//!
//! # Response Envelope
//!
//! Every response body is `{"version": <string>, "data": ...}` on success or
//! `{"version": <string>, "error": ...}` on failure. The `error` member is
//! schema-flexible: the classifier emits `{code, message, traceback?}`, while
//! the scenario-rename protocol reports partial failures under
//! `error.database` / `error.cache` sub-fields.
//!
//! # Example
//!
//! ```
//! use stubd_core::{Envelope, ServiceError};
//! use serde_json::json;
//!
//! let ok = Envelope::data(json!({"name": "localhost:checkout"}));
//! assert!(ok.error.is_none());
//!
//! let err = ServiceError::domain(422, "Scenario already exists");
//! let failed = Envelope::failure(err.error_body());
//! assert!(failed.data.is_none());
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
