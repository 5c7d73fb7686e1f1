//! Transport layer: envelope <-> HTTP conversion helpers.

pub mod http;

pub use http::{HttpEnvelope, HyperRequest, HyperResponse, VERSION_HEADER};
