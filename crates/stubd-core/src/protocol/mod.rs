//! Core protocol types: the response envelope and the failure taxonomy.

pub mod envelope;
pub mod error;

pub use envelope::{Envelope, ErrorBody, VERSION};
pub use error::{FailureKind, Result, ServiceError};

#[cfg(test)]
mod tests;
