//! HTTP Transport Utilities
//!
//! Conversion between response envelopes and hyper HTTP messages.
//!
//! # Components
//!
//! - **[`HttpEnvelope`]**: envelope/HTTP conversion functions
//! - **[`HyperRequest`]**: type alias for hyper incoming requests
//! - **[`HyperResponse`]**: type alias for hyper responses
//!
//! Every outgoing response is stamped with the [`VERSION_HEADER`] header,
//! regardless of success or failure.

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, StatusCode};
use serde_json::Value;

use crate::protocol::envelope::{Envelope, VERSION};
use crate::protocol::error::ServiceError;

/// Type alias for hyper incoming requests
pub type HyperRequest = Request<Incoming>;

/// Type alias for hyper responses with full body
pub type HyperResponse = Response<Full<Bytes>>;

/// Header stamped onto every response with the server version.
pub const VERSION_HEADER: &str = "x-stubd-version";

/// Envelope/HTTP conversion functions.
pub struct HttpEnvelope;

impl HttpEnvelope {
    /// Converts an envelope into an HTTP response with the given status.
    ///
    /// The response carries `Content-Type: application/json` and the
    /// `x-stubd-version` header.
    pub fn to_http_response(envelope: &Envelope, status: StatusCode) -> HyperResponse {
        let body = serde_json::to_vec(envelope).unwrap_or_default();

        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .header(VERSION_HEADER, VERSION)
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }

    /// Parses a JSON body, mapping the two body-level failures to domain
    /// errors: an empty body is 415 ("No JSON body found"), malformed JSON
    /// is 400.
    pub fn parse_json_body(body: &Bytes) -> Result<Value, ServiceError> {
        if body.is_empty() {
            return Err(ServiceError::domain(415, "No JSON body found"));
        }
        serde_json::from_slice(body)
            .map_err(|e| ServiceError::domain(400, format!("Invalid JSON body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_carries_version_header() {
        let env = Envelope::data(json!({"ok": true}));
        let res = HttpEnvelope::to_http_response(&env, StatusCode::OK);
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get(VERSION_HEADER).unwrap(), VERSION);
        assert_eq!(
            res.headers().get("Content-Type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_error_response_carries_version_header() {
        let env = Envelope::error_text("boom");
        let res = HttpEnvelope::to_http_response(&env, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.headers().get(VERSION_HEADER).unwrap(), VERSION);
    }

    #[test]
    fn test_parse_json_body_empty_is_415() {
        let err = HttpEnvelope::parse_json_body(&Bytes::new()).unwrap_err();
        assert_eq!(err.code(), 415);
        assert_eq!(err.to_string(), "No JSON body found");
    }

    #[test]
    fn test_parse_json_body_malformed_is_400() {
        let err = HttpEnvelope::parse_json_body(&Bytes::from_static(b"{nope")).unwrap_err();
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn test_parse_json_body_valid() {
        let value =
            HttpEnvelope::parse_json_body(&Bytes::from_static(b"{\"scenario\": \"s1\"}")).unwrap();
        assert_eq!(value, json!({"scenario": "s1"}));
    }
}
