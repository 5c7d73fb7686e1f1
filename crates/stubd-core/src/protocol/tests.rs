//! Cross-module protocol tests: envelope + failure taxonomy round trips.

use super::*;
use serde_json::json;

#[test]
fn test_failure_envelope_from_domain_error() {
    let err = ServiceError::domain(412, "Precondition failed");
    let env = Envelope::failure(err.error_body());
    assert_eq!(env.error.as_ref().unwrap()["code"], json!(412));
    assert_eq!(env.error.as_ref().unwrap()["message"], json!("Precondition failed"));
}

#[test]
fn test_failure_envelope_from_unclassified_error() {
    let err = ServiceError::unclassified(FailureKind::Cache, "lost connection");
    let env = Envelope::failure(err.error_body());
    assert_eq!(env.error.as_ref().unwrap()["code"], json!(500));
    assert_eq!(
        env.error.as_ref().unwrap()["message"],
        json!("cache: lost connection")
    );
}

#[test]
fn test_envelope_version_matches_crate() {
    let env = Envelope::new();
    assert_eq!(env.version, VERSION);
}

#[test]
fn test_partial_failure_envelope_round_trip() {
    // The shape the rename protocol emits: both error sub-fields and an
    // extra top-level member in one envelope.
    let mut env = Envelope::new();
    env.record_error_field("database", "rename failed");
    env.insert_extra("Remapped sessions", json!([{"name": "s1"}, {"name": "s2"}]));

    let text = serde_json::to_string(&env).unwrap();
    let back: Envelope = serde_json::from_str(&text).unwrap();
    assert_eq!(back, env);
    assert_eq!(back.extra["Remapped sessions"].as_array().unwrap().len(), 2);
}
