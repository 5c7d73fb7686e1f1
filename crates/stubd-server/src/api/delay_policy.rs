//! Delay Policy Management
//!
//! Each delay type requires its own parameter set and rejects the others:
//!
//! | type          | requires           | rejects                      |
//! |---------------|--------------------|------------------------------|
//! | fixed         | milliseconds       | mean, stddev, delays         |
//! | normalvariate | mean, stddev       | milliseconds, delays         |
//! | weighted      | delays             | milliseconds, mean, stddev   |
//!
//! A parameter mismatch is a 409; a missing name or type is a 400. Storing a
//! new name answers 201 / `"new"`, overwriting answers 200 / `"updated"`.

use hyper::body::Bytes;
use serde_json::{json, Value};

use stubd_core::transport::HttpEnvelope;
use stubd_core::{Envelope, Result, ServiceError};
use stubd_store::{DelayPolicy, DelayType};

use crate::api::AppState;
use crate::context::RequestContext;

/// Creates or overwrites a delay policy.
pub fn update(ctx: &mut RequestContext, state: &AppState, body: &Bytes) -> Result<Envelope> {
    let payload = HttpEnvelope::parse_json_body(body)?;
    let name = payload
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ServiceError::domain(400, "Delay policy name not supplied"))?;
    let type_text = payload
        .get("delay_type")
        .and_then(Value::as_str)
        .ok_or_else(|| ServiceError::domain(400, "Delay policy type not supplied"))?;
    let delay_type: DelayType = type_text
        .parse()
        .map_err(|_| ServiceError::domain(400, format!("Unknown delay type: {}", type_text)))?;

    let milliseconds = payload.get("milliseconds").and_then(Value::as_u64);
    let mean = payload.get("mean").and_then(Value::as_u64);
    let stddev = payload.get("stddev").and_then(Value::as_u64);
    let delays = payload
        .get("delays")
        .and_then(Value::as_str)
        .map(str::to_string);

    match delay_type {
        DelayType::Fixed => {
            if milliseconds.is_none() || mean.is_some() || stddev.is_some() || delays.is_some() {
                return Err(ServiceError::domain(
                    409,
                    "Fixed delay requires 'milliseconds' and no other parameters",
                ));
            }
        }
        DelayType::Normalvariate => {
            if mean.is_none() || stddev.is_none() || milliseconds.is_some() || delays.is_some() {
                return Err(ServiceError::domain(
                    409,
                    "Normalvariate delay requires 'mean' and 'stddev' and no other parameters",
                ));
            }
        }
        DelayType::Weighted => {
            if delays.is_none() || milliseconds.is_some() || mean.is_some() || stddev.is_some() {
                return Err(ServiceError::domain(
                    409,
                    "Weighted delay requires 'delays' and no other parameters",
                ));
            }
        }
    }

    let policy = DelayPolicy {
        name: name.to_string(),
        delay_type,
        milliseconds,
        mean,
        stddev,
        delays,
    };
    let is_new = state.cache.set_delay_policy(policy)?;
    let status = if is_new {
        ctx.set_status(201);
        "new"
    } else {
        "updated"
    };
    tracing::info!(name, delay_type = %delay_type, status, "stored delay policy");

    Ok(Envelope::data(json!({
        "message": format!("Put delay policy finished - {}", name),
        "name": name,
        "delay_type": type_text,
        "status": status,
    })))
}

/// Fetches one delay policy by name, or all policies when no name is given.
pub fn get(_ctx: &mut RequestContext, state: &AppState, name: Option<&str>) -> Result<Envelope> {
    match name {
        Some(name) => {
            let policy = state.cache.get_delay_policy(name)?.ok_or_else(|| {
                ServiceError::domain(404, format!("Delay policy not found - {}", name))
            })?;
            Ok(Envelope::data(serde_json::to_value(&policy)?))
        }
        None => Ok(Envelope::data(json!({
            "delay_policies": state.cache.all_delay_policies()?,
        }))),
    }
}

/// Deletes a delay policy. 404 when absent.
pub fn delete(_ctx: &mut RequestContext, state: &AppState, name: &str) -> Result<Envelope> {
    if !state.cache.delete_delay_policy(name)? {
        return Err(ServiceError::domain(
            404,
            format!("Delay policy not found - {}", name),
        ));
    }
    Ok(Envelope::data(json!({
        "message": format!("Deleted delay policy {}", name),
    })))
}
