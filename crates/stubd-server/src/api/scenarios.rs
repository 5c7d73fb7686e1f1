//! Scenario CRUD
//!
//! Scenarios are created through the v2 collection endpoint and addressed by
//! qualified name (`host:scenario`). A creation payload may override the
//! request host by embedding the qualifier in the scenario name.

use hyper::body::Bytes;
use serde_json::{json, Value};

use stubd_core::transport::HttpEnvelope;
use stubd_core::{Envelope, Result, ServiceError};
use stubd_store::Scenario;

use crate::api::{qualified, scenario_ref, short_name, AppState};
use crate::context::RequestContext;

fn illegal_name(name: &str) -> bool {
    name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Creates a scenario. 201 on success; 422 when the qualified name exists.
pub fn create(ctx: &mut RequestContext, state: &AppState, body: &Bytes) -> Result<Envelope> {
    let payload = HttpEnvelope::parse_json_body(body)?;
    let name = payload
        .get("scenario")
        .and_then(Value::as_str)
        .ok_or_else(|| ServiceError::domain(400, "Scenario name not supplied"))?;

    // "other-host:name" targets another host's namespace.
    let (host, short) = match name.split_once(':') {
        Some((host, short)) => (host.to_string(), short.to_string()),
        None => (ctx.host.clone(), name.to_string()),
    };
    if illegal_name(&short) {
        return Err(ServiceError::domain(
            400,
            format!(
                "Scenario name is blank or contains illegal characters: '{}'",
                short
            ),
        ));
    }

    let qualified = format!("{}:{}", host, short);
    if state.store.find(&qualified)?.is_some() {
        return Err(ServiceError::domain(
            422,
            format!("Scenario already exists - {}", qualified),
        ));
    }
    let record = state.store.insert(&qualified)?;
    tracing::info!(scenario = %record.name, "created scenario");

    ctx.scenario = Some(short);
    ctx.set_status(201);
    Ok(Envelope::data(json!({
        "name": record.name,
        "scenarioRef": scenario_ref(&record.name),
    })))
}

/// Lists scenarios for the request host as name/ref pairs.
pub fn list(ctx: &mut RequestContext, state: &AppState) -> Result<Envelope> {
    let scenarios: Vec<Value> = state
        .store
        .list(&ctx.host)?
        .into_iter()
        .map(|record| {
            json!({
                "name": record.name,
                "scenarioRef": scenario_ref(&record.name),
            })
        })
        .collect();
    Ok(Envelope::data(json!({"scenarios": scenarios})))
}

/// Lists scenarios for the request host with per-scenario detail.
pub fn detail_list(ctx: &mut RequestContext, state: &AppState) -> Result<Envelope> {
    let mut entries = Vec::new();
    for record in state.store.list(&ctx.host)? {
        entries.push(detail_entry(state, &record)?);
    }
    Ok(Envelope::data(json!({"scenarios": entries})))
}

/// Fetches one scenario's detail. 404 when absent.
pub fn get_one(ctx: &mut RequestContext, state: &AppState, name: &str) -> Result<Envelope> {
    let qualified = qualified(&ctx.host, name);
    let record = state
        .store
        .find(&qualified)?
        .ok_or_else(|| ServiceError::domain(404, format!("Scenario not found - {}", qualified)))?;
    ctx.scenario = Some(short_name(&qualified).to_string());
    Ok(Envelope::data(detail_entry(state, &record)?))
}

/// Deletes a scenario and its cached sessions. 412 when absent.
pub fn delete(ctx: &mut RequestContext, state: &AppState, name: &str) -> Result<Envelope> {
    let qualified = qualified(&ctx.host, name);
    if state.store.find(&qualified)?.is_none() {
        return Err(ServiceError::domain(
            412,
            format!("Precondition failed - scenario does not exist: {}", qualified),
        ));
    }
    // Cached sessions go first so no playback can race the removal.
    state.cache.delete_all(short_name(&qualified))?;
    state.store.remove(&qualified)?;
    tracing::info!(scenario = %qualified, "deleted scenario");

    ctx.scenario = Some(short_name(&qualified).to_string());
    Ok(Envelope::data(json!({
        "message": format!("Deleted scenario {}", qualified),
    })))
}

fn detail_entry(state: &AppState, record: &Scenario) -> Result<Value> {
    let stubs = state.store.stubs(&record.name)?;
    let space_used: usize = stubs
        .iter()
        .map(|stub| stub.response.len() + stub.matchers.iter().map(String::len).sum::<usize>())
        .sum();
    Ok(json!({
        "name": record.name,
        "recorded": record.recorded,
        "stub_count": stubs.len(),
        "space_used_kb": space_used / 1024,
        "scenarioRef": scenario_ref(&record.name),
    }))
}
