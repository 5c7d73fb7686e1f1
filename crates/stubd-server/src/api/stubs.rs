//! Stub Recording & Playback
//!
//! Recording inserts stubs into the session's scenario; playback matches an
//! incoming request body against the session's loaded stubs. A stub matches
//! when every one of its matchers appears in the request text; the first
//! match wins, in insertion order.

use hyper::body::Bytes;
use serde_json::{json, Value};

use stubd_core::transport::HttpEnvelope;
use stubd_core::{Envelope, Result, ServiceError};
use stubd_store::{SessionStatus, StubRecord};

use crate::api::{qualified, short_name, AppState};
use crate::context::RequestContext;
use crate::session::resolve_session;

/// Records a stub into the resolved session's scenario. Requires an active
/// record session.
pub fn put_stub(
    ctx: &mut RequestContext,
    state: &AppState,
    session: Option<&str>,
    delay_policy: Option<&str>,
    body: &Bytes,
) -> Result<Envelope> {
    let session = resolve_session(ctx, session)?;
    let entry = state
        .cache
        .find_session(&session)?
        .ok_or_else(|| ServiceError::domain(400, format!("Session not found - {}", session)))?;
    if entry.status != SessionStatus::Record {
        return Err(ServiceError::domain(
            400,
            format!(
                "Put stub requires an active record session - '{}' is {}",
                session, entry.status
            ),
        ));
    }

    let payload = HttpEnvelope::parse_json_body(body)?;
    let matchers: Vec<String> = payload
        .pointer("/request/bodyPatterns")
        .and_then(Value::as_array)
        .map(|patterns| {
            patterns
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .ok_or_else(|| ServiceError::domain(400, "Stub request matchers not supplied"))?;
    let response = payload
        .pointer("/response/body")
        .and_then(Value::as_str)
        .ok_or_else(|| ServiceError::domain(400, "Stub response body not supplied"))?;

    let qualified = qualified(&ctx.host, &entry.scenario);
    let count = state.store.insert_stub(
        &qualified,
        StubRecord {
            matchers,
            response: response.to_string(),
            delay_policy: delay_policy.map(str::to_string),
        },
    )?;
    tracing::debug!(scenario = %qualified, session = %session, count, "recorded stub");

    ctx.scenario = Some(entry.scenario);
    ctx.set_status(201);
    Ok(Envelope::data(json!({
        "message": "inserted",
        "stub_count": count,
    })))
}

/// Lists a scenario's stubs. 404 when the scenario is absent.
pub fn stub_list(
    ctx: &mut RequestContext,
    state: &AppState,
    scenario_name: &str,
) -> Result<Envelope> {
    let qualified = qualified(&ctx.host, scenario_name);
    state
        .store
        .find(&qualified)?
        .ok_or_else(|| ServiceError::domain(404, format!("Scenario not found - {}", qualified)))?;
    let stubs = state.store.stubs(&qualified)?;
    ctx.scenario = Some(short_name(&qualified).to_string());
    Ok(Envelope::data(json!({
        "scenario": qualified,
        "stubs": stubs,
    })))
}

/// Exports a scenario with its stubs and record timestamp.
pub fn export(ctx: &mut RequestContext, state: &AppState, scenario_name: &str) -> Result<Envelope> {
    let qualified = qualified(&ctx.host, scenario_name);
    let record = state
        .store
        .find(&qualified)?
        .ok_or_else(|| ServiceError::domain(404, format!("Scenario not found - {}", qualified)))?;
    let stubs = state.store.stubs(&qualified)?;
    ctx.scenario = Some(short_name(&qualified).to_string());
    Ok(Envelope::data(json!({
        "scenario": record.name,
        "recorded": record.recorded,
        "stubs": stubs,
    })))
}

/// Deletes all of a scenario's stubs and unloads them from any cached
/// sessions still holding them.
pub fn delete_stubs(
    ctx: &mut RequestContext,
    state: &AppState,
    scenario_name: &str,
) -> Result<Envelope> {
    let qualified = qualified(&ctx.host, scenario_name);
    state
        .store
        .find(&qualified)?
        .ok_or_else(|| ServiceError::domain(404, format!("Scenario not found - {}", qualified)))?;
    let removed = state.store.delete_stubs(&qualified)?;

    let short = short_name(&qualified).to_string();
    for (session, _) in state.cache.session_statuses(&short)? {
        state.cache.put_session_stubs(&session, Vec::new())?;
    }
    tracing::info!(scenario = %qualified, removed, "deleted stubs");

    ctx.scenario = Some(short);
    Ok(Envelope::data(json!({
        "message": format!("Deleted {} stubs from {}", removed, qualified),
    })))
}

/// Plays back the first stub matching the request body. The matched stub's
/// delay policy, when set, becomes the context's deferred-finish delay.
pub fn get_response(
    ctx: &mut RequestContext,
    state: &AppState,
    session: Option<&str>,
    body: &Bytes,
) -> Result<Envelope> {
    ctx.function = Some("get/response".to_string());
    let session = resolve_session(ctx, session)?;
    tracing::debug!(session = %session, "resolving playback session");

    let entry = state
        .cache
        .find_session(&session)?
        .ok_or_else(|| ServiceError::domain(400, format!("Session not found - {}", session)))?;
    match entry.status {
        SessionStatus::Playback => {}
        SessionStatus::Record => {
            return Err(ServiceError::domain(
                400,
                format!("Cannot get response in record mode - session: {}", session),
            ));
        }
        SessionStatus::Dormant => {
            return Err(ServiceError::domain(
                400,
                format!("Session is dormant - begin playback first: {}", session),
            ));
        }
    }
    ctx.scenario = Some(entry.scenario.clone());

    let request_text = String::from_utf8_lossy(body);
    let stub = entry
        .stubs
        .iter()
        .find(|stub| {
            stub.matchers
                .iter()
                .all(|matcher| request_text.contains(matcher.as_str()))
        })
        .ok_or_else(|| {
            ServiceError::domain(400, format!("No matching stub found - session: {}", session))
        })?;

    if let Some(policy_name) = &stub.delay_policy {
        if let Some(policy) = state.cache.get_delay_policy(policy_name)? {
            ctx.delay = Some(policy.delay_hint_ms());
        }
    }
    Ok(Envelope::data(Value::String(stub.response.clone())))
}
