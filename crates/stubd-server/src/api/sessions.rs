//! Session Lifecycle
//!
//! Sessions are driven through the scenario action endpoint. The action body
//! carries exactly one of:
//!
//! - `{"begin": null, "session": "<name>", "mode": "record"|"playback"}`
//! - `{"end": null, "session": "<name>"}`
//! - `{"end": "sessions"}` — end every session of the scenario
//! - `{"rename": "<new name>"}` — the scenario-rename protocol
//!
//! Supplying `begin` and `end` together is a 409.

use hyper::body::Bytes;
use serde_json::{json, Value};

use stubd_core::transport::HttpEnvelope;
use stubd_core::{Envelope, Result, ServiceError};
use stubd_store::SessionStatus;

use crate::api::{qualified, scenario_ref, AppState};
use crate::context::RequestContext;
use crate::rename;

/// Dispatches a scenario action body to the matching operation.
pub fn action(
    ctx: &mut RequestContext,
    state: &AppState,
    scenario_name: &str,
    body: &Bytes,
) -> Result<Envelope> {
    let payload = HttpEnvelope::parse_json_body(body)?;

    if payload.get("begin").is_some() && payload.get("end").is_some() {
        return Err(ServiceError::domain(
            409,
            "Conflicting session actions: begin and end both supplied",
        ));
    }

    if payload.get("begin").is_some() {
        ctx.function = Some("begin/session".to_string());
        let session = payload
            .get("session")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::domain(400, "'session' parameter not supplied."))?;
        let mode = payload.get("mode").and_then(Value::as_str);
        return begin(ctx, state, scenario_name, session, mode);
    }

    if let Some(end) = payload.get("end") {
        if end.as_str() == Some("sessions") {
            ctx.function = Some("end/sessions".to_string());
            return end_all(ctx, state, scenario_name);
        }
        ctx.function = Some("end/session".to_string());
        let session = payload
            .get("session")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::domain(400, "'session' parameter not supplied."))?;
        return end_one(ctx, state, session);
    }

    if let Some(new_name) = payload.get("rename").and_then(Value::as_str) {
        ctx.function = Some("rename/scenario".to_string());
        return rename::rename_scenario(
            ctx,
            state.store.as_ref(),
            state.cache.as_ref(),
            scenario_name,
            new_name,
        );
    }

    Err(ServiceError::domain(400, "Unknown scenario action"))
}

/// Begins a session in record or playback mode.
pub fn begin(
    ctx: &mut RequestContext,
    state: &AppState,
    scenario_name: &str,
    session: &str,
    mode: Option<&str>,
) -> Result<Envelope> {
    let mode = match mode {
        Some("record") => SessionStatus::Record,
        Some("playback") => SessionStatus::Playback,
        _ => {
            return Err(ServiceError::domain(
                400,
                "'mode' of playback or record required",
            ))
        }
    };

    let qualified = qualified(&ctx.host, scenario_name);
    if state.store.find(&qualified)?.is_none() {
        return Err(ServiceError::domain(
            400,
            format!("Begin session failed - scenario not found: {}", qualified),
        ));
    }
    if let Some(entry) = state.cache.find_session(session)? {
        if entry.status != SessionStatus::Dormant {
            return Err(ServiceError::domain(
                400,
                format!("Session already exists in {} mode - {}", entry.status, session),
            ));
        }
    }

    let stubs = state.store.stubs(&qualified)?;
    match mode {
        SessionStatus::Record if !stubs.is_empty() => {
            return Err(ServiceError::domain(
                400,
                format!(
                    "Scenario already has stubs - delete stubs before recording: {}",
                    qualified
                ),
            ));
        }
        SessionStatus::Playback if stubs.is_empty() => {
            return Err(ServiceError::domain(
                400,
                format!("Playback requires stubs - none found for scenario: {}", qualified),
            ));
        }
        _ => {}
    }

    state.cache.create_session_entry(scenario_name, session)?;
    state.cache.set_status(session, mode)?;
    if mode == SessionStatus::Playback {
        state.cache.put_session_stubs(session, stubs)?;
    }
    tracing::info!(scenario = %qualified, session, mode = %mode, "session started");

    ctx.scenario = Some(scenario_name.to_string());
    ctx.session = Some(session.to_string());
    Ok(Envelope::data(json!({
        "message": format!("Session {} started in {} mode", session, mode),
        "scenario": qualified,
        "scenarioRef": scenario_ref(&qualified),
        "session": session,
        "status": mode.to_string(),
    })))
}

/// Ends one session. Idempotent; a missing session is a no-op.
pub fn end_one(ctx: &mut RequestContext, state: &AppState, session: &str) -> Result<Envelope> {
    state.cache.end_session(session)?;
    ctx.session = Some(session.to_string());
    Ok(Envelope::data(json!({"message": "Session ended"})))
}

/// Ends every session of a scenario, reporting each one.
pub fn end_all(
    ctx: &mut RequestContext,
    state: &AppState,
    scenario_name: &str,
) -> Result<Envelope> {
    let sessions = state.cache.session_statuses(scenario_name)?;
    let mut ended = Vec::with_capacity(sessions.len());
    for (session, _) in sessions {
        state.cache.end_session(&session)?;
        ended.push(json!({"session": session, "status": "dormant"}));
    }
    ctx.scenario = Some(scenario_name.to_string());
    Ok(Envelope::data(Value::Array(ended)))
}
