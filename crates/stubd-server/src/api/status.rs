//! Server Status
//!
//! Reports the metrics snapshot (uptime plus per-endpoint call statistics)
//! and, when a scenario is named, the status of its cached sessions.

use serde_json::{json, Value};

use stubd_core::{Envelope, Result};

use crate::api::{short_name, AppState};
use crate::context::RequestContext;

pub fn get_status(
    ctx: &mut RequestContext,
    state: &AppState,
    scenario: Option<&str>,
) -> Result<Envelope> {
    let snapshot = state.metrics.snapshot();
    let mut data = serde_json::to_value(&snapshot)?;

    if let Some(scenario) = scenario {
        let sessions: Vec<Value> = state
            .cache
            .session_statuses(short_name(scenario))?
            .into_iter()
            .map(|(session, status)| json!({"session": session, "status": status.to_string()}))
            .collect();
        if let Some(object) = data.as_object_mut() {
            object.insert("sessions".to_string(), Value::Array(sessions));
        }
        ctx.scenario = Some(short_name(scenario).to_string());
    }
    Ok(Envelope::data(data))
}
