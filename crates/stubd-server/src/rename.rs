//! Scenario Rename & Cache Rebuild
//!
//! Renaming a scenario touches two stores that share no transaction: the
//! persistent scenario/stub store and the derived session cache. The protocol
//! therefore runs as two independent stages and reports partial failure
//! instead of aborting:
//!
//! 1. **Lookup**: a missing source scenario short-circuits with a bare-string
//!    error and a 400 status.
//! 2. **Database stage**: rename the store record and its stubs. On failure
//!    the error is recorded under `error.database` and the protocol
//!    continues; the response status is left at its default.
//! 3. **Cache stage**: always runs. Entries scoped to the old name are torn
//!    down and rebuilt under the new name with the renamed stubs loaded;
//!    rebuilt sessions come back dormant. On success the remapped session
//!    names are reported in the `"Remapped sessions"` member; on failure the
//!    member is omitted and the error is recorded under `error.cache`.
//!
//! Running the protocol twice is safe: the second pass finds no source
//! scenario and no old-name cache entries.

use serde_json::{json, Value};

use stubd_core::{Envelope, Result, ServiceError};
use stubd_store::{ScenarioStore, SessionCache};

use crate::api::qualified;
use crate::context::RequestContext;

/// Renames a scenario and rebuilds the session cache under the new name.
///
/// Returns a single envelope describing the outcome, including partial
/// failures. Only pre-stage failures (the existence lookup) propagate as
/// errors.
pub fn rename_scenario(
    ctx: &mut RequestContext,
    store: &dyn ScenarioStore,
    cache: &dyn SessionCache,
    old_name: &str,
    new_name: &str,
) -> Result<Envelope> {
    let qualified_old = qualified(&ctx.host, old_name);
    let qualified_new = qualified(&ctx.host, new_name);

    if store.find(&qualified_old).map_err(ServiceError::from)?.is_none() {
        ctx.scenario = Some(old_name.to_string());
        ctx.set_status(400);
        return Ok(Envelope::error_text(format!(
            "Scenario not found. Name provided: {}, host checked: {}.",
            old_name, ctx.host
        )));
    }

    let mut envelope = Envelope::new();

    match store.rename(&qualified_old, &qualified_new) {
        Ok(stub_count) => {
            tracing::info!(
                old = %qualified_old,
                new = %qualified_new,
                stubs = stub_count,
                "renamed scenario"
            );
            envelope.data = Some(json!({
                "old": qualified_old,
                "new": qualified_new,
                "stubs": stub_count,
            }));
        }
        Err(err) => {
            // The cache stage still runs; the status stays at its default.
            tracing::error!(old = %qualified_old, error = %err, "scenario rename failed");
            envelope.record_error_field("database", err.to_string());
        }
    }

    match rebuild_cache(store, cache, old_name, new_name, &qualified_new) {
        Ok(sessions) => {
            let remapped: Vec<Value> = sessions
                .into_iter()
                .map(|session| json!({"name": session}))
                .collect();
            envelope.insert_extra("Remapped sessions", Value::Array(remapped));
        }
        Err(err) => {
            tracing::error!(scenario = old_name, error = %err, "cache rebuild failed");
            envelope.record_error_field("cache", err.to_string());
        }
    }

    ctx.scenario = Some(new_name.to_string());
    Ok(envelope)
}

/// Tears down cache entries scoped to the old scenario name and recreates
/// them under the new one, dormant, with the renamed stubs loaded.
fn rebuild_cache(
    store: &dyn ScenarioStore,
    cache: &dyn SessionCache,
    old_name: &str,
    new_name: &str,
    qualified_new: &str,
) -> Result<Vec<String>> {
    let sessions = cache.session_statuses(old_name)?;
    cache.delete_all(old_name)?;
    let stubs = store.stubs(qualified_new).map_err(ServiceError::from)?;

    let mut remapped = Vec::with_capacity(sessions.len());
    for (session, _) in sessions {
        cache.create_session_entry(new_name, &session)?;
        cache.put_session_stubs(&session, stubs.clone())?;
        // Rebuilt entries must not silently resume playback.
        cache.end_session(&session)?;
        remapped.push(session);
    }
    Ok(remapped)
}
