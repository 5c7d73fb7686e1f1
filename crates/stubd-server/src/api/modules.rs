//! Module Management & Command Propagation
//!
//! Modules are named transformation sources loaded per host. Deleting a
//! module is the demonstrated distributed mutation: peer nodes hold their own
//! loaded copy, so the accepting node enqueues one `delete/module?name=<n>`
//! command per module into the per-host outbox before unloading locally.
//! Enqueueing never fails the request; propagation is eventually consistent.

use hyper::body::Bytes;
use serde_json::json;

use stubd_core::{Envelope, Result, ServiceError};
use stubd_store::Module;

use crate::api::AppState;
use crate::context::RequestContext;

/// Loads a module from the raw request body. 422 when the name is taken.
pub fn put_module(
    ctx: &mut RequestContext,
    state: &AppState,
    name: &str,
    body: &Bytes,
) -> Result<Envelope> {
    let source = String::from_utf8_lossy(body).to_string();
    if source.trim().is_empty() {
        return Err(ServiceError::domain(400, "Module source not supplied"));
    }
    let module = Module {
        name: name.to_string(),
        source,
    };
    if !state.modules.insert(&ctx.host, module) {
        return Err(ServiceError::domain(
            422,
            format!("Module already exists - {}", name),
        ));
    }
    tracing::info!(host = %ctx.host, module = name, "loaded module");

    ctx.set_status(201);
    Ok(Envelope::data(json!({
        "message": format!("Module {} added", name),
        "modules": state.modules.names(&ctx.host),
    })))
}

/// Lists module names loaded for the request host.
pub fn list(ctx: &mut RequestContext, state: &AppState) -> Result<Envelope> {
    Ok(Envelope::data(json!({
        "modules": state.modules.names(&ctx.host),
    })))
}

/// Unloads the named modules, propagating one delete command per module to
/// peer nodes first.
pub fn delete_modules(
    ctx: &mut RequestContext,
    state: &AppState,
    names: &[String],
) -> Result<Envelope> {
    // Peers must unload too, not just the accepting node; commands go out
    // before local state changes.
    for name in names {
        state
            .commands
            .enqueue(&ctx.host, &format!("delete/module?name={}", name));
    }
    let mut deleted = Vec::new();
    for name in names {
        if state.modules.remove(&ctx.host, name) {
            deleted.push(name.clone());
        }
    }
    tracing::info!(host = %ctx.host, count = deleted.len(), "unloaded modules");
    Ok(Envelope::data(json!({"deleted": deleted})))
}

/// Unloads every module of the request host, with the same propagation.
pub fn delete_all(ctx: &mut RequestContext, state: &AppState) -> Result<Envelope> {
    let names = state.modules.names(&ctx.host);
    delete_modules(ctx, state, &names)
}
