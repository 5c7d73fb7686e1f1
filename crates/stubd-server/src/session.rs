//! Session Resolution
//!
//! Playback and recording requests name their session one of three ways, in
//! priority order:
//!
//! 1. An explicit `session` query parameter.
//! 2. The canonical [`SESSION_HEADER`] request header.
//! 3. The legacy header pair [`LEGACY_SESSION_TAG`] + [`LEGACY_SCENARIO_TAG`],
//!    matched as header-name substrings; both must be present, and the
//!    session identity is the composition `<scenario value>_<session value>`.
//!    The composed name is written back under the canonical header so
//!    tracking sees a uniform value regardless of protocol generation.
//!
//! Missing identification is a 400 with a message naming the first absent
//! piece.

use stubd_core::{Result, ServiceError};

use crate::context::RequestContext;

/// Canonical session header.
pub const SESSION_HEADER: &str = "stubd-request-session";

/// Legacy session tag, honored only together with the scenario tag.
pub const LEGACY_SESSION_TAG: &str = "stb_session";

/// Legacy scenario tag accompanying [`LEGACY_SESSION_TAG`].
pub const LEGACY_SCENARIO_TAG: &str = "stb_scenario";

/// Resolves the session a request operates on and records it on the context.
///
/// Legacy requests name the session as the pair `stb_scenario` +
/// `stb_session`; the resolved identity is `<scenario>_<session>`, recorded
/// under the canonical header key.
pub fn resolve_session(ctx: &mut RequestContext, explicit: Option<&str>) -> Result<String> {
    let session = if let Some(session) = explicit {
        session.to_string()
    } else if let Some(session) = ctx.header(SESSION_HEADER) {
        session.to_string()
    } else {
        let session = ctx
            .header_containing(LEGACY_SESSION_TAG)
            .map(str::to_string)
            .ok_or_else(|| ServiceError::domain(400, "session not supplied in headers."))?;
        let scenario = ctx
            .header_containing(LEGACY_SCENARIO_TAG)
            .map(str::to_string)
            .ok_or_else(|| {
                ServiceError::domain(400, "scenario parameter not supplied in headers.")
            })?;
        let composed = format!("{}_{}", scenario, session);
        ctx.request_headers
            .insert(SESSION_HEADER.to_string(), composed.clone());
        ctx.scenario = Some(scenario);
        composed
    };
    ctx.session = Some(session.clone());
    Ok(session)
}
