//! API Handlers
//!
//! Synchronous domain handlers, one module per resource. Handlers receive the
//! per-request context plus the shared [`AppState`] and return
//! `Result<Envelope, ServiceError>`; the execution bridge classifies the
//! outcome. Handlers never build failure envelopes themselves — they raise
//! domain errors with the status code they want. The one exception is the
//! rename protocol, which reports partial failure inside a success envelope.

use std::sync::Arc;

use stubd_core::ServiceError;
use stubd_metrics::MetricsCollector;
use stubd_store::{
    CommandQueue, InMemoryCache, InMemoryCommandQueue, InMemoryStore, ModuleRegistry,
    ScenarioStore, SessionCache,
};

pub mod delay_policy;
pub mod modules;
pub mod scenarios;
pub mod sessions;
pub mod status;
pub mod stubs;


/// Shared server state handed to every handler.
pub struct AppState {
    pub store: Arc<dyn ScenarioStore>,
    pub cache: Arc<dyn SessionCache>,
    pub modules: Arc<ModuleRegistry>,
    pub commands: Arc<dyn CommandQueue>,
    pub metrics: Arc<MetricsCollector>,
}

impl AppState {
    /// State backed entirely by in-memory implementations, scoped to `host`.
    pub fn in_memory(host: &str) -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            cache: Arc::new(InMemoryCache::new(host)),
            modules: Arc::new(ModuleRegistry::new()),
            commands: Arc::new(InMemoryCommandQueue::new()),
            metrics: Arc::new(MetricsCollector::new()),
        }
    }
}

/// Parsed query string, order-preserving and repeatable-key friendly.
pub type Query = Vec<(String, String)>;

/// First value of a query parameter, when present and non-empty.
pub fn arg<'a>(query: &'a Query, name: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(key, value)| key == name && !value.is_empty())
        .map(|(_, value)| value.as_str())
}

/// All values of a repeatable query parameter, in order.
pub fn args(query: &Query, name: &str) -> Vec<String> {
    query
        .iter()
        .filter(|(key, value)| key == name && !value.is_empty())
        .map(|(_, value)| value.clone())
        .collect()
}

/// Raises the standard 400 for a missing required parameter.
pub fn missing_arg(name: &str) -> ServiceError {
    ServiceError::domain(400, format!("'{}' parameter not supplied.", name))
}

/// Qualifies a scenario name with the host namespace. Names that already
/// carry a `host:` prefix pass through unchanged.
pub fn qualified(host: &str, name: &str) -> String {
    if name.contains(':') {
        name.to_string()
    } else {
        format!("{}:{}", host, name)
    }
}

/// Strips the host qualifier from a scenario name, when present.
pub fn short_name(name: &str) -> &str {
    name.split_once(':').map(|(_, short)| short).unwrap_or(name)
}

/// Canonical resource path for a scenario.
pub fn scenario_ref(qualified: &str) -> String {
    format!("/api/v2/scenarios/objects/{}", qualified)
}
