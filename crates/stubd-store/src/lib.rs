//! stubd Storage Boundaries
//!
//! This crate defines the narrow interfaces the request-orchestration core
//! calls into, plus in-memory implementations used by the server and the test
//! suites:
//!
//! - [`ScenarioStore`] — the persistent scenario/stub store. Authoritative.
//! - [`SessionCache`] — the derived, rebuildable per-host session cache.
//!   Never authoritative; always reconstructible from the store.
//! - [`ModuleRegistry`] — named modules loaded per host.
//! - [`CommandQueue`] — the per-host outbox of fire-and-forget commands for
//!   cluster peer nodes. Produce-only; draining belongs to the (external)
//!   propagation transport.
//!
//! None of these provide cross-boundary transactions. The scenario-rename
//! protocol in `stubd-server` deliberately treats the store and the cache as
//! independent failure domains.

pub mod cache;
pub mod command_queue;
pub mod delay;
pub mod module;
pub mod scenario;

pub use cache::{CacheError, InMemoryCache, SessionCache, SessionEntry, SessionStatus};
pub use command_queue::{CommandQueue, InMemoryCommandQueue};
pub use delay::{DelayPolicy, DelayType};
pub use module::{Module, ModuleRegistry};
pub use scenario::{InMemoryStore, Scenario, ScenarioStore, StoreError, StubRecord};
