//! stubd Server Core
//!
//! Request orchestration for the stubd service-virtualization server. Every
//! API request flows through the same pipeline:
//!
//! 1. The HTTP router ([`Router`]) parses the path, query, and headers into a
//!    [`RequestContext`] and picks a handler.
//! 2. The async execution bridge ([`ExecBridge`]) runs the handler on the
//!    bounded worker pool, classifies its outcome into the uniform response
//!    envelope, and applies any deferred-finish delay.
//! 3. The transport layer writes the envelope back with the version header.
//!
//! Domain logic lives in [`api`]; the scenario-rename and session-resolution
//! protocols have modules of their own because their failure semantics are
//! subtle.

pub mod api;
pub mod bridge;
pub mod context;
pub mod http_router;
pub mod http_server;
pub mod rename;
pub mod session;

pub use api::AppState;
pub use bridge::ExecBridge;
pub use context::RequestContext;
pub use http_router::Router;
pub use http_server::HttpServer;
