//! HTTP Request Router
//!
//! Parses each incoming request into a [`RequestContext`], picks the handler
//! job for its path and method, and runs the job through the execution
//! bridge. The router owns endpoint labeling for metrics: every dispatched
//! request is recorded with its outcome and latency. A handler behind a
//! fan-out route refines the label through the context's `function` field.
//!
//! Two route families exist, mirroring the public API surface:
//!
//! - The v2 REST surface under `/api/v2/...` (scenarios, actions, delay
//!   policies), with explicit 405s for unsupported methods.
//! - The legacy verb surface under `/api/<verb>/<noun>` (stubs, playback,
//!   modules, status), which is method-agnostic.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::{Method, StatusCode};

use stubd_core::transport::{HttpEnvelope, HyperRequest, HyperResponse};
use stubd_core::{Envelope, FailureKind, Result, ServiceError};

use crate::api::{self, arg, args, missing_arg, AppState, Query};
use crate::bridge::ExecBridge;
use crate::context::RequestContext;

type Job = Box<dyn FnOnce(&mut RequestContext) -> Result<Envelope> + Send>;

enum Route {
    Job(&'static str, Job),
    NotFound,
    MethodNotAllowed,
}

/// Routes requests to handler jobs and runs them through the bridge.
pub struct Router {
    state: Arc<AppState>,
    bridge: ExecBridge,
}

impl Router {
    /// Creates a router over shared state with a worker pool of `workers`.
    pub fn new(state: Arc<AppState>, workers: usize) -> Self {
        Self {
            state,
            bridge: ExecBridge::new(workers),
        }
    }

    /// Handles one request end to end, always producing a response.
    pub async fn handle(&self, req: HyperRequest) -> HyperResponse {
        let method = req.method().clone();
        let path = req.uri().path().trim_matches('/').to_string();
        let query = parse_query(req.uri().query());

        let mut headers = HashMap::new();
        for (name, value) in req.headers() {
            if let Ok(text) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), text.to_string());
            }
        }
        let host = request_host(&query, &headers);

        let body = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                let failure = ServiceError::unclassified(FailureKind::Io, err.to_string());
                let envelope = Envelope::failure(failure.error_body());
                return HttpEnvelope::to_http_response(
                    &envelope,
                    StatusCode::INTERNAL_SERVER_ERROR,
                );
            }
        };

        let mut ctx = RequestContext::new(host);
        ctx.request_headers = headers;

        let segments: Vec<&str> = path.split('/').collect();
        let (label, job) = match self.route(&method, &segments, &query, body) {
            Route::Job(label, job) => (label, job),
            Route::NotFound => {
                let failure = ServiceError::domain(404, format!("Unknown path: /{}", path));
                let envelope = Envelope::failure(failure.error_body());
                return HttpEnvelope::to_http_response(&envelope, StatusCode::NOT_FOUND);
            }
            Route::MethodNotAllowed => {
                let failure =
                    ServiceError::domain(405, format!("Method {} not allowed on /{}", method, path));
                let envelope = Envelope::failure(failure.error_body());
                return HttpEnvelope::to_http_response(&envelope, StatusCode::METHOD_NOT_ALLOWED);
            }
        };

        tracing::debug!(endpoint = label, host = %ctx.host, "dispatching");
        let start = Instant::now();
        let ctx = self.bridge.execute(ctx, job).await;
        let envelope = ctx.response.clone().unwrap_or_default();
        let label = ctx.function.as_deref().unwrap_or(label);
        self.state
            .metrics
            .record_call(label, start, envelope.error.is_none());

        let status = StatusCode::from_u16(ctx.status_or_default()).unwrap_or(StatusCode::OK);
        HttpEnvelope::to_http_response(&envelope, status)
    }

    fn route(&self, method: &Method, segments: &[&str], query: &Query, body: Bytes) -> Route {
        let state = self.state.clone();
        match segments {
            ["api", "v2", "scenarios"] => match method.as_str() {
                "PUT" | "POST" => Route::Job(
                    "put/scenario",
                    Box::new(move |ctx| api::scenarios::create(ctx, &state, &body)),
                ),
                "GET" => Route::Job(
                    "get/scenarios",
                    Box::new(move |ctx| api::scenarios::list(ctx, &state)),
                ),
                _ => Route::MethodNotAllowed,
            },
            ["api", "v2", "scenarios", "detail"] => match method.as_str() {
                "GET" => Route::Job(
                    "get/scenarios/detail",
                    Box::new(move |ctx| api::scenarios::detail_list(ctx, &state)),
                ),
                _ => Route::MethodNotAllowed,
            },
            ["api", "v2", "scenarios", "objects", name] => {
                let name = name.to_string();
                match method.as_str() {
                    "GET" => Route::Job(
                        "get/scenario",
                        Box::new(move |ctx| api::scenarios::get_one(ctx, &state, &name)),
                    ),
                    "DELETE" => Route::Job(
                        "delete/scenario",
                        Box::new(move |ctx| api::scenarios::delete(ctx, &state, &name)),
                    ),
                    _ => Route::MethodNotAllowed,
                }
            }
            ["api", "v2", "scenarios", "objects", name, "action"] => {
                let name = name.to_string();
                match method.as_str() {
                    "POST" => Route::Job(
                        "scenario/action",
                        Box::new(move |ctx| api::sessions::action(ctx, &state, &name, &body)),
                    ),
                    _ => Route::MethodNotAllowed,
                }
            }
            ["api", "v2", "delay-policy"] => match method.as_str() {
                "PUT" | "POST" => Route::Job(
                    "put/delay_policy",
                    Box::new(move |ctx| api::delay_policy::update(ctx, &state, &body)),
                ),
                _ => Route::MethodNotAllowed,
            },
            ["api", "put", "stub"] => {
                let session = arg(query, "session").map(str::to_string);
                let policy = arg(query, "delay_policy").map(str::to_string);
                Route::Job(
                    "put/stub",
                    Box::new(move |ctx| {
                        api::stubs::put_stub(
                            ctx,
                            &state,
                            session.as_deref(),
                            policy.as_deref(),
                            &body,
                        )
                    }),
                )
            }
            ["api", "get", "response"] => {
                let session = arg(query, "session").map(str::to_string);
                Route::Job(
                    "get/response",
                    Box::new(move |ctx| {
                        api::stubs::get_response(ctx, &state, session.as_deref(), &body)
                    }),
                )
            }
            ["api", "get", "stublist"] => {
                let scenario = arg(query, "scenario").map(str::to_string);
                Route::Job(
                    "get/stublist",
                    Box::new(move |ctx| {
                        let scenario = scenario.ok_or_else(|| missing_arg("scenario"))?;
                        api::stubs::stub_list(ctx, &state, &scenario)
                    }),
                )
            }
            ["api", "get", "export"] => {
                let scenario = arg(query, "scenario").map(str::to_string);
                Route::Job(
                    "get/export",
                    Box::new(move |ctx| {
                        let scenario = scenario.ok_or_else(|| missing_arg("scenario"))?;
                        api::stubs::export(ctx, &state, &scenario)
                    }),
                )
            }
            ["api", "delete", "stubs"] => {
                let scenario = arg(query, "scenario").map(str::to_string);
                Route::Job(
                    "delete/stubs",
                    Box::new(move |ctx| {
                        let scenario = scenario.ok_or_else(|| missing_arg("scenario"))?;
                        api::stubs::delete_stubs(ctx, &state, &scenario)
                    }),
                )
            }
            ["api", "put", "module"] => {
                let name = arg(query, "name").map(str::to_string);
                Route::Job(
                    "put/module",
                    Box::new(move |ctx| {
                        let name = name.ok_or_else(|| missing_arg("name"))?;
                        api::modules::put_module(ctx, &state, &name, &body)
                    }),
                )
            }
            ["api", "get", "modulelist"] => Route::Job(
                "get/modulelist",
                Box::new(move |ctx| api::modules::list(ctx, &state)),
            ),
            ["api", "delete", "module"] => {
                let names = args(query, "name");
                Route::Job(
                    "delete/module",
                    Box::new(move |ctx| {
                        if names.is_empty() {
                            return Err(missing_arg("name"));
                        }
                        api::modules::delete_modules(ctx, &state, &names)
                    }),
                )
            }
            ["api", "delete", "modules"] => Route::Job(
                "delete/modules",
                Box::new(move |ctx| api::modules::delete_all(ctx, &state)),
            ),
            ["api", "get", "delay_policy"] => {
                let name = arg(query, "name").map(str::to_string);
                Route::Job(
                    "get/delay_policy",
                    Box::new(move |ctx| api::delay_policy::get(ctx, &state, name.as_deref())),
                )
            }
            ["api", "delete", "delay_policy"] => {
                let name = arg(query, "name").map(str::to_string);
                Route::Job(
                    "delete/delay_policy",
                    Box::new(move |ctx| {
                        let name = name.ok_or_else(|| missing_arg("name"))?;
                        api::delay_policy::delete(ctx, &state, &name)
                    }),
                )
            }
            ["api", "get", "status"] => {
                let scenario = arg(query, "scenario").map(str::to_string);
                Route::Job(
                    "get/status",
                    Box::new(move |ctx| {
                        api::status::get_status(ctx, &state, scenario.as_deref())
                    }),
                )
            }
            _ => Route::NotFound,
        }
    }
}

/// Parses a query string into ordered key/value pairs.
// TODO: percent-decode values once a client needs escaped names
fn parse_query(query: Option<&str>) -> Query {
    query
        .map(|text| {
            text.split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| match pair.split_once('=') {
                    Some((key, value)) => (key.to_string(), value.to_string()),
                    None => (pair.to_string(), String::new()),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The host namespace a request operates in: explicit `host` parameter first,
/// then the Host header (port stripped), then `localhost`.
fn request_host(query: &Query, headers: &HashMap<String, String>) -> String {
    if let Some(host) = arg(query, "host") {
        return host.to_ascii_lowercase();
    }
    headers
        .get("host")
        .map(|value| {
            value
                .split(':')
                .next()
                .unwrap_or(value)
                .to_ascii_lowercase()
        })
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
