//! Async Execution Bridge
//!
//! Handlers are synchronous functions; the server front-end is a
//! single-threaded async reactor. The bridge connects the two: it runs each
//! handler on a bounded blocking worker pool, waits for the outcome without
//! blocking the reactor, classifies that outcome into the response envelope,
//! and applies any deferred-finish delay the handler requested.
//!
//! Classification rules:
//!
//! - `Ok(envelope)` becomes the response as-is; any status the handler set
//!   is kept.
//! - A domain failure sets the response status to its code.
//! - An unclassified failure (including a panicking handler) becomes 500,
//!   unless the handler already set a non-default status, which is preserved.
//!
//! Exactly one envelope is produced per request, on every path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinError;

use stubd_core::{Envelope, FailureKind, Result, ServiceError};

use crate::context::RequestContext;

/// Bridges synchronous handlers onto the async reactor via a bounded worker
/// pool.
pub struct ExecBridge {
    permits: Arc<Semaphore>,
}

impl ExecBridge {
    /// Creates a bridge admitting at most `workers` concurrent handlers.
    pub fn new(workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Runs a handler on the worker pool and returns the context carrying
    /// the classified response envelope.
    ///
    /// The context is cloned before dispatch so that a panicking handler
    /// still yields a response: the panic is mapped to an unclassified task
    /// failure against the pre-dispatch context.
    pub async fn execute<F>(&self, ctx: RequestContext, job: F) -> RequestContext
    where
        F: FnOnce(&mut RequestContext) -> Result<Envelope> + Send + 'static,
    {
        // The semaphore is never closed, so acquisition only fails if the
        // bridge itself is torn down mid-request.
        let _permit = self.permits.clone().acquire_owned().await.ok();

        let fallback = ctx.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let mut ctx = ctx;
            let outcome = job(&mut ctx);
            (ctx, outcome)
        });

        let (mut ctx, outcome) = match handle.await {
            Ok(pair) => pair,
            Err(err) => {
                let detail = join_failure_detail(err);
                (
                    fallback,
                    Err(ServiceError::unclassified(FailureKind::Task, detail)),
                )
            }
        };

        classify(&mut ctx, outcome);
        finish_after_delay(&ctx).await;
        ctx
    }
}

fn join_failure_detail(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(text) = payload.downcast_ref::<&str>() {
            format!("handler panicked: {}", text)
        } else if let Some(text) = payload.downcast_ref::<String>() {
            format!("handler panicked: {}", text)
        } else {
            "handler panicked".to_string()
        }
    } else {
        "handler task cancelled".to_string()
    }
}

/// Maps a handler outcome into the context's response envelope and status.
pub(crate) fn classify(ctx: &mut RequestContext, outcome: Result<Envelope>) {
    match outcome {
        Ok(envelope) => {
            ctx.response = Some(envelope);
        }
        Err(err) => {
            match &err {
                ServiceError::Domain { code, .. } => ctx.set_status(*code),
                ServiceError::Unclassified { .. } => {
                    // A handler-set non-default status survives an
                    // unclassified failure.
                    if matches!(ctx.status(), None | Some(200)) {
                        ctx.set_status(500);
                    }
                }
            }
            tracing::error!(
                host = %ctx.host,
                status = ctx.status_or_default(),
                error = %err,
                "request failed"
            );
            ctx.response = Some(Envelope::failure(err.error_body()));
        }
    }
}

/// Sleeps out the context's deferred-finish delay, when one was requested.
pub(crate) async fn finish_after_delay(ctx: &RequestContext) {
    if let Some(ms) = ctx.delay {
        if ms > 0 {
            tracing::debug!(delay_ms = ms, "deferring response");
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> RequestContext {
        RequestContext::new("localhost")
    }

    #[tokio::test]
    async fn test_success_sets_response_and_keeps_status() {
        let bridge = ExecBridge::new(2);
        let ctx = bridge
            .execute(ctx(), |ctx| {
                ctx.set_status(201);
                Ok(Envelope::data(json!({"ok": true})))
            })
            .await;
        assert_eq!(ctx.status_or_default(), 201);
        assert_eq!(ctx.response.unwrap().data, Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_domain_failure_maps_code() {
        let bridge = ExecBridge::new(2);
        let ctx = bridge
            .execute(ctx(), |_| {
                Err(ServiceError::domain(422, "Scenario already exists"))
            })
            .await;
        assert_eq!(ctx.status_or_default(), 422);
        let envelope = ctx.response.unwrap();
        assert_eq!(envelope.error.unwrap()["code"], json!(422));
    }

    #[tokio::test]
    async fn test_unclassified_failure_defaults_to_500() {
        let bridge = ExecBridge::new(2);
        let ctx = bridge
            .execute(ctx(), |_| {
                Err(ServiceError::unclassified(FailureKind::Storage, "down"))
            })
            .await;
        assert_eq!(ctx.status_or_default(), 500);
        let envelope = ctx.response.unwrap();
        assert_eq!(envelope.error.unwrap()["message"], json!("storage: down"));
    }

    #[tokio::test]
    async fn test_unclassified_failure_preserves_prior_status() {
        let bridge = ExecBridge::new(2);
        let ctx = bridge
            .execute(ctx(), |ctx| {
                ctx.set_status(404);
                Err(ServiceError::unclassified(FailureKind::Cache, "gone"))
            })
            .await;
        assert_eq!(ctx.status_or_default(), 404);
    }

    #[tokio::test]
    async fn test_panicking_handler_yields_task_failure() {
        let bridge = ExecBridge::new(2);
        let ctx = bridge
            .execute(ctx(), |_| -> Result<Envelope> { panic!("boom") })
            .await;
        assert_eq!(ctx.status_or_default(), 500);
        let envelope = ctx.response.unwrap();
        let message = envelope.error.unwrap()["message"].as_str().unwrap().to_string();
        assert!(message.starts_with("task: handler panicked"));
        assert!(message.contains("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_finish_waits_out_delay() {
        let bridge = ExecBridge::new(2);
        let before = tokio::time::Instant::now();
        let ctx = bridge
            .execute(ctx(), |ctx| {
                ctx.delay = Some(250);
                Ok(Envelope::data(json!("delayed")))
            })
            .await;
        assert!(before.elapsed() >= Duration::from_millis(250));
        assert!(ctx.response.is_some());
    }
}
