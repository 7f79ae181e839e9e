//! Sandbox lifecycle manager.
//!
//! Owns the single execution context of a run. Every successful
//! [`SandboxManager::acquire`] is paired with exactly one
//! [`SandboxManager::release`] by [`SandboxManager::with_context`], whether
//! the body succeeds, fails, or the process is interrupted.

use logdetective_core::error::SandboxError;
use logdetective_core::event::{EventBus, RunEvent};
use logdetective_core::sandbox::{ContextState, ExecutionContext, Sandbox};
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use tracing::{info, warn};

pub struct SandboxManager {
    sandbox: Arc<dyn Sandbox>,
    events: Arc<EventBus>,
}

impl SandboxManager {
    pub fn new(sandbox: Arc<dyn Sandbox>, events: Arc<EventBus>) -> Self {
        Self { sandbox, events }
    }

    /// Create one execution context and wait until it is ready.
    ///
    /// Every failure surfaces as [`SandboxError::Provisioning`]; a context
    /// that was created but never became ready is shut down first.
    pub async fn acquire(&self) -> Result<ExecutionContext, SandboxError> {
        match self.acquire_until(std::future::pending()).await {
            Some(result) => result,
            None => Err(SandboxError::Interrupted),
        }
    }

    /// `None` when `interrupt` fired. Any context created by then has
    /// already been released.
    async fn acquire_until<S>(&self, interrupt: S) -> Option<Result<ExecutionContext, SandboxError>>
    where
        S: Future<Output = ()>,
    {
        let mut interrupt = pin!(interrupt);
        info!(backend = %self.sandbox.name(), "Creating execution context...");

        // The create request is allowed to finish so its id can be released.
        let mut create = pin!(self.sandbox.create());
        let (created, interrupted) = tokio::select! {
            result = &mut create => (result, false),
            () = &mut interrupt => (create.await, true),
        };
        let mut ctx = match created {
            Ok(ctx) => ctx,
            Err(_) if interrupted => return None,
            Err(e) => return Some(Err(provisioning(e))),
        };
        if interrupted {
            warn!(context = %ctx.id, "Interrupted while provisioning");
            self.release(&mut ctx).await;
            return None;
        }

        let ready = tokio::select! {
            result = self.sandbox.wait_ready(&ctx) => Some(result),
            () = &mut interrupt => None,
        };
        let error = match ready {
            Some(Ok(ready)) if ready.is_ready() => {
                info!(context = %ready.id, "Execution context ready");
                self.events.publish(RunEvent::ContextAcquired {
                    context_id: ready.id.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                return Some(Ok(ready));
            }
            Some(Ok(other)) => Some(SandboxError::Provisioning(format!(
                "context {} returned in state {:?}",
                other.id, other.state
            ))),
            Some(Err(e)) => Some(provisioning(e)),
            None => None,
        };

        match &error {
            Some(e) => warn!(context = %ctx.id, error = %e, "Provisioning failed"),
            None => warn!(context = %ctx.id, "Interrupted while provisioning"),
        }
        self.release(&mut ctx).await;
        error.map(Err)
    }

    /// Destroy the context. Failures are logged and published, never returned.
    pub async fn release(&self, ctx: &mut ExecutionContext) {
        info!(context = %ctx.id, "Destroying execution context...");
        match self.sandbox.shutdown(&ctx.id).await {
            Ok(()) => {
                ctx.state = ContextState::Destroyed;
                self.events.publish(RunEvent::ContextReleased {
                    context_id: ctx.id.to_string(),
                    timestamp: chrono::Utc::now(),
                });
            }
            Err(e) => {
                warn!(context = %ctx.id, error = %e, "Failed to destroy execution context");
                self.events.publish(RunEvent::ReleaseFailed {
                    context_id: ctx.id.to_string(),
                    error_message: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
            }
        }
    }

    /// Run `body` inside a fresh context, releasing it on every exit path.
    ///
    /// Ctrl-C, during provisioning or while the body runs, releases whatever
    /// context exists and returns [`SandboxError::Interrupted`].
    pub async fn with_context<F, Fut, T, E>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(ExecutionContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<SandboxError>,
    {
        self.with_context_until(ctrl_c(), body).await
    }

    /// [`with_context`](Self::with_context) with an explicit interrupt signal.
    pub async fn with_context_until<S, F, Fut, T, E>(&self, interrupt: S, body: F) -> Result<T, E>
    where
        S: Future<Output = ()>,
        F: FnOnce(ExecutionContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<SandboxError>,
    {
        let mut interrupt = pin!(interrupt);
        let mut ctx = match self.acquire_until(&mut interrupt).await {
            Some(result) => result?,
            None => return Err(SandboxError::Interrupted.into()),
        };

        let outcome = tokio::select! {
            result = body(ctx.clone()) => Some(result),
            () = &mut interrupt => None,
        };

        self.release(&mut ctx).await;

        match outcome {
            Some(result) => result,
            None => {
                warn!(context = %ctx.id, "Interrupted; execution context released");
                Err(SandboxError::Interrupted.into())
            }
        }
    }
}

fn provisioning(e: SandboxError) -> SandboxError {
    match e {
        SandboxError::Provisioning(_) => e,
        other => SandboxError::Provisioning(other.to_string()),
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
