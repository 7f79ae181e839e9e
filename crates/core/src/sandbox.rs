//! The Sandbox trait: the abstraction over remote execution contexts.
//!
//! A sandbox service hands out ephemeral, isolated environments where the
//! model's shell commands run and where files can be read and written.
//! Implementations: the Runloop devbox API, and recording doubles in tests.

use crate::error::SandboxError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identifier of a remote execution context, as assigned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub String);

impl ContextId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextState {
    Provisioning,
    Ready,
    Destroyed,
}

/// A remote execution context owned by one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub id: ContextId,
    pub state: ContextState,
}

impl ExecutionContext {
    pub fn new(id: impl Into<String>, state: ContextState) -> Self {
        Self {
            id: ContextId(id.into()),
            state,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == ContextState::Ready
    }
}

/// Result of running one command inside a context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Exit status, when the service reports one
    #[serde(default)]
    pub exit_status: Option<i32>,

    #[serde(default)]
    pub stdout: String,

    #[serde(default)]
    pub stderr: String,
}

impl CommandOutput {
    /// A command succeeded unless the service reported a non-zero status.
    pub fn success(&self) -> bool {
        self.exit_status.is_none_or(|code| code == 0)
    }
}

/// A remote execution backend.
///
/// `create` returns as soon as the service has assigned an id, so a caller
/// that gives up while [`wait_ready`](Sandbox::wait_ready) is pending still
/// knows which context to shut down.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Request a new execution context. The returned state may still be
    /// `Provisioning`.
    async fn create(&self) -> Result<ExecutionContext, SandboxError>;

    /// Wait until `ctx` accepts commands. Backends whose `create` already
    /// returns a ready context keep the default.
    async fn wait_ready(&self, ctx: &ExecutionContext) -> Result<ExecutionContext, SandboxError> {
        Ok(ctx.clone())
    }

    /// Run a shell command synchronously inside the context.
    async fn execute(&self, id: &ContextId, command: &str) -> Result<CommandOutput, SandboxError>;

    /// Read a file from the context.
    async fn read_file(&self, id: &ContextId, path: &str) -> Result<String, SandboxError>;

    /// Write (create or overwrite) a file in the context.
    async fn write_file(
        &self,
        id: &ContextId,
        path: &str,
        contents: &str,
    ) -> Result<(), SandboxError>;

    /// Destroy the context.
    async fn shutdown(&self, id: &ContextId) -> Result<(), SandboxError>;
}
