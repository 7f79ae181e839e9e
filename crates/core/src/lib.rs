//! # Log Detective Core
//!
//! Domain types, traits, and error definitions shared by every Log Detective
//! crate. Nothing here talks to the network: the remote model service and
//! the remote sandbox service are both expressed as traits so the agent loop
//! can be driven by real HTTP clients or by test doubles.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in their
//! respective crates:
//! - [`Provider`]: chat completions with tool calling (`logdetective-providers`)
//! - [`Sandbox`]: remote execution contexts (`logdetective-sandbox`)
//! - [`Tool`]: model-callable operations (`logdetective-tools`)

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod sandbox;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, SandboxError, ToolError};
pub use event::{EventBus, RunEvent};
pub use message::{Conversation, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use sandbox::{CommandOutput, ContextId, ContextState, ExecutionContext, Sandbox};
pub use tool::{Tool, ToolCall, ToolKind, ToolRegistry, ToolResult};
