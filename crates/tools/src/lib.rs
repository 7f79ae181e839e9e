//! Sandbox-bound tool implementations for Log Detective.
//!
//! The model can run shell commands, read files, and write files, all inside
//! the run's remote execution context. Nothing here touches the local
//! filesystem.
//!
//! Every tool returns bounded text: output longer than the configured limit
//! is cut and marked so the model knows it saw a prefix.

pub mod file_read;
pub mod file_write;
pub mod shell;

#[cfg(test)]
mod testing;

use logdetective_core::sandbox::{ContextId, Sandbox};
use logdetective_core::tool::ToolRegistry;
use std::sync::Arc;

pub use file_read::ReadFileTool;
pub use file_write::WriteFileTool;
pub use shell::ShellTool;

/// The execution context a tool forwards to.
#[derive(Clone)]
pub struct SandboxBinding {
    pub sandbox: Arc<dyn Sandbox>,
    pub context: ContextId,
    /// Longest output handed back to the model, in bytes
    pub max_output_len: usize,
}

impl SandboxBinding {
    pub fn new(sandbox: Arc<dyn Sandbox>, context: ContextId, max_output_len: usize) -> Self {
        Self {
            sandbox,
            context,
            max_output_len,
        }
    }
}

/// Build the dispatch table for one execution context.
pub fn sandbox_registry(binding: SandboxBinding) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ShellTool::new(binding.clone())));
    registry.register(Box::new(ReadFileTool::new(binding.clone())));
    registry.register(Box::new(WriteFileTool::new(binding)));
    registry
}

/// Cut `text` to at most `max_len` bytes (on a char boundary) and append a
/// marker saying how much was dropped.
pub fn truncate_output(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!(
        "{}\n... [output truncated: showing {cut} of {} bytes]",
        &text[..cut],
        text.len()
    )
}
