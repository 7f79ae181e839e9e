//! File read tool: read a file from the execution context.

use crate::{SandboxBinding, truncate_output};
use async_trait::async_trait;
use logdetective_core::error::ToolError;
use logdetective_core::tool::{Tool, ToolCall, ToolKind, ToolResult};
use tracing::debug;

pub struct ReadFileTool {
    binding: SandboxBinding,
}

impl ReadFileTool {
    pub fn new(binding: SandboxBinding) -> Self {
        Self { binding }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ReadFile
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let path = call.str_arg("filename")?;
        debug!(context = %self.binding.context, path = %path, "Reading file");

        match self
            .binding
            .sandbox
            .read_file(&self.binding.context, path)
            .await
        {
            Ok(content) => Ok(ToolResult::ok(truncate_output(
                &content,
                self.binding.max_output_len,
            ))),
            Err(e) => Ok(ToolResult::failed(format!(
                "Error: failed to read file '{path}': {e}"
            ))),
        }
    }
}
