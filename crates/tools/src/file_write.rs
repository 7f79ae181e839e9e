//! File write tool: create or overwrite a file in the execution context.

use crate::SandboxBinding;
use async_trait::async_trait;
use logdetective_core::error::ToolError;
use logdetective_core::tool::{Tool, ToolCall, ToolKind, ToolResult};
use tracing::debug;

pub struct WriteFileTool {
    binding: SandboxBinding,
}

impl WriteFileTool {
    pub fn new(binding: SandboxBinding) -> Self {
        Self { binding }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::WriteFile
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let path = call.str_arg("filename")?;
        let contents = call.str_arg("contents")?;
        debug!(context = %self.binding.context, path = %path, bytes = contents.len(), "Writing file");

        match self
            .binding
            .sandbox
            .write_file(&self.binding.context, path, contents)
            .await
        {
            Ok(()) => Ok(ToolResult::ok(format!(
                "Wrote {} bytes to {path}",
                contents.len()
            ))),
            Err(e) => Ok(ToolResult::failed(format!(
                "Error: failed to write file '{path}': {e}"
            ))),
        }
    }
}
