//! Shell tool: run a command inside the execution context.

use crate::{SandboxBinding, truncate_output};
use async_trait::async_trait;
use logdetective_core::error::ToolError;
use logdetective_core::tool::{Tool, ToolCall, ToolKind, ToolResult};
use tracing::{debug, warn};

pub struct ShellTool {
    binding: SandboxBinding,
}

impl ShellTool {
    pub fn new(binding: SandboxBinding) -> Self {
        Self { binding }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ExecuteShellCommand
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let command = call.str_arg("command")?;

        debug!(context = %self.binding.context, command = %command, "Executing shell command");

        let output = match self
            .binding
            .sandbox
            .execute(&self.binding.context, command)
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!(command = %command, error = %e, "Shell command could not be sent");
                return Ok(ToolResult::failed(format!(
                    "Error: failed to run command: {e}"
                )));
            }
        };

        let success = output.success();
        let mut text = output.stdout;
        if !output.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str("[stderr]: ");
            text.push_str(&output.stderr);
        }
        if !success {
            let code = output.exit_status.unwrap_or(-1);
            debug!(command = %command, exit_code = code, "Command failed");
            text = format!("[exit code: {code}]\n{text}");
        }

        let text = truncate_output(text.trim_end(), self.binding.max_output_len);
        Ok(if success {
            ToolResult::ok(text)
        } else {
            ToolResult::failed(text)
        })
    }
}
