//! Tool trait and the enumerated dispatch table.
//!
//! The model may only call a fixed set of operations. Each one is a
//! [`ToolKind`] variant carrying its name, description, and JSON-Schema
//! argument schema; the [`ToolRegistry`] maps a kind to the handler bound to
//! the active execution context.

use crate::error::ToolError;
use crate::message::MessageToolCall;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The fixed set of model-callable operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// `{ "command": string }`: run a shell command in the sandbox.
    ExecuteShellCommand,
    /// `{ "filename": string }`: read a file from the sandbox.
    ReadFile,
    /// `{ "filename": string, "contents": string }`: write a file in the sandbox.
    WriteFile,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [
        ToolKind::ExecuteShellCommand,
        ToolKind::ReadFile,
        ToolKind::WriteFile,
    ];

    /// The wire name the model uses to call this tool.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::ExecuteShellCommand => "execute_shell_command",
            ToolKind::ReadFile => "read_file",
            ToolKind::WriteFile => "write_file",
        }
    }

    /// Resolve a wire name back to a kind.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolKind::ExecuteShellCommand => {
                "Run a shell command in the devbox and return its combined stdout/stderr."
            }
            ToolKind::ReadFile => "Read a file on the devbox and return its contents.",
            ToolKind::WriteFile => {
                "Write a file on the devbox. Creates the file if it doesn't exist, overwrites it if it does."
            }
        }
    }

    pub fn parameters_schema(self) -> serde_json::Value {
        match self {
            ToolKind::ExecuteShellCommand => serde_json::json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to execute"
                    }
                },
                "required": ["command"]
            }),
            ToolKind::ReadFile => serde_json::json!({
                "type": "object",
                "properties": {
                    "filename": {
                        "type": "string",
                        "description": "Path of the file to read"
                    }
                },
                "required": ["filename"]
            }),
            ToolKind::WriteFile => serde_json::json!({
                "type": "object",
                "properties": {
                    "filename": {
                        "type": "string",
                        "description": "Path of the file to write"
                    },
                    "contents": {
                        "type": "string",
                        "description": "The full contents to write"
                    }
                },
                "required": ["filename", "contents"]
            }),
        }
    }

    /// Convert into a ToolDefinition for sending to the model.
    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A request to execute a tool, with arguments already parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Parse the raw JSON argument string the model produced.
    pub fn from_message(call: &MessageToolCall) -> Result<Self, ToolError> {
        let arguments = if call.arguments.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&call.arguments).map_err(|e| {
                ToolError::InvalidArguments(format!(
                    "arguments for '{}' are not valid JSON: {e}",
                    call.name
                ))
            })?
        };
        Ok(Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
        })
    }

    /// Fetch a required string argument.
    pub fn str_arg(&self, key: &str) -> Result<&str, ToolError> {
        self.arguments[key]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
    }
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// The output text fed back to the model
    pub output: String,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            success: false,
            output: output.into(),
        }
    }
}

/// A handler for one [`ToolKind`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which operation this handler implements.
    fn kind(&self) -> ToolKind;

    /// Execute the tool with the given call.
    async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolResult, ToolError>;
}

/// The dispatch table: tool kind → handler.
pub struct ToolRegistry {
    tools: BTreeMap<ToolKind, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a handler. Replaces any existing handler for the same kind.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.kind(), tool);
    }

    /// Get a handler by kind.
    pub fn get(&self, kind: ToolKind) -> Option<&dyn Tool> {
        self.tools.get(&kind).map(|t| t.as_ref())
    }

    /// Tool definitions for the registered kinds, in declaration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.keys().map(|k| k.definition()).collect()
    }

    /// Execute a tool call. The returned result carries the call's ID.
    pub async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolResult, ToolError> {
        let tool = ToolKind::from_name(&call.name)
            .and_then(|kind| self.tools.get(&kind))
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        let mut result = tool.execute(call).await?;
        result.call_id = call.id.clone();
        Ok(result)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
