//! In-memory sandbox double shared by the tool tests.

use crate::SandboxBinding;
use async_trait::async_trait;
use logdetective_core::error::SandboxError;
use logdetective_core::sandbox::{
    CommandOutput, ContextId, ContextState, ExecutionContext, Sandbox,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct FakeSandbox {
    pub files: Mutex<HashMap<String, String>>,
    pub commands: Mutex<Vec<String>>,
    /// Returned for every command when set
    pub command_output: Mutex<Option<CommandOutput>>,
    /// Makes every call fail with a network error
    pub offline: bool,
}

impl FakeSandbox {
    fn check_online(&self) -> Result<(), SandboxError> {
        if self.offline {
            Err(SandboxError::Network("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Sandbox for FakeSandbox {
    fn name(&self) -> &str {
        "fake"
    }

    async fn create(&self) -> Result<ExecutionContext, SandboxError> {
        Ok(ExecutionContext::new("dbx_test", ContextState::Ready))
    }

    async fn execute(&self, _id: &ContextId, command: &str) -> Result<CommandOutput, SandboxError> {
        self.check_online()?;
        self.commands.lock().unwrap().push(command.to_string());
        Ok(self
            .command_output
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_default())
    }

    async fn read_file(&self, _id: &ContextId, path: &str) -> Result<String, SandboxError> {
        self.check_online()?;
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| SandboxError::NotFound(format!("{path}: No such file or directory")))
    }

    async fn write_file(
        &self,
        _id: &ContextId,
        path: &str,
        contents: &str,
    ) -> Result<(), SandboxError> {
        self.check_online()?;
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), contents.to_string());
        Ok(())
    }

    async fn shutdown(&self, _id: &ContextId) -> Result<(), SandboxError> {
        Ok(())
    }
}

pub fn binding(sandbox: Arc<FakeSandbox>, max_output_len: usize) -> SandboxBinding {
    SandboxBinding::new(sandbox, ContextId("dbx_test".into()), max_output_len)
}

pub fn call(name: &str, arguments: serde_json::Value) -> logdetective_core::tool::ToolCall {
    logdetective_core::tool::ToolCall {
        id: "call_1".into(),
        name: name.into(),
        arguments,
    }
}
