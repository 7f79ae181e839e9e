//! End-to-end runs of the detective against scripted backends.

use async_trait::async_trait;
use logdetective_agent::{AgentServices, AsciiArtAgent, DetectiveError, FindingStatus, LogDetective};
use logdetective_config::AppConfig;
use logdetective_core::error::{ProviderError, SandboxError};
use logdetective_core::event::{RunEvent, drain};
use logdetective_core::message::{Message, MessageToolCall, Role};
use logdetective_core::provider::{Provider, ProviderRequest, ProviderResponse};
use logdetective_core::sandbox::{CommandOutput, ContextId, ContextState, ExecutionContext, Sandbox};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test doubles ──

/// Replays scripted replies and records every request it receives.
/// Answers "No anomalies found." once the script is exhausted.
#[derive(Default)]
struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    hang: bool,
}

impl ScriptedProvider {
    fn new(script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, n: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[n].clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(text("No anomalies found.")))
    }
}

fn text(content: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(content),
        usage: None,
        model: "scripted-model".into(),
    }
}

fn tool_turn(id: &str, name: &str, arguments: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tool_calls(
            "",
            vec![MessageToolCall {
                id: id.into(),
                name: name.into(),
                arguments: arguments.into(),
            }],
        ),
        usage: None,
        model: "scripted-model".into(),
    }
}

/// An in-memory execution context backend that records its lifecycle.
#[derive(Default)]
struct RecordingSandbox {
    files: Mutex<HashMap<String, String>>,
    uploads: Mutex<Vec<String>>,
    commands: Mutex<Vec<String>>,
    creates: Mutex<usize>,
    shutdowns: Mutex<usize>,
    fail_create: bool,
    fail_writes: bool,
    fail_execute: bool,
}

impl RecordingSandbox {
    fn creates(&self) -> usize {
        *self.creates.lock().unwrap()
    }

    fn shutdowns(&self) -> usize {
        *self.shutdowns.lock().unwrap()
    }

    fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sandbox for RecordingSandbox {
    fn name(&self) -> &str {
        "recording"
    }

    async fn create(&self) -> Result<ExecutionContext, SandboxError> {
        *self.creates.lock().unwrap() += 1;
        if self.fail_create {
            return Err(SandboxError::Provisioning("devbox entered failure".into()));
        }
        Ok(ExecutionContext::new("dbx_test", ContextState::Ready))
    }

    async fn execute(&self, _id: &ContextId, command: &str) -> Result<CommandOutput, SandboxError> {
        self.commands.lock().unwrap().push(command.to_string());
        if self.fail_execute {
            return Err(SandboxError::Network("execute_sync timed out".into()));
        }
        Ok(CommandOutput {
            exit_status: Some(0),
            stdout: "42\n".into(),
            stderr: String::new(),
        })
    }

    async fn read_file(&self, _id: &ContextId, path: &str) -> Result<String, SandboxError> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| SandboxError::NotFound(format!("{path}: no such file")))
    }

    async fn write_file(&self, _id: &ContextId, path: &str, contents: &str) -> Result<(), SandboxError> {
        if self.fail_writes {
            return Err(SandboxError::Network("connection reset".into()));
        }
        self.uploads.lock().unwrap().push(path.to_string());
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), contents.to_string());
        Ok(())
    }

    async fn shutdown(&self, _id: &ContextId) -> Result<(), SandboxError> {
        *self.shutdowns.lock().unwrap() += 1;
        Ok(())
    }
}

// ── Fixtures ──

fn config(max_chunk_size: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.model.api_key = Some("sk-test".into());
    config.sandbox.api_key = Some("rl-test".into());
    config.agent.max_chunk_size = max_chunk_size;
    config.agent.max_iterations = 4;
    config.agent.model_retries = 1;
    config.agent.retry_base_delay_ms = 1;
    config
}

fn write_log(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn detective(
    config: AppConfig,
    provider: &Arc<ScriptedProvider>,
    sandbox: &Arc<RecordingSandbox>,
) -> LogDetective {
    LogDetective::new(AgentServices::new(config, provider.clone(), sandbox.clone()))
}

fn user_prompt(request: &ProviderRequest) -> String {
    request
        .messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

// ── Scenarios ──

#[tokio::test]
async fn small_file_is_analysed_whole() {
    let dir = tempfile::tempdir().unwrap();
    let content = "2024-05-01T12:00:00 INFO start\n".repeat(6) + "2024-05-01T12:00:07 ERROR disk full\n";
    let path = write_log(&dir, "app.log", &content);

    let provider = Arc::new(ScriptedProvider::new(vec![Ok(text("Disk filled up at 12:00:07."))]));
    let sandbox = Arc::new(RecordingSandbox::default());
    let detective = detective(config(100_000), &provider, &sandbox);
    let mut events = detective.services().events().subscribe();

    let report = detective.run(&path).await.unwrap();

    assert_eq!(report.total_chunks, 1);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].status, FindingStatus::Complete);

    let rendered = report.render();
    assert!(rendered.contains("LOG DETECTIVE ANALYSIS: app.log"));
    assert!(rendered.contains("Disk filled up at 12:00:07."));
    assert!(!rendered.contains("--- Chunk"));

    assert_eq!(sandbox.uploads(), vec!["app.log".to_string()]);
    assert_eq!(sandbox.files.lock().unwrap()["app.log"], content);
    assert!(user_prompt(&provider.request(0)).contains("'app.log'"));

    assert_eq!(sandbox.creates(), 1);
    assert_eq!(sandbox.shutdowns(), 1);

    let events = drain(&mut events);
    let acquired = events
        .iter()
        .position(|e| matches!(e.as_ref(), RunEvent::ContextAcquired { .. }))
        .unwrap();
    let released = events
        .iter()
        .position(|e| matches!(e.as_ref(), RunEvent::ContextReleased { .. }))
        .unwrap();
    assert!(acquired < released);
}

#[tokio::test]
async fn large_file_is_analysed_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let line = format!("2024-05-01T12:00:00 WARN slow request {}\n", "x".repeat(61));
    assert_eq!(line.len(), 100);
    let content = line.repeat(30);
    let path = write_log(&dir, "server.log", &content);

    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(text("first part: slow requests")),
        Ok(text("second part: more of the same")),
        Ok(text("third part: still slow")),
    ]));
    let sandbox = Arc::new(RecordingSandbox::default());
    let report = detective(config(1000), &provider, &sandbox)
        .run(&path)
        .await
        .unwrap();

    assert_eq!(report.total_chunks, 3);
    let indices: Vec<usize> = report.findings.iter().map(|f| f.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(report.findings[0].text, "first part: slow requests");
    assert_eq!(report.findings[2].text, "third part: still slow");

    assert_eq!(
        sandbox.uploads(),
        vec!["server.part-1.log", "server.part-2.log", "server.part-3.log"]
    );
    let files = sandbox.files.lock().unwrap();
    let rejoined: String = (1..=3)
        .map(|k| files[&format!("server.part-{k}.log")].clone())
        .collect();
    assert_eq!(rejoined, content);
    drop(files);

    let second = user_prompt(&provider.request(1));
    assert!(second.contains("part 2 of 3"));
    assert!(second.contains("lines 11-20"));
    // Earlier findings are not carried forward
    assert!(!second.contains("first part"));

    let rendered = report.render();
    assert!(rendered.find("--- Chunk 1/3").unwrap() < rendered.find("--- Chunk 3/3").unwrap());

    // One context for the whole file
    assert_eq!(sandbox.creates(), 1);
    assert_eq!(sandbox.shutdowns(), 1);
}

#[tokio::test]
async fn missing_model_credential_fails_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "app.log", "INFO ok\n");

    let mut config = config(100_000);
    config.model.api_key = None;
    let provider = Arc::new(ScriptedProvider::default());
    let sandbox = Arc::new(RecordingSandbox::default());

    let err = detective(config, &provider, &sandbox).run(&path).await.unwrap_err();

    assert!(matches!(err, DetectiveError::Configuration(_)));
    assert!(err.to_string().contains("OPENAI_API_KEY"));
    assert_eq!(provider.calls(), 0);
    assert_eq!(sandbox.creates(), 0);
}

#[tokio::test]
async fn missing_local_file_is_an_input_error() {
    let provider = Arc::new(ScriptedProvider::default());
    let sandbox = Arc::new(RecordingSandbox::default());

    let err = detective(config(100_000), &provider, &sandbox)
        .run(std::path::Path::new("/definitely/not/here.log"))
        .await
        .unwrap_err();

    assert!(matches!(err, DetectiveError::Input { .. }));
    assert_eq!(sandbox.creates(), 0);
}

#[tokio::test]
async fn failed_remote_read_is_reported_to_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "app.log", "ERROR boom\n");

    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(tool_turn("c1", "read_file", r#"{"filename":"/var/log/nope.log"}"#)),
        Ok(tool_turn("c2", "execute_shell_command", r#"{"command":"wc -l app.log"}"#)),
        Ok(text("The file has one error line.")),
    ]));
    let sandbox = Arc::new(RecordingSandbox::default());

    let report = detective(config(100_000), &provider, &sandbox)
        .run(&path)
        .await
        .unwrap();

    assert_eq!(report.findings[0].status, FindingStatus::Complete);
    assert_eq!(report.findings[0].text, "The file has one error line.");
    assert_eq!(provider.calls(), 3);

    let second = provider.request(1);
    let tool_result = second.messages.last().unwrap();
    assert_eq!(tool_result.role, Role::Tool);
    assert_eq!(tool_result.tool_call_id.as_deref(), Some("c1"));
    assert!(tool_result.content.starts_with("Error:"));
    assert!(tool_result.content.contains("/var/log/nope.log"));

    let third = provider.request(2);
    assert_eq!(third.messages.last().unwrap().content, "42");
    assert_eq!(sandbox.commands.lock().unwrap().as_slice(), ["wc -l app.log"]);
    assert_eq!(sandbox.creates(), 1);
    assert_eq!(sandbox.shutdowns(), 1);
}

#[tokio::test]
async fn command_transport_failure_is_fed_back_and_context_released() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "app.log", "ERROR boom\n");

    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(tool_turn("c1", "execute_shell_command", r#"{"command":"grep -c ERROR app.log"}"#)),
        Ok(text("Could not run commands; one ERROR line is visible in the prompt.")),
    ]));
    let sandbox = Arc::new(RecordingSandbox {
        fail_execute: true,
        ..Default::default()
    });

    let report = detective(config(100_000), &provider, &sandbox)
        .run(&path)
        .await
        .unwrap();

    assert_eq!(report.findings[0].status, FindingStatus::Complete);
    let fed_back = provider.request(1).messages.last().unwrap().clone();
    assert_eq!(fed_back.role, Role::Tool);
    assert!(fed_back.content.starts_with("Error:"));
    assert!(fed_back.content.contains("execute_sync timed out"));
    assert_eq!(sandbox.creates(), 1);
    assert_eq!(sandbox.shutdowns(), 1);
}

#[tokio::test]
async fn iteration_cap_marks_the_finding_partial() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "app.log", "ERROR boom\n");

    let digging = || {
        let mut turn = tool_turn("c", "execute_shell_command", r#"{"command":"grep ERROR app.log"}"#);
        turn.message.content = "Looking at errors.".into();
        Ok(turn)
    };
    let provider = Arc::new(ScriptedProvider::new((0..10).map(|_| digging()).collect()));
    let sandbox = Arc::new(RecordingSandbox::default());

    let report = detective(config(100_000), &provider, &sandbox)
        .run(&path)
        .await
        .unwrap();

    assert_eq!(provider.calls(), 4);
    assert_eq!(report.findings[0].status, FindingStatus::Partial);
    assert!(report.render().contains("[incomplete: iteration cap reached]"));
    assert_eq!(sandbox.shutdowns(), 1);
}

#[tokio::test]
async fn exhausted_retries_fail_the_chunk_and_the_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let content = ("INFO ".to_string() + &"y".repeat(94) + "\n").repeat(20);
    let path = write_log(&dir, "app.log", &content);

    let network = || Err(ProviderError::Network("connection reset".into()));
    // Chunk 1: first attempt and one retry both fail. Chunk 2 succeeds.
    let provider = Arc::new(ScriptedProvider::new(vec![
        network(),
        network(),
        Ok(text("second half looks fine")),
    ]));
    let sandbox = Arc::new(RecordingSandbox::default());

    let report = detective(config(1000), &provider, &sandbox)
        .run(&path)
        .await
        .unwrap();

    assert_eq!(report.findings.len(), 2);
    assert!(matches!(report.findings[0].status, FindingStatus::Failed(_)));
    assert_eq!(report.findings[1].status, FindingStatus::Complete);

    let rendered = report.render();
    assert!(rendered.contains("[failed: Network error: connection reset]"));
    assert!(rendered.contains("second half looks fine"));
    assert_eq!(sandbox.shutdowns(), 1);
}

#[tokio::test]
async fn rejected_model_key_fails_the_chunk_and_releases() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "app.log", "INFO ok\n");

    let provider = Arc::new(ScriptedProvider::new(vec![Err(
        ProviderError::AuthenticationFailed("invalid api key".into()),
    )]));
    let sandbox = Arc::new(RecordingSandbox::default());

    let report = detective(config(100_000), &provider, &sandbox)
        .run(&path)
        .await
        .unwrap();

    assert!(matches!(report.findings[0].status, FindingStatus::Failed(_)));
    assert!(report.is_total_failure());
    // Not retried
    assert_eq!(provider.calls(), 1);
    assert_eq!(sandbox.creates(), 1);
    assert_eq!(sandbox.shutdowns(), 1);
}

#[tokio::test]
async fn rejected_model_key_keeps_earlier_findings_and_skips_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let content = ("INFO ".to_string() + &"z".repeat(94) + "\n").repeat(30);
    let path = write_log(&dir, "app.log", &content);

    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(text("first third: found the outage")),
        Err(ProviderError::AuthenticationFailed("key revoked".into())),
    ]));
    let sandbox = Arc::new(RecordingSandbox::default());

    let report = detective(config(1000), &provider, &sandbox)
        .run(&path)
        .await
        .unwrap();

    assert_eq!(report.findings.len(), 3);
    assert_eq!(report.findings[0].status, FindingStatus::Complete);
    assert_eq!(report.findings[0].text, "first third: found the outage");
    assert!(matches!(&report.findings[1].status, FindingStatus::Failed(r) if r.contains("key revoked")));
    assert!(matches!(&report.findings[2].status, FindingStatus::Failed(r) if r.starts_with("skipped:")));
    // The third chunk never reaches the model
    assert_eq!(provider.calls(), 2);

    let rendered = report.render();
    assert!(rendered.contains("first third: found the outage"));
    assert!(rendered.contains("3 chunks: 1 complete, 0 partial, 2 failed"));
    assert_eq!(sandbox.shutdowns(), 1);
}

#[tokio::test]
async fn provisioning_failure_stops_before_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "app.log", "INFO ok\n");

    let provider = Arc::new(ScriptedProvider::default());
    let sandbox = Arc::new(RecordingSandbox {
        fail_create: true,
        ..Default::default()
    });

    let err = detective(config(100_000), &provider, &sandbox)
        .run(&path)
        .await
        .unwrap_err();

    assert!(matches!(err, DetectiveError::Provisioning(_)));
    assert_eq!(provider.calls(), 0);
    assert_eq!(sandbox.shutdowns(), 0);
}

#[tokio::test]
async fn failed_upload_falls_back_to_inline_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "app.log", "2024-05-01 ERROR inline me\n");

    let provider = Arc::new(ScriptedProvider::new(vec![Ok(text("Saw it."))]));
    let sandbox = Arc::new(RecordingSandbox {
        fail_writes: true,
        ..Default::default()
    });

    let report = detective(config(100_000), &provider, &sandbox)
        .run(&path)
        .await
        .unwrap();

    assert_eq!(report.findings[0].status, FindingStatus::Complete);
    assert!(user_prompt(&provider.request(0)).contains("2024-05-01 ERROR inline me"));
}

#[tokio::test(start_paused = true)]
async fn interrupt_releases_the_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "app.log", "INFO ok\n");

    let provider = Arc::new(ScriptedProvider {
        hang: true,
        ..Default::default()
    });
    let sandbox = Arc::new(RecordingSandbox::default());

    let err = detective(config(100_000), &provider, &sandbox)
        .run_until(&path, tokio::time::sleep(Duration::from_millis(10)))
        .await
        .unwrap_err();

    assert!(matches!(err, DetectiveError::Interrupted));
    assert_eq!(sandbox.creates(), 1);
    assert_eq!(sandbox.shutdowns(), 1);
}

#[tokio::test]
async fn ascii_art_returns_final_text() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(tool_turn(
            "c1",
            "write_file",
            r#"{"filename":"script.py","contents":"import sys\nprint(' '.join(sys.argv[1:]))\n"}"#,
        )),
        Ok(tool_turn("c2", "execute_shell_command", r#"{"command":"python script.py hello runloop"}"#)),
        Ok(text("```python\nimport sys\n```\n```\nhello runloop\n```")),
    ]));
    let sandbox = Arc::new(RecordingSandbox::default());
    let agent = AsciiArtAgent::new(AgentServices::new(config(100_000), provider.clone(), sandbox.clone()));

    let output = agent.run("hello runloop").await.unwrap();

    assert!(output.contains("hello runloop"));
    assert!(sandbox.files.lock().unwrap().contains_key("script.py"));
    assert!(user_prompt(&provider.request(0)).contains("\"hello runloop\""));
    assert_eq!(sandbox.shutdowns(), 1);
}

#[tokio::test]
async fn ascii_art_marks_output_cut_off_by_the_cap() {
    let busy = || {
        let mut turn = tool_turn("c", "execute_shell_command", r#"{"command":"python script.py"}"#);
        turn.message.content = "Trying again.".into();
        Ok(turn)
    };
    let provider = Arc::new(ScriptedProvider::new((0..10).map(|_| busy()).collect()));
    let sandbox = Arc::new(RecordingSandbox::default());
    let agent = AsciiArtAgent::new(AgentServices::new(config(100_000), provider.clone(), sandbox.clone()));

    let output = agent.run("hello runloop").await.unwrap();

    assert!(output.starts_with("[incomplete: iteration cap reached]\n"));
    assert!(output.contains("Trying again."));
    assert_eq!(provider.calls(), 4);
    assert_eq!(sandbox.shutdowns(), 1);
}
