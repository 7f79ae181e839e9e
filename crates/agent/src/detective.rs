//! Log analysis orchestration.
//!
//! A run validates credentials, reads and chunks the local file, then holds
//! one execution context for the whole file. Chunks are analysed strictly in
//! order, each by a fresh agent loop with its own conversation; nothing from
//! one chunk's conversation is carried into the next.

use crate::chunking::{ChunkStrategy, LogChunk, estimate_tokens, prepare_chunks, read_log_file};
use crate::error::DetectiveError;
use crate::loop_runner::AgentLoop;
use crate::prompts::{ChunkSource, DETECTIVE_SYSTEM_PROMPT, analysis_prompt};
use crate::report::{AnalysisReport, ChunkFinding, FindingStatus};
use logdetective_config::AppConfig;
use logdetective_core::error::ProviderError;
use logdetective_core::event::{EventBus, RunEvent};
use logdetective_core::message::Conversation;
use logdetective_core::provider::Provider;
use logdetective_core::sandbox::{ExecutionContext, Sandbox};
use logdetective_core::tool::ToolRegistry;
use logdetective_providers::{RetryPolicy, RetryingProvider};
use logdetective_sandbox::{RunloopSandbox, SandboxManager};
use logdetective_tools::{SandboxBinding, sandbox_registry};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a task needs: configuration, the model, the sandbox backend
/// and the event bus they report to.
pub struct AgentServices {
    pub config: AppConfig,
    provider: Arc<dyn Provider>,
    sandbox: Arc<dyn Sandbox>,
    events: Arc<EventBus>,
}

impl AgentServices {
    /// Wire explicit backends. The provider is wrapped in retries built from
    /// `config.agent`.
    pub fn new(config: AppConfig, provider: Arc<dyn Provider>, sandbox: Arc<dyn Sandbox>) -> Self {
        let events = Arc::new(EventBus::default());
        let provider: Arc<dyn Provider> = Arc::new(
            RetryingProvider::new(provider, RetryPolicy::from_config(&config.agent))
                .with_events(events.clone()),
        );
        Self {
            config,
            provider,
            sandbox,
            events,
        }
    }

    /// Build the OpenAI-compatible client and the Runloop client.
    ///
    /// Fails on a missing credential before any client is created.
    pub fn from_config(config: AppConfig) -> Result<Self, DetectiveError> {
        config.require_credentials()?;
        let provider = logdetective_providers::build_from_config(&config)?;
        let sandbox = Arc::new(RunloopSandbox::from_config(&config.sandbox)?);
        Ok(Self::new(config, provider, sandbox))
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    pub(crate) fn manager(&self) -> SandboxManager {
        SandboxManager::new(self.sandbox.clone(), self.events.clone())
    }

    pub(crate) fn agent_loop(&self) -> AgentLoop {
        let model = &self.config.model;
        AgentLoop::new(
            self.provider.clone(),
            &model.name,
            model.temperature,
            self.events.clone(),
        )
        .with_max_tokens(model.max_tokens)
        .with_max_iterations(self.config.agent.max_iterations)
    }

    pub(crate) fn tools_for(&self, ctx: &ExecutionContext) -> ToolRegistry {
        sandbox_registry(SandboxBinding::new(
            self.sandbox.clone(),
            ctx.id.clone(),
            self.config.agent.max_tool_output_len,
        ))
    }
}

/// Analyses one log file per run.
pub struct LogDetective {
    services: AgentServices,
    strategy: ChunkStrategy,
}

impl LogDetective {
    pub fn new(services: AgentServices) -> Self {
        Self {
            services,
            strategy: ChunkStrategy::default(),
        }
    }

    /// How to handle files larger than the chunk budget.
    pub fn with_strategy(mut self, strategy: ChunkStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn services(&self) -> &AgentServices {
        &self.services
    }

    /// Analyse `path`, releasing the execution context on Ctrl-C.
    pub async fn run(&self, path: &Path) -> Result<AnalysisReport, DetectiveError> {
        let (source, chunks) = self.prepare(path)?;
        let (source, chunks) = (source.as_str(), chunks.as_slice());
        self.services
            .manager()
            .with_context(move |ctx| self.analyse(ctx, source, chunks))
            .await
    }

    /// [`run`](Self::run) with an explicit interrupt signal.
    pub async fn run_until<S>(&self, path: &Path, interrupt: S) -> Result<AnalysisReport, DetectiveError>
    where
        S: Future<Output = ()>,
    {
        let (source, chunks) = self.prepare(path)?;
        let (source, chunks) = (source.as_str(), chunks.as_slice());
        self.services
            .manager()
            .with_context_until(interrupt, move |ctx| self.analyse(ctx, source, chunks))
            .await
    }

    /// Everything that happens before the first remote request.
    fn prepare(&self, path: &Path) -> Result<(String, Vec<LogChunk>), DetectiveError> {
        self.services.config.require_credentials()?;

        let text = read_log_file(path).map_err(|e| DetectiveError::Input {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "log".to_string());

        let chunks = prepare_chunks(&text, self.strategy, self.services.config.agent.max_chunk_size);
        info!(
            file = %path.display(),
            bytes = text.len(),
            estimated_tokens = estimate_tokens(&text),
            chunks = chunks.len(),
            strategy = ?self.strategy,
            "Prepared log file"
        );
        Ok((source, chunks))
    }

    async fn analyse(
        &self,
        ctx: ExecutionContext,
        source: &str,
        chunks: &[LogChunk],
    ) -> Result<AnalysisReport, DetectiveError> {
        let sandbox = &self.services.sandbox;
        let events = &self.services.events;
        let tools = self.services.tools_for(&ctx);
        let agent = self.services.agent_loop();
        let total = chunks.len();

        let mut report = AnalysisReport::new(source, total);
        report.sampled = chunks.iter().any(|c| c.sampled);

        let mut skip_reason: Option<String> = None;
        for chunk in chunks {
            if let Some(reason) = &skip_reason {
                let finding = failed_finding(chunk, format!("skipped: {reason}"));
                events.publish(RunEvent::ChunkFinished {
                    index: chunk.index,
                    status: finding.status.label().to_string(),
                    iterations: 0,
                    timestamp: chrono::Utc::now(),
                });
                report.push(finding);
                continue;
            }

            info!(chunk = chunk.index + 1, total, bytes = chunk.len(), "Analysing chunk");
            events.publish(RunEvent::ChunkStarted {
                index: chunk.index,
                total,
                bytes: chunk.len(),
                timestamp: chrono::Utc::now(),
            });

            let remote = remote_name(source, chunk.index, total);
            let location = match sandbox.write_file(&ctx.id, &remote, &chunk.content).await {
                Ok(()) => ChunkSource::Uploaded(&remote),
                Err(e) => {
                    warn!(file = %remote, error = %e, "Upload failed, inlining chunk in the prompt");
                    ChunkSource::Inline
                }
            };

            let mut conversation = Conversation::seeded(
                DETECTIVE_SYSTEM_PROMPT,
                analysis_prompt(source, chunk, total, location),
            );

            let finding = match agent.run(&tools, &mut conversation).await {
                Ok(outcome) => ChunkFinding {
                    index: chunk.index,
                    first_line: chunk.first_line,
                    last_line: chunk.last_line,
                    status: if outcome.is_complete() {
                        FindingStatus::Complete
                    } else {
                        FindingStatus::Partial
                    },
                    text: outcome.text,
                    iterations: outcome.iterations,
                },
                Err(e) => {
                    warn!(chunk = chunk.index + 1, error = %e, "Chunk analysis failed");
                    if is_fatal(&e) {
                        warn!("Model credentials rejected, skipping remaining chunks");
                        skip_reason = Some(e.to_string());
                    }
                    failed_finding(chunk, e.to_string())
                }
            };

            events.publish(RunEvent::ChunkFinished {
                index: chunk.index,
                status: finding.status.label().to_string(),
                iterations: finding.iterations,
                timestamp: chrono::Utc::now(),
            });
            report.push(finding);
        }

        Ok(report)
    }
}

fn failed_finding(chunk: &LogChunk, reason: String) -> ChunkFinding {
    ChunkFinding {
        index: chunk.index,
        first_line: chunk.first_line,
        last_line: chunk.last_line,
        status: FindingStatus::Failed(reason),
        text: String::new(),
        iterations: 0,
    }
}

/// Model errors that would fail every remaining chunk the same way; later
/// chunks are recorded as skipped instead of calling the model again.
fn is_fatal(err: &ProviderError) -> bool {
    matches!(
        err,
        ProviderError::AuthenticationFailed(_) | ProviderError::NotConfigured(_)
    )
}

/// Name of the uploaded file: the original name when the log is analysed
/// whole, `<stem>.part-<k>.log` otherwise.
pub fn remote_name(source: &str, index: usize, total: usize) -> String {
    if total <= 1 {
        return source.to_string();
    }
    let stem = Path::new(source)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_string());
    format!("{stem}.part-{}.log", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_file_keeps_its_name() {
        assert_eq!(remote_name("app.log", 0, 1), "app.log");
    }

    #[test]
    fn parts_are_numbered_from_one() {
        assert_eq!(remote_name("app.log", 0, 3), "app.part-1.log");
        assert_eq!(remote_name("server.2024.txt", 2, 3), "server.2024.part-3.log");
    }

    #[test]
    fn auth_errors_are_fatal() {
        assert!(is_fatal(&ProviderError::AuthenticationFailed("bad key".into())));
        assert!(!is_fatal(&ProviderError::Network("reset".into())));
    }

    #[test]
    fn from_config_requires_credentials() {
        let err = AgentServices::from_config(AppConfig::default()).err();
        assert!(matches!(err, Some(DetectiveError::Configuration(_))));
    }
}
