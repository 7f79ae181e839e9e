//! The per-chunk agent loop.
//!
//! One loop owns one conversation. Each iteration is a single model turn:
//! the model either answers with text (the loop is done) or asks for tool
//! calls, which are dispatched in order before the next turn. When the
//! iteration cap is hit with tool calls still pending, those calls are not
//! dispatched and the loop stops with whatever the model has said so far.

use logdetective_core::error::ProviderError;
use logdetective_core::event::{EventBus, RunEvent};
use logdetective_core::message::{Conversation, Message, MessageToolCall};
use logdetective_core::provider::{Provider, ProviderRequest};
use logdetective_core::tool::{ToolCall, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingModel,
    DispatchingTools,
    /// The model answered without tool calls
    Done,
    /// The iteration cap was reached with tool calls pending
    Aborted,
}

/// What a finished loop produced.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// `Done` or `Aborted`
    pub state: LoopState,

    /// Final answer, or the assistant narration so far when aborted
    pub text: String,

    /// Model turns taken
    pub iterations: usize,

    /// Tool calls dispatched
    pub tool_calls: usize,
}

impl LoopOutcome {
    pub fn is_complete(&self) -> bool {
        self.state == LoopState::Done
    }
}

/// Drives one conversation between a model and a tool registry.
pub struct AgentLoop {
    /// The model service
    provider: Arc<dyn Provider>,

    /// Model name sent with every request
    model: String,

    temperature: f32,

    /// Response token cap per model turn
    max_tokens: Option<u32>,

    /// Maximum model turns
    max_iterations: usize,

    event_bus: Arc<EventBus>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            max_iterations: 10,
            event_bus,
        }
    }

    /// Set the maximum number of model turns.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Set the max tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Run the conversation to completion or to the iteration cap.
    ///
    /// Tool failures never end the loop: they are fed back to the model as
    /// tool results. Only a model-service failure is returned as an error.
    pub async fn run(
        &self,
        tools: &ToolRegistry,
        conversation: &mut Conversation,
    ) -> Result<LoopOutcome, ProviderError> {
        info!(
            conversation_id = %conversation.id,
            messages = conversation.messages.len(),
            max_iterations = self.max_iterations,
            "Starting agent loop"
        );

        let tool_definitions = tools.definitions();
        let mut state = LoopState::AwaitingModel;
        let mut pending: Vec<MessageToolCall> = Vec::new();
        let mut iterations = 0;
        let mut dispatched = 0;
        let mut answer = String::new();

        loop {
            match state {
                LoopState::AwaitingModel => {
                    iterations += 1;
                    debug!(
                        conversation_id = %conversation.id,
                        iteration = iterations,
                        estimated_tokens = conversation.estimated_tokens(),
                        "Calling model"
                    );

                    let request = ProviderRequest {
                        model: self.model.clone(),
                        messages: conversation.messages.clone(),
                        temperature: self.temperature,
                        max_tokens: self.max_tokens,
                        tools: tool_definitions.clone(),
                    };
                    let response = self.provider.complete(request).await?;

                    self.event_bus.publish(RunEvent::ModelCalled {
                        iteration: iterations,
                        model: response.model.clone(),
                        tool_calls: response.message.tool_calls.len(),
                        timestamp: chrono::Utc::now(),
                    });

                    if response.message.tool_calls.is_empty() {
                        answer = response.message.content.clone();
                        conversation.push(response.message);
                        state = LoopState::Done;
                        continue;
                    }

                    pending = response.message.tool_calls.clone();
                    conversation.push(response.message);

                    if iterations >= self.max_iterations {
                        warn!(
                            conversation_id = %conversation.id,
                            iterations,
                            pending = pending.len(),
                            "Iteration cap reached with tool calls pending"
                        );
                        state = LoopState::Aborted;
                    } else {
                        state = LoopState::DispatchingTools;
                    }
                }

                LoopState::DispatchingTools => {
                    for tc in pending.drain(..) {
                        let output = self.dispatch(tools, &tc).await;
                        conversation.push(Message::tool_result(&tc.id, output));
                        dispatched += 1;
                    }
                    state = LoopState::AwaitingModel;
                }

                LoopState::Done | LoopState::Aborted => break,
            }
        }

        let text = match state {
            LoopState::Aborted => conversation.assistant_narration().join("\n\n"),
            _ => answer,
        };

        info!(
            conversation_id = %conversation.id,
            state = ?state,
            iterations,
            tool_calls = dispatched,
            "Agent loop finished"
        );

        Ok(LoopOutcome {
            state,
            text,
            iterations,
            tool_calls: dispatched,
        })
    }

    /// Execute one tool call and render its result for the model.
    async fn dispatch(&self, tools: &ToolRegistry, tc: &MessageToolCall) -> String {
        let start = std::time::Instant::now();
        let result = match ToolCall::from_message(tc) {
            Ok(call) => tools.execute(&call).await,
            Err(e) => Err(e),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        let (success, output) = match result {
            Ok(tool_result) => (tool_result.success, tool_result.output),
            Err(e) => {
                warn!(tool = %tc.name, error = %e, "Tool call failed");
                (false, format!("Error: {e}"))
            }
        };

        self.event_bus.publish(RunEvent::ToolExecuted {
            tool_name: tc.name.clone(),
            success,
            duration_ms,
            timestamp: chrono::Utc::now(),
        });

        output
    }
}
