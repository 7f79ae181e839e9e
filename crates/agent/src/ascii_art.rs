//! The ASCII art demonstration task: the model writes a small program in the
//! execution context, runs it, fixes it until it works, and reports the
//! source and output.

use crate::detective::AgentServices;
use crate::error::DetectiveError;
use crate::loop_runner::LoopState;
use crate::prompts::{ASCII_ART_SYSTEM_PROMPT, ascii_art_prompt};
use crate::report::INCOMPLETE_MARKER;
use logdetective_core::message::Conversation;
use tracing::{info, warn};

pub const DEFAULT_TEXT: &str = "hello runloop";

pub struct AsciiArtAgent {
    services: AgentServices,
}

impl AsciiArtAgent {
    pub fn new(services: AgentServices) -> Self {
        Self { services }
    }

    /// Run the task and return the model's final text. When the iteration
    /// cap cuts the task off, the narration so far is returned behind
    /// [`INCOMPLETE_MARKER`].
    pub async fn run(&self, text: &str) -> Result<String, DetectiveError> {
        self.services.config.require_credentials()?;

        self.services
            .manager()
            .with_context(move |ctx| async move {
                let tools = self.services.tools_for(&ctx);
                let mut conversation = Conversation::seeded(ASCII_ART_SYSTEM_PROMPT, ascii_art_prompt(text));

                let outcome = self.services.agent_loop().run(&tools, &mut conversation).await?;
                if outcome.state == LoopState::Aborted {
                    warn!(iterations = outcome.iterations, "Iteration cap reached before the program worked");
                    return Ok(format!("{INCOMPLETE_MARKER}\n{}", outcome.text));
                }
                info!(iterations = outcome.iterations, tool_calls = outcome.tool_calls, "Task finished");
                Ok::<_, DetectiveError>(outcome.text)
            })
            .await
    }
}
