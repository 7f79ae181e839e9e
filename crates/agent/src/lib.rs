//! Log analysis agent for Log Detective.
//!
//! A run moves through:
//!
//! 1. **Validate** both service credentials
//! 2. **Chunk** the local log file (split on line boundaries, or sample)
//! 3. **Acquire** one remote execution context
//! 4. For each chunk in order: **upload** it, then run an agent loop
//!    (model turn → tool dispatch → model turn ...) until the model answers
//!    in text or the iteration cap is hit
//! 5. **Release** the context, whatever happened
//! 6. **Report** the findings in chunk order

pub mod ascii_art;
pub mod chunking;
pub mod detective;
pub mod error;
pub mod loop_runner;
pub mod prompts;
pub mod report;

#[cfg(test)]
mod testing;

pub use ascii_art::AsciiArtAgent;
pub use chunking::{ChunkStrategy, LogChunk, chunk_text, prepare_chunks, sample_log};
pub use detective::{AgentServices, LogDetective};
pub use error::DetectiveError;
pub use loop_runner::{AgentLoop, LoopOutcome, LoopState};
pub use report::{AnalysisReport, ChunkFinding, FindingStatus};
