//! Run events: the injectable observer for one Log Detective run.
//!
//! Components publish an event whenever something worth reporting happens
//! (a context was provisioned, a chunk started, a tool ran). The CLI logs
//! through `tracing`; tests subscribe to the bus and assert on events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Everything observable during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
    /// An execution context reached the ready state
    ContextAcquired {
        context_id: String,
        timestamp: DateTime<Utc>,
    },

    /// An execution context was destroyed
    ContextReleased {
        context_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Destroying an execution context failed (logged, never raised)
    ReleaseFailed {
        context_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A chunk's agent loop is starting
    ChunkStarted {
        index: usize,
        total: usize,
        bytes: usize,
        timestamp: DateTime<Utc>,
    },

    /// The model answered one turn
    ModelCalled {
        iteration: usize,
        model: String,
        tool_calls: usize,
        timestamp: DateTime<Utc>,
    },

    /// A model call failed and will be retried
    ModelRetry {
        attempt: u32,
        delay_ms: u64,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool call was dispatched
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A chunk's agent loop finished ("complete", "partial" or "failed")
    ChunkFinished {
        index: usize,
        status: String,
        iterations: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for run events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<RunEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: RunEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RunEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Drain every event currently buffered in a receiver.
pub fn drain(rx: &mut broadcast::Receiver<Arc<RunEvent>>) -> Vec<Arc<RunEvent>> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
