//! Event types for the ingest pipeline
//!
//! Provides the pipeline state enum, the IngestEvent enum and the EventBus
//! that carries them to any number of subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pipeline run state
///
/// `Idle → Acquiring → Normalizing → Retrieving → Done`, with `Aborted`
/// reachable from any working state. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PipelineState {
    /// Run created, nothing started
    Idle,
    /// Downloading the yearly archive
    Acquiring,
    /// Extracting and ordering records
    Normalizing,
    /// Fetching one document per record
    Retrieving,
    /// Run finished (individual documents may still have failed)
    Done,
    /// Run stopped by a fatal error
    Aborted,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Aborted)
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Acquiring)
                | (Acquiring, Normalizing)
                | (Normalizing, Retrieving)
                | (Retrieving, Done)
                | (Acquiring, Aborted)
                | (Normalizing, Aborted)
                | (Retrieving, Aborted)
        )
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Acquiring => "acquiring",
            PipelineState::Normalizing => "normalizing",
            PipelineState::Retrieving => "retrieving",
            PipelineState::Done => "done",
            PipelineState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Pipeline events
///
/// Serialized with a `type` tag so subscribers can forward them as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IngestEvent {
    /// Run moved between states
    StateChanged {
        run_id: Uuid,
        old_state: PipelineState,
        new_state: PipelineState,
        timestamp: DateTime<Utc>,
    },

    /// One document was fetched and written
    DocumentRetrieved {
        run_id: Uuid,
        doc_id: String,
        path: String,
        timestamp: DateTime<Utc>,
    },

    /// One document could not be fetched; the run continues
    DocumentFailed {
        run_id: Uuid,
        doc_id: String,
        cause: String,
        timestamp: DateTime<Utc>,
    },

    /// Run reached `Done`
    RunCompleted {
        run_id: Uuid,
        considered: usize,
        retrieved: usize,
        failed: usize,
        skipped: usize,
        timestamp: DateTime<Utc>,
    },

    /// Run reached `Aborted`
    RunAborted {
        run_id: Uuid,
        stage: PipelineState,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for [`IngestEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IngestEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, failing if nobody is listening
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: IngestEvent,
    ) -> Result<usize, broadcast::error::SendError<IngestEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: IngestEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
