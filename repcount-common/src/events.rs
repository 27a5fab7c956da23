//! Workout event types and the EventBus that distributes them
//!
//! Events let the overlay, persistence and any UI observe a session without
//! touching the counter that produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::counter::Stage;
use crate::session::WorkoutSummary;

/// Workout event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RepEvent {
    /// A workout session started for a user
    SessionStarted {
        session_id: Uuid,
        user_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The curl stage changed
    StageChanged {
        session_id: Uuid,
        old_stage: Stage,
        new_stage: Stage,
        timestamp: DateTime<Utc>,
    },

    /// A repetition was credited
    RepCompleted {
        session_id: Uuid,
        /// Total reps after this one
        count: u32,
        timestamp: DateTime<Utc>,
    },

    /// The frame loop stopped and the session produced its final result
    SessionEnded {
        session_id: Uuid,
        summary: WorkoutSummary,
        timestamp: DateTime<Utc>,
    },
}

impl RepEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            RepEvent::SessionStarted { session_id, .. }
            | RepEvent::StageChanged { session_id, .. }
            | RepEvent::RepCompleted { session_id, .. }
            | RepEvent::SessionEnded { session_id, .. } => *session_id,
        }
    }
}

/// Central event distribution bus
///
/// Wraps a tokio broadcast channel:
/// - Non-blocking publish (slow subscribers don't block the frame loop)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RepEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<RepEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: RepEvent) -> Result<usize, broadcast::error::SendError<RepEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: RepEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
