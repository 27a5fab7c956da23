//! HUD text drawn over the video feed
//!
//! The overlay follows sessions through the event bus rather than reading
//! the counter, so it can run on its own task next to the frame loop.
//! Pixel drawing belongs to the renderer; this only produces the labels.

use std::collections::HashMap;
use std::fmt;

use repcount_common::events::RepEvent;
use repcount_common::{RepCounterState, Stage};
use uuid::Uuid;

/// Labels and values shown in the corner box of the video feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayText {
    pub reps_label: &'static str,
    pub reps: String,
    pub stage_label: &'static str,
    pub stage: String,
}

impl OverlayText {
    pub fn from_state(state: &RepCounterState) -> Self {
        Self {
            reps_label: "REPS",
            reps: state.count.to_string(),
            stage_label: "STAGE",
            stage: state.stage.label().unwrap_or("").to_string(),
        }
    }
}

impl fmt::Display for OverlayText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} | {} {}",
            self.reps_label, self.reps, self.stage_label, self.stage
        )
    }
}

/// Per-session state folded from the event stream
#[derive(Debug, Default)]
pub struct OverlayTracker {
    sessions: HashMap<Uuid, RepCounterState>,
}

impl OverlayTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event in; returns the new overlay if the session's display changed
    pub fn apply(&mut self, event: &RepEvent) -> Option<OverlayText> {
        match event {
            RepEvent::SessionStarted { session_id, .. } => {
                let state = RepCounterState::new();
                self.sessions.insert(*session_id, state);
                Some(OverlayText::from_state(&state))
            }
            RepEvent::StageChanged {
                session_id,
                new_stage,
                ..
            } => {
                let state = self.sessions.entry(*session_id).or_default();
                state.stage = *new_stage;
                Some(OverlayText::from_state(state))
            }
            RepEvent::RepCompleted {
                session_id, count, ..
            } => {
                let state = self.sessions.entry(*session_id).or_default();
                state.count = *count;
                state.stage = Stage::Up;
                Some(OverlayText::from_state(state))
            }
            RepEvent::SessionEnded { session_id, .. } => {
                self.sessions.remove(session_id);
                None
            }
        }
    }

    pub fn current(&self, session_id: Uuid) -> Option<OverlayText> {
        self.sessions.get(&session_id).map(OverlayText::from_state)
    }
}
