//! Per-session frame processing and workout results
//!
//! A session starts with a fresh [`RepCounterState`], processes pose frames
//! one at a time in arrival order, and ends with a [`WorkoutSummary`] that
//! the caller persists as a [`WorkoutLogEntry`].
//!
//! Frames without a usable arm (no pose, missing or low-visibility joints,
//! degenerate geometry) are skipped: the counter is not updated and nothing
//! is reported as an error.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CounterConfig;
use crate::counter::{RepCounter, RepCounterState, Stage, Thresholds, Transition};
use crate::pose::{Landmark, PoseResult};

/// Why a frame did not reach the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The pose model found no person
    NoPose,
    /// A tracked joint was absent from the landmarks
    MissingLandmark(Landmark),
    /// A tracked joint was under the visibility threshold
    LowVisibility(Landmark),
    /// A tracked joint had a NaN or infinite coordinate
    InvalidCoordinate(Landmark),
    /// Shoulder, elbow and wrist (nearly) coincide
    DegenerateGeometry,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoPose => write!(f, "no pose detected"),
            SkipReason::MissingLandmark(l) => write!(f, "missing landmark {}", l),
            SkipReason::LowVisibility(l) => write!(f, "low visibility for {}", l),
            SkipReason::InvalidCoordinate(l) => write!(f, "invalid coordinate for {}", l),
            SkipReason::DegenerateGeometry => write!(f, "degenerate joint geometry"),
        }
    }
}

/// Result of processing one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// The elbow angle was fed to the counter
    Counted {
        angle: f64,
        state: RepCounterState,
        transition: Transition,
    },
    /// The frame was dropped and the state left unchanged
    Skipped(SkipReason),
}

/// Final result of a workout session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub reps: u32,
    pub final_stage: Stage,
    /// Frames whose angle reached the counter
    pub frames_processed: u64,
    /// Frames dropped by the skip policy
    pub frames_skipped: u64,
}

impl WorkoutSummary {
    pub fn state(&self) -> RepCounterState {
        RepCounterState {
            count: self.reps,
            stage: self.final_stage,
        }
    }
}

/// Rep counter plus the frame acceptance policy for one session
#[derive(Debug, Clone)]
pub struct FrameProcessor {
    counter: RepCounter,
    min_visibility: f32,
    min_segment_length: f64,
    frames_processed: u64,
    frames_skipped: u64,
}

impl FrameProcessor {
    /// Start a session: count 0, stage unknown
    pub fn start_session(config: &CounterConfig) -> Self {
        Self {
            counter: RepCounter::new(Thresholds::from(config)),
            min_visibility: config.min_visibility,
            min_segment_length: config.min_segment_length,
            frames_processed: 0,
            frames_skipped: 0,
        }
    }

    pub fn state(&self) -> RepCounterState {
        self.counter.state()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Process one frame of pose output
    pub fn process_frame(&mut self, pose: &PoseResult) -> FrameOutcome {
        let points = match pose.curl_points(self.min_visibility) {
            Ok(points) if points.is_degenerate(self.min_segment_length) => {
                return self.skip(SkipReason::DegenerateGeometry);
            }
            Ok(points) => points,
            Err(reason) => return self.skip(reason),
        };

        let angle = points.angle();
        let transition = self.counter.step(angle);
        self.frames_processed += 1;

        FrameOutcome::Counted {
            angle,
            state: self.counter.state(),
            transition,
        }
    }

    fn skip(&mut self, reason: SkipReason) -> FrameOutcome {
        self.frames_skipped += 1;
        debug!("Skipping frame: {}", reason);
        FrameOutcome::Skipped(reason)
    }

    /// Snapshot the session for persistence
    pub fn end_session(self) -> WorkoutSummary {
        let state = self.counter.state();
        WorkoutSummary {
            reps: state.count,
            final_stage: state.stage,
            frames_processed: self.frames_processed,
            frames_skipped: self.frames_skipped,
        }
    }
}

/// State of a session that has not seen any frames
pub fn start_session() -> RepCounterState {
    RepCounterState::new()
}

/// Apply one frame to a state snapshot
///
/// Returns the state unchanged when the frame is skipped.
pub fn process_frame(
    state: RepCounterState,
    pose: &PoseResult,
    config: &CounterConfig,
) -> RepCounterState {
    let mut processor = FrameProcessor {
        counter: RepCounter::with_state(state, Thresholds::from(config)),
        ..FrameProcessor::start_session(config)
    };
    processor.process_frame(pose);
    processor.state()
}

/// Snapshot a state for persistence
pub fn end_session(state: RepCounterState) -> WorkoutSummary {
    WorkoutSummary {
        reps: state.count,
        final_stage: state.stage,
        frames_processed: 0,
        frames_skipped: 0,
    }
}

/// One completed workout, ready for the persistence layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutLogEntry {
    pub user_id: String,
    pub recorded_at: DateTime<Utc>,
    pub reps: u32,
    pub final_stage: Stage,
}

impl WorkoutLogEntry {
    pub fn new(user_id: impl Into<String>, summary: &WorkoutSummary, recorded_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            recorded_at,
            reps: summary.reps,
            final_stage: summary.final_stage,
        }
    }

    /// Timestamp as shown in workout history ("2024-05-01 18:30:00"), in
    /// the machine's local time zone
    pub fn date_label(&self) -> String {
        self.recorded_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    /// Final stage as stored in workout history, empty when never extended
    pub fn stage_label(&self) -> &'static str {
        self.final_stage.label().unwrap_or("")
    }
}
