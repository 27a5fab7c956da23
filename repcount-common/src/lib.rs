//! # Repcount Common Library
//!
//! Shared code for the repcount workspace including:
//! - Joint geometry and elbow angle calculation
//! - Pose landmark types supplied by the pose-estimation model
//! - The curl repetition state machine and per-frame processor
//! - Workout summaries, log entries and event types
//! - Configuration loading
//! - Utility functions

pub mod config;
pub mod counter;
pub mod error;
pub mod events;
pub mod geometry;
pub mod pose;
pub mod session;
pub mod time;

pub use counter::{RepCounter, RepCounterState, Stage};
pub use error::{Error, Result};
pub use geometry::{calculate_angle, AnglePoints, JointPoint};
pub use pose::{Landmark, LandmarkPosition, PoseResult};
pub use session::{FrameOutcome, FrameProcessor, SkipReason, WorkoutLogEntry, WorkoutSummary};
