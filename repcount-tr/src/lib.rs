//! # Repcount Tracker Library (repcount-tr)
//!
//! Drives curl counting for live workout sessions.
//!
//! **Purpose:** Pull frames from a source, run pose estimation, feed each
//! session's rep counter in frame order and publish the results as events.
//!
//! **Architecture:** one frame loop per session, each owning its own counter;
//! a shared registry that starts, stops and completes sessions; an overlay
//! stage that follows sessions through the event bus.

pub mod buildinfo;
pub mod error;
pub mod overlay;
pub mod registry;
pub mod runner;
pub mod source;

pub use buildinfo::BuildInfo;
pub use error::{Error, Result};
pub use registry::{SessionHandle, SessionRegistry};
pub use runner::{RunReport, StopReason, WorkoutRunner};
