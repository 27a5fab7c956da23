//! Error types for repcount-tr
//!
//! Frame-level detection problems never show up here; they are skipped by
//! the frame processor. These errors cover the frame source, pose estimation
//! and the session registry.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for the tracker
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed line in a pose recording
    #[error("Replay parse error on line {line}: {source}")]
    Replay {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Frame source failure other than I/O
    #[error("Frame source error: {0}")]
    Source(String),

    /// Pose estimator failure for a single frame
    #[error("Pose estimation error: {0}")]
    Estimation(String),

    /// No session with this id
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    /// The user already has a running workout
    #[error("User {user_id} already has an active session {session_id}")]
    SessionAlreadyActive { user_id: String, session_id: Uuid },

    /// The session must be ended before it can be completed
    #[error("Session {0} is still running; end it before completing")]
    SessionStillActive(Uuid),
}

/// Convenience Result type using the tracker Error
pub type Result<T> = std::result::Result<T, Error>;
