//! Common error types for repcount

use thiserror::Error;

/// Common result type for repcount operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across repcount crates
///
/// Per-frame detection problems are not represented here. A frame without a
/// usable pose is a [`crate::session::SkipReason`], never an error.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
