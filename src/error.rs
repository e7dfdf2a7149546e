//! Error type for environment I/O operations
//!
//! Instrumentation never produces errors of its own; every `EnvError` a
//! caller sees originated in the delegate environment and is propagated
//! unchanged through the tracing wrappers.

use thiserror::Error;

/// Result alias used throughout the environment abstraction.
pub type Result<T> = std::result::Result<T, EnvError>;

/// Failure raised by an environment or file-handle operation.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Underlying OS-level I/O failure, tagged with the file it hit
    #[error("IO error: {path}: {source}")]
    Io {
        /// Path of the file the operation targeted
        path: String,
        /// The OS error
        #[source]
        source: std::io::Error,
    },

    /// Operation attempted on a handle after `close`
    #[error("invalid handle: {path}: file is closed")]
    Closed {
        /// Path of the closed file
        path: String,
    },
}

impl EnvError {
    /// Wrap an `io::Error` with the path it occurred on.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
