//! Errors of the waypoint environment.
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

/// Errors of the waypoint environment.
#[derive(Error, Debug)]
pub enum WpEnvError {
    /// Missing or inconsistent configuration. Raised at startup only.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A descriptor file could not be read.
    #[error("Failed to read {path:?}: {source}")]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A descriptor is not valid YAML or has fields of unexpected types.
    #[error("Malformed descriptor: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A collaborator did not answer within the bounded wait.
    #[error("Transport timeout after {timeout:?} while {operation}")]
    TransportTimeout {
        /// What the loop was waiting for.
        operation: &'static str,
        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// The other side of a transport channel has gone.
    #[error("Transport closed while {0}")]
    TransportClosed(&'static str),

    /// The action does not belong to the action space.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// An internal invariant does not hold. Indicates a bug or corrupted input data.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The environment has been closed.
    #[error("Environment is closed")]
    Closed,
}
