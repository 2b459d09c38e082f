//! Error types for the node runtime.
//!
//! These surface only from configuration and storage plumbing. The radio
//! protocol itself reports through boolean send results and log lines, the
//! way the embedded target does.

/// Errors from node setup and persistence.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("radio error: {0}")]
    Radio(#[from] sensormesh_radio::RadioError),
}
