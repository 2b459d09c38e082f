//! Error types for the sensormesh-radio crate.

/// Errors from transport construction and socket configuration.
///
/// Steady-state send/receive failures never surface here: the [`Transport`]
/// contract reports them as a boolean link result, matching the radio
/// hardware it stands in for.
///
/// [`Transport`]: crate::Transport
#[derive(Debug, thiserror::Error)]
pub enum RadioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid transport configuration: {0}")]
    Configuration(String),
}
