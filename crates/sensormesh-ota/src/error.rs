//! Error types for the sensormesh-ota crate.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    /// The computed CRC over the staged image does not match the descriptor.
    CrcMismatch { expected: u16, computed: u16 },
    /// The same block was re-requested more times than the resend budget.
    RetriesExhausted { block: u16 },
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateError::CrcMismatch { expected, computed } => {
                write!(
                    f,
                    "firmware crc mismatch: expected 0x{expected:04X}, computed 0x{computed:04X}"
                )
            }
            UpdateError::RetriesExhausted { block } => {
                write!(f, "no response for firmware block {block} after retries")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UpdateError {}
