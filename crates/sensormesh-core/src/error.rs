//! Error types for the sensormesh-core crate.

use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    TooShort { min: usize, actual: usize },
    TooLong { max: usize, actual: usize },
    UnknownMessageType(u8),
    UnknownValueType(u8),
    ValueTooLong { max: usize, actual: usize },
    TextTooLong { max: usize, actual: usize },
    LengthMismatch { declared: usize, available: usize },
    InvalidText,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::TooShort { min, actual } => {
                write!(f, "frame too short: need at least {min} bytes, got {actual}")
            }
            FrameError::TooLong { max, actual } => {
                write!(f, "frame too long: at most {max} bytes, got {actual}")
            }
            FrameError::UnknownMessageType(v) => write!(f, "unknown message type: {v}"),
            FrameError::UnknownValueType(v) => write!(f, "unknown value type: {v}"),
            FrameError::ValueTooLong { max, actual } => {
                write!(f, "device value too long: at most {max} bytes, got {actual}")
            }
            FrameError::TextTooLong { max, actual } => {
                write!(f, "text payload too long: at most {max} bytes, got {actual}")
            }
            FrameError::LengthMismatch {
                declared,
                available,
            } => {
                write!(
                    f,
                    "declared payload length {declared} exceeds available {available} bytes"
                )
            }
            FrameError::InvalidText => write!(f, "text payload is not valid UTF-8"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FrameError {}
