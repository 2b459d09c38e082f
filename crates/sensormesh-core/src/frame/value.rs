//! Dynamic device values: a payload tagged with its own primitive type.
//!
//! Level, accumulated, rate, var, and config messages carry one of these.
//! The wire form is the `ptype` tag followed by the packed value bytes;
//! multi-byte integers are little-endian, floats are an f32 followed by a
//! precision byte used when textualizing.

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

use core::fmt::Write as _;

use crate::constants::MAX_DEVICE_VALUE;
use crate::error::FrameError;

mod ptype {
    pub const STRING: u8 = 0;
    pub const BYTE: u8 = 1;
    pub const INT16: u8 = 2;
    pub const UINT16: u8 = 3;
    pub const INT32: u8 = 4;
    pub const UINT32: u8 = 5;
    pub const CUSTOM: u8 = 6;
    pub const FLOAT32: u8 = 7;
}

/// A typed device value.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceValue {
    Text(String),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Custom(Vec<u8>),
    Float { value: f32, precision: u8 },
}

impl DeviceValue {
    /// The wire tag for this value's type.
    #[must_use]
    pub fn ptype(&self) -> u8 {
        match self {
            DeviceValue::Text(_) => ptype::STRING,
            DeviceValue::Byte(_) => ptype::BYTE,
            DeviceValue::Int16(_) => ptype::INT16,
            DeviceValue::UInt16(_) => ptype::UINT16,
            DeviceValue::Int32(_) => ptype::INT32,
            DeviceValue::UInt32(_) => ptype::UINT32,
            DeviceValue::Custom(_) => ptype::CUSTOM,
            DeviceValue::Float { .. } => ptype::FLOAT32,
        }
    }

    /// Byte length of the packed value on the wire.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        match self {
            DeviceValue::Text(s) => s.len(),
            DeviceValue::Byte(_) => 1,
            DeviceValue::Int16(_) | DeviceValue::UInt16(_) => 2,
            DeviceValue::Int32(_) | DeviceValue::UInt32(_) => 4,
            DeviceValue::Custom(b) => b.len(),
            // f32 plus the precision byte
            DeviceValue::Float { .. } => 5,
        }
    }

    /// Append the packed value bytes to `out`.
    ///
    /// Fails if a text or custom value exceeds the device value budget.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), FrameError> {
        match self {
            DeviceValue::Text(s) => {
                if s.len() > MAX_DEVICE_VALUE {
                    return Err(FrameError::ValueTooLong {
                        max: MAX_DEVICE_VALUE,
                        actual: s.len(),
                    });
                }
                out.extend_from_slice(s.as_bytes());
            }
            DeviceValue::Byte(v) => out.push(*v),
            DeviceValue::Int16(v) => out.extend_from_slice(&v.to_le_bytes()),
            DeviceValue::UInt16(v) => out.extend_from_slice(&v.to_le_bytes()),
            DeviceValue::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
            DeviceValue::UInt32(v) => out.extend_from_slice(&v.to_le_bytes()),
            DeviceValue::Custom(b) => {
                if b.len() > MAX_DEVICE_VALUE {
                    return Err(FrameError::ValueTooLong {
                        max: MAX_DEVICE_VALUE,
                        actual: b.len(),
                    });
                }
                out.extend_from_slice(b);
            }
            DeviceValue::Float { value, precision } => {
                out.extend_from_slice(&value.to_le_bytes());
                out.push(*precision);
            }
        }
        Ok(())
    }

    /// Decode a value from its tag and exactly `bytes`.
    pub fn decode(tag: u8, bytes: &[u8]) -> Result<Self, FrameError> {
        let expect = |len: usize| -> Result<(), FrameError> {
            if bytes.len() == len {
                Ok(())
            } else {
                Err(FrameError::LengthMismatch {
                    declared: len,
                    available: bytes.len(),
                })
            }
        };
        match tag {
            ptype::STRING => {
                let s = core::str::from_utf8(bytes).map_err(|_| FrameError::InvalidText)?;
                Ok(DeviceValue::Text(String::from(s)))
            }
            ptype::BYTE => {
                expect(1)?;
                Ok(DeviceValue::Byte(bytes[0]))
            }
            ptype::INT16 => {
                expect(2)?;
                Ok(DeviceValue::Int16(i16::from_le_bytes([bytes[0], bytes[1]])))
            }
            ptype::UINT16 => {
                expect(2)?;
                Ok(DeviceValue::UInt16(u16::from_le_bytes([bytes[0], bytes[1]])))
            }
            ptype::INT32 => {
                expect(4)?;
                Ok(DeviceValue::Int32(i32::from_le_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3],
                ])))
            }
            ptype::UINT32 => {
                expect(4)?;
                Ok(DeviceValue::UInt32(u32::from_le_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3],
                ])))
            }
            ptype::CUSTOM => Ok(DeviceValue::Custom(Vec::from(bytes))),
            ptype::FLOAT32 => {
                expect(5)?;
                Ok(DeviceValue::Float {
                    value: f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
                    precision: bytes[4],
                })
            }
            other => Err(FrameError::UnknownValueType(other)),
        }
    }

    /// Textualize the value.
    ///
    /// Strings are copied verbatim, integers render base-10, floats with the
    /// stored precision, custom bytes as uppercase hex (two chars per byte).
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            DeviceValue::Text(s) => s.clone(),
            DeviceValue::Byte(v) => {
                let mut out = String::new();
                let _ = write!(out, "{v}");
                out
            }
            DeviceValue::Int16(v) => {
                let mut out = String::new();
                let _ = write!(out, "{v}");
                out
            }
            DeviceValue::UInt16(v) => {
                let mut out = String::new();
                let _ = write!(out, "{v}");
                out
            }
            DeviceValue::Int32(v) => {
                let mut out = String::new();
                let _ = write!(out, "{v}");
                out
            }
            DeviceValue::UInt32(v) => {
                let mut out = String::new();
                let _ = write!(out, "{v}");
                out
            }
            DeviceValue::Custom(bytes) => {
                let mut out = String::with_capacity(bytes.len() * 2);
                for b in bytes {
                    let _ = write!(out, "{b:02X}");
                }
                out
            }
            DeviceValue::Float { value, precision } => {
                let mut out = String::new();
                let _ = write!(out, "{value:.prec$}", prec = *precision as usize);
                out
            }
        }
    }
}
