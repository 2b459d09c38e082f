//! Typed payload variants and their packed encodings.
//!
//! The payload is a sum type discriminated on the wire by [`MessageType`].
//! Control variants carry fixed little-endian fields, device variants share
//! the dynamic `{device, length_req, ptype, value}` layout, and the firmware
//! variants carry the block transfer protocol fields.

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

use crate::constants::{FIRMWARE_BLOCK_SIZE, MAX_PAYLOAD};
use crate::error::FrameError;
use crate::frame::message_type::MessageType;
use crate::frame::value::DeviceValue;

/// Fields of the `Node` presentation message sent at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeInfo {
    pub major_version: u8,
    pub minor_version: u8,
    pub is_repeater: bool,
    pub parent: u8,
}

/// Fields of a per-device `Presentation` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presentation {
    pub device: u8,
    pub device_type: u8,
    pub binary: bool,
    pub calibrated: bool,
}

/// The 4-tuple identifying a firmware image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirmwareDescriptor {
    pub firmware_type: u16,
    pub version: u16,
    pub blocks: u16,
    pub crc: u16,
}

impl FirmwareDescriptor {
    pub const WIRE_SIZE: usize = 8;

    /// Pack as four little-endian u16 fields.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let mut out = [0u8; Self::WIRE_SIZE];
        out[0..2].copy_from_slice(&self.firmware_type.to_le_bytes());
        out[2..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..6].copy_from_slice(&self.blocks.to_le_bytes());
        out[6..8].copy_from_slice(&self.crc.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() != Self::WIRE_SIZE {
            return Err(FrameError::LengthMismatch {
                declared: Self::WIRE_SIZE,
                available: bytes.len(),
            });
        }
        Ok(FirmwareDescriptor {
            firmware_type: u16::from_le_bytes([bytes[0], bytes[1]]),
            version: u16::from_le_bytes([bytes[2], bytes[3]]),
            blocks: u16::from_le_bytes([bytes[4], bytes[5]]),
            crc: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }
}

/// The device message kinds, all sharing the dynamic payload layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Status,
    Armed,
    Tripped,
    Locked,
    Level,
    Percentage,
    Power,
    Accumulated,
    Rate,
    Mode,
    Angle,
    Stop,
    Rgb,
    Rgbw,
    Scene,
    Var,
    Config,
    IrSend,
    IrReceived,
}

impl DeviceKind {
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            DeviceKind::Status => MessageType::DeviceStatus,
            DeviceKind::Armed => MessageType::DeviceArmed,
            DeviceKind::Tripped => MessageType::DeviceTripped,
            DeviceKind::Locked => MessageType::DeviceLocked,
            DeviceKind::Level => MessageType::DeviceLevel,
            DeviceKind::Percentage => MessageType::DevicePercentage,
            DeviceKind::Power => MessageType::DevicePower,
            DeviceKind::Accumulated => MessageType::DeviceAccumulated,
            DeviceKind::Rate => MessageType::DeviceRate,
            DeviceKind::Mode => MessageType::DeviceMode,
            DeviceKind::Angle => MessageType::DeviceAngle,
            DeviceKind::Stop => MessageType::DeviceStop,
            DeviceKind::Rgb => MessageType::DeviceRgb,
            DeviceKind::Rgbw => MessageType::DeviceRgbw,
            DeviceKind::Scene => MessageType::DeviceScene,
            DeviceKind::Var => MessageType::DeviceVar,
            DeviceKind::Config => MessageType::DeviceConfig,
            DeviceKind::IrSend => MessageType::DeviceIrSend,
            DeviceKind::IrReceived => MessageType::DeviceIrReceived,
        }
    }

    #[must_use]
    pub fn from_message_type(t: MessageType) -> Option<Self> {
        Some(match t {
            MessageType::DeviceStatus => DeviceKind::Status,
            MessageType::DeviceArmed => DeviceKind::Armed,
            MessageType::DeviceTripped => DeviceKind::Tripped,
            MessageType::DeviceLocked => DeviceKind::Locked,
            MessageType::DeviceLevel => DeviceKind::Level,
            MessageType::DevicePercentage => DeviceKind::Percentage,
            MessageType::DevicePower => DeviceKind::Power,
            MessageType::DeviceAccumulated => DeviceKind::Accumulated,
            MessageType::DeviceRate => DeviceKind::Rate,
            MessageType::DeviceMode => DeviceKind::Mode,
            MessageType::DeviceAngle => DeviceKind::Angle,
            MessageType::DeviceStop => DeviceKind::Stop,
            MessageType::DeviceRgb => DeviceKind::Rgb,
            MessageType::DeviceRgbw => DeviceKind::Rgbw,
            MessageType::DeviceScene => DeviceKind::Scene,
            MessageType::DeviceVar => DeviceKind::Var,
            MessageType::DeviceConfig => DeviceKind::Config,
            MessageType::DeviceIrSend => DeviceKind::IrSend,
            MessageType::DeviceIrReceived => DeviceKind::IrReceived,
            _ => return None,
        })
    }
}

/// Request flag in the device payload's `length_req` byte.
const LENGTH_REQ_REQUEST: u8 = 0x80;
/// Value-length mask in the device payload's `length_req` byte.
const LENGTH_REQ_LEN_MASK: u8 = 0x7F;

/// A decoded frame payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Node(NodeInfo),
    Presentation(Presentation),
    Version(String),
    Name(String),
    IdRequest {
        request_identifier: u16,
    },
    IdResponse {
        request_identifier: u16,
        new_id: u8,
    },
    FindParentRequest,
    FindParentResponse {
        distance: u8,
    },
    LogMessage(String),
    BatteryLevel {
        level: u8,
    },
    TimeRequest,
    TimeResponse {
        time: u32,
    },
    Reset,
    InclusionMode {
        enabled: bool,
    },
    GatewayReady,
    Device {
        kind: DeviceKind,
        device: u8,
        request: bool,
        value: DeviceValue,
    },
    FirmwareConfigRequest(FirmwareDescriptor),
    FirmwareConfigResponse(FirmwareDescriptor),
    FirmwareRequest {
        firmware_type: u16,
        version: u16,
        block: u16,
    },
    FirmwareResponse {
        firmware_type: u16,
        version: u16,
        block: u16,
        data: [u8; FIRMWARE_BLOCK_SIZE],
    },
}

impl Payload {
    /// The wire discriminator for this payload.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            Payload::Node(_) => MessageType::Node,
            Payload::Presentation(_) => MessageType::Presentation,
            Payload::Version(_) => MessageType::Version,
            Payload::Name(_) => MessageType::Name,
            Payload::IdRequest { .. } => MessageType::IdRequest,
            Payload::IdResponse { .. } => MessageType::IdResponse,
            Payload::FindParentRequest => MessageType::FindParentRequest,
            Payload::FindParentResponse { .. } => MessageType::FindParentResponse,
            Payload::LogMessage(_) => MessageType::LogMessage,
            Payload::BatteryLevel { .. } => MessageType::BatteryLevel,
            Payload::TimeRequest => MessageType::TimeRequest,
            Payload::TimeResponse { .. } => MessageType::TimeResponse,
            Payload::Reset => MessageType::Reset,
            Payload::InclusionMode { .. } => MessageType::InclusionMode,
            Payload::GatewayReady => MessageType::GatewayReady,
            Payload::Device { kind, .. } => kind.message_type(),
            Payload::FirmwareConfigRequest(_) => MessageType::FirmwareConfigRequest,
            Payload::FirmwareConfigResponse(_) => MessageType::FirmwareConfigResponse,
            Payload::FirmwareRequest { .. } => MessageType::FirmwareRequest,
            Payload::FirmwareResponse { .. } => MessageType::FirmwareResponse,
        }
    }

    /// Append the packed payload bytes to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), FrameError> {
        match self {
            Payload::Node(info) => {
                out.push(info.major_version);
                out.push(info.minor_version);
                out.push(info.is_repeater as u8);
                out.push(info.parent);
            }
            Payload::Presentation(p) => {
                out.push(p.device);
                out.push(p.device_type);
                out.push(p.binary as u8);
                out.push(p.calibrated as u8);
            }
            Payload::Version(s) | Payload::Name(s) | Payload::LogMessage(s) => {
                encode_text(s, out)?;
            }
            Payload::IdRequest { request_identifier } => {
                out.extend_from_slice(&request_identifier.to_le_bytes());
            }
            Payload::IdResponse {
                request_identifier,
                new_id,
            } => {
                out.extend_from_slice(&request_identifier.to_le_bytes());
                out.push(*new_id);
            }
            Payload::FindParentRequest | Payload::TimeRequest | Payload::Reset
            | Payload::GatewayReady => {}
            Payload::FindParentResponse { distance } => out.push(*distance),
            Payload::BatteryLevel { level } => out.push(*level),
            Payload::TimeResponse { time } => out.extend_from_slice(&time.to_le_bytes()),
            Payload::InclusionMode { enabled } => out.push(*enabled as u8),
            Payload::Device {
                device,
                request,
                value,
                ..
            } => {
                let len = value.wire_len();
                debug_assert!(len <= LENGTH_REQ_LEN_MASK as usize);
                out.push(*device);
                out.push((len as u8 & LENGTH_REQ_LEN_MASK) | if *request { LENGTH_REQ_REQUEST } else { 0 });
                out.push(value.ptype());
                value.encode_into(out)?;
            }
            Payload::FirmwareConfigRequest(d) | Payload::FirmwareConfigResponse(d) => {
                out.extend_from_slice(&d.to_bytes());
            }
            Payload::FirmwareRequest {
                firmware_type,
                version,
                block,
            } => {
                out.extend_from_slice(&firmware_type.to_le_bytes());
                out.extend_from_slice(&version.to_le_bytes());
                out.extend_from_slice(&block.to_le_bytes());
            }
            Payload::FirmwareResponse {
                firmware_type,
                version,
                block,
                data,
            } => {
                out.extend_from_slice(&firmware_type.to_le_bytes());
                out.extend_from_slice(&version.to_le_bytes());
                out.extend_from_slice(&block.to_le_bytes());
                out.extend_from_slice(data);
            }
        }
        Ok(())
    }

    /// Decode a payload from the discriminator and the bytes after the header.
    pub fn decode(message_type: MessageType, bytes: &[u8]) -> Result<Self, FrameError> {
        if let Some(kind) = DeviceKind::from_message_type(message_type) {
            return decode_device(kind, bytes);
        }
        match message_type {
            MessageType::Node => {
                expect_len(bytes, 4)?;
                Ok(Payload::Node(NodeInfo {
                    major_version: bytes[0],
                    minor_version: bytes[1],
                    is_repeater: bytes[2] != 0,
                    parent: bytes[3],
                }))
            }
            MessageType::Presentation => {
                expect_len(bytes, 4)?;
                Ok(Payload::Presentation(Presentation {
                    device: bytes[0],
                    device_type: bytes[1],
                    binary: bytes[2] != 0,
                    calibrated: bytes[3] != 0,
                }))
            }
            MessageType::Version => Ok(Payload::Version(decode_text(bytes)?)),
            MessageType::Name => Ok(Payload::Name(decode_text(bytes)?)),
            MessageType::LogMessage => Ok(Payload::LogMessage(decode_text(bytes)?)),
            MessageType::IdRequest => {
                expect_len(bytes, 2)?;
                Ok(Payload::IdRequest {
                    request_identifier: u16::from_le_bytes([bytes[0], bytes[1]]),
                })
            }
            MessageType::IdResponse => {
                expect_len(bytes, 3)?;
                Ok(Payload::IdResponse {
                    request_identifier: u16::from_le_bytes([bytes[0], bytes[1]]),
                    new_id: bytes[2],
                })
            }
            MessageType::FindParentRequest => {
                expect_len(bytes, 0)?;
                Ok(Payload::FindParentRequest)
            }
            MessageType::FindParentResponse => {
                expect_len(bytes, 1)?;
                Ok(Payload::FindParentResponse { distance: bytes[0] })
            }
            MessageType::BatteryLevel => {
                expect_len(bytes, 1)?;
                Ok(Payload::BatteryLevel { level: bytes[0] })
            }
            MessageType::TimeRequest => {
                expect_len(bytes, 0)?;
                Ok(Payload::TimeRequest)
            }
            MessageType::TimeResponse => {
                expect_len(bytes, 4)?;
                Ok(Payload::TimeResponse {
                    time: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
                })
            }
            MessageType::Reset => {
                expect_len(bytes, 0)?;
                Ok(Payload::Reset)
            }
            MessageType::InclusionMode => {
                expect_len(bytes, 1)?;
                Ok(Payload::InclusionMode {
                    enabled: bytes[0] != 0,
                })
            }
            MessageType::GatewayReady => {
                expect_len(bytes, 0)?;
                Ok(Payload::GatewayReady)
            }
            MessageType::FirmwareConfigRequest => Ok(Payload::FirmwareConfigRequest(
                FirmwareDescriptor::from_bytes(bytes)?,
            )),
            MessageType::FirmwareConfigResponse => Ok(Payload::FirmwareConfigResponse(
                FirmwareDescriptor::from_bytes(bytes)?,
            )),
            MessageType::FirmwareRequest => {
                expect_len(bytes, 6)?;
                Ok(Payload::FirmwareRequest {
                    firmware_type: u16::from_le_bytes([bytes[0], bytes[1]]),
                    version: u16::from_le_bytes([bytes[2], bytes[3]]),
                    block: u16::from_le_bytes([bytes[4], bytes[5]]),
                })
            }
            MessageType::FirmwareResponse => {
                expect_len(bytes, 6 + FIRMWARE_BLOCK_SIZE)?;
                let mut data = [0u8; FIRMWARE_BLOCK_SIZE];
                data.copy_from_slice(&bytes[6..]);
                Ok(Payload::FirmwareResponse {
                    firmware_type: u16::from_le_bytes([bytes[0], bytes[1]]),
                    version: u16::from_le_bytes([bytes[2], bytes[3]]),
                    block: u16::from_le_bytes([bytes[4], bytes[5]]),
                    data,
                })
            }
            // Device types were handled above.
            _ => unreachable!("device types handled before the match"),
        }
    }
}

fn expect_len(bytes: &[u8], len: usize) -> Result<(), FrameError> {
    if bytes.len() == len {
        Ok(())
    } else {
        Err(FrameError::LengthMismatch {
            declared: len,
            available: bytes.len(),
        })
    }
}

fn encode_text(s: &str, out: &mut Vec<u8>) -> Result<(), FrameError> {
    if s.len() > MAX_PAYLOAD {
        return Err(FrameError::TextTooLong {
            max: MAX_PAYLOAD,
            actual: s.len(),
        });
    }
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

fn decode_text(bytes: &[u8]) -> Result<String, FrameError> {
    core::str::from_utf8(bytes)
        .map(String::from)
        .map_err(|_| FrameError::InvalidText)
}

fn decode_device(kind: DeviceKind, bytes: &[u8]) -> Result<Payload, FrameError> {
    if bytes.len() < 3 {
        return Err(FrameError::TooShort {
            min: 3,
            actual: bytes.len(),
        });
    }
    let device = bytes[0];
    let request = bytes[1] & LENGTH_REQ_REQUEST != 0;
    let len = (bytes[1] & LENGTH_REQ_LEN_MASK) as usize;
    let rest = &bytes[3..];
    // The declared length is authoritative; trailing radio padding is ignored.
    if len > rest.len() {
        return Err(FrameError::LengthMismatch {
            declared: len,
            available: rest.len(),
        });
    }
    let value = DeviceValue::decode(bytes[2], &rest[..len])?;
    Ok(Payload::Device {
        kind,
        device,
        request,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;

    fn roundtrip(p: &Payload) -> Payload {
        let mut buf = Vec::new();
        p.encode_into(&mut buf).unwrap();
        assert!(buf.len() <= MAX_PAYLOAD, "payload overflows budget: {p:?}");
        Payload::decode(p.message_type(), &buf).unwrap()
    }

    #[test]
    fn test_control_roundtrips() {
        let payloads = [
            Payload::Node(NodeInfo {
                major_version: 1,
                minor_version: 4,
                is_repeater: true,
                parent: 3,
            }),
            Payload::Presentation(Presentation {
                device: 2,
                device_type: 17,
                binary: true,
                calibrated: false,
            }),
            Payload::Version("1.4.1".to_string()),
            Payload::Name("window sensor".to_string()),
            Payload::IdRequest {
                request_identifier: 0xBEEF,
            },
            Payload::IdResponse {
                request_identifier: 0xBEEF,
                new_id: 7,
            },
            Payload::FindParentRequest,
            Payload::FindParentResponse { distance: 3 },
            Payload::LogMessage("lost parent".to_string()),
            Payload::BatteryLevel { level: 87 },
            Payload::TimeRequest,
            Payload::TimeResponse { time: 1_700_000_000 },
            Payload::Reset,
            Payload::InclusionMode { enabled: true },
            Payload::GatewayReady,
        ];
        for p in &payloads {
            assert_eq!(&roundtrip(p), p);
        }
    }

    #[test]
    fn test_device_roundtrips() {
        let payloads = [
            Payload::Device {
                kind: DeviceKind::Status,
                device: 2,
                request: false,
                value: DeviceValue::Byte(1),
            },
            Payload::Device {
                kind: DeviceKind::Level,
                device: 0,
                request: false,
                value: DeviceValue::Float {
                    value: 21.5,
                    precision: 1,
                },
            },
            Payload::Device {
                kind: DeviceKind::Var,
                device: 9,
                request: true,
                value: DeviceValue::Text(String::new()),
            },
            Payload::Device {
                kind: DeviceKind::IrSend,
                device: 1,
                request: false,
                value: DeviceValue::UInt32(0xA90),
            },
            Payload::Device {
                kind: DeviceKind::Config,
                device: 4,
                request: false,
                value: DeviceValue::Custom(vec![0x01, 0x02, 0x03]),
            },
        ];
        for p in &payloads {
            assert_eq!(&roundtrip(p), p);
        }
    }

    #[test]
    fn test_firmware_roundtrips() {
        let descriptor = FirmwareDescriptor {
            firmware_type: 1,
            version: 2,
            blocks: 4,
            crc: 0xBBBB,
        };
        let payloads = [
            Payload::FirmwareConfigRequest(descriptor),
            Payload::FirmwareConfigResponse(descriptor),
            Payload::FirmwareRequest {
                firmware_type: 1,
                version: 2,
                block: 3,
            },
            Payload::FirmwareResponse {
                firmware_type: 1,
                version: 2,
                block: 3,
                data: [0x5A; FIRMWARE_BLOCK_SIZE],
            },
        ];
        for p in &payloads {
            assert_eq!(&roundtrip(p), p);
        }
    }

    #[test]
    fn test_descriptor_wire_layout_little_endian() {
        let d = FirmwareDescriptor {
            firmware_type: 0x0102,
            version: 0x0304,
            blocks: 0x0506,
            crc: 0x0708,
        };
        assert_eq!(
            d.to_bytes(),
            [0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0x08, 0x07]
        );
    }

    #[test]
    fn test_device_request_flag_in_length_byte() {
        let p = Payload::Device {
            kind: DeviceKind::Level,
            device: 5,
            request: true,
            value: DeviceValue::Text(String::new()),
        };
        let mut buf = Vec::new();
        p.encode_into(&mut buf).unwrap();
        assert_eq!(buf[0], 5);
        assert_eq!(buf[1], 0x80);
        assert_eq!(buf[2], 0); // string ptype
    }

    #[test]
    fn test_device_trailing_padding_ignored() {
        // device=1, len=1, ptype=BYTE, value=9, then two bytes of radio padding
        let bytes = [1, 0x01, 1, 9, 0xAA, 0xBB];
        let p = Payload::decode(MessageType::DeviceStatus, &bytes).unwrap();
        assert_eq!(
            p,
            Payload::Device {
                kind: DeviceKind::Status,
                device: 1,
                request: false,
                value: DeviceValue::Byte(9),
            }
        );
    }

    #[test]
    fn test_device_declared_length_beyond_buffer() {
        let bytes = [1, 0x10, 0, 0x41]; // declares 16 bytes, one available
        assert!(matches!(
            Payload::decode(MessageType::DeviceVar, &bytes),
            Err(FrameError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_fixed_payload_length_enforced() {
        assert!(Payload::decode(MessageType::Node, &[1, 2, 3]).is_err());
        assert!(Payload::decode(MessageType::IdResponse, &[1, 2]).is_err());
        assert!(Payload::decode(MessageType::FindParentRequest, &[0]).is_err());
        assert!(Payload::decode(MessageType::FirmwareResponse, &[0; 10]).is_err());
    }

    #[test]
    fn test_text_budget_enforced() {
        let p = Payload::LogMessage("x".repeat(MAX_PAYLOAD + 1));
        let mut buf = Vec::new();
        assert!(matches!(
            p.encode_into(&mut buf),
            Err(FrameError::TextTooLong { .. })
        ));
    }

    #[test]
    fn test_device_kind_mapping_is_total_over_device_types() {
        for v in 32..=50u8 {
            let t = MessageType::from_u8(v).unwrap();
            let kind = DeviceKind::from_message_type(t).unwrap();
            assert_eq!(kind.message_type(), t);
        }
        assert!(DeviceKind::from_message_type(MessageType::Reset).is_none());
    }
}
