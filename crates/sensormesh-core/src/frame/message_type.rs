//! The wire discriminator for frame payloads.

use crate::error::FrameError;

/// Every message variant the node runtime understands, with its wire value.
///
/// Values 0..=14 are control traffic, 32..=50 device traffic (all sharing
/// the dynamic payload layout), 64..=67 firmware transfer. Gaps are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    // Control
    Node = 0,
    Presentation = 1,
    Version = 2,
    Name = 3,
    IdRequest = 4,
    IdResponse = 5,
    FindParentRequest = 6,
    FindParentResponse = 7,
    LogMessage = 8,
    BatteryLevel = 9,
    TimeRequest = 10,
    TimeResponse = 11,
    Reset = 12,
    InclusionMode = 13,
    GatewayReady = 14,

    // Device
    DeviceStatus = 32,
    DeviceArmed = 33,
    DeviceTripped = 34,
    DeviceLocked = 35,
    DeviceLevel = 36,
    DevicePercentage = 37,
    DevicePower = 38,
    DeviceAccumulated = 39,
    DeviceRate = 40,
    DeviceMode = 41,
    DeviceAngle = 42,
    DeviceStop = 43,
    DeviceRgb = 44,
    DeviceRgbw = 45,
    DeviceScene = 46,
    DeviceVar = 47,
    DeviceConfig = 48,
    DeviceIrSend = 49,
    DeviceIrReceived = 50,

    // Firmware
    FirmwareConfigRequest = 64,
    FirmwareConfigResponse = 65,
    FirmwareRequest = 66,
    FirmwareResponse = 67,
}

impl MessageType {
    pub fn from_u8(value: u8) -> Result<Self, FrameError> {
        use MessageType::*;
        Ok(match value {
            0 => Node,
            1 => Presentation,
            2 => Version,
            3 => Name,
            4 => IdRequest,
            5 => IdResponse,
            6 => FindParentRequest,
            7 => FindParentResponse,
            8 => LogMessage,
            9 => BatteryLevel,
            10 => TimeRequest,
            11 => TimeResponse,
            12 => Reset,
            13 => InclusionMode,
            14 => GatewayReady,
            32 => DeviceStatus,
            33 => DeviceArmed,
            34 => DeviceTripped,
            35 => DeviceLocked,
            36 => DeviceLevel,
            37 => DevicePercentage,
            38 => DevicePower,
            39 => DeviceAccumulated,
            40 => DeviceRate,
            41 => DeviceMode,
            42 => DeviceAngle,
            43 => DeviceStop,
            44 => DeviceRgb,
            45 => DeviceRgbw,
            46 => DeviceScene,
            47 => DeviceVar,
            48 => DeviceConfig,
            49 => DeviceIrSend,
            50 => DeviceIrReceived,
            64 => FirmwareConfigRequest,
            65 => FirmwareConfigResponse,
            66 => FirmwareRequest,
            67 => FirmwareResponse,
            other => return Err(FrameError::UnknownMessageType(other)),
        })
    }

    /// Whether this type carries the dynamic device payload.
    #[must_use]
    pub fn is_device(&self) -> bool {
        let v = *self as u8;
        (32..=50).contains(&v)
    }

    /// Whether this type belongs to the firmware transfer protocol.
    #[must_use]
    pub fn is_firmware(&self) -> bool {
        let v = *self as u8;
        (64..=67).contains(&v)
    }
}
