//! Frame flag byte encoding and decoding.
//!
//! The flag byte layout:
//! ```text
//! Bit 0: ack_requested - receiver should send an application ack back
//! Bit 1: is_ack        - this frame is the ack itself
//! Bit 2: is_request    - this frame requests a value rather than carrying one
//! Bits 3-7: reserved   - sent as zero, ignored on receive
//! ```

/// Decoded frame flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags {
    pub ack_requested: bool,
    pub is_ack: bool,
    pub is_request: bool,
}

impl FrameFlags {
    /// Decode a flags byte. Reserved bits are discarded.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        FrameFlags {
            ack_requested: byte & 0x01 != 0,
            is_ack: byte & 0x02 != 0,
            is_request: byte & 0x04 != 0,
        }
    }

    /// Encode to a flags byte. Reserved bits are zero.
    #[must_use]
    pub fn to_byte(&self) -> u8 {
        (self.ack_requested as u8) | ((self.is_ack as u8) << 1) | ((self.is_request as u8) << 2)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn flags_roundtrip_modulo_reserved(byte in any::<u8>()) {
            let flags = FrameFlags::from_byte(byte);
            prop_assert_eq!(flags.to_byte(), byte & 0x07);
        }
    }
}
