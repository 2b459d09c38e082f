//! Frame wire format parsing and serialization.
//!
//! A frame is the 5-byte header `{last, sender, destination, flags,
//! message_type}` followed by the packed payload, at most 32 bytes total.

extern crate alloc;
use alloc::vec::Vec;

use crate::constants::{HEADER_SIZE, MAX_FRAME_SIZE};
use crate::error::FrameError;
use crate::frame::flags::FrameFlags;
use crate::frame::message_type::MessageType;
use crate::frame::payload::Payload;

/// The routing header carried by every frame.
///
/// `sender` is the origin and never changes along a path; `last` is
/// overwritten with the transmitting node's id at each hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub last: u8,
    pub sender: u8,
    pub destination: u8,
    pub flags: FrameFlags,
}

/// A decoded frame: header plus typed payload.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Payload,
}

impl Frame {
    /// Build a frame originating at `sender` for `destination`.
    pub fn new(sender: u8, destination: u8, payload: Payload) -> Self {
        Frame {
            header: FrameHeader {
                last: sender,
                sender,
                destination,
                flags: FrameFlags::default(),
            },
            payload,
        }
    }

    /// The wire discriminator of the payload.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    /// Serialize to wire bytes.
    ///
    /// Never produces more than [`MAX_FRAME_SIZE`] bytes; an oversized
    /// payload is a construction error surfaced here.
    #[must_use = "serialization may fail; check the Result"]
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let mut out = Vec::with_capacity(MAX_FRAME_SIZE);
        out.push(self.header.last);
        out.push(self.header.sender);
        out.push(self.header.destination);
        out.push(self.header.flags.to_byte());
        out.push(self.message_type() as u8);
        self.payload.encode_into(&mut out)?;
        if out.len() > MAX_FRAME_SIZE {
            return Err(FrameError::TooLong {
                max: MAX_FRAME_SIZE,
                actual: out.len(),
            });
        }
        Ok(out)
    }

    /// Parse a frame from wire bytes.
    #[must_use = "parsing may fail; check the Result"]
    pub fn decode(raw: &[u8]) -> Result<Self, FrameError> {
        if raw.len() < HEADER_SIZE {
            return Err(FrameError::TooShort {
                min: HEADER_SIZE,
                actual: raw.len(),
            });
        }
        if raw.len() > MAX_FRAME_SIZE {
            return Err(FrameError::TooLong {
                max: MAX_FRAME_SIZE,
                actual: raw.len(),
            });
        }
        let message_type = MessageType::from_u8(raw[4])?;
        let payload = Payload::decode(message_type, &raw[HEADER_SIZE..])?;
        Ok(Frame {
            header: FrameHeader {
                last: raw[0],
                sender: raw[1],
                destination: raw[2],
                flags: FrameFlags::from_byte(raw[3]),
            },
            payload,
        })
    }

    /// Build the application-level ack for this frame.
    ///
    /// The ack carries the original payload with the is-ack flag set and the
    /// ack-requested flag cleared; sender becomes `node_id` and the
    /// destination is the original sender.
    pub fn ack_reply(&self, node_id: u8) -> Frame {
        let mut ack = self.clone();
        ack.header.flags.ack_requested = false;
        ack.header.flags.is_ack = true;
        ack.header.sender = node_id;
        ack.header.last = node_id;
        ack.header.destination = self.header.sender;
        ack
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]

        #[test]
        fn arbitrary_bytes_never_panic(raw in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = Frame::decode(&raw);
        }

        #[test]
        fn decoded_frames_reencode_identically(raw in proptest::collection::vec(any::<u8>(), 0..=32)) {
            if let Ok(frame) = Frame::decode(&raw) {
                let encoded = frame.encode().unwrap();
                // Reserved flag bits and device trailing padding are not
                // preserved; everything else must be.
                prop_assert!(encoded.len() <= raw.len());
                prop_assert_eq!(&encoded[..3], &raw[..3]);
                prop_assert_eq!(encoded[3], raw[3] & 0x07);
                prop_assert_eq!(encoded[4], raw[4]);
            }
        }

        #[test]
        fn encoded_frames_fit_the_budget(
            sender in any::<u8>(),
            destination in any::<u8>(),
            level in any::<u8>(),
        ) {
            let frame = Frame::new(sender, destination, Payload::BatteryLevel { level });
            let bytes = frame.encode().unwrap();
            prop_assert!(bytes.len() <= MAX_FRAME_SIZE);
        }
    }
}
