//! The block-transfer update session state machine.
//!
//! Pure state plus a staging capability: the node runtime feeds it received
//! frames and the clock, and it answers with what to transmit next. Block
//! indices are strictly monotonic within a session; duplicate and
//! out-of-order responses are ignored.

use sensormesh_core::FirmwareDescriptor;
use sensormesh_core::constants::FIRMWARE_BLOCK_SIZE;

use crate::constants::{BLOCK_RETRY_TIMEOUT_MS, MAX_BLOCK_RESENDS};
use crate::error::UpdateError;
use crate::stage::{FirmwareStage, staged_crc};

/// What the node runtime must do after feeding the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Nothing to transmit right now.
    Idle,
    /// (Re-)send the firmware request for this block.
    RequestBlock(u16),
    /// Image staged and verified: persist the descriptor and reboot.
    Complete,
    /// Update abandoned; the installed image stays active.
    Abandoned(UpdateError),
}

/// One in-flight firmware update.
#[derive(Debug)]
pub struct UpdateSession {
    target: FirmwareDescriptor,
    next_block: u16,
    resends: u8,
    last_request_at: u32,
}

impl UpdateSession {
    /// Start a session when the gateway advertises a different image.
    ///
    /// Returns `None` when the advertised descriptor equals the installed
    /// one (nothing to do), or advertises an empty image.
    pub fn begin(
        installed: FirmwareDescriptor,
        available: FirmwareDescriptor,
        now: u32,
    ) -> Option<Self> {
        if available == installed || available.blocks == 0 {
            return None;
        }
        Some(UpdateSession {
            target: available,
            next_block: 0,
            resends: 0,
            last_request_at: now,
        })
    }

    /// The descriptor being fetched.
    #[must_use]
    pub fn target(&self) -> FirmwareDescriptor {
        self.target
    }

    /// Fields for the next `FirmwareRequest` frame:
    /// `(firmware_type, version, block)`.
    #[must_use]
    pub fn request_fields(&self) -> (u16, u16, u16) {
        (self.target.firmware_type, self.target.version, self.next_block)
    }

    /// Feed a received `FirmwareResponse`.
    ///
    /// A response for anything but the awaited block of the target image is
    /// ignored. A matching block is staged; the resend budget resets.
    pub fn handle_response<S: FirmwareStage + ?Sized>(
        &mut self,
        firmware_type: u16,
        version: u16,
        block: u16,
        data: &[u8; FIRMWARE_BLOCK_SIZE],
        stage: &mut S,
        now: u32,
    ) -> SessionEvent {
        if firmware_type != self.target.firmware_type
            || version != self.target.version
            || block != self.next_block
        {
            return SessionEvent::Idle;
        }

        stage.write_block(block, data);
        self.resends = 0;
        self.next_block += 1;

        if self.next_block == self.target.blocks {
            return self.verify(stage);
        }

        self.last_request_at = now;
        SessionEvent::RequestBlock(self.next_block)
    }

    /// Drive the retry clock. Call once per dispatcher pass.
    pub fn poll(&mut self, now: u32) -> SessionEvent {
        if now.wrapping_sub(self.last_request_at) < BLOCK_RETRY_TIMEOUT_MS {
            return SessionEvent::Idle;
        }
        if self.resends >= MAX_BLOCK_RESENDS {
            return SessionEvent::Abandoned(UpdateError::RetriesExhausted {
                block: self.next_block,
            });
        }
        self.resends += 1;
        self.last_request_at = now;
        SessionEvent::RequestBlock(self.next_block)
    }

    fn verify<S: FirmwareStage + ?Sized>(&self, stage: &S) -> SessionEvent {
        let computed = staged_crc(stage, self.target.blocks);
        if computed == self.target.crc {
            SessionEvent::Complete
        } else {
            SessionEvent::Abandoned(UpdateError::CrcMismatch {
                expected: self.target.crc,
                computed,
            })
        }
    }
}
