//! Over-the-air firmware updates.
//!
//! The protocol is node-initiated and strictly request/response: the node
//! advertises its installed descriptor, the gateway answers with the
//! available one, and when they differ the node pulls the image 16 bytes at
//! a time into a staging area, verifies the CRC, and persists the new
//! descriptor for the bootloader to swap in on reboot.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod constants;
pub mod crc;
pub mod error;
pub mod session;
pub mod stage;

pub use constants::{BLOCK_RETRY_TIMEOUT_MS, MAX_BLOCK_RESENDS};
pub use crc::{crc16, crc16_update};
pub use error::UpdateError;
pub use sensormesh_core::FirmwareDescriptor;
pub use session::{SessionEvent, UpdateSession};
pub use stage::{FirmwareStage, RamStage};
