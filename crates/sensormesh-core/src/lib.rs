//! Core types, constants, and wire formats for the sensormesh network stack.
//!
//! This crate defines the frame envelope, the typed payload variants carried
//! over the radio, the dynamic device-value encoding, the network address
//! sentinels, and the persistent-store capability trait used by the node
//! runtime.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod constants;
pub mod error;
pub mod frame;
pub mod store;

pub use constants::{
    AUTO, BROADCAST_ADDRESS, DISTANCE_INVALID, GATEWAY_ADDRESS, HEADER_SIZE, MAX_DEVICE_VALUE,
    MAX_FRAME_SIZE, MAX_PAYLOAD,
};
pub use error::FrameError;
pub use frame::flags::FrameFlags;
pub use frame::message_type::MessageType;
pub use frame::payload::{DeviceKind, FirmwareDescriptor, NodeInfo, Payload, Presentation};
pub use frame::value::DeviceValue;
pub use frame::wire::{Frame, FrameHeader};
pub use store::{MemStore, Store};
