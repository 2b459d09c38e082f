//! Protocol constants and network address sentinels.

/// Maximum total frame length on the wire, header included.
pub const MAX_FRAME_SIZE: usize = 32;

/// Fixed header length: `{last, sender, destination, flags, message_type}`.
pub const HEADER_SIZE: usize = 5;

/// Maximum payload length following the header.
pub const MAX_PAYLOAD: usize = MAX_FRAME_SIZE - HEADER_SIZE;

/// Maximum byte length of a dynamic device value.
///
/// The device payload spends three bytes on `{device, length_req, ptype}`
/// before the value itself.
pub const MAX_DEVICE_VALUE: usize = MAX_PAYLOAD - 3;

/// Size of one over-the-air firmware block.
pub const FIRMWARE_BLOCK_SIZE: usize = 16;

/// Node id of the gateway, the root of the routing tree.
pub const GATEWAY_ADDRESS: u8 = 0;

/// Address every node listens on in addition to its own.
pub const BROADCAST_ADDRESS: u8 = 255;

/// Sentinel for "no id assigned yet; request one from the gateway".
pub const AUTO: u8 = 255;

/// Sentinel distance meaning the parent is unverified or unreachable.
pub const DISTANCE_INVALID: u8 = 0xFF;

/// Whether a stored parent id refers to an actual node.
#[must_use]
pub fn is_valid_parent(parent: u8) -> bool {
    parent != AUTO
}

/// Whether a distance value represents a verified hop count.
#[must_use]
pub fn is_valid_distance(distance: u8) -> bool {
    distance != DISTANCE_INVALID
}

/// Whether a child-route slot holds a usable next-hop neighbor.
///
/// The gateway address and the broadcast address are never relay neighbors.
#[must_use]
pub fn is_valid_route(via: u8) -> bool {
    via > GATEWAY_ADDRESS && via < BROADCAST_ADDRESS
}
