//! Firmware update protocol constants.

/// How long to wait for a matching block response before re-requesting.
pub const BLOCK_RETRY_TIMEOUT_MS: u32 = 500;

/// How many times one block may be re-requested before the update is
/// abandoned. Receiving any block resets the budget.
pub const MAX_BLOCK_RESENDS: u8 = 10;
