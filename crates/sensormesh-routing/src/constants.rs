//! Routing constants.

/// Consecutive failed transmissions to the parent before the distance is
/// invalidated to force re-discovery.
pub const SEARCH_FAILURES: u8 = 5;

/// Child-route slot value meaning "no route learned".
pub const NO_ROUTE: u8 = 0xFF;

/// Number of child-route slots (one per assignable node id).
pub const ROUTE_TABLE_SIZE: usize = 256;
