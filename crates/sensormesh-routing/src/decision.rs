//! The next-hop decision for outbound and relayed frames.

use sensormesh_core::constants::{
    BROADCAST_ADDRESS, GATEWAY_ADDRESS, is_valid_route,
};
use sensormesh_core::{AUTO, MessageType};

/// What the caller must do with a frame it wants transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextHop {
    /// The node has no id yet: trigger id acquisition and drop this send.
    RequestNodeId,
    /// Relay through the learned child route.
    Child(u8),
    /// Transmit as a link-level broadcast (recipient has no address yet).
    Broadcast,
    /// Send toward the gateway via the parent.
    Parent,
    /// Nowhere to send this (gateway with no downstream route).
    Drop,
}

/// The slice of node state the decision depends on.
#[derive(Debug, Clone, Copy)]
pub struct RoutingContext {
    pub node_id: u8,
    pub is_gateway: bool,
    pub is_repeater: bool,
}

/// Pick the next hop for a frame addressed to `destination`.
///
/// `child_route` is the route-table slot for the destination
/// ([`NO_ROUTE`](crate::NO_ROUTE) when unlearned).
#[must_use]
pub fn next_hop(
    ctx: &RoutingContext,
    destination: u8,
    message_type: MessageType,
    child_route: u8,
) -> NextHop {
    // Without an id this node may only transmit the id request itself.
    if ctx.node_id == AUTO && message_type != MessageType::IdRequest {
        return NextHop::RequestNodeId;
    }

    if ctx.is_repeater && destination != GATEWAY_ADDRESS && is_valid_route(child_route) {
        return NextHop::Child(child_route);
    }

    // An id response to a node that has no address yet can only be broadcast.
    if message_type == MessageType::IdResponse && destination == BROADCAST_ADDRESS {
        return NextHop::Broadcast;
    }

    if !ctx.is_gateway {
        return NextHop::Parent;
    }

    NextHop::Drop
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NO_ROUTE;

    fn sensor(node_id: u8) -> RoutingContext {
        RoutingContext {
            node_id,
            is_gateway: false,
            is_repeater: false,
        }
    }

    fn repeater(node_id: u8) -> RoutingContext {
        RoutingContext {
            node_id,
            is_gateway: false,
            is_repeater: true,
        }
    }

    fn gateway() -> RoutingContext {
        RoutingContext {
            node_id: GATEWAY_ADDRESS,
            is_gateway: true,
            is_repeater: true,
        }
    }

    #[test]
    fn test_unassigned_node_must_acquire_id_first() {
        let ctx = sensor(AUTO);
        assert_eq!(
            next_hop(&ctx, GATEWAY_ADDRESS, MessageType::BatteryLevel, NO_ROUTE),
            NextHop::RequestNodeId
        );
        // The id request itself goes out toward the parent.
        assert_eq!(
            next_hop(&ctx, GATEWAY_ADDRESS, MessageType::IdRequest, NO_ROUTE),
            NextHop::Parent
        );
    }

    #[test]
    fn test_repeater_uses_child_route_for_downstream() {
        let ctx = repeater(3);
        assert_eq!(
            next_hop(&ctx, 42, MessageType::DeviceStatus, 17),
            NextHop::Child(17)
        );
    }

    #[test]
    fn test_gateway_bound_traffic_ignores_child_routes() {
        // Even if a (stale) slot exists for the gateway id, upstream
        // traffic goes through the parent.
        let ctx = repeater(3);
        assert_eq!(
            next_hop(&ctx, GATEWAY_ADDRESS, MessageType::DeviceStatus, 17),
            NextHop::Parent
        );
    }

    #[test]
    fn test_invalid_slots_fall_back_to_parent() {
        let ctx = repeater(3);
        for slot in [NO_ROUTE, GATEWAY_ADDRESS] {
            assert_eq!(
                next_hop(&ctx, 42, MessageType::DeviceStatus, slot),
                NextHop::Parent
            );
        }
    }

    #[test]
    fn test_non_repeater_never_relays() {
        let ctx = sensor(3);
        assert_eq!(
            next_hop(&ctx, 42, MessageType::DeviceStatus, 17),
            NextHop::Parent
        );
    }

    #[test]
    fn test_id_response_to_broadcast_is_broadcast() {
        let ctx = gateway();
        assert_eq!(
            next_hop(&ctx, BROADCAST_ADDRESS, MessageType::IdResponse, NO_ROUTE),
            NextHop::Broadcast
        );
        // Same on a relaying repeater.
        let ctx = repeater(3);
        assert_eq!(
            next_hop(&ctx, BROADCAST_ADDRESS, MessageType::IdResponse, NO_ROUTE),
            NextHop::Broadcast
        );
    }

    #[test]
    fn test_gateway_with_no_route_drops() {
        let ctx = gateway();
        assert_eq!(
            next_hop(&ctx, 42, MessageType::DeviceStatus, NO_ROUTE),
            NextHop::Drop
        );
    }
}
