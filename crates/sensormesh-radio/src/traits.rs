//! The transport capability injected into the node runtime.

/// Frame-level radio access with per-node logical addressing.
///
/// Every node listens on its unicast address and on the shared broadcast
/// address. The transport carries whole frames; it knows nothing about
/// their contents.
pub trait Transport {
    /// Set the unicast address this node listens on.
    fn set_address(&mut self, address: u8);

    /// Transmit `frame` to the immediate neighbor `next_hop`.
    ///
    /// Returns true iff the link layer reports the neighbor acknowledged
    /// the frame. Broadcast transmissions are unacknowledged and report
    /// best-effort success.
    fn send(&mut self, next_hop: u8, frame: &[u8]) -> bool;

    /// The address a pending inbound frame was sent to, if one is waiting.
    ///
    /// This is the link-layer destination (this node's unicast address or
    /// the broadcast address), not the frame's routed destination.
    fn available(&mut self) -> Option<u8>;

    /// Copy the pending frame into `buf`, returning its length.
    ///
    /// Returns 0 when nothing is pending.
    fn receive(&mut self, buf: &mut [u8]) -> usize;

    /// Power the radio down until the next `set_address` or `send`.
    fn power_down(&mut self);
}
