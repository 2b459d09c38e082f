//! Frame transports for the sensormesh node runtime.
//!
//! The radio is a byte-pipe with per-node addressing; no framing or routing
//! logic lives here. Two implementations ship: an in-memory hub that models
//! a shared radio medium for tests and simulation, and a UDP multicast
//! transport for running nodes on a development LAN.

pub mod air;
pub mod error;
pub mod traits;
pub mod udp;

pub use air::{Air, AirTransport};
pub use error::RadioError;
pub use traits::Transport;
pub use udp::UdpTransport;
