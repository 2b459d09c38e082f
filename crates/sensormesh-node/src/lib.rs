//! Node runtime for the sensormesh wireless sensor network.
//!
//! Wires the wire format, routing, and firmware-update crates to a radio
//! transport, a persistent store, and a clock, and runs the cooperative
//! single-threaded event pump that is the heart of a node.

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod node;
pub mod sleep;
pub mod storage;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::NodeConfig;
pub use error::NodeError;
pub use gateway::SerialLink;
pub use node::{
    LIBRARY_MAJOR_VERSION, LIBRARY_MINOR_VERSION, Node, NodeOptions, ReceiveCallback,
};
pub use sleep::{HostPower, PowerControl, WakeFlag, WakeReason};
pub use storage::{FileStore, NodeStore, layout};
