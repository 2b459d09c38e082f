//! Tree routing for the sensormesh network.
//!
//! This crate holds the pure routing machinery: the next-hop decision, the
//! child-route table repeaters learn from relayed traffic, and the
//! parent-link state with its failure-driven re-selection rule. All of it is
//! deterministic and free of I/O; the node runtime wires it to the radio and
//! the persistent store.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod constants;
pub mod decision;
pub mod parent;
pub mod table;

pub use constants::{NO_ROUTE, SEARCH_FAILURES};
pub use decision::{NextHop, RoutingContext, next_hop};
pub use parent::ParentLink;
pub use table::ChildRouteTable;
