//! In-memory radio medium.
//!
//! [`Air`] models the shared channel between every attached endpoint:
//! unicast sends are delivered to the endpoint currently holding that
//! address and report link-layer ack success, broadcasts fan out to all
//! other powered endpoints unacknowledged. Powered-down endpoints neither
//! receive nor ack, which is how tests inject parent loss.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use sensormesh_core::constants::BROADCAST_ADDRESS;

use crate::traits::Transport;

struct Endpoint {
    address: u8,
    powered: bool,
    inbox: VecDeque<(u8, Vec<u8>)>,
}

#[derive(Default)]
struct AirInner {
    endpoints: Vec<Endpoint>,
}

/// A shared in-memory radio medium.
#[derive(Clone, Default)]
pub struct Air {
    inner: Arc<Mutex<AirInner>>,
}

impl Air {
    pub fn new() -> Self {
        Air::default()
    }

    /// Attach a new endpoint listening on `address`.
    pub fn endpoint(&self, address: u8) -> AirTransport {
        let mut inner = self.inner.lock().unwrap();
        inner.endpoints.push(Endpoint {
            address,
            powered: true,
            inbox: VecDeque::new(),
        });
        AirTransport {
            air: self.clone(),
            index: inner.endpoints.len() - 1,
        }
    }
}

/// One endpoint's view of the [`Air`].
pub struct AirTransport {
    air: Air,
    index: usize,
}

impl Transport for AirTransport {
    fn set_address(&mut self, address: u8) {
        let mut inner = self.air.inner.lock().unwrap();
        let ep = &mut inner.endpoints[self.index];
        ep.address = address;
        ep.powered = true;
    }

    fn send(&mut self, next_hop: u8, frame: &[u8]) -> bool {
        let mut inner = self.air.inner.lock().unwrap();
        // Transmitting wakes a powered-down radio.
        inner.endpoints[self.index].powered = true;

        if next_hop == BROADCAST_ADDRESS {
            for (i, ep) in inner.endpoints.iter_mut().enumerate() {
                if i != self.index && ep.powered {
                    ep.inbox.push_back((BROADCAST_ADDRESS, frame.to_vec()));
                }
            }
            return true;
        }

        let sender = self.index;
        let target = inner
            .endpoints
            .iter_mut()
            .enumerate()
            .find(|(i, ep)| *i != sender && ep.powered && ep.address == next_hop);
        match target {
            Some((_, ep)) => {
                ep.inbox.push_back((next_hop, frame.to_vec()));
                true
            }
            // Nobody listening on that address: no link-layer ack.
            None => false,
        }
    }

    fn available(&mut self) -> Option<u8> {
        let inner = self.air.inner.lock().unwrap();
        let ep = &inner.endpoints[self.index];
        if !ep.powered {
            return None;
        }
        ep.inbox.front().map(|(to, _)| *to)
    }

    fn receive(&mut self, buf: &mut [u8]) -> usize {
        let mut inner = self.air.inner.lock().unwrap();
        let ep = &mut inner.endpoints[self.index];
        match ep.inbox.pop_front() {
            Some((_, frame)) => {
                let len = frame.len().min(buf.len());
                buf[..len].copy_from_slice(&frame[..len]);
                len
            }
            None => 0,
        }
    }

    fn power_down(&mut self) {
        let mut inner = self.air.inner.lock().unwrap();
        inner.endpoints[self.index].powered = false;
    }
}
