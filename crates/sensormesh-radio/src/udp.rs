//! UDP multicast transport for running nodes on a development LAN.
//!
//! Every node on a mesh joins the same multicast group and port. Datagrams
//! carry a two-byte link header `{to, from}` in front of the frame, standing
//! in for the radio's pipe addressing; receivers filter on the `to` byte.
//!
//! UDP gives no delivery confirmation, so unlike the hardware radio this
//! transport reports success for any frame the socket accepted.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

use sensormesh_core::constants::{BROADCAST_ADDRESS, MAX_FRAME_SIZE};

use crate::error::RadioError;
use crate::traits::Transport;

/// Link header bytes in front of every datagram.
const LINK_HEADER: usize = 2;

/// A [`Transport`] over a shared UDP multicast group.
pub struct UdpTransport {
    socket: UdpSocket,
    group: SocketAddrV4,
    address: u8,
    powered: bool,
    pending: VecDeque<(u8, Vec<u8>)>,
}

impl UdpTransport {
    /// Join `group:port` and listen as `address`.
    pub fn new(group: Ipv4Addr, port: u16, address: u8) -> Result<Self, RadioError> {
        if !group.is_multicast() {
            return Err(RadioError::Configuration(format!(
                "{group} is not a multicast group"
            )));
        }

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;
        socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port).into())?;
        socket.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?;
        // Several nodes may share one host during development.
        socket.set_multicast_loop_v4(true)?;
        socket.set_nonblocking(true)?;

        Ok(UdpTransport {
            socket: socket.into(),
            group: SocketAddrV4::new(group, port),
            address,
            powered: true,
            pending: VecDeque::new(),
        })
    }

    /// Pull everything waiting on the socket into the pending queue.
    fn drain_socket(&mut self) {
        let mut buf = [0u8; LINK_HEADER + MAX_FRAME_SIZE + 16];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((len, _)) => {
                    if len < LINK_HEADER {
                        continue;
                    }
                    let (to, from) = (buf[0], buf[1]);
                    if from == self.address {
                        continue; // our own multicast loopback
                    }
                    if to != self.address && to != BROADCAST_ADDRESS {
                        continue;
                    }
                    self.pending.push_back((to, buf[LINK_HEADER..len].to_vec()));
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    tracing::warn!("udp transport receive error: {e}");
                    break;
                }
            }
        }
    }
}

impl Transport for UdpTransport {
    fn set_address(&mut self, address: u8) {
        self.address = address;
        self.powered = true;
    }

    fn send(&mut self, next_hop: u8, frame: &[u8]) -> bool {
        self.powered = true;
        let mut datagram = Vec::with_capacity(LINK_HEADER + frame.len());
        datagram.push(next_hop);
        datagram.push(self.address);
        datagram.extend_from_slice(frame);
        match self.socket.send_to(&datagram, self.group) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("udp transport send error: {e}");
                false
            }
        }
    }

    fn available(&mut self) -> Option<u8> {
        if !self.powered {
            return None;
        }
        if self.pending.is_empty() {
            self.drain_socket();
        }
        self.pending.front().map(|(to, _)| *to)
    }

    fn receive(&mut self, buf: &mut [u8]) -> usize {
        match self.pending.pop_front() {
            Some((_, frame)) => {
                let len = frame.len().min(buf.len());
                buf[..len].copy_from_slice(&frame[..len]);
                len
            }
            None => 0,
        }
    }

    fn power_down(&mut self) {
        self.powered = false;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 42, 99);

    #[test]
    fn test_rejects_non_multicast_group() {
        let result = UdpTransport::new(Ipv4Addr::new(192, 168, 1, 1), 4000, 1);
        assert!(matches!(result, Err(RadioError::Configuration(_))));
    }

    #[test]
    #[ignore = "requires a multicast-capable network interface"]
    fn test_unicast_between_two_endpoints() {
        let mut a = UdpTransport::new(GROUP, 49401, 1).unwrap();
        let mut b = UdpTransport::new(GROUP, 49401, 2).unwrap();

        assert!(a.send(2, &[0xAB, 0xCD]));

        let mut buf = [0u8; MAX_FRAME_SIZE];
        let got = poll_until_available(&mut b);
        assert_eq!(got, Some(2));
        assert_eq!(b.receive(&mut buf), 2);
        assert_eq!(&buf[..2], &[0xAB, 0xCD]);

        // Not addressed to a third party.
        let mut c = UdpTransport::new(GROUP, 49401, 3).unwrap();
        assert!(poll_until_available(&mut c).is_none());
    }

    #[test]
    #[ignore = "requires a multicast-capable network interface"]
    fn test_broadcast_reaches_other_endpoints() {
        let mut a = UdpTransport::new(GROUP, 49402, 1).unwrap();
        let mut b = UdpTransport::new(GROUP, 49402, 2).unwrap();

        assert!(a.send(BROADCAST_ADDRESS, &[0x11]));
        assert_eq!(poll_until_available(&mut b), Some(BROADCAST_ADDRESS));
        // The sender filters its own loopback copy.
        assert!(poll_until_available(&mut a).is_none());
    }

    #[test]
    #[ignore = "requires a multicast-capable network interface"]
    fn test_power_down_stops_reception() {
        let mut a = UdpTransport::new(GROUP, 49403, 1).unwrap();
        let mut b = UdpTransport::new(GROUP, 49403, 2).unwrap();

        b.power_down();
        a.send(2, &[0x00]);
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(b.available(), None);
    }

    /// Local multicast delivery is fast but not instant; poll briefly.
    fn poll_until_available(t: &mut UdpTransport) -> Option<u8> {
        for _ in 0..50 {
            if let Some(to) = t.available() {
                return Some(to);
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        None
    }
}
