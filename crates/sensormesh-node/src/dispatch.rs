//! The receive loop: one inbound frame fully processed per pass.

use sensormesh_core::constants::{AUTO, GATEWAY_ADDRESS, MAX_FRAME_SIZE, is_valid_route};
use sensormesh_core::{Frame, FirmwareDescriptor, MessageType, Payload, Store};
use sensormesh_ota::{SessionEvent, UpdateSession};
use sensormesh_radio::Transport;
use sensormesh_routing::NO_ROUTE;

use crate::clock::Clock;
use crate::gateway::COMMAND_INTERNAL;
use crate::node::Node;

impl<T: Transport, S: Store, C: Clock> Node<T, S, C> {
    /// One dispatcher pass: drive the update retry clock, then drain and
    /// fully handle at most one inbound frame.
    ///
    /// Returns true when a frame addressed to this node reached the user
    /// callback.
    pub fn process(&mut self) -> bool {
        if self.halted {
            return false;
        }
        self.poll_update();

        let Some(link_to) = self.transport.available() else {
            return false;
        };
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = self.transport.receive(&mut buf);
        let frame = match Frame::decode(&buf[..len]) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("dropping malformed frame: {e}");
                return false;
            }
        };
        tracing::trace!(
            sender = frame.header.sender,
            last = frame.header.last,
            destination = frame.header.destination,
            message_type = ?frame.message_type(),
            "rx"
        );
        self.dispatch(frame, link_to)
    }

    fn dispatch(&mut self, frame: Frame, link_to: u8) -> bool {
        self.last_handled = Some(frame.message_type());
        let header = frame.header;

        // Relay-capable nodes always answer parent searches. A short jitter
        // spreads replies from multiple neighbors apart.
        if frame.message_type() == MessageType::FindParentRequest && self.repeater {
            self.collision_delay(self.clock.millis() & 0x3FF);
            let mut reply = Frame::new(
                self.node_id,
                header.sender,
                Payload::FindParentResponse {
                    distance: self.parent.distance,
                },
            );
            self.send_write(header.sender, &mut reply, false);
            return false;
        }

        if let Payload::TimeResponse { time } = &frame.payload {
            let time = *time;
            if let Some(callback) = &mut self.time_callback {
                callback(time);
            }
            return false;
        }

        if header.destination == self.node_id {
            if header.flags.ack_requested && !header.flags.is_ack {
                let mut ack = frame.ack_reply(self.node_id);
                self.send_route(&mut ack);
            }

            // A frame that did not come through the parent came up from a
            // child: remember the hop it arrived on.
            if self.repeater && header.last != self.parent.parent && header.sender != self.node_id
            {
                self.add_child_route(header.sender, header.last);
            }

            return self.dispatch_addressed(frame);
        }

        // The link layer says we are the intended relay.
        if self.repeater && link_to == self.node_id {
            self.relay(frame);
        }
        false
    }

    fn dispatch_addressed(&mut self, frame: Frame) -> bool {
        let header = frame.header;
        match &frame.payload {
            Payload::FindParentResponse { distance } if !self.is_gateway => {
                if self.parent.consider_candidate(header.sender, *distance) {
                    self.store.set_parent(self.parent.parent);
                    self.store.set_distance(self.parent.distance);
                    tracing::info!(
                        parent = self.parent.parent,
                        distance = self.parent.distance,
                        "adopted new parent"
                    );
                }
                false
            }
            Payload::Reset if header.sender == GATEWAY_ADDRESS => {
                tracing::info!("reset requested by gateway");
                self.reboot_requested = true;
                false
            }
            Payload::IdResponse {
                request_identifier,
                new_id,
            } if header.sender == GATEWAY_ADDRESS
                && self.node_id == AUTO
                && *request_identifier == self.request_identifier =>
            {
                if *new_id == AUTO {
                    // The gateway hands out AUTO when the id pool is empty.
                    tracing::error!("gateway has no free node ids, halting");
                    self.halted = true;
                } else {
                    self.node_id = *new_id;
                    self.store.set_node_id(*new_id);
                    self.transport.set_address(*new_id);
                    tracing::info!(node_id = *new_id, "node id assigned");
                }
                false
            }
            Payload::FirmwareConfigResponse(available) => {
                self.start_update(*available);
                false
            }
            Payload::FirmwareResponse {
                firmware_type,
                version,
                block,
                data,
            } => {
                self.feed_update(*firmware_type, *version, *block, data);
                false
            }
            _ => {
                if self.is_gateway {
                    if let Payload::LogMessage(text) = &frame.payload {
                        let line = text.clone();
                        if let Some(serial) = &mut self.serial {
                            serial.emit(COMMAND_INTERNAL, MessageType::LogMessage as u8, &line);
                        }
                    }
                }
                if let Some(callback) = &mut self.callback {
                    callback(&frame);
                }
                true
            }
        }
    }

    /// Forward a frame for another node, learning the way back to its
    /// sender if we have none.
    fn relay(&mut self, mut frame: Frame) {
        let destination = frame.header.destination;
        let sender = frame.header.sender;
        let came_via = frame.header.last;

        let slot = self
            .routes
            .as_ref()
            .map_or(NO_ROUTE, |routes| routes.get(destination));
        if is_valid_route(slot) {
            self.send_write(slot, &mut frame, true);
        } else {
            // No downstream route: pass it up toward the gateway.
            let parent = self.parent.parent;
            self.send_write(parent, &mut frame, true);
        }

        let unknown = self
            .routes
            .as_ref()
            .is_some_and(|routes| routes.get(sender) == NO_ROUTE);
        if unknown && sender != self.node_id && sender != GATEWAY_ADDRESS {
            self.add_child_route(sender, came_via);
        }
    }

    // ---------------------------------------------------------------- //
    // Firmware update glue
    // ---------------------------------------------------------------- //

    fn start_update(&mut self, available: FirmwareDescriptor) {
        let now = self.clock.millis();
        match UpdateSession::begin(self.installed_firmware, available, now) {
            Some(session) => {
                tracing::info!(
                    firmware_type = available.firmware_type,
                    version = available.version,
                    blocks = available.blocks,
                    "firmware update available"
                );
                self.update = Some(session);
                self.send_block_request();
            }
            None => tracing::debug!("installed firmware is current"),
        }
    }

    fn feed_update(&mut self, firmware_type: u16, version: u16, block: u16, data: &[u8; 16]) {
        let now = self.clock.millis();
        let event = match self.update.as_mut() {
            Some(session) => {
                session.handle_response(firmware_type, version, block, data, &mut *self.stage, now)
            }
            None => return,
        };
        self.apply_update_event(event);
    }

    pub(crate) fn poll_update(&mut self) {
        let now = self.clock.millis();
        let event = match self.update.as_mut() {
            Some(session) => session.poll(now),
            None => return,
        };
        self.apply_update_event(event);
    }

    fn apply_update_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Idle => {}
            SessionEvent::RequestBlock(_) => self.send_block_request(),
            SessionEvent::Complete => {
                if let Some(session) = self.update.take() {
                    let target = session.target();
                    self.store.set_firmware_descriptor(target);
                    self.installed_firmware = target;
                    tracing::info!(
                        version = target.version,
                        crc = target.crc,
                        "firmware update verified, rebooting"
                    );
                    self.reboot_requested = true;
                }
            }
            SessionEvent::Abandoned(e) => {
                tracing::error!("firmware update abandoned: {e}");
                self.update = None;
            }
        }
    }

    fn send_block_request(&mut self) {
        let Some(session) = &self.update else {
            return;
        };
        let (firmware_type, version, block) = session.request_fields();
        let mut frame = Frame::new(
            self.node_id,
            GATEWAY_ADDRESS,
            Payload::FirmwareRequest {
                firmware_type,
                version,
                block,
            },
        );
        self.send_route(&mut frame);
    }

    /// Busy-wait, matching the hardware's blocking delay.
    fn collision_delay(&self, ms: u32) {
        let start = self.clock.millis();
        while self.clock.millis().wrapping_sub(start) < ms {
            std::hint::spin_loop();
        }
    }
}
