//! The node runtime: boot lifecycle, outbound routing, and the user API.

use sensormesh_core::constants::{
    AUTO, BROADCAST_ADDRESS, DISTANCE_INVALID, GATEWAY_ADDRESS, MAX_PAYLOAD, is_valid_parent,
};
use sensormesh_core::{
    DeviceKind, DeviceValue, Frame, FirmwareDescriptor, MessageType, NodeInfo, Payload,
    Presentation, Store,
};
use sensormesh_ota::{FirmwareStage, RamStage, UpdateSession};
use sensormesh_radio::Transport;
use sensormesh_routing::{ChildRouteTable, NO_ROUTE, NextHop, ParentLink, RoutingContext, next_hop};

use crate::clock::Clock;
use crate::gateway::SerialLink;
use crate::sleep::{HostPower, PowerControl, WakeFlag, WakeReason, ladder_sleep};
use crate::storage::NodeStore;

/// Runtime version reported in the boot presentation.
pub const LIBRARY_MAJOR_VERSION: u8 = 1;
pub const LIBRARY_MINOR_VERSION: u8 = 4;

/// How long boot-time exchanges pump the dispatcher for replies.
pub(crate) const REPLY_WINDOW_MS: u32 = 2000;

/// Dispatcher drain window before a smart sleep powers down.
pub(crate) const SMART_SLEEP_DRAIN_MS: u32 = 500;

pub type ReceiveCallback = Box<dyn FnMut(&Frame)>;
pub type TimeCallback = Box<dyn FnMut(u32)>;

/// Boot options, mirroring the sketch-facing `begin()` arguments.
#[derive(Debug, Clone, Copy)]
pub struct NodeOptions {
    /// Fixed node id, or `AUTO` to acquire one from the gateway. Id 0 makes
    /// this node the gateway.
    pub node_id: u8,
    /// Relay frames for child nodes.
    pub repeater: bool,
    /// Fixed parent id, or `AUTO` for parent discovery.
    pub parent: u8,
}

impl Default for NodeOptions {
    fn default() -> Self {
        NodeOptions {
            node_id: AUTO,
            repeater: false,
            parent: AUTO,
        }
    }
}

/// A sensormesh node.
///
/// Single-threaded and cooperative: all protocol work happens inside
/// [`process`](Node::process) and the calls that pump it (`wait`, the boot
/// sequence, parent search). The transport, persistent store, and clock are
/// injected capabilities.
pub struct Node<T: Transport, S: Store, C: Clock> {
    pub(crate) transport: T,
    pub(crate) store: NodeStore<S>,
    pub(crate) clock: C,
    pub(crate) power: Box<dyn PowerControl>,
    pub(crate) stage: Box<dyn FirmwareStage>,
    pub(crate) serial: Option<SerialLink>,
    pub(crate) callback: Option<ReceiveCallback>,
    pub(crate) time_callback: Option<TimeCallback>,
    pub(crate) wake: WakeFlag,

    options: NodeOptions,
    pub(crate) node_id: u8,
    pub(crate) is_gateway: bool,
    pub(crate) repeater: bool,
    pub(crate) parent: ParentLink,
    pub(crate) routes: Option<ChildRouteTable>,
    pub(crate) installed_firmware: FirmwareDescriptor,
    pub(crate) update: Option<UpdateSession>,
    pub(crate) request_identifier: u16,
    pub(crate) halted: bool,
    pub(crate) reboot_requested: bool,
    pub(crate) last_handled: Option<MessageType>,
    pub(crate) in_parent_search: bool,
}

impl<T: Transport, S: Store, C: Clock> Node<T, S, C> {
    pub fn new(transport: T, store: S, clock: C, options: NodeOptions) -> Self {
        Node {
            transport,
            store: NodeStore::new(store),
            clock,
            power: Box::new(HostPower),
            stage: Box::new(RamStage::new()),
            serial: None,
            callback: None,
            time_callback: None,
            wake: WakeFlag::new(),
            options,
            node_id: AUTO,
            is_gateway: false,
            repeater: false,
            parent: ParentLink::new(AUTO, DISTANCE_INVALID, true),
            routes: None,
            installed_firmware: FirmwareDescriptor::default(),
            update: None,
            request_identifier: 0,
            halted: false,
            reboot_requested: false,
            last_handled: None,
            in_parent_search: false,
        }
    }

    /// Attach the controller-facing serial link (gateway nodes).
    pub fn with_serial(mut self, serial: SerialLink) -> Self {
        self.serial = Some(serial);
        self
    }

    /// Replace the power-down capability (tests, alternative hardware).
    pub fn with_power_control(mut self, power: Box<dyn PowerControl>) -> Self {
        self.power = power;
        self
    }

    /// Replace the firmware staging area.
    pub fn with_firmware_stage(mut self, stage: Box<dyn FirmwareStage>) -> Self {
        self.stage = stage;
        self
    }

    /// Handle for interrupt wiring: triggering it wakes a sleeping node.
    pub fn wake_flag(&self) -> WakeFlag {
        self.wake.clone()
    }

    // ---------------------------------------------------------------- //
    // Lifecycle
    // ---------------------------------------------------------------- //

    /// Boot the node: restore persisted state, acquire an id if needed,
    /// present to the gateway, and negotiate firmware.
    pub fn begin(&mut self, callback: Option<ReceiveCallback>) {
        self.callback = callback;

        let opts = self.options;
        self.is_gateway = opts.node_id == GATEWAY_ADDRESS;
        // The gateway always relays; it is the root of the tree.
        self.repeater = opts.repeater || self.is_gateway;

        self.node_id = if opts.node_id != AUTO {
            self.store.set_node_id(opts.node_id);
            opts.node_id
        } else {
            self.store.node_id()
        };

        if self.repeater {
            self.routes = Some(ChildRouteTable::from_bytes(&self.store.routes_image()));
        }

        let stored_parent = self.store.parent();
        let auto_find = opts.parent == AUTO;
        self.parent = if self.is_gateway {
            ParentLink::new(GATEWAY_ADDRESS, 0, false)
        } else if !auto_find {
            // Fixed parent: treat as known-good and never search.
            ParentLink::new(opts.parent, 0, false)
        } else if !is_valid_parent(stored_parent) {
            ParentLink::new(stored_parent, DISTANCE_INVALID, true)
        } else {
            ParentLink::new(stored_parent, self.store.distance(), true)
        };

        self.installed_firmware = self.store.firmware_descriptor();

        if self.node_id == AUTO && !self.is_gateway {
            self.request_node_id();
        }

        self.transport.set_address(self.node_id);

        if self.is_gateway {
            tracing::info!("gateway started");
            if let Some(serial) = &mut self.serial {
                serial.emit(
                    crate::gateway::COMMAND_INTERNAL,
                    MessageType::GatewayReady as u8,
                    "Gateway startup complete.",
                );
            }
            return;
        }

        tracing::info!(
            node_id = self.node_id,
            parent = self.parent.parent,
            distance = self.parent.distance,
            repeater = self.repeater,
            "node started"
        );

        let info = NodeInfo {
            major_version: LIBRARY_MAJOR_VERSION,
            minor_version: LIBRARY_MINOR_VERSION,
            is_repeater: self.repeater,
            parent: self.parent.parent,
        };
        self.send(Payload::Node(info), GATEWAY_ADDRESS, false);
        // Window for controller-initiated configuration.
        self.wait(REPLY_WINDOW_MS);

        // Advertise the installed image; an update begins if the gateway
        // answers with a different descriptor.
        self.send(
            Payload::FirmwareConfigRequest(self.installed_firmware),
            GATEWAY_ADDRESS,
            false,
        );
    }

    /// Ask the gateway for a node id and pump for the response.
    pub(crate) fn request_node_id(&mut self) {
        if self.halted {
            return;
        }
        // Weak entropy on purpose: only a collision between this node and
        // itself within one boot matters.
        self.request_identifier = self.clock.micros() as u16;
        tracing::debug!(
            request_identifier = self.request_identifier,
            "requesting node id"
        );
        self.transport.set_address(self.node_id);
        let mut frame = Frame::new(
            self.node_id,
            GATEWAY_ADDRESS,
            Payload::IdRequest {
                request_identifier: self.request_identifier,
            },
        );
        self.send_route(&mut frame);
        self.wait(REPLY_WINDOW_MS);
    }

    /// Broadcast a parent search and collect responses for the reply window.
    pub(crate) fn find_parent(&mut self) {
        if !self.parent.auto_find || self.in_parent_search {
            return;
        }
        self.in_parent_search = true;
        tracing::debug!("searching for parent");
        let mut frame = Frame::new(self.node_id, BROADCAST_ADDRESS, Payload::FindParentRequest);
        frame.header.last = self.node_id;
        if let Ok(bytes) = frame.encode() {
            self.transport.send(BROADCAST_ADDRESS, &bytes);
        }
        self.wait(REPLY_WINDOW_MS);
        self.in_parent_search = false;
    }

    // ---------------------------------------------------------------- //
    // Outbound path
    // ---------------------------------------------------------------- //

    /// Route a frame toward its destination. Returns whether the first hop
    /// accepted it.
    pub(crate) fn send_route(&mut self, frame: &mut Frame) -> bool {
        if self.halted {
            return false;
        }
        let destination = frame.header.destination;
        let slot = self
            .routes
            .as_ref()
            .map_or(NO_ROUTE, |routes| routes.get(destination));
        let ctx = RoutingContext {
            node_id: self.node_id,
            is_gateway: self.is_gateway,
            is_repeater: self.repeater,
        };
        match next_hop(&ctx, destination, frame.message_type(), slot) {
            NextHop::RequestNodeId => {
                self.request_node_id();
                false
            }
            NextHop::Child(via) => self.send_write(via, frame, true),
            NextHop::Broadcast => self.send_write(BROADCAST_ADDRESS, frame, true),
            NextHop::Parent => self.send_write(self.parent.parent, frame, true),
            NextHop::Drop => {
                tracing::debug!(destination, "no route for frame, dropping");
                false
            }
        }
    }

    /// Transmit to a specific neighbor, searching for a parent first when
    /// the parent link is unverified.
    pub(crate) fn send_write(&mut self, next: u8, frame: &mut Frame, allow_find_parent: bool) -> bool {
        let to_parent = !self.is_gateway && next == self.parent.parent;
        if allow_find_parent && to_parent && self.parent.needs_search() {
            self.find_parent();
            // A known distance indicates the search found a parent. This
            // frame still goes to `next` as given; a newly adopted parent
            // only carries traffic from the following send on.
            if self.parent.needs_search() {
                return false;
            }
        }

        frame.header.last = self.node_id;
        let bytes = match frame.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("refusing to send oversized frame: {e}");
                return false;
            }
        };
        let ok = self.transport.send(next, &bytes);
        tracing::trace!(
            next,
            sender = frame.header.sender,
            destination = frame.header.destination,
            message_type = ?frame.message_type(),
            ok,
            "tx"
        );

        if to_parent && self.parent.record_parent_send(ok) {
            self.store.set_distance(DISTANCE_INVALID);
            tracing::warn!("lost parent, will search before the next send");
        }
        ok
    }

    // ---------------------------------------------------------------- //
    // User API
    // ---------------------------------------------------------------- //

    /// Send a payload into the mesh. Returns whether the first hop accepted
    /// the frame.
    pub fn send(&mut self, payload: Payload, destination: u8, ack: bool) -> bool {
        let mut frame = Frame::new(self.node_id, destination, payload);
        frame.header.flags.ack_requested = ack;
        self.send_route(&mut frame)
    }

    /// Report a typed device value.
    pub fn send_value(
        &mut self,
        device: u8,
        kind: DeviceKind,
        value: DeviceValue,
        destination: u8,
        ack: bool,
    ) -> bool {
        self.send(
            Payload::Device {
                kind,
                device,
                request: false,
                value,
            },
            destination,
            ack,
        )
    }

    /// Announce one attached device to the controller.
    pub fn present(
        &mut self,
        device: u8,
        device_type: u8,
        binary: bool,
        calibrated: bool,
        ack: bool,
    ) -> bool {
        self.send(
            Payload::Presentation(Presentation {
                device,
                device_type,
                binary,
                calibrated,
            }),
            GATEWAY_ADDRESS,
            ack,
        )
    }

    /// Ask another node (default: the controller) for a device value.
    pub fn request(&mut self, device: u8, kind: DeviceKind, destination: u8) -> bool {
        let mut frame = Frame::new(
            self.node_id,
            destination,
            Payload::Device {
                kind,
                device,
                request: true,
                value: DeviceValue::Text(String::new()),
            },
        );
        frame.header.flags.is_request = true;
        self.send_route(&mut frame)
    }

    pub fn send_battery_level(&mut self, level: u8) -> bool {
        self.send(Payload::BatteryLevel { level }, GATEWAY_ADDRESS, false)
    }

    /// Report sketch name and version to the controller.
    pub fn send_sketch_info(&mut self, name: Option<&str>, version: Option<&str>) -> bool {
        let mut ok = true;
        if let Some(name) = name {
            ok = self.send(
                Payload::Name(truncate_to_payload(name)),
                GATEWAY_ADDRESS,
                false,
            );
        }
        if let Some(version) = version {
            ok &= self.send(
                Payload::Version(truncate_to_payload(version)),
                GATEWAY_ADDRESS,
                false,
            );
        }
        ok
    }

    /// Send a log line to the controller's application log.
    pub fn log_message(&mut self, text: &str) -> bool {
        self.send(
            Payload::LogMessage(truncate_to_payload(text)),
            GATEWAY_ADDRESS,
            false,
        )
    }

    /// Request the time of day; `callback` fires when the controller answers.
    pub fn request_time(&mut self, callback: impl FnMut(u32) + 'static) -> bool {
        self.time_callback = Some(Box::new(callback));
        self.send(Payload::TimeRequest, GATEWAY_ADDRESS, false)
    }

    /// Persist one byte of user state.
    pub fn save_state(&mut self, pos: u8, value: u8) {
        self.store.save_state(pos, value);
    }

    /// Read one byte of user state.
    pub fn load_state(&self, pos: u8) -> u8 {
        self.store.load_state(pos)
    }

    // ---------------------------------------------------------------- //
    // Waiting and sleeping
    // ---------------------------------------------------------------- //

    /// Pump the dispatcher for `ms` milliseconds without suspending.
    pub fn wait(&mut self, ms: u32) {
        let start = self.clock.millis();
        while self.clock.millis().wrapping_sub(start) < ms {
            self.process();
        }
    }

    /// Like [`wait`](Node::wait), but returns early (true) as soon as a
    /// frame of `message_type` has been processed.
    pub fn wait_for(&mut self, ms: u32, message_type: MessageType) -> bool {
        self.last_handled = None;
        let start = self.clock.millis();
        while self.clock.millis().wrapping_sub(start) < ms {
            self.process();
            if self.last_handled == Some(message_type) {
                return true;
            }
        }
        false
    }

    /// Power down radio and CPU for `ms`, waking on the timer.
    pub fn sleep(&mut self, ms: u32) -> WakeReason {
        if self.update.is_some() {
            return WakeReason::NotPossible;
        }
        self.power_down_and_sleep(ms);
        WakeReason::Timer
    }

    /// Power down for `ms`, waking on the timer or an armed interrupt.
    pub fn sleep_with_interrupts(&mut self, ms: u32) -> WakeReason {
        if self.update.is_some() {
            return WakeReason::NotPossible;
        }
        self.power_down_and_sleep(ms);
        match self.wake.pending() {
            Some(interrupt) => WakeReason::Interrupt(interrupt),
            None => WakeReason::Timer,
        }
    }

    /// Drain queued traffic (giving the controller a delivery window), then
    /// sleep.
    pub fn smart_sleep(&mut self, ms: u32) -> WakeReason {
        if self.update.is_some() {
            return WakeReason::NotPossible;
        }
        self.wait(SMART_SLEEP_DRAIN_MS);
        self.sleep_with_interrupts(ms)
    }

    fn power_down_and_sleep(&mut self, ms: u32) {
        self.transport.power_down();
        self.wake.clear();
        ladder_sleep(&mut *self.power, &self.wake, ms);
        // Wake the radio back up on our address.
        self.transport.set_address(self.node_id);
    }

    // ---------------------------------------------------------------- //
    // Introspection
    // ---------------------------------------------------------------- //

    pub fn node_id(&self) -> u8 {
        self.node_id
    }

    /// Read access to the persistent layout (diagnostics and tests).
    pub fn persistent(&self) -> &NodeStore<S> {
        &self.store
    }

    pub fn parent_node_id(&self) -> u8 {
        self.parent.parent
    }

    pub fn distance(&self) -> u8 {
        self.parent.distance
    }

    /// Terminal failure: the gateway had no ids left.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// The node wants a reboot (gateway reset command or a completed
    /// firmware update). The host supervisor restarts the process.
    pub fn reboot_pending(&self) -> bool {
        self.reboot_requested
    }

    /// Next-hop neighbor recorded for `child`.
    pub fn child_route(&self, child: u8) -> u8 {
        self.routes
            .as_ref()
            .map_or(NO_ROUTE, |routes| routes.get(child))
    }

    /// Record a child route (also used for explicit controller assignment).
    pub fn add_child_route(&mut self, child: u8, via: u8) {
        if let Some(routes) = &mut self.routes {
            if routes.set(child, via) {
                self.store.set_route(child, via);
            }
        }
    }

    /// Forget a child route.
    pub fn remove_child_route(&mut self, child: u8) {
        if let Some(routes) = &mut self.routes {
            if routes.remove(child) {
                self.store.set_route(child, NO_ROUTE);
            }
        }
    }
}

/// Clamp text to the payload budget on a character boundary.
fn truncate_to_payload(text: &str) -> String {
    if text.len() <= MAX_PAYLOAD {
        return text.to_string();
    }
    text.char_indices()
        .take_while(|(i, c)| i + c.len_utf8() <= MAX_PAYLOAD)
        .map(|(_, c)| c)
        .collect()
}
