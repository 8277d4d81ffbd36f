//! # Sync Coordinator
//!
//! The explicit context object: owns every piece of protocol state and the
//! transport, and runs the per-tick pipeline.
//!
//! ## Tick Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌───────┐   ┌───────┐   ┌─────────────┐   ┌──────────┐   ┌──────────┐
//! │ drain, order │──►│ evict │──►│ input │──►│ extrapolate │──►│ snapshot │──►│ resend   │
//! │ & dispatch   │   │ stale │   │       │   │ remotes     │   │ (cadence)│   │ timeouts │
//! └──────────────┘   └───────┘   └───────┘   └─────────────┘   └──────────┘   └──────────┘
//! ```
//!
//! One tick runs to completion before the next. Nothing blocks: the
//! transport is polled until empty and all timing is a comparison against
//! the `now` passed in by the host.

use arena_shared::constants::MAX_DATAGRAM_SIZE;
use tracing::{debug, info, trace};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult, TransportError};
use crate::input::{InputSource, LocalController};
use crate::ordering::PacketOrderer;
use crate::protocol::{
    decode, AckBody, FireBody, Packet, PacketKind, Payload, SequenceNumber,
};
use crate::reliability::{ReliabilityEvent, ReliabilityLayer};
use crate::replication::{Entity, EntityId, EntityReplicationManager, SnapshotOutcome};
use crate::rooms::{ResetOutcome, RoomState, RoomStateMachine};
use crate::transport::Transport;

/// State changes surfaced to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    /// Room occupancy was refreshed.
    LobbyUpdated,
    /// The server placed us in a room under `id`.
    EnteredRoom {
        /// Id assigned to the local tank.
        id: EntityId,
    },
    /// The room closed; back in the lobby.
    ReturnedToLobby,
    /// A remote tank appeared.
    EntitySpawned(EntityId),
    /// A remote tank went silent and was removed.
    EntityEvicted(EntityId),
    /// A guaranteed packet timed out and was sent again.
    PacketResent {
        /// Kind of the packet.
        kind: PacketKind,
        /// Retired sequence number.
        old_sequence: SequenceNumber,
        /// Sequence number now outstanding.
        new_sequence: SequenceNumber,
    },
    /// A guaranteed packet was abandoned at the resend cap.
    PeerUnreachable {
        /// Kind of the packet.
        kind: PacketKind,
        /// Its last sequence number.
        sequence: SequenceNumber,
    },
}

impl From<ReliabilityEvent> for SyncEvent {
    fn from(event: ReliabilityEvent) -> Self {
        match event {
            ReliabilityEvent::Resent {
                kind,
                old_sequence,
                new_sequence,
            } => Self::PacketResent {
                kind,
                old_sequence,
                new_sequence,
            },
            ReliabilityEvent::PeerUnreachable { kind, sequence } => {
                Self::PeerUnreachable { kind, sequence }
            }
        }
    }
}

/// What one tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Distinct packets dispatched this tick.
    pub dispatched: usize,
    /// State changes, in the order they happened.
    pub events: Vec<SyncEvent>,
}

/// Inbound traffic statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Datagrams read from the transport.
    pub datagrams_received: u64,
    /// Datagrams that failed to decode.
    pub malformed: u64,
    /// Exact duplicates discarded within a burst.
    pub duplicates: u64,
    /// Packets dispatched to a handler.
    pub dispatched: u64,
    /// Packets of a kind a client never acts on.
    pub ignored: u64,
    /// Snapshots dropped for non-finite kinematics.
    pub rejected_snapshots: u64,
    /// Acks sent in reply to guaranteed packets.
    pub acks_sent: u64,
}

/// The replication client.
pub struct SyncCoordinator<T> {
    config: SyncConfig,
    transport: T,
    reliability: ReliabilityLayer,
    orderer: PacketOrderer,
    rooms: RoomStateMachine,
    replication: EntityReplicationManager,
    controller: LocalController,
    connected: bool,
    last_send: Option<f64>,
    last_tick: Option<f64>,
    stats: SyncStats,
    recv_buffer: [u8; MAX_DATAGRAM_SIZE],
}

impl<T: Transport> SyncCoordinator<T> {
    /// Creates a disconnected coordinator.
    #[must_use]
    pub fn new(config: SyncConfig, transport: T) -> Self {
        Self {
            reliability: ReliabilityLayer::new(config.reliability_config()),
            orderer: PacketOrderer::new(),
            rooms: RoomStateMachine::new(config.rooms.capacity),
            replication: EntityReplicationManager::new(config.replication_config()),
            controller: LocalController::new(config.movement_config()),
            connected: false,
            last_send: None,
            last_tick: None,
            stats: SyncStats::default(),
            recv_buffer: [0u8; MAX_DATAGRAM_SIZE],
            config,
            transport,
        }
    }

    /// Connects to the configured endpoint and asks to join the lobby.
    ///
    /// # Errors
    ///
    /// The endpoint does not resolve or the transport cannot open.
    pub fn connect(&mut self, now: f64) -> SyncResult<()> {
        let endpoint = self.config.endpoint.socket_addr()?;
        self.transport.connect(endpoint)?;
        self.connected = true;
        info!(%endpoint, "connected");

        self.send(RoomStateMachine::lobby_join_request(), now);
        Ok(())
    }

    /// Closes the transport and forgets all session state, including the
    /// id the server assigned.
    pub fn disconnect(&mut self) {
        if self.connected {
            info!("disconnected");
        }
        self.transport.disconnect();
        self.connected = false;
        self.reliability.clear();
        self.replication.reset();
        self.rooms.reset();
        self.last_send = None;
    }

    /// Changes the server endpoint.
    ///
    /// # Errors
    ///
    /// [`SyncError::AlreadyConnected`] while connected.
    pub fn set_endpoint(&mut self, address: impl Into<String>, port: u16) -> SyncResult<()> {
        if self.connected {
            return Err(SyncError::AlreadyConnected);
        }
        self.config.endpoint.address = address.into();
        self.config.endpoint.port = port;
        Ok(())
    }

    /// Asks to enter `room`: creates it if empty, joins it otherwise.
    ///
    /// # Errors
    ///
    /// A [`RoomError`](crate::error::RoomError) if the request is rejected
    /// locally (nothing is sent), or
    /// [`TransportError::NotConnected`].
    pub fn request_room(&mut self, room: u8, now: f64) -> SyncResult<SequenceNumber> {
        let payload = self.rooms.request_room(room)?;
        if !self.connected {
            return Err(TransportError::NotConnected.into());
        }
        debug!(room, kind = ?payload.kind(), "room requested");
        Ok(self.send(payload, now))
    }

    /// Runs one tick.
    pub fn tick(&mut self, now: f64, input: &dyn InputSource) -> TickReport {
        let mut report = TickReport::default();

        // 1. Drain, order and dispatch
        if self.connected {
            for packet in self.receive() {
                self.dispatch(&packet, now, &mut report.events);
                report.dispatched += 1;
            }
        }

        // 2. Liveness
        for id in self.replication.evict_stale(now) {
            report.events.push(SyncEvent::EntityEvicted(id));
        }

        // 3. Local input
        let dt = self.last_tick.map_or(0.0, |last| (now - last).max(0.0)) as f32;
        self.last_tick = Some(now);
        if self.rooms.is_in_room() {
            let bounds = *self.replication.config();
            let fired = self
                .controller
                .apply(input, self.replication.local_mut(), &bounds, dt);
            if fired && self.connected {
                self.fire(now);
            }
        }

        // 4. Dead reckoning
        self.replication.extrapolate(now);

        if self.connected {
            // 5. State packet on cadence
            let due = self
                .last_send
                .map_or(true, |last| now - last >= self.config.timing.send_interval_secs);
            if due {
                self.send_state(now);
            }

            // 6. Resends
            let events = self.reliability.tick(&mut self.transport, now);
            report.events.extend(events.into_iter().map(SyncEvent::from));
        }

        report
    }

    fn send(&mut self, payload: Payload, now: f64) -> SequenceNumber {
        let sender = self.sender_id();
        self.reliability.send(&mut self.transport, sender, payload, now)
    }

    fn sender_id(&self) -> u8 {
        self.replication.local_id().0
    }

    fn receive(&mut self) -> Vec<Packet> {
        while let Some(len) = self.transport.try_receive(&mut self.recv_buffer) {
            self.stats.datagrams_received += 1;
            match decode(&self.recv_buffer[..len]) {
                Ok(packet) => {
                    if !self.orderer.push(packet) {
                        self.stats.duplicates += 1;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "malformed datagram dropped");
                    self.stats.malformed += 1;
                }
            }
        }
        self.orderer.drain_ordered()
    }

    fn dispatch(&mut self, packet: &Packet, now: f64, events: &mut Vec<SyncEvent>) {
        trace!(kind = ?packet.kind(), sequence = packet.sequence, sender = packet.sender_id, "dispatch");

        let handled = match packet.payload {
            Payload::Ack(body) => {
                self.reliability.on_ack(body.acked_sequence);
                true
            }
            Payload::Nack(body) => {
                debug!(kind = ?body.acked_kind(), sequence = body.acked_sequence, "peer refused packet");
                self.reliability.on_nak(body.acked_sequence);
                true
            }
            Payload::LobbyUpdate(body) => {
                self.rooms.on_lobby_update(&body);
                events.push(SyncEvent::LobbyUpdated);
                true
            }
            Payload::GameReset(body) => {
                let id = EntityId(body.id);
                if self.rooms.on_game_reset() == ResetOutcome::Entered {
                    events.push(SyncEvent::EnteredRoom { id });
                }
                self.replication
                    .adopt_local(id, body.position, body.orientation, now);
                true
            }
            Payload::ReturnToLobby => {
                if self.rooms.on_return_to_lobby() {
                    events.push(SyncEvent::ReturnedToLobby);
                }
                self.replication.clear_remote();
                true
            }
            Payload::GameUpdate(body) => {
                if self.rooms.is_in_room() {
                    let id = EntityId(packet.sender_id);
                    match self.replication.apply_snapshot(id, &body, now) {
                        SnapshotOutcome::Spawned => events.push(SyncEvent::EntitySpawned(id)),
                        SnapshotOutcome::Rejected => self.stats.rejected_snapshots += 1,
                        SnapshotOutcome::Updated
                        | SnapshotOutcome::Refreshed
                        | SnapshotOutcome::IgnoredLocal => {}
                    }
                } else {
                    trace!(sender = packet.sender_id, "snapshot outside a room ignored");
                }
                true
            }
            Payload::Hit(body) => {
                self.replication
                    .apply_hit(EntityId(body.target_id), body.damage);
                true
            }
            Payload::Fire(body) => {
                self.replication
                    .apply_fire(EntityId(body.instigator_id), now);
                true
            }
            Payload::Respawn(body) => {
                self.replication
                    .apply_respawn(body.position, body.orientation, now);
                true
            }
            Payload::JoinRoom(_) | Payload::CreateRoom(_) | Payload::KeepAlive => {
                trace!(kind = ?packet.kind(), "server-bound packet ignored");
                self.stats.ignored += 1;
                false
            }
        };

        if handled {
            self.stats.dispatched += 1;
            if packet.is_guaranteed() {
                self.acknowledge(packet, now);
            }
        }
    }

    fn acknowledge(&mut self, packet: &Packet, now: f64) {
        self.send(Payload::Ack(AckBody::answering(packet)), now);
        self.stats.acks_sent += 1;
    }

    fn fire(&mut self, now: f64) {
        let local = self.replication.local_mut();
        local.last_fire = Some(now);
        let instigator_id = local.id.0;
        self.send(Payload::Fire(FireBody { instigator_id }), now);
    }

    fn send_state(&mut self, now: f64) {
        let payload = match self.rooms.state() {
            RoomState::Lobby => Payload::KeepAlive,
            RoomState::InRoom => Payload::GameUpdate(self.replication.local().to_snapshot()),
        };
        self.send(payload, now);
        self.last_send = Some(now);
    }

    /// Returns true between `connect` and `disconnect`.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Room state machine (lobby UI data).
    #[must_use]
    pub const fn rooms(&self) -> &RoomStateMachine {
        &self.rooms
    }

    /// All tanks.
    #[must_use]
    pub const fn replication(&self) -> &EntityReplicationManager {
        &self.replication
    }

    /// The local tank.
    #[must_use]
    pub const fn local(&self) -> &Entity {
        self.replication.local()
    }

    /// Remote tanks, in stable order.
    pub fn remotes(&self) -> impl Iterator<Item = &Entity> {
        self.replication.remotes()
    }

    /// Returns true while `entity`'s firing effect is visible.
    #[must_use]
    pub fn is_firing(&self, entity: &Entity, now: f64) -> bool {
        entity.is_firing(now, self.config.timing.fire_effect_secs)
    }

    /// Guaranteed-delivery bookkeeping.
    #[must_use]
    pub const fn reliability(&self) -> &ReliabilityLayer {
        &self.reliability
    }

    /// Inbound statistics.
    #[must_use]
    pub const fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// The transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
