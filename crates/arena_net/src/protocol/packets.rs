//! # Packet Definitions
//!
//! All packet kinds of the arena protocol.
//!
//! ## Fixed-Size Design
//!
//! Every payload body is a `Copy`, `Pod` struct so that:
//! - bodies are written to the wire with a single byte copy
//! - the payload area is a union: its size is the largest body
//! - every packet, whatever its kind, is exactly [`PACKET_SIZE`] bytes

use std::hash::{Hash, Hasher};
use std::mem::size_of;

use arena_shared::{Vec2, LOBBY_ROOM, MAX_ROOMS};
use bytemuck::{Pod, Zeroable};

/// Sequence number type alias.
///
/// Assigned by the sender, monotonically increasing per sender.
pub type SequenceNumber = u32;

/// Wire tag of every packet kind.
///
/// Tag `0` is deliberately unused so that a zeroed buffer never decodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PacketKind {
    /// Client -> Server: join a room (or the lobby, room 0).
    JoinRoom = 1,
    /// Client -> Server: open an empty room.
    CreateRoom = 2,
    /// Server -> Client: occupancy of every room.
    LobbyUpdate = 3,
    /// Server -> Client: you are in a room; here is your id and spawn.
    GameReset = 4,
    /// Bidirectional: kinematic snapshot of the sender's tank.
    GameUpdate = 5,
    /// Server -> Client: a tank took damage.
    Hit = 6,
    /// Bidirectional: a tank fired.
    Fire = 7,
    /// Server -> Client: respawn the local tank.
    Respawn = 8,
    /// Server -> Client: the room closed, go back to the lobby.
    ReturnToLobby = 9,
    /// Bidirectional: a guaranteed packet arrived.
    Ack = 10,
    /// Bidirectional: a guaranteed packet was refused.
    Nack = 11,
    /// Client -> Server: liveness while idle in the lobby.
    KeepAlive = 12,
}

impl PacketKind {
    /// Every kind, in tag order.
    pub const ALL: [Self; 12] = [
        Self::JoinRoom,
        Self::CreateRoom,
        Self::LobbyUpdate,
        Self::GameReset,
        Self::GameUpdate,
        Self::Hit,
        Self::Fire,
        Self::Respawn,
        Self::ReturnToLobby,
        Self::Ack,
        Self::Nack,
        Self::KeepAlive,
    ];

    /// Converts from the wire tag.
    #[must_use]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::JoinRoom),
            2 => Some(Self::CreateRoom),
            3 => Some(Self::LobbyUpdate),
            4 => Some(Self::GameReset),
            5 => Some(Self::GameUpdate),
            6 => Some(Self::Hit),
            7 => Some(Self::Fire),
            8 => Some(Self::Respawn),
            9 => Some(Self::ReturnToLobby),
            10 => Some(Self::Ack),
            11 => Some(Self::Nack),
            12 => Some(Self::KeepAlive),
            _ => None,
        }
    }

    /// Returns true if losing a packet of this kind corrupts game state,
    /// so it must be tracked until acknowledged.
    ///
    /// Snapshots and keep-alives are superseded by the next one. Acks and
    /// naks are never acknowledged themselves.
    #[must_use]
    pub const fn is_guaranteed(self) -> bool {
        match self {
            Self::JoinRoom
            | Self::CreateRoom
            | Self::GameReset
            | Self::Hit
            | Self::Fire
            | Self::Respawn
            | Self::ReturnToLobby => true,
            Self::LobbyUpdate
            | Self::GameUpdate
            | Self::Ack
            | Self::Nack
            | Self::KeepAlive => false,
        }
    }
}

/// Room request body (`JoinRoom`, `CreateRoom`).
///
/// Size: 1 byte
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct RoomBody {
    /// Room number; [`LOBBY_ROOM`] means the lobby.
    pub room: u8,
}

impl RoomBody {
    /// Creates a room request body.
    #[inline]
    #[must_use]
    pub const fn new(room: u8) -> Self {
        Self { room }
    }

    /// Request body for the lobby itself.
    #[must_use]
    pub const fn lobby() -> Self {
        Self::new(LOBBY_ROOM)
    }
}

/// Lobby occupancy body.
///
/// Size: 8 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct LobbyBody {
    /// Players currently in room `index + 1`.
    pub occupancy: [u8; MAX_ROOMS],
}

impl LobbyBody {
    /// Creates a lobby body.
    #[inline]
    #[must_use]
    pub const fn new(occupancy: [u8; MAX_ROOMS]) -> Self {
        Self { occupancy }
    }
}

/// Game reset body: the server places the local tank in a room.
///
/// Size: 16 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ResetBody {
    /// Spawn position.
    pub position: Vec2,
    /// Spawn orientation (degrees).
    pub orientation: f32,
    /// Id assigned to the local tank for this session.
    pub id: u8,
    /// Padding for alignment.
    pub _padding: [u8; 3],
}

impl ResetBody {
    /// Creates a reset body.
    #[must_use]
    pub const fn new(id: u8, position: Vec2, orientation: f32) -> Self {
        Self {
            position,
            orientation,
            id,
            _padding: [0; 3],
        }
    }
}

/// Kinematic snapshot body.
///
/// Size: 32 bytes (the largest body; sets the payload size)
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct UpdateBody {
    /// Position at the sender's timestamp.
    pub position: Vec2,
    /// Velocity (units per second).
    pub velocity: Vec2,
    /// Acceleration (units per second squared).
    pub acceleration: Vec2,
    /// Orientation (degrees).
    pub orientation: f32,
    /// Remaining health.
    pub health: u8,
    /// Score.
    pub score: u8,
    /// Padding for alignment.
    pub _padding: [u8; 2],
}

impl UpdateBody {
    /// Creates a snapshot body.
    #[must_use]
    pub const fn new(
        position: Vec2,
        velocity: Vec2,
        acceleration: Vec2,
        orientation: f32,
        health: u8,
        score: u8,
    ) -> Self {
        Self {
            position,
            velocity,
            acceleration,
            orientation,
            health,
            score,
            _padding: [0; 2],
        }
    }

    /// Returns true if position, velocity and acceleration are all finite.
    #[must_use]
    pub fn has_finite_kinematics(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.acceleration.is_finite()
    }
}

/// Hit body.
///
/// Size: 2 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct HitBody {
    /// Tank that was hit.
    pub target_id: u8,
    /// Health removed.
    pub damage: u8,
}

/// Fire body.
///
/// Size: 1 byte
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct FireBody {
    /// Tank that fired.
    pub instigator_id: u8,
}

/// Respawn body for the local tank.
///
/// Size: 12 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct RespawnBody {
    /// Respawn position.
    pub position: Vec2,
    /// Respawn orientation (degrees).
    pub orientation: f32,
}

/// Ack / Nack body: correlates to one guaranteed packet.
///
/// Size: 8 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct AckBody {
    /// Wire tag of the acknowledged packet.
    pub acked_kind: u8,
    /// Padding for alignment.
    pub _padding: [u8; 3],
    /// Sequence number of the acknowledged packet.
    pub acked_sequence: SequenceNumber,
}

impl AckBody {
    /// Creates a correlation body.
    #[must_use]
    pub const fn new(kind: PacketKind, sequence: SequenceNumber) -> Self {
        Self {
            acked_kind: kind as u8,
            _padding: [0; 3],
            acked_sequence: sequence,
        }
    }

    /// Correlation body answering `packet`.
    #[must_use]
    pub const fn answering(packet: &Packet) -> Self {
        Self::new(packet.kind(), packet.sequence)
    }

    /// Kind of the acknowledged packet, if the tag is known.
    #[must_use]
    pub const fn acked_kind(&self) -> Option<PacketKind> {
        PacketKind::from_u8(self.acked_kind)
    }
}

const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// Size of the payload union: the largest body.
pub const PAYLOAD_SIZE: usize = max(
    max(
        max(size_of::<RoomBody>(), size_of::<LobbyBody>()),
        max(size_of::<ResetBody>(), size_of::<UpdateBody>()),
    ),
    max(
        max(size_of::<HitBody>(), size_of::<FireBody>()),
        max(size_of::<RespawnBody>(), size_of::<AckBody>()),
    ),
);

/// Header size: kind (1) + sequence (4) + sender (1) + timestamp (8).
pub const HEADER_SIZE: usize = 1 + 4 + 1 + 8;

/// Total size of every packet on the wire.
pub const PACKET_SIZE: usize = HEADER_SIZE + PAYLOAD_SIZE;

/// Payload, selected by kind. Exactly one body per kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Payload {
    /// Join a room.
    JoinRoom(RoomBody),
    /// Create a room.
    CreateRoom(RoomBody),
    /// Lobby occupancy.
    LobbyUpdate(LobbyBody),
    /// Enter a room.
    GameReset(ResetBody),
    /// Kinematic snapshot.
    GameUpdate(UpdateBody),
    /// Damage event.
    Hit(HitBody),
    /// Fire event.
    Fire(FireBody),
    /// Respawn the local tank.
    Respawn(RespawnBody),
    /// Leave the room.
    ReturnToLobby,
    /// Acknowledgement.
    Ack(AckBody),
    /// Refusal.
    Nack(AckBody),
    /// Idle liveness.
    KeepAlive,
}

impl Payload {
    /// Returns the packet kind carrying this payload.
    #[must_use]
    pub const fn kind(&self) -> PacketKind {
        match self {
            Self::JoinRoom(_) => PacketKind::JoinRoom,
            Self::CreateRoom(_) => PacketKind::CreateRoom,
            Self::LobbyUpdate(_) => PacketKind::LobbyUpdate,
            Self::GameReset(_) => PacketKind::GameReset,
            Self::GameUpdate(_) => PacketKind::GameUpdate,
            Self::Hit(_) => PacketKind::Hit,
            Self::Fire(_) => PacketKind::Fire,
            Self::Respawn(_) => PacketKind::Respawn,
            Self::ReturnToLobby => PacketKind::ReturnToLobby,
            Self::Ack(_) => PacketKind::Ack,
            Self::Nack(_) => PacketKind::Nack,
            Self::KeepAlive => PacketKind::KeepAlive,
        }
    }
}

/// One packet.
///
/// Equality (and hashing) follow [`PacketKey`]: kind, sequence number,
/// sender and payload bytes. The timestamp is not part of a packet's
/// identity.
#[derive(Clone, Copy, Debug)]
pub struct Packet {
    /// Sender-assigned sequence number.
    pub sequence: SequenceNumber,
    /// Sender's participant id.
    pub sender_id: u8,
    /// Sender's clock when the packet was (re)issued, in seconds.
    pub timestamp: f64,
    /// Kind-specific body.
    pub payload: Payload,
}

impl Packet {
    /// Creates a packet.
    #[must_use]
    pub const fn new(
        sequence: SequenceNumber,
        sender_id: u8,
        timestamp: f64,
        payload: Payload,
    ) -> Self {
        Self {
            sequence,
            sender_id,
            timestamp,
            payload,
        }
    }

    /// Returns the packet kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> PacketKind {
        self.payload.kind()
    }

    /// Returns true if this packet must be tracked until acknowledged.
    #[inline]
    #[must_use]
    pub const fn is_guaranteed(&self) -> bool {
        self.kind().is_guaranteed()
    }

    /// Identity key used for deduplication and ordering.
    #[must_use]
    pub fn key(&self) -> PacketKey {
        PacketKey {
            sequence: self.sequence,
            kind: self.kind(),
            sender_id: self.sender_id,
            payload: self.payload.to_bytes(),
        }
    }
}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Packet {}

impl Hash for Packet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Identity of a packet independent of arrival order.
///
/// Ordered by sequence number first; the remaining fields only break ties
/// between distinct packets that happen to share a sequence number (for
/// example from two different senders).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PacketKey {
    /// Sequence number (primary order).
    pub sequence: SequenceNumber,
    /// Packet kind.
    pub kind: PacketKind,
    /// Sender id.
    pub sender_id: u8,
    /// Raw payload bytes.
    pub payload: [u8; PAYLOAD_SIZE],
}
