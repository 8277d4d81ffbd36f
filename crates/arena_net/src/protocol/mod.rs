//! # Network Protocol
//!
//! Fixed-size binary packets. One datagram carries exactly one packet.
//!
//! ## Packet Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (14 bytes, little-endian)                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Kind (1) │ Sequence (4) │ Sender (1) │ Timestamp f64 (8)     │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Payload (32 bytes: largest body, zero-padded)                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Philosophy
//!
//! - One constant datagram length: anything else is malformed
//! - Pod bodies for zero-copy encode/decode
//! - Reliable delivery only for kinds whose loss corrupts state

mod packets;
mod serialization;

pub use packets::{
    AckBody, FireBody, HitBody, LobbyBody, Packet, PacketKey, PacketKind, Payload, ResetBody,
    RespawnBody, RoomBody, SequenceNumber, UpdateBody, HEADER_SIZE, PACKET_SIZE, PAYLOAD_SIZE,
};
pub use serialization::{decode, encode, PacketDeserializer, PacketSerializer};
