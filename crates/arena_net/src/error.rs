//! # Network Error Types
//!
//! Errors that can cross the host-facing API. Nothing on the per-tick path
//! returns these: malformed datagrams, stale acks and unknown entities are
//! absorbed and counted instead.

use std::io;

use thiserror::Error;

use crate::protocol::PACKET_SIZE;

/// A datagram that is not a packet.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Datagram length differs from the fixed packet size.
    #[error("wrong datagram size: expected {expected} bytes, got {actual}")]
    WrongSize {
        /// The fixed packet size.
        expected: usize,
        /// The received length.
        actual: usize,
    },

    /// The type tag names no known packet kind.
    #[error("unknown packet kind tag: {0}")]
    UnknownKind(u8),
}

impl DecodeError {
    /// Size error for a datagram of `actual` bytes.
    #[must_use]
    pub const fn wrong_size(actual: usize) -> Self {
        Self::WrongSize {
            expected: PACKET_SIZE,
            actual,
        }
    }
}

/// Failures of the datagram transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Send or receive attempted before `connect`.
    #[error("transport is not connected")]
    NotConnected,

    /// The configured endpoint does not resolve to a socket address.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The other end of an in-process pipe is gone.
    #[error("peer end of the channel was dropped")]
    Disconnected,

    /// Underlying socket error.
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
}

/// Local rejection of a room request. No packet is sent.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomError {
    /// Room number outside `1..=MAX_ROOMS`.
    #[error("no such room: {0}")]
    InvalidRoom(u8),

    /// Room is at capacity.
    #[error("room {room} is full ({capacity} players)")]
    RoomFull {
        /// The requested room.
        room: u8,
        /// The room's capacity.
        capacity: u8,
    },

    /// Requests are only valid from the lobby.
    #[error("room requests are only valid in the lobby")]
    NotInLobby,
}

/// Configuration loading and validation failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("cannot read config file: {0}")]
    Io(#[from] io::Error),

    /// Config file is not valid TOML for this schema.
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of its allowed range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors surfaced by the sync coordinator's host-facing calls.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Room request rejected locally.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Bad configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The endpoint may only change while disconnected.
    #[error("cannot change endpoint while connected")]
    AlreadyConnected,
}

/// Result type for coordinator operations.
pub type SyncResult<T> = Result<T, SyncError>;
