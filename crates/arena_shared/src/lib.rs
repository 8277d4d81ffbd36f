//! # Arena Shared
//!
//! Common types used by every participant of an arena session.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER do I/O. Sockets, clocks and files belong in
//! `arena_net`. Anything here may be compiled into a server, a client or a
//! test harness unchanged.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod color;
pub mod constants;
pub mod math;

pub use color::{Color, TANK_PALETTE};
pub use constants::{
    ARENA_HEIGHT, ARENA_WIDTH, DEFAULT_SERVER_ADDRESS, DEFAULT_SERVER_PORT, LOBBY_ROOM,
    MAX_PLAYERS_PER_ROOM, MAX_ROOMS,
};
pub use math::{clamp_to_arena, normalize_degrees, Vec2, Vec3};
