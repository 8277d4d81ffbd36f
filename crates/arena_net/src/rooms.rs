//! # Room State Machine
//!
//! ```text
//!            LobbyUpdate (refresh counts)
//!               ┌──────┐
//!               ▼      │
//!          ┌─────────────┐   GameReset    ┌──────────┐
//!   ──────►│    Lobby    │ ─────────────► │  InRoom  │
//!          └─────────────┘ ◄───────────── └──────────┘
//!                           ReturnToLobby
//! ```
//!
//! Occupancy is only ever written from the network. Local join/create
//! requests are validated against the last known counts and turned into a
//! payload; they never change state themselves.

use arena_shared::{LOBBY_ROOM, MAX_PLAYERS_PER_ROOM, MAX_ROOMS};
use tracing::{debug, info};

use crate::error::RoomError;
use crate::protocol::{LobbyBody, Payload, RoomBody};

/// Where the local participant is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoomState {
    /// Choosing a room.
    #[default]
    Lobby,
    /// Playing in a room.
    InRoom,
}

/// One room as shown in the lobby.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoomInfo {
    /// Room number, `1..=MAX_ROOMS`.
    pub number: u8,
    /// Players currently inside.
    pub occupancy: u8,
    /// Players allowed inside.
    pub capacity: u8,
}

impl RoomInfo {
    /// Returns true if nobody is inside (joining would create it).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.occupancy == 0
    }

    /// Returns true if no one else may join.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.occupancy >= self.capacity
    }
}

/// Result of a `GameReset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetOutcome {
    /// Moved from the lobby into a room.
    Entered,
    /// Already in a room; the reset re-spawned us there.
    Readopted,
}

/// Lobby/room state.
#[derive(Clone, Debug)]
pub struct RoomStateMachine {
    state: RoomState,
    occupancy: [u8; MAX_ROOMS],
    capacity: u8,
    lobby_seen: bool,
}

impl Default for RoomStateMachine {
    fn default() -> Self {
        Self::new(MAX_PLAYERS_PER_ROOM)
    }
}

impl RoomStateMachine {
    /// Creates a machine in the lobby with unknown (zero) occupancy.
    #[must_use]
    pub const fn new(capacity: u8) -> Self {
        Self {
            state: RoomState::Lobby,
            occupancy: [0; MAX_ROOMS],
            capacity,
            lobby_seen: false,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> RoomState {
        self.state
    }

    /// Returns true while in a room.
    #[must_use]
    pub fn is_in_room(&self) -> bool {
        self.state == RoomState::InRoom
    }

    /// Returns true once the lobby UI has something to show: in the lobby
    /// and at least one occupancy update received.
    #[must_use]
    pub fn shows_lobby_affordances(&self) -> bool {
        self.state == RoomState::Lobby && self.lobby_seen
    }

    /// Every room with its last known occupancy.
    pub fn rooms(&self) -> impl Iterator<Item = RoomInfo> + '_ {
        (1..=MAX_ROOMS as u8).filter_map(|number| self.room(number))
    }

    /// One room, or `None` for a number outside `1..=MAX_ROOMS`.
    #[must_use]
    pub fn room(&self, number: u8) -> Option<RoomInfo> {
        let index = usize::from(number).checked_sub(1)?;
        let occupancy = *self.occupancy.get(index)?;
        Some(RoomInfo {
            number,
            occupancy,
            capacity: self.capacity,
        })
    }

    /// The request sent right after connecting: join the lobby itself.
    #[must_use]
    pub const fn lobby_join_request() -> Payload {
        Payload::JoinRoom(RoomBody::new(LOBBY_ROOM))
    }

    /// Builds the request for entering `room`.
    ///
    /// Empty rooms are created, occupied ones joined.
    ///
    /// # Errors
    ///
    /// [`RoomError::NotInLobby`] outside the lobby,
    /// [`RoomError::InvalidRoom`] for an unknown room number and
    /// [`RoomError::RoomFull`] when the room is at capacity. Nothing is
    /// sent in any of these cases.
    pub fn request_room(&self, room: u8) -> Result<Payload, RoomError> {
        if self.state != RoomState::Lobby {
            return Err(RoomError::NotInLobby);
        }
        let info = self.room(room).ok_or(RoomError::InvalidRoom(room))?;
        if info.is_full() {
            debug!(room, occupancy = info.occupancy, "room full, request rejected");
            return Err(RoomError::RoomFull {
                room,
                capacity: info.capacity,
            });
        }

        let body = RoomBody::new(room);
        Ok(if info.is_empty() {
            Payload::CreateRoom(body)
        } else {
            Payload::JoinRoom(body)
        })
    }

    /// Applies a lobby occupancy update. Counts are refreshed in either
    /// state; only the lobby shows them.
    pub fn on_lobby_update(&mut self, body: &LobbyBody) {
        self.occupancy = body.occupancy;
        if self.state == RoomState::Lobby && !self.lobby_seen {
            info!("lobby available");
        }
        self.lobby_seen = true;
    }

    /// Applies a `GameReset`.
    pub fn on_game_reset(&mut self) -> ResetOutcome {
        match self.state {
            RoomState::Lobby => {
                info!("entered room");
                self.state = RoomState::InRoom;
                ResetOutcome::Entered
            }
            RoomState::InRoom => ResetOutcome::Readopted,
        }
    }

    /// Applies a `ReturnToLobby`. Returns true if this left a room.
    pub fn on_return_to_lobby(&mut self) -> bool {
        let left = self.state == RoomState::InRoom;
        if left {
            info!("returned to lobby");
        }
        self.state = RoomState::Lobby;
        left
    }

    /// Back to the initial state (used on disconnect).
    pub fn reset(&mut self) {
        *self = Self::new(self.capacity);
    }
}
