//! # Arena Net - Replicated Arena State Over UDP
//!
//! Keeps every participant's view of one shared tank arena consistent on
//! top of an unreliable, unordered datagram transport.
//!
//! ## Architecture
//!
//! - **Protocol**: fixed-size binary packets, one constant datagram length
//! - **Transport**: non-blocking UDP (or an in-process pipe for tests)
//! - **Reliability**: ack/nak plus timeout resend for guaranteed kinds
//! - **Ordering**: per-tick dedup, then ascending sequence order
//! - **Rooms**: lobby/room state machine fed only by the server
//! - **Replication**: remote tanks dead-reckoned between snapshots
//!
//! ## Threading Model
//!
//! ```text
//! HOST LOOP (one thread)
//!   |
//!   |-- coordinator.tick(now, &input)
//!   |     drain -> order -> dispatch -> evict -> input -> extrapolate
//!   |     -> snapshot -> resend
//!   |
//!   |-- render(coordinator.local(), coordinator.remotes())
//! ```
//!
//! All protocol state is owned by the [`SyncCoordinator`]. There are no
//! locks and no globals; the host passes time and input in and reads state
//! back out.
//!
//! ## Example
//!
//! ```rust,ignore
//! use arena_net::{NoInput, SyncConfig, SyncCoordinator, UdpTransport};
//!
//! let mut sync = SyncCoordinator::new(SyncConfig::default(), UdpTransport::new());
//! sync.connect(clock.now())?;
//! loop {
//!     let report = sync.tick(clock.now(), &NoInput);
//!     // draw sync.local() and sync.remotes()
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod input;
pub mod ordering;
pub mod protocol;
pub mod reliability;
pub mod replication;
pub mod rooms;
pub mod simulation;
pub mod sync;
pub mod transport;

// Re-exports for convenience
pub use config::SyncConfig;
pub use error::{ConfigError, DecodeError, RoomError, SyncError, SyncResult, TransportError};
pub use input::{InputSource, Key, KeyboardState, LocalController, MovementConfig, NoInput};
pub use ordering::PacketOrderer;
pub use protocol::{decode, encode, Packet, PacketKind, Payload, SequenceNumber, PACKET_SIZE};
pub use reliability::{ReliabilityConfig, ReliabilityEvent, ReliabilityLayer, ReliabilityStats};
pub use replication::{Entity, EntityId, EntityReplicationManager, ReplicationConfig};
pub use rooms::{RoomInfo, RoomState, RoomStateMachine};
pub use simulation::{LossyTransport, NetworkConditions};
pub use sync::{SyncCoordinator, SyncEvent, SyncStats, TickReport};
pub use transport::{ChannelTransport, Transport, TransportStats, UdpTransport};
