//! # Protocol Constants
//!
//! Values both ends of the wire must agree on, plus the client defaults
//! the configuration layer falls back to.
//!
//! **CRITICAL:** Room count and capacity are baked into the lobby packet
//! layout. Changing them changes the wire format.

// =============================================================================
// NETWORK CONFIGURATION
// =============================================================================

/// Default server address
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1";

/// Default server port for game traffic
pub const DEFAULT_SERVER_PORT: u16 = 5000;

/// Maximum datagram size we ever read (MTU-safe)
pub const MAX_DATAGRAM_SIZE: usize = 1200;

// =============================================================================
// ROOMS
// =============================================================================

/// Number of joinable rooms (numbered `1..=MAX_ROOMS`)
pub const MAX_ROOMS: usize = 8;

/// Occupancy at which a room refuses new players
pub const MAX_PLAYERS_PER_ROOM: u8 = 8;

/// Reserved room id meaning "the lobby itself"
pub const LOBBY_ROOM: u8 = 0;

// =============================================================================
// ARENA
// =============================================================================

/// Arena floor width in world units
pub const ARENA_WIDTH: f32 = 500.0;

/// Arena floor height in world units
pub const ARENA_HEIGHT: f32 = 500.0;

/// Height at which a tank's floor position is rendered
pub const TANK_RENDER_HEIGHT: f32 = 1.0;

/// Local tank speed (units per second)
pub const TANK_SPEED_UNITS_PER_SECOND: f32 = 100.0;

/// Local tank turn rate (degrees per second)
pub const TANK_ROTATION_DEGREES_PER_SECOND: f32 = 90.0;

/// Health a freshly created tank starts with
pub const TANK_STARTING_HEALTH: u8 = 1;

// =============================================================================
// TIMING (seconds)
// =============================================================================

/// Age after which an unacknowledged guaranteed packet is re-issued
pub const SECONDS_BEFORE_RESEND_GUARANTEED_PACKET: f64 = 0.25;

/// Minimum interval between two state packets (keep-alive or snapshot)
pub const SECONDS_BEFORE_SEND_UPDATE_PACKET: f64 = 0.05;

/// Silence after which a remote tank is evicted
pub const SECONDS_BEFORE_TIMEOUT_REMOVE: f64 = 5.0;

/// How long a fired laser stays visible
pub const SECONDS_FIRE_EFFECT_VISIBLE: f64 = 0.25;

/// Resend attempts before a guaranteed packet is given up on
pub const MAX_GUARANTEED_RESENDS: u32 = 10;
