//! # Sync Configuration
//!
//! Loaded once at startup from TOML. Every section and every field has a
//! default, so an empty file (or no file) is a valid configuration.
//!
//! ```toml
//! [endpoint]
//! address = "127.0.0.1"
//! port = 5000
//!
//! [timing]
//! resend_after_secs = 0.25
//! max_resends = 10        # 0 retries forever
//! ```

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;

use arena_shared::constants::{
    DEFAULT_SERVER_ADDRESS, DEFAULT_SERVER_PORT, MAX_GUARANTEED_RESENDS,
    SECONDS_BEFORE_RESEND_GUARANTEED_PACKET, SECONDS_BEFORE_SEND_UPDATE_PACKET,
    SECONDS_BEFORE_TIMEOUT_REMOVE, SECONDS_FIRE_EFFECT_VISIBLE, TANK_ROTATION_DEGREES_PER_SECOND,
    TANK_SPEED_UNITS_PER_SECOND,
};
use arena_shared::{ARENA_HEIGHT, ARENA_WIDTH, MAX_PLAYERS_PER_ROOM};
use serde::Deserialize;

use crate::error::{ConfigError, TransportError};
use crate::input::MovementConfig;
use crate::reliability::ReliabilityConfig;
use crate::replication::ReplicationConfig;

/// Full client configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Where the server lives.
    pub endpoint: EndpointSection,
    /// Protocol timing.
    pub timing: TimingSection,
    /// Arena bounds.
    pub arena: ArenaSection,
    /// Room layout.
    pub rooms: RoomsSection,
    /// Local tank handling.
    pub movement: MovementSection,
}

/// `[endpoint]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointSection {
    /// Host name or IP address.
    pub address: String,
    /// UDP port.
    pub port: u16,
}

impl Default for EndpointSection {
    fn default() -> Self {
        Self {
            address: DEFAULT_SERVER_ADDRESS.to_owned(),
            port: DEFAULT_SERVER_PORT,
        }
    }
}

impl EndpointSection {
    /// Resolves to the first matching socket address.
    ///
    /// # Errors
    ///
    /// [`TransportError::InvalidEndpoint`] if the address does not resolve.
    pub fn socket_addr(&self) -> Result<SocketAddr, TransportError> {
        let invalid = || TransportError::InvalidEndpoint(format!("{}:{}", self.address, self.port));
        (self.address.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| invalid())?
            .next()
            .ok_or_else(invalid)
    }
}

/// `[timing]`, all in seconds.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingSection {
    /// Age after which an unacknowledged guaranteed packet is re-issued.
    pub resend_after_secs: f64,
    /// Minimum interval between two state packets.
    pub send_interval_secs: f64,
    /// Silence after which a remote tank is evicted.
    pub stale_timeout_secs: f64,
    /// How long the firing effect stays visible.
    pub fire_effect_secs: f64,
    /// Re-issues per packet before giving up. `0` retries forever.
    pub max_resends: u32,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            resend_after_secs: SECONDS_BEFORE_RESEND_GUARANTEED_PACKET,
            send_interval_secs: SECONDS_BEFORE_SEND_UPDATE_PACKET,
            stale_timeout_secs: SECONDS_BEFORE_TIMEOUT_REMOVE,
            fire_effect_secs: SECONDS_FIRE_EFFECT_VISIBLE,
            max_resends: MAX_GUARANTEED_RESENDS,
        }
    }
}

/// `[arena]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArenaSection {
    /// Width in world units.
    pub width: f32,
    /// Height in world units.
    pub height: f32,
}

impl Default for ArenaSection {
    fn default() -> Self {
        Self {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
        }
    }
}

/// `[rooms]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoomsSection {
    /// Players per room.
    pub capacity: u8,
}

impl Default for RoomsSection {
    fn default() -> Self {
        Self {
            capacity: MAX_PLAYERS_PER_ROOM,
        }
    }
}

/// `[movement]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MovementSection {
    /// Drive speed (units per second).
    pub speed: f32,
    /// Turn rate (degrees per second).
    pub turn_rate: f32,
}

impl Default for MovementSection {
    fn default() -> Self {
        Self {
            speed: TANK_SPEED_UNITS_PER_SECOND,
            turn_rate: TANK_ROTATION_DEGREES_PER_SECOND,
        }
    }
}

impl SyncConfig {
    /// Loads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// I/O, parse or validation failure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Parse or validation failure.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("timing.resend_after_secs", self.timing.resend_after_secs),
            ("timing.send_interval_secs", self.timing.send_interval_secs),
            ("timing.stale_timeout_secs", self.timing.stale_timeout_secs),
            ("timing.fire_effect_secs", self.timing.fire_effect_secs),
            ("arena.width", f64::from(self.arena.width)),
            ("arena.height", f64::from(self.arena.height)),
            ("movement.speed", f64::from(self.movement.speed)),
            ("movement.turn_rate", f64::from(self.movement.turn_rate)),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if self.rooms.capacity == 0 {
            return Err(ConfigError::Invalid("rooms.capacity must be at least 1".to_owned()));
        }
        if self.endpoint.address.is_empty() {
            return Err(ConfigError::Invalid("endpoint.address is empty".to_owned()));
        }
        Ok(())
    }

    /// Reliability settings.
    #[must_use]
    pub const fn reliability_config(&self) -> ReliabilityConfig {
        ReliabilityConfig {
            resend_after: self.timing.resend_after_secs,
            max_resends: if self.timing.max_resends == 0 {
                None
            } else {
                Some(self.timing.max_resends)
            },
        }
    }

    /// Replication settings.
    #[must_use]
    pub const fn replication_config(&self) -> ReplicationConfig {
        ReplicationConfig {
            arena_width: self.arena.width,
            arena_height: self.arena.height,
            stale_timeout: self.timing.stale_timeout_secs,
        }
    }

    /// Local movement settings.
    #[must_use]
    pub const fn movement_config(&self) -> MovementConfig {
        MovementConfig {
            speed: self.movement.speed,
            turn_rate: self.movement.turn_rate,
        }
    }
}
