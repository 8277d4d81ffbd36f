//! Replicated tank state.

use std::fmt;

use arena_shared::constants::{TANK_RENDER_HEIGHT, TANK_STARTING_HEALTH};
use arena_shared::{normalize_degrees, Color, Vec2, Vec3};

use crate::protocol::UpdateBody;

/// Participant id, stable for the length of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u8);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One tank.
///
/// `position` is what gets rendered. For remote tanks it is recomputed
/// every tick from `snapshot_position`, `velocity` and `acceleration` as
/// of `snapshot_time` (the dead-reckoning epoch).
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    /// Participant id.
    pub id: EntityId,
    /// Current (rendered) floor position.
    pub position: Vec2,
    /// Velocity (units per second).
    pub velocity: Vec2,
    /// Acceleration (units per second squared).
    pub acceleration: Vec2,
    /// Orientation in degrees, `[-180, 180)`.
    pub orientation: f32,
    /// Remaining health.
    pub health: u8,
    /// Score.
    pub score: u8,
    /// Palette color derived from the id.
    pub color: Color,
    /// Position carried by the last kinematic change.
    pub snapshot_position: Vec2,
    /// When the kinematics last changed (dead-reckoning epoch).
    pub snapshot_time: f64,
    /// When anything was last heard about this tank (liveness).
    pub last_heard: f64,
    /// When this tank last fired.
    pub last_fire: Option<f64>,
}

impl Entity {
    /// Creates a stationary tank at `position`.
    #[must_use]
    pub fn new(id: EntityId, position: Vec2, orientation: f32, now: f64) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            orientation: normalize_degrees(orientation),
            health: TANK_STARTING_HEALTH,
            score: 0,
            color: Color::for_id(id.0),
            snapshot_position: position,
            snapshot_time: now,
            last_heard: now,
            last_fire: None,
        }
    }

    /// Creates a tank from its first snapshot.
    #[must_use]
    pub fn from_snapshot(id: EntityId, body: &UpdateBody, now: f64) -> Self {
        let mut entity = Self::new(id, body.position, body.orientation, now);
        entity.velocity = body.velocity;
        entity.acceleration = body.acceleration;
        entity.health = body.health;
        entity.score = body.score;
        entity
    }

    /// Returns true if `body` carries different kinematics than the last
    /// snapshot applied.
    #[must_use]
    pub fn kinematics_differ(&self, body: &UpdateBody) -> bool {
        self.snapshot_position != body.position
            || self.velocity != body.velocity
            || self.acceleration != body.acceleration
    }

    /// Position predicted at `now` by constant-acceleration dead reckoning.
    ///
    /// Unclamped. Times before the epoch are treated as the epoch.
    #[must_use]
    pub fn extrapolated_position(&self, now: f64) -> Vec2 {
        let dt = (now - self.snapshot_time).max(0.0) as f32;
        self.snapshot_position + self.velocity * dt + self.acceleration * (0.5 * dt * dt)
    }

    /// Position in render space.
    #[must_use]
    pub const fn render_position(&self) -> Vec3 {
        self.position.extrude(TANK_RENDER_HEIGHT)
    }

    /// Returns true while the firing effect is visible.
    #[must_use]
    pub fn is_firing(&self, now: f64, effect_duration: f64) -> bool {
        self.last_fire
            .is_some_and(|fired| now >= fired && now - fired < effect_duration)
    }

    /// Snapshot body describing this tank.
    #[must_use]
    pub const fn to_snapshot(&self) -> UpdateBody {
        UpdateBody::new(
            self.position,
            self.velocity,
            self.acceleration,
            self.orientation,
            self.health,
            self.score,
        )
    }

    /// Is this tank destroyed?
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.health == 0
    }
}
