//! Input handling for the local tank.
//!
//! The host owns the real keyboard. It hands the sync engine anything that
//! implements [`InputSource`]; [`KeyboardState`] is a ready-made one that
//! tracks held keys and per-tick presses.

use arena_shared::constants::{TANK_ROTATION_DEGREES_PER_SECOND, TANK_SPEED_UNITS_PER_SECOND};
use arena_shared::{normalize_degrees, Vec2};

use crate::replication::{Entity, ReplicationConfig};

/// Logical tank controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Drive forward.
    Forward,
    /// Drive backward.
    Backward,
    /// Turn counter-clockwise.
    TurnLeft,
    /// Turn clockwise.
    TurnRight,
    /// Fire the laser.
    Fire,
}

/// Input query made once per tick.
pub trait InputSource {
    /// Returns true while `key` is down.
    fn is_key_held(&self, key: Key) -> bool;

    /// Returns true if `key` went down since the previous tick.
    fn was_key_pressed_this_tick(&self, key: Key) -> bool;
}

/// No keys, ever. For headless participants.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn is_key_held(&self, _key: Key) -> bool {
        false
    }

    fn was_key_pressed_this_tick(&self, _key: Key) -> bool {
        false
    }
}

/// Keyboard state for the current tick.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    /// Keys pressed this tick.
    keys_pressed: Vec<Key>,
    /// Keys currently held.
    keys_down: Vec<Key>,
}

impl KeyboardState {
    /// Creates a new empty keyboard state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a new tick, clearing per-tick presses.
    pub fn begin_tick(&mut self) {
        self.keys_pressed.clear();
    }

    /// Records a key press.
    pub fn key_down(&mut self, key: Key) {
        if !self.keys_down.contains(&key) {
            self.keys_pressed.push(key);
            self.keys_down.push(key);
        }
    }

    /// Records a key release.
    pub fn key_up(&mut self, key: Key) {
        self.keys_down.retain(|&k| k != key);
    }
}

impl InputSource for KeyboardState {
    fn is_key_held(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    fn was_key_pressed_this_tick(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }
}

/// Local tank handling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementConfig {
    /// Drive speed (units per second).
    pub speed: f32,
    /// Turn rate (degrees per second).
    pub turn_rate: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: TANK_SPEED_UNITS_PER_SECOND,
            turn_rate: TANK_ROTATION_DEGREES_PER_SECOND,
        }
    }
}

/// Turns input into local tank motion.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalController {
    config: MovementConfig,
}

impl LocalController {
    /// Creates a controller.
    #[must_use]
    pub const fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    /// Applies one tick of input to `local` and integrates its position.
    ///
    /// Returns true if fire was pressed this tick; firing itself is the
    /// caller's business.
    pub fn apply(
        &self,
        input: &dyn InputSource,
        local: &mut Entity,
        bounds: &ReplicationConfig,
        dt: f32,
    ) -> bool {
        let dt = dt.max(0.0);

        let mut orientation = local.orientation;
        if input.is_key_held(Key::TurnLeft) {
            orientation += self.config.turn_rate * dt;
        } else if input.is_key_held(Key::TurnRight) {
            orientation -= self.config.turn_rate * dt;
        }
        local.orientation = normalize_degrees(orientation);

        let speed = if input.is_key_held(Key::Forward) {
            self.config.speed
        } else if input.is_key_held(Key::Backward) {
            -self.config.speed
        } else {
            0.0
        };
        local.velocity = Vec2::from_angle_degrees(local.orientation) * speed;
        local.acceleration = Vec2::ZERO;
        local.position = bounds.clamp(local.position + local.velocity * dt);
        local.snapshot_position = local.position;

        input.was_key_pressed_this_tick(Key::Fire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::EntityId;

    fn local_at(x: f32, y: f32) -> Entity {
        Entity::new(EntityId(1), Vec2::new(x, y), 0.0, 0.0)
    }

    #[test]
    fn test_key_press_is_per_tick() {
        let mut keyboard = KeyboardState::new();
        keyboard.key_down(Key::Fire);
        assert!(keyboard.was_key_pressed_this_tick(Key::Fire));
        assert!(keyboard.is_key_held(Key::Fire));

        keyboard.begin_tick();
        assert!(!keyboard.was_key_pressed_this_tick(Key::Fire));
        assert!(keyboard.is_key_held(Key::Fire));

        // Repeat while held is not a new press
        keyboard.key_down(Key::Fire);
        assert!(!keyboard.was_key_pressed_this_tick(Key::Fire));

        keyboard.key_up(Key::Fire);
        assert!(!keyboard.is_key_held(Key::Fire));
    }

    #[test]
    fn test_drive_forward() {
        let controller = LocalController::default();
        let mut keyboard = KeyboardState::new();
        keyboard.key_down(Key::Forward);

        let mut local = local_at(100.0, 100.0);
        let fired = controller.apply(&keyboard, &mut local, &ReplicationConfig::default(), 0.5);

        assert!(!fired);
        assert_eq!(local.velocity, Vec2::new(100.0, 0.0));
        assert_eq!(local.position, Vec2::new(150.0, 100.0));
    }

    #[test]
    fn test_turning_wraps_orientation() {
        let controller = LocalController::default();
        let mut keyboard = KeyboardState::new();
        keyboard.key_down(Key::TurnLeft);

        let mut local = local_at(100.0, 100.0);
        local.orientation = 170.0;
        controller.apply(&keyboard, &mut local, &ReplicationConfig::default(), 0.5);
        assert!((local.orientation - (-145.0)).abs() < 1e-4);

        keyboard.key_up(Key::TurnLeft);
        keyboard.key_down(Key::TurnRight);
        controller.apply(&keyboard, &mut local, &ReplicationConfig::default(), 1.0);
        assert!((local.orientation - 125.0).abs() < 1e-4);
    }

    #[test]
    fn test_position_stays_in_arena() {
        let controller = LocalController::default();
        let mut keyboard = KeyboardState::new();
        keyboard.key_down(Key::Backward);

        let mut local = local_at(10.0, 10.0);
        controller.apply(&keyboard, &mut local, &ReplicationConfig::default(), 1.0);
        assert_eq!(local.position, Vec2::new(0.0, 10.0));
        assert_eq!(local.velocity, Vec2::new(-100.0, 0.0));
    }

    #[test]
    fn test_release_stops_tank() {
        let controller = LocalController::default();
        let mut local = local_at(10.0, 10.0);
        local.velocity = Vec2::new(5.0, 5.0);
        controller.apply(&NoInput, &mut local, &ReplicationConfig::default(), 1.0);
        assert_eq!(local.velocity, Vec2::ZERO);
        assert_eq!(local.position, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_fire_reported() {
        let controller = LocalController::default();
        let mut keyboard = KeyboardState::new();
        keyboard.key_down(Key::Fire);
        let mut local = local_at(10.0, 10.0);
        assert!(controller.apply(&keyboard, &mut local, &ReplicationConfig::default(), 0.1));
    }
}
