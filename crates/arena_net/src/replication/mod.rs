//! # Entity Replication
//!
//! Keeps the local view of every tank in the arena.
//!
//! ## Ownership
//!
//! - Exactly one **local** tank, owned and integrated here
//! - Any number of **remote** tanks, owned by their senders and only
//!   extrapolated here between snapshots
//!
//! The local tank is stored apart from the remote arena, so no sweep over
//! remote tanks (extrapolation, eviction) can ever touch it.
//!
//! ## Dead Reckoning
//!
//! ```text
//! position(now) = p0 + v*dt + 0.5*a*dt²     dt = now - epoch
//! ```
//!
//! The epoch only moves when a snapshot actually changes `p0`, `v` or `a`;
//! a redundant snapshot must not restart the extrapolation.

mod arena;
mod entity;

use arena_shared::constants::{SECONDS_BEFORE_TIMEOUT_REMOVE, TANK_STARTING_HEALTH};
use arena_shared::{clamp_to_arena, normalize_degrees, Vec2, ARENA_HEIGHT, ARENA_WIDTH};
use tracing::{debug, trace};

pub use arena::EntityArena;
pub use entity::{Entity, EntityId};

use crate::protocol::UpdateBody;

/// Arena bounds and liveness tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReplicationConfig {
    /// Arena width (x in `[0, width]`).
    pub arena_width: f32,
    /// Arena height (y in `[0, height]`).
    pub arena_height: f32,
    /// Silence (seconds) after which a remote tank is evicted.
    pub stale_timeout: f64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            arena_width: ARENA_WIDTH,
            arena_height: ARENA_HEIGHT,
            stale_timeout: SECONDS_BEFORE_TIMEOUT_REMOVE,
        }
    }
}

impl ReplicationConfig {
    /// Clamps `position` into the arena.
    #[inline]
    #[must_use]
    pub fn clamp(&self, position: Vec2) -> Vec2 {
        clamp_to_arena(position, self.arena_width, self.arena_height)
    }

    /// Arena center.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.arena_width * 0.5, self.arena_height * 0.5)
    }
}

/// What a snapshot did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// First snapshot for this id; a tank was created.
    Spawned,
    /// Kinematics changed; the dead-reckoning epoch moved.
    Updated,
    /// Same kinematics as before; only non-kinematic fields and liveness
    /// were refreshed.
    Refreshed,
    /// The snapshot carried the local id and was dropped.
    IgnoredLocal,
    /// Non-finite kinematics; dropped with no state change.
    Rejected,
}

/// The set of tanks.
#[derive(Clone, Debug)]
pub struct EntityReplicationManager {
    config: ReplicationConfig,
    local: Entity,
    remotes: EntityArena<Entity>,
}

impl EntityReplicationManager {
    /// Creates a manager holding only the local tank (id 0, arena center).
    #[must_use]
    pub fn new(config: ReplicationConfig) -> Self {
        Self {
            local: Entity::new(EntityId(0), config.center(), 0.0, 0.0),
            remotes: EntityArena::with_capacity(usize::from(arena_shared::MAX_PLAYERS_PER_ROOM)),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    /// The local tank.
    #[must_use]
    pub const fn local(&self) -> &Entity {
        &self.local
    }

    /// The local tank, mutably.
    pub fn local_mut(&mut self) -> &mut Entity {
        &mut self.local
    }

    /// Id currently assigned to the local tank.
    #[must_use]
    pub const fn local_id(&self) -> EntityId {
        self.local.id
    }

    /// A remote tank.
    #[must_use]
    pub fn remote(&self, id: EntityId) -> Option<&Entity> {
        self.remotes.get(id)
    }

    /// All remote tanks, in stable slot order.
    pub fn remotes(&self) -> impl Iterator<Item = &Entity> {
        self.remotes.iter().map(|(_, entity)| entity)
    }

    /// Number of remote tanks.
    #[must_use]
    pub fn remote_count(&self) -> usize {
        self.remotes.len()
    }

    /// Any tank, local or remote.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        if id == self.local.id {
            Some(&self.local)
        } else {
            self.remotes.get(id)
        }
    }

    fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if id == self.local.id {
            Some(&mut self.local)
        } else {
            self.remotes.get_mut(id)
        }
    }

    /// Applies a remote snapshot from `sender`.
    pub fn apply_snapshot(&mut self, sender: EntityId, body: &UpdateBody, now: f64) -> SnapshotOutcome {
        if !body.has_finite_kinematics() {
            debug!(%sender, "snapshot with non-finite kinematics rejected");
            return SnapshotOutcome::Rejected;
        }
        if sender == self.local.id {
            trace!(%sender, "snapshot echoing the local id ignored");
            return SnapshotOutcome::IgnoredLocal;
        }

        let Some(entity) = self.remotes.get_mut(sender) else {
            debug!(id = %sender, x = body.position.x, y = body.position.y, "remote tank spawned");
            self.remotes.insert(sender, Entity::from_snapshot(sender, body, now));
            return SnapshotOutcome::Spawned;
        };

        let changed = entity.kinematics_differ(body);
        if changed {
            entity.snapshot_position = body.position;
            entity.position = body.position;
            entity.velocity = body.velocity;
            entity.acceleration = body.acceleration;
            entity.snapshot_time = now;
        }
        entity.orientation = normalize_degrees(body.orientation);
        entity.health = body.health;
        entity.score = body.score;
        entity.last_heard = now;

        if changed {
            SnapshotOutcome::Updated
        } else {
            SnapshotOutcome::Refreshed
        }
    }

    /// Moves every remote tank to its dead-reckoned position at `now`,
    /// clamped to the arena. Idempotent for a fixed `now`.
    pub fn extrapolate(&mut self, now: f64) {
        let config = self.config;
        for (_, entity) in self.remotes.iter_mut() {
            entity.position = config.clamp(entity.extrapolated_position(now));
        }
    }

    /// Evicts remote tanks silent for longer than the timeout and returns
    /// their ids.
    pub fn evict_stale(&mut self, now: f64) -> Vec<EntityId> {
        let timeout = self.config.stale_timeout;
        let evicted = self
            .remotes
            .remove_where(|_, entity| now - entity.last_heard > timeout);
        for id in &evicted {
            debug!(%id, "remote tank timed out");
        }
        evicted
    }

    /// Applies damage. Returns false if the target is unknown.
    pub fn apply_hit(&mut self, target: EntityId, damage: u8) -> bool {
        let Some(entity) = self.entity_mut(target) else {
            trace!(%target, "hit on unknown tank ignored");
            return false;
        };
        entity.health = entity.health.saturating_sub(damage);
        true
    }

    /// Starts the firing effect. Returns false if the instigator is
    /// unknown.
    pub fn apply_fire(&mut self, instigator: EntityId, now: f64) -> bool {
        let Some(entity) = self.entity_mut(instigator) else {
            trace!(%instigator, "fire from unknown tank ignored");
            return false;
        };
        entity.last_fire = Some(now);
        true
    }

    /// Respawns the local tank: new pose, zero motion, fresh epoch.
    pub fn apply_respawn(&mut self, position: Vec2, orientation: f32, now: f64) {
        let position = self.config.clamp(position);
        let local = &mut self.local;
        local.position = position;
        local.snapshot_position = position;
        local.velocity = Vec2::ZERO;
        local.acceleration = Vec2::ZERO;
        local.orientation = normalize_degrees(orientation);
        local.health = TANK_STARTING_HEALTH;
        local.snapshot_time = now;
        local.last_heard = now;
    }

    /// Takes the id and pose assigned by a `GameReset`.
    ///
    /// A remote tank already holding `id` is dropped; there is only one
    /// owner per id.
    pub fn adopt_local(&mut self, id: EntityId, position: Vec2, orientation: f32, now: f64) {
        if self.remotes.remove(id).is_some() {
            debug!(%id, "remote tank displaced by local id");
        }
        self.local = Entity::new(id, self.config.clamp(position), orientation, now);
    }

    /// Drops every remote tank.
    pub fn clear_remote(&mut self) {
        self.remotes.clear();
    }

    /// Back to the unassigned state: no remotes, local tank id 0 at the
    /// arena center.
    pub fn reset(&mut self) {
        self.remotes.clear();
        self.local = Entity::new(EntityId(0), self.config.center(), 0.0, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(position: Vec2, velocity: Vec2) -> UpdateBody {
        UpdateBody::new(position, velocity, Vec2::ZERO, 0.0, 1, 0)
    }

    fn manager() -> EntityReplicationManager {
        EntityReplicationManager::new(ReplicationConfig::default())
    }

    #[test]
    fn test_snapshot_creates_then_updates() {
        let mut manager = manager();
        let body = update(Vec2::new(10.0, 20.0), Vec2::new(1.0, 0.0));

        assert_eq!(manager.apply_snapshot(EntityId(7), &body, 0.0), SnapshotOutcome::Spawned);
        assert_eq!(manager.remote_count(), 1);
        assert_eq!(manager.apply_snapshot(EntityId(7), &body, 1.0), SnapshotOutcome::Refreshed);

        let turned = UpdateBody { velocity: Vec2::new(0.0, 1.0), ..body };
        assert_eq!(manager.apply_snapshot(EntityId(7), &turned, 1.5), SnapshotOutcome::Updated);
        assert_eq!(manager.remote(EntityId(7)).map(|e| e.snapshot_time), Some(1.5));
    }

    #[test]
    fn test_redundant_snapshot_keeps_epoch() {
        let mut manager = manager();
        let body = update(Vec2::new(10.0, 20.0), Vec2::new(1.0, 0.0));
        manager.apply_snapshot(EntityId(7), &body, 0.0);
        manager.apply_snapshot(EntityId(7), &body, 1.0);

        manager.extrapolate(2.0);
        assert_eq!(manager.remote(EntityId(7)).map(|e| e.position), Some(Vec2::new(12.0, 20.0)));
    }

    #[test]
    fn test_extrapolate_idempotent_and_clamped() {
        let mut manager = manager();
        manager.apply_snapshot(EntityId(3), &update(Vec2::new(490.0, 5.0), Vec2::new(10.0, -10.0)), 0.0);

        manager.extrapolate(3.0);
        let first = manager.remote(EntityId(3)).map(|e| e.position);
        manager.extrapolate(3.0);
        let second = manager.remote(EntityId(3)).map(|e| e.position);

        assert_eq!(first, second);
        assert_eq!(first, Some(Vec2::new(500.0, 0.0)));
    }

    #[test]
    fn test_local_entity_not_extrapolated() {
        let mut manager = manager();
        manager.local_mut().velocity = Vec2::new(50.0, 0.0);
        let before = manager.local().position;
        manager.extrapolate(10.0);
        assert_eq!(manager.local().position, before);
    }

    #[test]
    fn test_eviction_threshold() {
        let mut manager = manager();
        let body = update(Vec2::new(1.0, 1.0), Vec2::ZERO);
        manager.apply_snapshot(EntityId(1), &body, 0.0);
        manager.apply_snapshot(EntityId(2), &body, 0.0);
        manager.apply_snapshot(EntityId(2), &body, 1.0);

        assert!(manager.evict_stale(4.99).is_empty());
        assert_eq!(manager.evict_stale(5.01), vec![EntityId(1)]);
        assert!(manager.remote(EntityId(2)).is_some());
        assert_eq!(manager.evict_stale(6.01), vec![EntityId(2)]);
    }

    #[test]
    fn test_local_never_evicted() {
        let mut manager = manager();
        assert!(manager.evict_stale(1_000.0).is_empty());
        assert_eq!(manager.local_id(), EntityId(0));
    }

    #[test]
    fn test_hit_and_fire() {
        let mut manager = manager();
        manager.apply_snapshot(EntityId(4), &update(Vec2::ZERO, Vec2::ZERO), 0.0);

        assert!(manager.apply_hit(EntityId(4), 5));
        assert_eq!(manager.remote(EntityId(4)).map(|e| e.health), Some(0));
        assert!(!manager.apply_hit(EntityId(9), 1));

        assert!(manager.apply_fire(EntityId(4), 2.0));
        assert!(!manager.apply_fire(EntityId(9), 2.0));
        assert!(manager.remote(EntityId(4)).is_some_and(|e| e.is_firing(2.1, 0.25)));

        // The local tank is a valid target too
        assert!(manager.apply_hit(manager.local_id(), 1));
        assert!(manager.local().is_destroyed());
    }

    #[test]
    fn test_respawn_resets_local_only() {
        let mut manager = manager();
        manager.apply_snapshot(EntityId(4), &update(Vec2::ZERO, Vec2::new(1.0, 1.0)), 0.0);
        manager.local_mut().velocity = Vec2::new(3.0, 3.0);
        manager.local_mut().health = 0;

        manager.apply_respawn(Vec2::new(40.0, 50.0), 270.0, 9.0);

        let local = manager.local();
        assert_eq!(local.position, Vec2::new(40.0, 50.0));
        assert_eq!(local.velocity, Vec2::ZERO);
        assert_eq!(local.orientation, -90.0);
        assert_eq!(local.snapshot_time, 9.0);
        assert_eq!(local.health, TANK_STARTING_HEALTH);
        assert_eq!(manager.remote(EntityId(4)).map(|e| e.velocity), Some(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn test_adopt_local_displaces_remote() {
        let mut manager = manager();
        manager.apply_snapshot(EntityId(5), &update(Vec2::ZERO, Vec2::ZERO), 0.0);
        manager.adopt_local(EntityId(5), Vec2::new(100.0, 100.0), 45.0, 1.0);

        assert_eq!(manager.local_id(), EntityId(5));
        assert_eq!(manager.remote_count(), 0);
        assert_eq!(manager.local().position, Vec2::new(100.0, 100.0));

        // Snapshots echoing our own id do not spawn a ghost
        let outcome = manager.apply_snapshot(EntityId(5), &update(Vec2::ZERO, Vec2::ZERO), 2.0);
        assert_eq!(outcome, SnapshotOutcome::IgnoredLocal);
        assert_eq!(manager.remote_count(), 0);
    }

    #[test]
    fn test_non_finite_snapshot_rejected() {
        let mut manager = manager();
        let runaway = update(Vec2::new(10.0, 20.0), Vec2::new(f32::INFINITY, 0.0));
        assert_eq!(manager.apply_snapshot(EntityId(7), &runaway, 0.0), SnapshotOutcome::Rejected);
        assert_eq!(manager.remote_count(), 0);

        let body = update(Vec2::new(10.0, 20.0), Vec2::new(1.0, 0.0));
        manager.apply_snapshot(EntityId(7), &body, 0.0);
        let lost = update(Vec2::new(f32::NAN, 20.0), Vec2::ZERO);
        let drifting = UpdateBody { acceleration: Vec2::new(0.0, f32::NEG_INFINITY), ..body };
        assert_eq!(manager.apply_snapshot(EntityId(7), &lost, 1.0), SnapshotOutcome::Rejected);
        assert_eq!(manager.apply_snapshot(EntityId(7), &drifting, 1.0), SnapshotOutcome::Rejected);

        // Nothing moved, not even the liveness clock
        let remote = manager.remote(EntityId(7)).cloned();
        assert_eq!(remote.as_ref().map(|e| e.snapshot_position), Some(Vec2::new(10.0, 20.0)));
        assert_eq!(remote.as_ref().map(|e| e.velocity), Some(Vec2::new(1.0, 0.0)));
        assert_eq!(remote.map(|e| e.last_heard), Some(0.0));
    }

    #[test]
    fn test_extrapolation_stays_in_arena_for_extreme_motion() {
        let mut manager = manager();
        let fast = update(Vec2::new(250.0, 250.0), Vec2::new(f32::MAX, -f32::MAX));
        manager.apply_snapshot(EntityId(2), &fast, 0.0);

        for now in [0.0, 1.0, 1.0e30] {
            manager.extrapolate(now);
            let position = manager.remote(EntityId(2)).map(|e| e.position);
            assert!(position.is_some_and(|p| (0.0..=500.0).contains(&p.x) && (0.0..=500.0).contains(&p.y)));
        }
    }

    #[test]
    fn test_reset_returns_local_to_unassigned() {
        let mut manager = manager();
        manager.adopt_local(EntityId(3), Vec2::new(10.0, 10.0), 90.0, 1.0);
        manager.apply_snapshot(EntityId(4), &update(Vec2::ZERO, Vec2::ZERO), 1.0);

        manager.reset();
        assert_eq!(manager.local_id(), EntityId(0));
        assert_eq!(manager.local().position, Vec2::new(250.0, 250.0));
        assert_eq!(manager.remote_count(), 0);
    }

    #[test]
    fn test_clear_remote() {
        let mut manager = manager();
        for id in 1..5 {
            manager.apply_snapshot(EntityId(id), &update(Vec2::ZERO, Vec2::ZERO), 0.0);
        }
        manager.clear_remote();
        assert_eq!(manager.remote_count(), 0);
        assert_eq!(manager.local_id(), EntityId(0));
    }
}
