//! # Entity Arena
//!
//! Slot storage addressed by [`EntityId`].
//!
//! Removing an entity frees its slot for reuse; other slots never move, so
//! iteration order stays stable while entities come and go and removal in
//! the middle of a sweep is always safe.

use std::collections::HashMap;

use super::entity::EntityId;

/// Slot storage for values keyed by id.
#[derive(Clone, Debug)]
pub struct EntityArena<T> {
    /// The storage array.
    slots: Vec<Option<(EntityId, T)>>,
    /// Free list - indices of vacated slots.
    free_list: Vec<usize>,
    /// Id to slot index.
    by_id: HashMap<EntityId, usize>,
}

impl<T> Default for EntityArena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            by_id: HashMap::new(),
        }
    }
}

impl<T> EntityArena<T> {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty arena with room for `capacity` entities.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            by_id: HashMap::with_capacity(capacity),
        }
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if there are no live entities.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Returns true if `id` is live.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Stores `value` under `id`, reusing a vacated slot when possible.
    ///
    /// Returns the previous value if `id` was already live; it is replaced
    /// in place.
    pub fn insert(&mut self, id: EntityId, value: T) -> Option<T> {
        if let Some(&index) = self.by_id.get(&id) {
            return self.slots[index]
                .replace((id, value))
                .map(|(_, previous)| previous);
        }

        let index = match self.free_list.pop() {
            Some(index) => {
                self.slots[index] = Some((id, value));
                index
            }
            None => {
                self.slots.push(Some((id, value)));
                self.slots.len() - 1
            }
        };
        self.by_id.insert(id, index);
        None
    }

    /// Removes `id`, returning its value.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let index = self.by_id.remove(&id)?;
        let (_, value) = self.slots.get_mut(index)?.take()?;
        self.free_list.push(index);
        Some(value)
    }

    /// Gets a reference by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        let index = *self.by_id.get(&id)?;
        self.slots.get(index)?.as_ref().map(|(_, value)| value)
    }

    /// Gets a mutable reference by id.
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        let index = *self.by_id.get(&id)?;
        self.slots.get_mut(index)?.as_mut().map(|(_, value)| value)
    }

    /// Removes every entity for which `remove` returns true and returns
    /// their ids in slot order.
    pub fn remove_where<F>(&mut self, mut remove: F) -> Vec<EntityId>
    where
        F: FnMut(EntityId, &T) -> bool,
    {
        let mut removed = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some((id, value)) = slot {
                let id = *id;
                if remove(id, value) {
                    removed.push(id);
                    self.by_id.remove(&id);
                    *slot = None;
                    self.free_list.push(index);
                }
            }
        }
        removed
    }

    /// Clears all entities. Capacity is kept.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.by_id.clear();
    }

    /// Iterates over live entities in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref().map(|(id, value)| (*id, value)))
    }

    /// Iterates mutably over live entities in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.slots
            .iter_mut()
            .filter_map(|slot| slot.as_mut().map(|(id, value)| (*id, value)))
    }

    /// Ids of live entities in slot order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.iter().map(|(id, _)| id)
    }
}
