use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use thiserror::Error;

/// Errors raised when storing into an [`Arena`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    #[error("arena is full at {limit} slots")]
    Full { limit: u32 },
}

/// A stable, generation-checked handle into an [`Arena`].
///
/// A handle stays valid until its entry is removed. After removal the slot may
/// be reused, but the old handle no longer resolves because the slot's
/// generation has moved on.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Returns the slot index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Returns the generation the handle was issued for.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.index, self.generation).cmp(&(other.index, other.generation))
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage addressed by [`Handle`]s.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    limit: u32,
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::with_slot_limit(u32::MAX)
    }

    /// Creates an empty arena that never grows past `limit` slots.
    #[must_use]
    pub fn with_slot_limit(limit: u32) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            limit,
        }
    }

    /// Stores a value and returns its handle.
    ///
    /// Freed slots are reused before new ones are added.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Full`] if no slot is free and the arena has
    /// reached its slot limit.
    pub fn try_insert(&mut self, value: T) -> Result<Handle<T>, ArenaError> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            self.len += 1;
            return Ok(Handle::new(index, slot.generation));
        }

        let index = u32::try_from(self.slots.len())
            .ok()
            .filter(|&index| index < self.limit)
            .ok_or(ArenaError::Full { limit: self.limit })?;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        self.len += 1;
        Ok(Handle::new(index, 0))
    }

    /// Stores a value and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if the arena is full. Use [`Arena::try_insert`] where the slot
    /// limit can be reached.
    pub fn insert(&mut self, value: T) -> Handle<T> {
        match self.try_insert(value) {
            Ok(handle) => handle,
            Err(error) => panic!("{error}"),
        }
    }

    /// Removes a value, invalidating its handle.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(value)
    }

    #[must_use]
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Returns `true` if the handle resolves to a live entry.
    #[must_use]
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Returns mutable references to several distinct entries at once.
    ///
    /// Returns `None` if any handle is stale or if a handle appears twice.
    pub fn get_disjoint_mut(&mut self, handles: &[Handle<T>]) -> Option<Vec<&mut T>> {
        let mut order: Vec<usize> = (0..handles.len()).collect();
        order.sort_by_key(|&i| handles[i].index);
        if order
            .windows(2)
            .any(|w| handles[w[0]].index == handles[w[1]].index)
        {
            return None;
        }

        let mut found: Vec<Option<&mut T>> = handles.iter().map(|_| None).collect();
        let mut wanted = order.into_iter().peekable();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(&i) = wanted.peek() else { break };
            if handles[i].index() != index {
                continue;
            }
            wanted.next();
            if slot.generation != handles[i].generation {
                return None;
            }
            found[i] = slot.value.as_mut();
        }
        found.into_iter().collect()
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over live entries with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            #[allow(clippy::cast_possible_truncation)]
            let handle = Handle::new(index as u32, slot.generation);
            slot.value.as_ref().map(|value| (handle, value))
        })
    }

    /// Removes every entry for which `keep` returns `false`.
    pub fn retain(&mut self, mut keep: impl FnMut(Handle<T>, &T) -> bool) {
        let doomed: Vec<Handle<T>> = self
            .iter()
            .filter(|(handle, value)| !keep(*handle, value))
            .map(|(handle, _)| handle)
            .collect();
        for handle in doomed {
            self.remove(handle);
        }
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
