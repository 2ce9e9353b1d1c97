#![forbid(unsafe_code)]

//! Fixed-capacity, ordered registry of on-screen notifications.
//!
//! Entries live in a generation-checked arena; the on-screen order is a
//! separate list of keys, top of the stack first.
//!
//! # Invariants
//!
//! 1. `len() <= capacity()`; the arena never grows after construction.
//! 2. Task-bound entries occupy a contiguous suffix of the order (bottom of
//!    the stack). Plain entries are inserted just above that suffix; task
//!    entries are appended at the very bottom.
//! 3. A key resolves only while its slot holds the generation it was issued
//!    with. Removing an entry bumps the generation, so stale keys resolve to
//!    nothing instead of to a recycled entry.
//! 4. Removal compacts the order by shifting later entries up.

use toastline_anim::Tag;

/// Generation-checked handle to a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationKey {
    index: u32,
    generation: u32,
}

impl NotificationKey {
    /// Slot index inside the arena.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation the key was issued with.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Cancellation tag shared by every animation and timer of this entry.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> Tag {
        Tag::new(((self.generation as u64) << 32) | self.index as u64)
    }
}

struct Slot<T> {
    generation: u32,
    task_bound: bool,
    value: Option<T>,
}

/// Ordered arena of live notifications.
pub struct Registry<T> {
    slots: Vec<Slot<T>>,
    order: Vec<NotificationKey>,
    free: Vec<u32>,
    task_count: usize,
}

impl<T> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("capacity", &self.slots.len())
            .field("order", &self.order)
            .field("task_count", &self.task_count)
            .finish()
    }
}

impl<T> Registry<T> {
    /// Create a registry holding at most `capacity` entries (at least 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let slots = (0..capacity)
            .map(|_| Slot {
                generation: 0,
                task_bound: false,
                value: None,
            })
            .collect();
        // Pop order hands out low indices first.
        let free = (0..capacity as u32).rev().collect();
        Self {
            slots,
            order: Vec::with_capacity(capacity),
            free,
            task_count: 0,
        }
    }

    /// Maximum number of entries.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no entry is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether admission would be refused.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.order.len() >= self.slots.len()
    }

    /// Length of the task-bound suffix.
    #[inline]
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.task_count
    }

    /// Keys in stack order, top first.
    #[inline]
    #[must_use]
    pub fn keys(&self) -> &[NotificationKey] {
        &self.order
    }

    /// Admit `value`, returning its key and stack position.
    ///
    /// Task-bound entries (or any entry while no task is on screen) go to the
    /// bottom; plain entries go just above the task suffix. Returns the value
    /// back when the registry is full.
    pub fn insert(&mut self, value: T, task_bound: bool) -> Result<(NotificationKey, usize), T> {
        let Some(index) = self.free.pop() else {
            return Err(value);
        };
        let slot = &mut self.slots[index as usize];
        slot.value = Some(value);
        slot.task_bound = task_bound;
        let key = NotificationKey {
            index,
            generation: slot.generation,
        };

        let position = if task_bound || self.task_count == 0 {
            self.order.len()
        } else {
            self.order.len() - self.task_count
        };
        self.order.insert(position, key);
        if task_bound {
            self.task_count += 1;
        }
        Ok((key, position))
    }

    /// Remove an entry. Stale or unknown keys are a no-op.
    pub fn remove(&mut self, key: NotificationKey) -> Option<T> {
        let slot = self.slot_mut(key)?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        let task_bound = std::mem::take(&mut slot.task_bound);

        if let Some(pos) = self.order.iter().position(|k| *k == key) {
            self.order.remove(pos);
        }
        if task_bound {
            self.task_count -= 1;
        }
        self.free.push(key.index);
        Some(value)
    }

    /// Whether `key` still resolves.
    #[must_use]
    pub fn contains(&self, key: NotificationKey) -> bool {
        self.get(key).is_some()
    }

    /// Resolve a key.
    #[must_use]
    pub fn get(&self, key: NotificationKey) -> Option<&T> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Resolve a key mutably.
    #[must_use]
    pub fn get_mut(&mut self, key: NotificationKey) -> Option<&mut T> {
        self.slot_mut(key)?.value.as_mut()
    }

    /// Whether the entry behind `key` is task-bound.
    #[must_use]
    pub fn is_task_bound(&self, key: NotificationKey) -> bool {
        self.get(key).is_some() && self.slots[key.index as usize].task_bound
    }

    /// Stack position of `key`, top first.
    #[must_use]
    pub fn position(&self, key: NotificationKey) -> Option<usize> {
        self.order.iter().position(|k| *k == key)
    }

    /// Entries in stack order, top first.
    pub fn iter(&self) -> impl Iterator<Item = (NotificationKey, &T)> + '_ {
        self.order
            .iter()
            .filter_map(move |&key| self.get(key).map(|value| (key, value)))
    }

    /// Remove every entry, handing each to `release` in stack order.
    pub fn clear_with(&mut self, mut release: impl FnMut(NotificationKey, T)) {
        while let Some(&key) = self.order.first() {
            match self.remove(key) {
                Some(value) => release(key, value),
                None => {
                    self.order.remove(0);
                }
            }
        }
    }

    fn slot_mut(&mut self, key: NotificationKey) -> Option<&mut Slot<T>> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        Some(slot)
    }
}
