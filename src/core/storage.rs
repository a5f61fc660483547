
use crate::error::PhysicsError;
use crate::Result;

/// Generic storage trait for physics objects
pub trait Storage<T, H> {
    /// Creates a new empty storage
    fn new() -> Self;

    /// Adds an item to the storage and returns its handle
    fn add(&mut self, item: T) -> H;

    /// Gets a reference to an item by its handle
    fn get(&self, handle: H) -> Option<&T>;

    /// Gets a mutable reference to an item by its handle
    fn get_mut(&mut self, handle: H) -> Option<&mut T>;

    /// Removes an item from the storage
    fn remove(&mut self, handle: H) -> Option<T>;

    /// Returns the number of items in the storage
    fn len(&self) -> usize;

    /// Returns whether the storage is empty
    fn is_empty(&self) -> bool;

    /// Clears all items from the storage
    fn clear(&mut self);

    /// Returns all live handles in insertion order
    fn handles(&self) -> Vec<H>;

    /// Returns an iterator over all items
    fn iter<'a>(&'a self) -> impl Iterator<Item = (H, &'a T)> + 'a
    where
        T: 'a;

    /// Returns a mutable iterator over all items
    fn iter_mut<'a>(&'a mut self) -> impl Iterator<Item = (H, &'a mut T)> + 'a
    where
        T: 'a;
}

/// Slot-based arena keyed by `u32` handles
///
/// Handles are never reused, and iteration visits items in creation
/// order, which keeps stepping deterministic run to run.
#[derive(Debug)]
struct SlotArena<T> {
    slots: Vec<(u32, Option<T>)>,
    next_id: u32,
    len: usize,
}

impl<T> SlotArena<T> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_id: 1, // Start at 1, so 0 can represent an invalid handle
            len: 0,
        }
    }

    fn add(&mut self, item: T) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.slots.push((id, Some(item)));
        self.len += 1;
        id
    }

    fn position(&self, id: u32) -> Option<usize> {
        // Handles are strictly increasing, so binary search applies.
        self.slots.binary_search_by_key(&id, |(slot_id, _)| *slot_id).ok()
    }

    fn get(&self, id: u32) -> Option<&T> {
        self.position(id).and_then(|i| self.slots[i].1.as_ref())
    }

    fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        match self.position(id) {
            Some(i) => self.slots[i].1.as_mut(),
            None => None,
        }
    }

    fn remove(&mut self, id: u32) -> Option<T> {
        let i = self.position(id)?;
        let item = self.slots[i].1.take();
        if item.is_some() {
            self.len -= 1;
        }

        // Compact once the dead-slot overhead dominates.
        if self.len * 2 < self.slots.len() {
            self.slots.retain(|(_, slot)| slot.is_some());
        }

        item
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.len = 0;
    }

    fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slots
            .iter()
            .filter_map(|(id, slot)| slot.as_ref().map(|item| (*id, item)))
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.slots
            .iter_mut()
            .filter_map(|(id, slot)| slot.as_mut().map(|item| (*id, item)))
    }
}

macro_rules! handle_storage {
    ($name:ident, $handle:ident, $label:literal, $getter:ident, $getter_mut:ident) => {
        /// Storage for physics objects addressed by a typed handle
        #[derive(Debug)]
        pub struct $name<T> {
            arena: SlotArena<T>,
        }

        impl<T> Storage<T, crate::core::$handle> for $name<T> {
            fn new() -> Self {
                Self {
                    arena: SlotArena::new(),
                }
            }

            fn add(&mut self, item: T) -> crate::core::$handle {
                crate::core::$handle(self.arena.add(item))
            }

            fn get(&self, handle: crate::core::$handle) -> Option<&T> {
                self.arena.get(handle.0)
            }

            fn get_mut(&mut self, handle: crate::core::$handle) -> Option<&mut T> {
                self.arena.get_mut(handle.0)
            }

            fn remove(&mut self, handle: crate::core::$handle) -> Option<T> {
                self.arena.remove(handle.0)
            }

            fn len(&self) -> usize {
                self.arena.len
            }

            fn is_empty(&self) -> bool {
                self.arena.len == 0
            }

            fn clear(&mut self) {
                self.arena.clear();
            }

            fn handles(&self) -> Vec<crate::core::$handle> {
                self.arena.iter().map(|(id, _)| crate::core::$handle(id)).collect()
            }

            fn iter<'a>(&'a self) -> impl Iterator<Item = (crate::core::$handle, &'a T)> + 'a
            where
                T: 'a,
            {
                self.arena.iter().map(|(id, item)| (crate::core::$handle(id), item))
            }

            fn iter_mut<'a>(
                &'a mut self,
            ) -> impl Iterator<Item = (crate::core::$handle, &'a mut T)> + 'a
            where
                T: 'a,
            {
                self.arena
                    .iter_mut()
                    .map(|(id, item)| (crate::core::$handle(id), item))
            }
        }

        impl<T> $name<T> {
            /// Gets an item by its handle, returning an error if not found
            pub fn $getter(&self, handle: crate::core::$handle) -> Result<&T> {
                self.get(handle).ok_or_else(|| {
                    PhysicsError::ResourceNotFound(format!(
                        concat!($label, " with handle {:?} not found"),
                        handle
                    ))
                })
            }

            /// Gets an item mutably by its handle, returning an error if not found
            pub fn $getter_mut(&mut self, handle: crate::core::$handle) -> Result<&mut T> {
                self.get_mut(handle).ok_or_else(|| {
                    PhysicsError::ResourceNotFound(format!(
                        concat!($label, " with handle {:?} not found"),
                        handle
                    ))
                })
            }
        }
    };
}

handle_storage!(BodyStorage, BodyHandle, "Body", get_body, get_body_mut);
handle_storage!(JointStorage, JointHandle, "Joint", get_joint, get_joint_mut);
handle_storage!(ContactStorage, ContactHandle, "Contact", get_contact, get_contact_mut);
