//! Stable identities for objects that carry no caller-assigned key.
//!
//! List rows are keyed by the domain object behind them rather than by their position
//! or domain id, so a re-created object mounts as a fresh row (and can be focused)
//! while an edited one keeps its widget state.

use std::collections::HashMap;
use std::rc::{Rc, Weak};
use uuid::Uuid;

struct Slot {
    key: String,
    alive: Box<dyn Fn() -> bool>,
}

/// Reference-identity keyed side table, scoped to the component owning it.
#[derive(Default)]
pub struct KeyRegistry {
    slots: HashMap<usize, Slot>,
}

impl std::fmt::Debug for KeyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRegistry")
            .field("len", &self.slots.len())
            .finish()
    }
}

impl KeyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the key of `object`, allocating one on first sight.
    ///
    /// Objects are compared by reference: two distinct allocations holding equal
    /// values get different keys.
    pub fn get_key<T: ?Sized + 'static>(&mut self, object: &Rc<T>) -> String {
        let address = Rc::as_ptr(object) as *const () as usize;
        if let Some(slot) = self.slots.get(&address) {
            if (slot.alive)() {
                return slot.key.clone();
            }
        }
        let weak: Weak<T> = Rc::downgrade(object);
        let key = Uuid::new_v4().to_string();
        self.slots.insert(
            address,
            Slot {
                key: key.clone(),
                alive: Box::new(move || weak.strong_count() > 0),
            },
        );
        key
    }

    /// Forgets objects that have been dropped since they were keyed.
    pub fn prune(&mut self) {
        self.slots.retain(|_, slot| (slot.alive)());
    }

    /// Number of objects currently keyed.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no object has been keyed.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::cell::RefCell;

    #[test]
    fn same_reference_gets_same_key() {
        let mut registry = KeyRegistry::new();
        let object = Rc::new(RefCell::new(String::from("mapping")));
        let first = registry.get_key(&object);
        object.borrow_mut().push_str("-edited");
        assert_eq!(registry.get_key(&Rc::clone(&object)), first);
    }

    #[test]
    fn equal_values_in_distinct_allocations_get_distinct_keys() {
        let mut registry = KeyRegistry::new();
        let a = Rc::new(42u32);
        let b = Rc::new(42u32);
        assert_ne!(registry.get_key(&a), registry.get_key(&b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn trait_objects_are_keyed_by_their_allocation() {
        let mut registry = KeyRegistry::new();
        let concrete = Rc::new(7i64);
        let erased: Rc<dyn Any> = concrete.clone();
        let key = registry.get_key(&erased);
        assert_eq!(registry.get_key(&erased), key);
        assert_eq!(registry.get_key(&concrete), key);
    }

    #[test]
    fn prune_drops_dead_objects_only() {
        let mut registry = KeyRegistry::new();
        let kept = Rc::new(1u8);
        let dropped = Rc::new(2u8);
        let kept_key = registry.get_key(&kept);
        registry.get_key(&dropped);
        drop(dropped);

        registry.prune();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_key(&kept), kept_key);
    }
}
