// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Synchronous change notification.
//!
//! Handlers are keyed by `(owner, property)`. Dispatch takes a snapshot of
//! the handler list first, so a handler may subscribe, unsubscribe or write
//! properties while it runs.

use alloc::rc::Rc;
use core::hash::Hash;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::id::{Property, PropertyId};
use crate::priority::Priority;
use crate::value::ErasedValue;

/// A change of an effective value.
#[derive(Clone, Debug)]
pub struct PropertyChange<K> {
    /// Owner whose effective value changed.
    pub owner: K,
    /// The property that changed.
    pub property: PropertyId,
    /// Effective value before the change.
    pub old: ErasedValue,
    /// Effective value after the change; already installed when handlers run.
    pub new: ErasedValue,
    /// Tier that produces the new value.
    pub priority: Priority,
}

impl<K> PropertyChange<K> {
    /// Returns `true` if this change is for `property`.
    #[must_use]
    #[inline]
    pub fn is<T>(&self, property: Property<T>) -> bool {
        self.property == property.id()
    }

    /// Returns the old value as a `T`.
    #[must_use]
    pub fn old_value<T: 'static>(&self) -> Option<&T> {
        self.old.downcast_ref()
    }

    /// Returns the new value as a `T`.
    #[must_use]
    pub fn new_value<T: 'static>(&self) -> Option<&T> {
        self.new.downcast_ref()
    }
}

/// Handle returned by [`ChangeNotifier::subscribe`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

/// A change handler. `C` is the context handed to the handler, usually the
/// tree that owns the notifier.
pub type ChangeHandler<K, C> = Rc<dyn Fn(&mut C, &PropertyChange<K>)>;

type HandlerList<K, C> = SmallVec<[(SubscriptionId, ChangeHandler<K, C>); 1]>;

/// Subscriptions keyed by `(owner, property)`.
///
/// ```rust
/// use understory_property_store::{
///     ChangeNotifier, ErasedValue, Priority, PropertyChange, PropertyMetadataBuilder,
///     PropertyRegistry,
/// };
///
/// let mut registry = PropertyRegistry::new();
/// let property = registry
///     .register("Control", "Width", PropertyMetadataBuilder::new(0_i32).build())
///     .id();
/// let mut notifier = ChangeNotifier::<u32, Vec<i32>>::new();
/// let id = notifier.subscribe(7, property, |log: &mut Vec<i32>, change: &PropertyChange<u32>| {
///     log.push(*change.new_value::<i32>().unwrap());
/// });
///
/// let change = PropertyChange {
///     owner: 7,
///     property,
///     old: ErasedValue::new(0_i32),
///     new: ErasedValue::new(5_i32),
///     priority: Priority::LocalValue,
/// };
/// let mut log = Vec::new();
/// notifier.dispatch(&mut log, &change);
/// assert_eq!(log, [5]);
///
/// assert!(notifier.unsubscribe(id));
/// notifier.dispatch(&mut log, &change);
/// assert_eq!(log, [5]);
/// ```
pub struct ChangeNotifier<K, C> {
    next_id: u32,
    handlers: HashMap<(K, PropertyId), HandlerList<K, C>>,
    keys: HashMap<SubscriptionId, (K, PropertyId)>,
}

impl<K: Copy + Eq + Hash, C> Default for ChangeNotifier<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Eq + Hash, C> ChangeNotifier<K, C> {
    /// Creates a notifier with no subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            handlers: HashMap::new(),
            keys: HashMap::new(),
        }
    }

    /// Registers `handler` for changes of `property` on `owner`.
    pub fn subscribe<F>(&mut self, owner: K, property: PropertyId, handler: F) -> SubscriptionId
    where
        F: Fn(&mut C, &PropertyChange<K>) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.handlers
            .entry((owner, property))
            .or_default()
            .push((id, Rc::new(handler)));
        self.keys.insert(id, (owner, property));
        id
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let Some(key) = self.keys.remove(&id) else {
            return false;
        };
        if let Some(list) = self.handlers.get_mut(&key) {
            list.retain(|(sid, _)| *sid != id);
            if list.is_empty() {
                self.handlers.remove(&key);
            }
        }
        true
    }

    /// Removes every subscription of `owner`.
    pub fn remove_owner(&mut self, owner: K) {
        self.handlers.retain(|(key, _), _| *key != owner);
        self.keys.retain(|_, (key, _)| *key != owner);
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if there are no subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns `true` if anything listens to `property` on `owner`.
    #[must_use]
    pub fn has_subscribers(&self, owner: K, property: PropertyId) -> bool {
        self.handlers.contains_key(&(owner, property))
    }

    /// Clones the current handler list for `(owner, property)`.
    #[must_use]
    pub fn snapshot(&self, owner: K, property: PropertyId) -> SmallVec<[ChangeHandler<K, C>; 2]> {
        self.handlers
            .get(&(owner, property))
            .map(|list| list.iter().map(|(_, handler)| handler.clone()).collect())
            .unwrap_or_default()
    }

    /// Calls every handler subscribed to the change's owner and property.
    pub fn dispatch(&self, context: &mut C, change: &PropertyChange<K>) {
        for handler in self.snapshot(change.owner, change.property) {
            handler(context, change);
        }
    }
}

impl<K, C> core::fmt::Debug for ChangeNotifier<K, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscriptions", &self.keys.len())
            .field("keys", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn change(owner: u32, property: PropertyId, new: i32) -> PropertyChange<u32> {
        PropertyChange {
            owner,
            property,
            old: ErasedValue::new(0_i32),
            new: ErasedValue::new(new),
            priority: Priority::LocalValue,
        }
    }

    #[test]
    fn dispatch_reaches_only_matching_subscribers() {
        let a = PropertyId::unregistered(0);
        let b = PropertyId::unregistered(1);
        let mut notifier = ChangeNotifier::<u32, Vec<(u32, i32)>>::new();
        notifier.subscribe(1, a, |log, change| log.push((1, *change.new_value::<i32>().unwrap())));
        notifier.subscribe(2, a, |log, change| log.push((2, *change.new_value::<i32>().unwrap())));
        notifier.subscribe(1, b, |log, _| log.push((99, 0)));

        let mut log = Vec::new();
        notifier.dispatch(&mut log, &change(1, a, 5));
        assert_eq!(log, [(1, 5)]);
        assert_eq!(notifier.len(), 3);
    }

    #[test]
    fn handlers_run_in_subscription_order() {
        let a = PropertyId::unregistered(0);
        let mut notifier = ChangeNotifier::<u32, Vec<u8>>::new();
        notifier.subscribe(1, a, |log, _| log.push(1));
        notifier.subscribe(1, a, |log, _| log.push(2));
        let mut log = Vec::new();
        notifier.dispatch(&mut log, &change(1, a, 0));
        assert_eq!(log, [1, 2]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let a = PropertyId::unregistered(0);
        let mut notifier = ChangeNotifier::<u32, ()>::new();
        let id = notifier.subscribe(1, a, |_, _| {});
        assert!(notifier.has_subscribers(1, a));
        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        assert!(!notifier.has_subscribers(1, a));
        assert!(notifier.is_empty());
    }

    #[test]
    fn snapshot_survives_unsubscribe() {
        let a = PropertyId::unregistered(0);
        let mut notifier = ChangeNotifier::<u32, Vec<u8>>::new();
        let id = notifier.subscribe(1, a, |log, _| log.push(1));
        let snapshot = notifier.snapshot(1, a);
        notifier.unsubscribe(id);

        let mut log = Vec::new();
        for handler in snapshot {
            handler(&mut log, &change(1, a, 0));
        }
        assert_eq!(log, [1]);
    }

    #[test]
    fn remove_owner_drops_all_of_its_subscriptions() {
        let a = PropertyId::unregistered(0);
        let b = PropertyId::unregistered(1);
        let mut notifier = ChangeNotifier::<u32, ()>::new();
        notifier.subscribe(1, a, |_, _| {});
        notifier.subscribe(1, b, |_, _| {});
        let kept = notifier.subscribe(2, a, |_, _| {});
        notifier.remove_owner(1);
        assert_eq!(notifier.len(), 1);
        assert!(!notifier.has_subscribers(1, a));
        assert!(notifier.unsubscribe(kept));
    }

    #[test]
    fn typed_accessors() {
        let a = PropertyId::unregistered(3);
        let change = change(1, a, 9);
        assert!(change.is(Property::<i32>::from_id(a)));
        assert_eq!(change.old_value::<i32>(), Some(&0));
        assert_eq!(change.new_value::<f64>(), None);
    }
}
