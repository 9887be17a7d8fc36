// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-owner sparse ladder storage.
//!
//! # Implementation
//!
//! Ladders live in a `SmallVec` sorted by [`PropertyId`] and are found by
//! binary search, following the `WinUI` `vector_map` approach: contiguous
//! memory, no hash buckets, and O(log n) lookup for the handful of
//! properties a typical element sets. A ladder exists only while at least
//! one of its tiers is occupied.

use smallvec::SmallVec;

use crate::cell::ValueCell;
use crate::error::PropertyError;
use crate::id::{Property, PropertyId};
use crate::inherit::{ParentLookup, Resolved, resolve_inherited};
use crate::ladder::PriorityLadder;
use crate::priority::{AnimationClock, Priority};
use crate::registry::PropertyRegistry;
use crate::value::ErasedValue;

/// Inline capacity for ladders.
///
/// Most elements set fewer than four properties, so this avoids heap
/// allocation in the common case.
const INLINE_CAPACITY: usize = 4;

/// Report that a mutation affected the top of a ladder.
///
/// Returned only when the written or cleared tier was, or became, the top.
/// The caller turns it into an effective-value change by filling in the
/// inherited/default fallback for whichever side has no cell.
#[derive(Clone, Debug)]
pub struct Transition {
    /// The top cell before the mutation, `None` if the ladder was empty.
    pub old: Option<ValueCell>,
    /// The top tier after the mutation, `None` if the ladder is now empty.
    pub new: Option<Priority>,
}

/// Per-owner registry of [`PriorityLadder`]s.
///
/// # Example
///
/// ```rust
/// use understory_property_store::{PropertyMetadataBuilder, PropertyRegistry, ValueStore};
///
/// let mut registry = PropertyRegistry::new();
/// let width = registry.register(
///     "Control",
///     "Width",
///     PropertyMetadataBuilder::new(0.0_f64).build(),
/// );
///
/// let mut store = ValueStore::new(1_u32);
/// store.set_local_value(&registry, width, 100.0).unwrap();
/// assert_eq!(store.get_local(width), Some(&100.0));
/// assert_eq!(store.len(), 1);
///
/// // Clearing the only cell reclaims the ladder.
/// store.clear_local_value(&registry, width).unwrap();
/// assert!(store.is_empty());
/// let detached = |_: u32| None::<(&ValueStore<u32>, Option<u32>)>;
/// assert_eq!(store.get_effective_value(&registry, width, None, &detached).unwrap(), 0.0);
/// ```
#[derive(Clone, Debug)]
pub struct ValueStore<K> {
    /// Ladders sorted by [`PropertyId`].
    ladders: SmallVec<[(PropertyId, PriorityLadder); INLINE_CAPACITY]>,
    owner: K,
}

impl<K: Copy + Eq> ValueStore<K> {
    /// Creates an empty store for `owner`.
    #[must_use]
    pub fn new(owner: K) -> Self {
        Self {
            ladders: SmallVec::new(),
            owner,
        }
    }

    /// Returns the owner key.
    #[must_use]
    #[inline]
    pub fn owner(&self) -> K {
        self.owner
    }

    /// Returns the number of properties with at least one cell.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.ladders.len()
    }

    /// Returns `true` if no property has a cell.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ladders.is_empty()
    }

    /// Iterates properties with at least one cell, in id order.
    pub fn property_ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.ladders.iter().map(|(id, _)| *id)
    }

    #[inline]
    fn find(&self, id: PropertyId) -> Result<usize, usize> {
        self.ladders.binary_search_by_key(&id, |(pid, _)| *pid)
    }

    /// Returns the ladder for a property, if any tier is occupied.
    #[must_use]
    pub fn ladder(&self, id: PropertyId) -> Option<&PriorityLadder> {
        self.find(id).ok().map(|idx| &self.ladders[idx].1)
    }

    fn ladder_mut(&mut self, id: PropertyId) -> &mut PriorityLadder {
        let idx = match self.find(id) {
            Ok(idx) => idx,
            Err(idx) => {
                self.ladders.insert(idx, (id, PriorityLadder::new()));
                idx
            }
        };
        &mut self.ladders[idx].1
    }

    /// Returns the value at `tier`, if set.
    #[must_use]
    pub fn get<T: Clone + 'static>(&self, property: Property<T>, tier: Priority) -> Option<&T> {
        self.ladder(property.id())
            .and_then(|ladder| ladder.get(tier))
            .and_then(|cell| cell.read().downcast_ref())
    }

    /// Returns the local value, if set.
    #[must_use]
    #[inline]
    pub fn get_local<T: Clone + 'static>(&self, property: Property<T>) -> Option<&T> {
        self.get(property, Priority::LocalValue)
    }

    /// Returns `true` if the property has a cell at `tier`.
    #[must_use]
    pub fn has_value(&self, id: PropertyId, tier: Priority) -> bool {
        self.ladder(id).is_some_and(|ladder| ladder.get(tier).is_some())
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Writes a typed value at `tier`.
    ///
    /// The value is coerced and validated by the property's metadata first;
    /// on error nothing is written.
    pub fn set_value<T: Clone + PartialEq + 'static>(
        &mut self,
        registry: &PropertyRegistry,
        property: Property<T>,
        tier: Priority,
        value: T,
    ) -> Result<Option<Transition>, PropertyError> {
        let value = prepare_typed(registry, property, value)?;
        Ok(self.write_typed(property.id(), tier, value, None))
    }

    /// Writes an animation value driven by `clock`.
    pub fn animate<T: Clone + PartialEq + 'static>(
        &mut self,
        registry: &PropertyRegistry,
        property: Property<T>,
        value: T,
        clock: AnimationClock,
    ) -> Result<Option<Transition>, PropertyError> {
        let value = prepare_typed(registry, property, value)?;
        Ok(self.write_typed(property.id(), Priority::Animation, value, Some(clock)))
    }

    /// Writes an erased value at `tier`, checking its type against the
    /// registration.
    pub fn set_value_erased(
        &mut self,
        registry: &PropertyRegistry,
        id: PropertyId,
        tier: Priority,
        value: ErasedValue,
    ) -> Result<Option<Transition>, PropertyError> {
        let value = registry.registration(id)?.prepare(value)?;
        let ladder = self.ladder_mut(id);
        let old = ladder
            .reaches_top(tier)
            .then(|| ladder.effective().cloned())
            .flatten();
        Ok(ladder.set(tier, value).then(|| Transition {
            old,
            new: Some(tier),
        }))
    }

    /// Sets the local value; see [`set_value`](Self::set_value).
    pub fn set_local_value<T: Clone + PartialEq + 'static>(
        &mut self,
        registry: &PropertyRegistry,
        property: Property<T>,
        value: T,
    ) -> Result<Option<Transition>, PropertyError> {
        self.set_value(registry, property, Priority::LocalValue, value)
    }

    /// Clears the cell at `tier`, reclaiming the ladder once it is empty.
    ///
    /// Clearing an empty tier is a no-op and returns `Ok(None)`.
    pub fn clear_value(
        &mut self,
        registry: &PropertyRegistry,
        id: PropertyId,
        tier: Priority,
    ) -> Result<Option<Transition>, PropertyError> {
        registry.registration(id)?;
        let Ok(idx) = self.find(id) else {
            return Ok(None);
        };
        let ladder = &mut self.ladders[idx].1;
        let was_top = ladder.is_top(tier);
        let transition = match ladder.clear(tier) {
            Some(cell) if was_top => Some(Transition {
                old: Some(cell),
                new: ladder.effective().map(ValueCell::priority),
            }),
            _ => None,
        };
        if ladder.is_empty() {
            self.ladders.remove(idx);
        }
        Ok(transition)
    }

    /// Clears the local value; see [`clear_value`](Self::clear_value).
    pub fn clear_local_value<T>(
        &mut self,
        registry: &PropertyRegistry,
        property: Property<T>,
    ) -> Result<Option<Transition>, PropertyError> {
        self.clear_value(registry, property.id(), Priority::LocalValue)
    }

    /// Clears every animation cell driven by `clock`.
    ///
    /// Returns the transitions of the properties whose top was affected.
    pub fn clear_clock(
        &mut self,
        clock: AnimationClock,
    ) -> SmallVec<[(PropertyId, Transition); 1]> {
        let mut transitions = SmallVec::new();
        self.ladders.retain(|(id, ladder)| {
            let was_top = ladder.is_top(Priority::Animation);
            if let Some(cell) = ladder.clear_clock(clock)
                && was_top
            {
                transitions.push((
                    *id,
                    Transition {
                        old: Some(cell),
                        new: ladder.effective().map(ValueCell::priority),
                    },
                ));
            }
            !ladder.is_empty()
        });
        transitions
    }

    /// Installs a cell without consulting the registry.
    pub(crate) fn put_cell(&mut self, id: PropertyId, cell: ValueCell) {
        self.ladder_mut(id).insert(cell);
    }

    /// Removes a cell without consulting the registry, reclaiming an emptied
    /// ladder.
    pub(crate) fn take_cell(&mut self, id: PropertyId, tier: Priority) -> Option<ValueCell> {
        let idx = self.find(id).ok()?;
        let cell = self.ladders[idx].1.clear(tier);
        if self.ladders[idx].1.is_empty() {
            self.ladders.remove(idx);
        }
        cell
    }

    pub(crate) fn write_typed<T: Clone + 'static>(
        &mut self,
        id: PropertyId,
        tier: Priority,
        value: T,
        clock: Option<AnimationClock>,
    ) -> Option<Transition> {
        let ladder = self.ladder_mut(id);
        let old = ladder
            .reaches_top(tier)
            .then(|| ladder.effective().cloned())
            .flatten();
        ladder.set_typed(tier, value, clock).then(|| Transition {
            old,
            new: Some(tier),
        })
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolves the effective value without cloning.
    ///
    /// Order: the highest cell above [`Priority::Default`]; then, for an
    /// inheriting property, the nearest ancestor's offer starting at
    /// `parent`; then this owner's [`Priority::Default`] cell; then the
    /// registered default.
    pub fn effective<'a, F>(
        &'a self,
        registry: &'a PropertyRegistry,
        id: PropertyId,
        parent: Option<K>,
        parents: &F,
    ) -> Result<Resolved<'a>, PropertyError>
    where
        F: ParentLookup<'a, K> + ?Sized,
    {
        let registration = registry.registration(id)?;
        let ladder = self.ladder(id);
        if let Some(cell) = ladder.and_then(|l| l.top_above(Priority::Default)) {
            return Ok(Resolved {
                value: cell.read(),
                priority: cell.priority(),
            });
        }
        if registration.inherits()
            && let Some(value) = resolve_inherited(parent, id, parents)?
        {
            return Ok(Resolved {
                value,
                priority: Priority::Inherited,
            });
        }
        let value = ladder
            .and_then(|l| l.get(Priority::Default))
            .map_or(registration.default_value(), ValueCell::read);
        Ok(Resolved {
            value,
            priority: Priority::Default,
        })
    }

    /// Resolves and clones the effective value.
    ///
    /// `parent` is this owner's parent key and `parents` resolves ancestors;
    /// pass `None` and a lookup returning `None` for a detached owner.
    pub fn get_effective_value<'a, T, F>(
        &'a self,
        registry: &'a PropertyRegistry,
        property: Property<T>,
        parent: Option<K>,
        parents: &F,
    ) -> Result<T, PropertyError>
    where
        T: Clone + 'static,
        F: ParentLookup<'a, K> + ?Sized,
    {
        let resolved = self.effective(registry, property.id(), parent, parents)?;
        resolved
            .value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| PropertyError::TypeMismatch {
                property: registry.name(property.id()).unwrap_or("<unknown>"),
                expected: resolved.value.type_name(),
                found: core::any::type_name::<T>(),
            })
    }
}

/// Coerces and validates a typed value against its registration.
pub(crate) fn prepare_typed<T: Clone + PartialEq + 'static>(
    registry: &PropertyRegistry,
    property: Property<T>,
    value: T,
) -> Result<T, PropertyError> {
    let metadata = registry.metadata(property)?;
    let value = metadata.coerce(value);
    if metadata.validate(&value) {
        Ok(value)
    } else {
        Err(PropertyError::InvalidValue {
            property: registry.name(property.id()).unwrap_or("<unknown>"),
        })
    }
}
