// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Inheritance resolution over an owner's ancestor chain.

use crate::error::PropertyError;
use crate::id::PropertyId;
use crate::priority::Priority;
use crate::store::ValueStore;
use crate::value::ErasedValue;

/// A lookup mechanism for walking parent chains.
///
/// Given an owner key, returns its [`ValueStore`] and its parent key.
/// Closures of the matching shape implement this trait.
pub trait ParentLookup<'a, K: Copy + Eq + 'a> {
    /// Looks up the store and parent key for `key`.
    fn lookup(&self, key: K) -> Option<(&'a ValueStore<K>, Option<K>)>;
}

impl<'a, K, F> ParentLookup<'a, K> for F
where
    K: Copy + Eq + 'a,
    F: Fn(K) -> Option<(&'a ValueStore<K>, Option<K>)>,
{
    #[inline]
    fn lookup(&self, key: K) -> Option<(&'a ValueStore<K>, Option<K>)> {
        self(key)
    }
}

/// An effective value together with the tier that produced it.
#[derive(Clone, Copy, Debug)]
pub struct Resolved<'a> {
    /// The effective payload.
    pub value: &'a ErasedValue,
    /// The tier that produced it; [`Priority::Inherited`] when it came from
    /// an ancestor and [`Priority::Default`] for the registered default.
    pub priority: Priority,
}

/// Walks the ancestor chain starting at `start` for an inherited value.
///
/// Each ancestor offers its highest cell above [`Priority::Default`]; an
/// ancestor's own [`Priority::Inherited`] cell is the value it cached from
/// further up, so the walk stops there too. Returns `Ok(None)` when no
/// ancestor offers anything.
///
/// A chain that loops back on itself is reported as
/// [`PropertyError::CyclicOwnership`] instead of spinning. Detection uses
/// Brent's algorithm, so keys only need `Eq`.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use understory_property_store::{
///     PropertyError, PropertyMetadataBuilder, PropertyRegistry, ValueStore, resolve_inherited,
/// };
///
/// let mut registry = PropertyRegistry::new();
/// let font_size = registry.register(
///     "TextBlock",
///     "FontSize",
///     PropertyMetadataBuilder::new(12.0_f64).inherits(true).build(),
/// );
///
/// let mut root = ValueStore::new(1_u32);
/// root.set_local_value(&registry, font_size, 16.0).unwrap();
/// let middle = ValueStore::new(2_u32);
///
/// let stores: HashMap<u32, (&ValueStore<u32>, Option<u32>)> =
///     [(1, (&root, None)), (2, (&middle, Some(1)))].into_iter().collect();
/// let found = resolve_inherited(Some(2), font_size.id(), &|key: u32| stores.get(&key).copied())
///     .unwrap()
///     .and_then(|value| value.downcast_ref::<f64>().copied());
/// assert_eq!(found, Some(16.0));
///
/// // A malformed chain (2 -> 3 -> 2) is reported, not followed forever.
/// let third = ValueStore::new(3_u32);
/// let cyclic: HashMap<u32, (&ValueStore<u32>, Option<u32>)> =
///     [(2, (&middle, Some(3))), (3, (&third, Some(2)))].into_iter().collect();
/// assert!(matches!(
///     resolve_inherited(Some(2), font_size.id(), &|key: u32| cyclic.get(&key).copied()),
///     Err(PropertyError::CyclicOwnership { .. })
/// ));
/// ```
pub fn resolve_inherited<'a, K, F>(
    start: Option<K>,
    id: PropertyId,
    parents: &F,
) -> Result<Option<&'a ErasedValue>, PropertyError>
where
    K: Copy + Eq + 'a,
    F: ParentLookup<'a, K> + ?Sized,
{
    let mut current = start;
    let mut anchor: Option<K> = None;
    let mut power = 1_usize;
    let mut lap = 0_usize;
    let mut steps = 0_usize;

    while let Some(key) = current {
        if anchor == Some(key) {
            tracing::warn!(?id, steps, "cyclic owner chain during inheritance walk");
            return Err(PropertyError::CyclicOwnership { steps });
        }
        let Some((store, parent)) = parents.lookup(key) else {
            break;
        };
        if let Some(cell) = store
            .ladder(id)
            .and_then(|ladder| ladder.top_above(Priority::Default))
        {
            return Ok(Some(cell.read()));
        }

        steps += 1;
        lap += 1;
        if lap == power {
            anchor = Some(key);
            power *= 2;
            lap = 0;
        }
        current = parent;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PropertyMetadataBuilder;
    use crate::registry::PropertyRegistry;
    use crate::Property;
    use alloc::collections::BTreeMap;
    use alloc::vec::Vec;

    fn setup() -> (PropertyRegistry, Property<f64>) {
        let mut registry = PropertyRegistry::new();
        let size = registry.register(
            "TextBlock",
            "FontSize",
            PropertyMetadataBuilder::new(12.0_f64).inherits(true).build(),
        );
        (registry, size)
    }

    fn chain(len: u32) -> Vec<ValueStore<u32>> {
        (0..len).map(ValueStore::new).collect()
    }

    fn found(result: Result<Option<&ErasedValue>, PropertyError>) -> Option<f64> {
        result
            .unwrap()
            .and_then(|value| value.downcast_ref::<f64>().copied())
    }

    #[test]
    fn nearest_ancestor_wins() {
        let (registry, size) = setup();
        let mut stores = chain(4);
        stores[0].set_local_value(&registry, size, 10.0).unwrap();
        stores[2].set_value(&registry, size, Priority::StyleBase, 20.0).unwrap();
        let lookup = |key: u32| {
            stores
                .get(key as usize)
                .map(|store| (store, key.checked_sub(1)))
        };
        assert_eq!(found(resolve_inherited(Some(3), size.id(), &lookup)), Some(20.0));
        assert_eq!(found(resolve_inherited(Some(1), size.id(), &lookup)), Some(10.0));
        assert_eq!(found(resolve_inherited(None, size.id(), &lookup)), None);
    }

    #[test]
    fn default_tier_cells_are_not_offered() {
        let (registry, size) = setup();
        let mut stores = chain(2);
        stores[0]
            .set_value(&registry, size, Priority::Default, 30.0)
            .unwrap();
        let lookup = |key: u32| {
            stores
                .get(key as usize)
                .map(|store| (store, key.checked_sub(1)))
        };
        assert_eq!(found(resolve_inherited(Some(0), size.id(), &lookup)), None);
    }

    #[test]
    fn cached_inherited_cells_short_circuit() {
        let (registry, size) = setup();
        let mut stores = chain(3);
        stores[0].set_local_value(&registry, size, 10.0).unwrap();
        stores[1]
            .set_value(&registry, size, Priority::Inherited, 11.0)
            .unwrap();
        let lookup = |key: u32| {
            stores
                .get(key as usize)
                .map(|store| (store, key.checked_sub(1)))
        };
        assert_eq!(found(resolve_inherited(Some(1), size.id(), &lookup)), Some(11.0));
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let (_, size) = setup();
        let store = ValueStore::new(7_u32);
        let lookup = |key: u32| (key == 7).then_some((&store, Some(7)));
        assert!(matches!(
            resolve_inherited(Some(7), size.id(), &lookup),
            Err(PropertyError::CyclicOwnership { .. })
        ));
    }

    #[test]
    fn long_cycles_behind_a_tail_are_detected() {
        let (_, size) = setup();
        let stores = chain(40);
        // 39 -> 38 -> ... -> 10 -> ... -> 0 -> 25 -> 24 -> ...
        let parents: BTreeMap<u32, u32> = (1..40).map(|k| (k, k - 1)).chain([(0, 25)]).collect();
        let lookup = |key: u32| {
            stores
                .get(key as usize)
                .map(|store| (store, parents.get(&key).copied()))
        };
        assert!(matches!(
            resolve_inherited(Some(39), size.id(), &lookup),
            Err(PropertyError::CyclicOwnership { .. })
        ));
    }

    #[test]
    fn a_value_inside_a_cycle_is_still_found() {
        let (registry, size) = setup();
        let mut stores = chain(3);
        stores[1].set_local_value(&registry, size, 5.0).unwrap();
        let lookup = |key: u32| {
            stores
                .get(key as usize)
                .map(|store| (store, Some((key + 1) % 3)))
        };
        assert_eq!(found(resolve_inherited(Some(2), size.id(), &lookup)), Some(5.0));
    }
}
