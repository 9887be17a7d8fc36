// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element tree: owners, parent links, and the write pipeline.
//!
//! Every write goes through the same steps: the value is validated and
//! coerced, the owner's ladder is updated, the old and new effective values
//! are compared, and on a change the property's changed callback and the
//! subscribers run. For inheriting properties the owner's offer is then
//! pushed down to its descendants.
//!
//! ## Inherited values
//!
//! Each owner caches what it inherits in its [`Priority::Inherited`] cell.
//! When an owner's offer changes, descendants are refreshed with a worklist
//! rather than recursion:
//!
//! - A child with a cell above [`Priority::Inherited`] is shielded. Its cache
//!   is refreshed silently and its subtree is skipped.
//! - Otherwise the child's cache is replaced or cleared, subscribers are told
//!   if its effective value changed, and its own children are queued.
//! - A child whose cache already holds the offer stops the walk.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use smallvec::SmallVec;

use crate::cell::ValueCell;
use crate::error::PropertyError;
use crate::id::{Property, PropertyId};
use crate::inherit::{Resolved, resolve_inherited};
use crate::ladder::PriorityLadder;
use crate::metadata::PropertyFlags;
use crate::notify::{ChangeNotifier, PropertyChange, SubscriptionId};
use crate::priority::{AnimationClock, Priority};
use crate::registry::{PropertyRegistration, PropertyRegistry};
use crate::store::{Transition, ValueStore};
use crate::value::ErasedValue;

/// Identifier for a node in an [`ElementTree`].
///
/// A slot index plus a generation counter. Removing a node frees its slot;
/// reusing the slot bumps the generation, so a stale `NodeId` never aliases
/// a different live node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(u32, u32);

impl NodeId {
    const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    type_name: &'static str,
    store: ValueStore<NodeId>,
    invalidation: PropertyFlags,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Invalidation bits a change can raise.
const INVALIDATION: PropertyFlags =
    PropertyFlags::AFFECTS_MEASURE.union(PropertyFlags::AFFECTS_RENDER);

/// An arena of owners, each with its own [`ValueStore`].
///
/// The tree is `!Send`: handlers are `Rc`, which confines a tree and its
/// subscriptions to the thread that built it.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use understory_property_store::{ElementTree, PropertyMetadataBuilder, PropertyRegistry};
///
/// let mut registry = PropertyRegistry::new();
/// let font_size = registry.register(
///     "TextBlock",
///     "FontSize",
///     PropertyMetadataBuilder::new(12.0_f64).inherits(true).build(),
/// );
///
/// let mut tree = ElementTree::new(Arc::new(registry));
/// let window = tree.insert("Window", None).unwrap();
/// let label = tree.insert("TextBlock", Some(window)).unwrap();
///
/// assert_eq!(tree.get_value(label, font_size).unwrap(), 12.0);
/// tree.set_local_value(window, font_size, 20.0).unwrap();
/// assert_eq!(tree.get_value(label, font_size).unwrap(), 20.0);
/// ```
pub struct ElementTree {
    registry: Arc<PropertyRegistry>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    notifier: ChangeNotifier<NodeId, Self>,
}

impl fmt::Debug for ElementTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementTree")
            .field("registry", &self.registry)
            .field("live", &self.live)
            .field("slots", &self.slots.len())
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

impl ElementTree {
    /// Creates an empty tree resolving against `registry`.
    #[must_use]
    pub fn new(registry: Arc<PropertyRegistry>) -> Self {
        Self {
            registry,
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Returns the registry this tree resolves against.
    #[must_use]
    pub fn registry(&self) -> &Arc<PropertyRegistry> {
        &self.registry
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if the tree has no live nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns `true` if `node` refers to a live node.
    #[must_use]
    pub fn is_alive(&self, node: NodeId) -> bool {
        self.get(node).is_some()
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.idx())
            .filter(|slot| slot.generation == id.1)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node(&self, id: NodeId) -> Result<&Node, PropertyError> {
        self.get(id).ok_or(PropertyError::StaleNode)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, PropertyError> {
        self.slots
            .get_mut(id.idx())
            .filter(|slot| slot.generation == id.1)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(PropertyError::StaleNode)
    }

    fn lookup(&self, key: NodeId) -> Option<(&ValueStore<NodeId>, Option<NodeId>)> {
        self.get(key).map(|node| (&node.store, node.parent))
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Inserts a node of `type_name`, optionally under `parent`.
    ///
    /// The new node picks up the inherited values its parent offers.
    pub fn insert(
        &mut self,
        type_name: &'static str,
        parent: Option<NodeId>,
    ) -> Result<NodeId, PropertyError> {
        if let Some(parent) = parent {
            self.node(parent)?;
        }
        let id = match self.free.pop() {
            Some(idx) => {
                let slot = &mut self.slots[idx as usize];
                slot.generation = slot.generation.wrapping_add(1);
                NodeId::new(idx, slot.generation)
            }
            None => {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "slot count is bounded by memory long before u32::MAX"
                )]
                let idx = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 1,
                    node: None,
                });
                NodeId::new(idx, 1)
            }
        };
        self.slots[id.idx()].node = Some(Node {
            parent,
            children: Vec::new(),
            type_name,
            store: ValueStore::new(id),
            invalidation: PropertyFlags::empty(),
        });
        self.live += 1;
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.push(id);
            self.adopt(id)?;
        }
        Ok(id)
    }

    /// Removes `node` and its whole subtree.
    ///
    /// Children are freed before their parents, together with their
    /// subscriptions. Ids of removed nodes become stale.
    pub fn remove(&mut self, node: NodeId) -> Result<(), PropertyError> {
        if let Some(parent) = self.node(node)?.parent
            && let Ok(parent) = self.node_mut(parent)
        {
            parent.children.retain(|child| *child != node);
        }

        let mut order = vec![node];
        let mut next = 0;
        while next < order.len() {
            let id = order[next];
            order.extend_from_slice(&self.node(id)?.children);
            next += 1;
        }
        for id in order.iter().rev() {
            self.slots[id.idx()].node = None;
            self.free.push(id.0);
            self.notifier.remove_owner(*id);
        }
        self.live -= order.len();
        tracing::debug!(?node, removed = order.len(), "removed subtree");
        Ok(())
    }

    /// Moves `node` under `parent`, or detaches it with `None`.
    ///
    /// Moving a node under itself or one of its descendants fails with
    /// [`PropertyError::CyclicOwnership`] and leaves the tree unchanged.
    /// Inherited values of the moved subtree are refreshed.
    pub fn set_parent(
        &mut self,
        node: NodeId,
        parent: Option<NodeId>,
    ) -> Result<(), PropertyError> {
        let old_parent = self.node(node)?.parent;
        let mut steps = 0;
        let mut cursor = parent;
        while let Some(ancestor) = cursor {
            if ancestor == node {
                tracing::warn!(?node, ?parent, "refused to parent a node under its own subtree");
                return Err(PropertyError::CyclicOwnership { steps });
            }
            steps += 1;
            cursor = self.node(ancestor)?.parent;
        }
        if old_parent == parent {
            return Ok(());
        }

        if let Some(old) = old_parent
            && let Ok(old) = self.node_mut(old)
        {
            old.children.retain(|child| *child != node);
        }
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.push(node);
        }
        self.node_mut(node)?.parent = parent;
        self.adopt(node)
    }

    /// Returns the parent of `node`.
    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>, PropertyError> {
        Ok(self.node(node)?.parent)
    }

    /// Returns the children of `node`, in insertion order.
    pub fn children(&self, node: NodeId) -> Result<&[NodeId], PropertyError> {
        Ok(&self.node(node)?.children)
    }

    /// Returns the owner type `node` was inserted with.
    pub fn type_name(&self, node: NodeId) -> Result<&'static str, PropertyError> {
        Ok(self.node(node)?.type_name)
    }

    /// Returns the value store of `node`.
    pub fn store(&self, node: NodeId) -> Result<&ValueStore<NodeId>, PropertyError> {
        Ok(&self.node(node)?.store)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Resolves the effective value of `property` on `node`.
    pub fn get_value<T: Clone + 'static>(
        &self,
        node: NodeId,
        property: Property<T>,
    ) -> Result<T, PropertyError> {
        let owner = self.node(node)?;
        owner.store.get_effective_value(
            &self.registry,
            property,
            owner.parent,
            &|key: NodeId| self.lookup(key),
        )
    }

    /// Resolves the effective value of `id` on `node` without cloning.
    pub fn effective(&self, node: NodeId, id: PropertyId) -> Result<Resolved<'_>, PropertyError> {
        let owner = self.node(node)?;
        owner
            .store
            .effective(&self.registry, id, owner.parent, &|key: NodeId| self.lookup(key))
    }

    /// Returns the tier that currently produces the effective value.
    pub fn value_source(&self, node: NodeId, id: PropertyId) -> Result<Priority, PropertyError> {
        Ok(self.effective(node, id)?.priority)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Writes `value` at `tier`.
    pub fn set_value<T: Clone + PartialEq + 'static>(
        &mut self,
        node: NodeId,
        property: Property<T>,
        tier: Priority,
        value: T,
    ) -> Result<(), PropertyError> {
        let registry = Arc::clone(&self.registry);
        let transition = self
            .node_mut(node)?
            .store
            .set_value(&registry, property, tier, value)?;
        self.after_write(&registry, node, property.id(), transition)
    }

    /// Writes a local value.
    pub fn set_local_value<T: Clone + PartialEq + 'static>(
        &mut self,
        node: NodeId,
        property: Property<T>,
        value: T,
    ) -> Result<(), PropertyError> {
        self.set_value(node, property, Priority::LocalValue, value)
    }

    /// Writes a type-erased value at `tier`, checking its type first.
    pub fn set_value_erased(
        &mut self,
        node: NodeId,
        id: PropertyId,
        tier: Priority,
        value: ErasedValue,
    ) -> Result<(), PropertyError> {
        let registry = Arc::clone(&self.registry);
        let transition = self
            .node_mut(node)?
            .store
            .set_value_erased(&registry, id, tier, value)?;
        self.after_write(&registry, node, id, transition)
    }

    /// Clears the cell at `tier`. Clearing an empty tier does nothing.
    pub fn clear_value(
        &mut self,
        node: NodeId,
        id: PropertyId,
        tier: Priority,
    ) -> Result<(), PropertyError> {
        let registry = Arc::clone(&self.registry);
        let transition = self.node_mut(node)?.store.clear_value(&registry, id, tier)?;
        self.after_write(&registry, node, id, transition)
    }

    /// Clears the local value.
    pub fn clear_local_value<T>(
        &mut self,
        node: NodeId,
        property: Property<T>,
    ) -> Result<(), PropertyError> {
        self.clear_value(node, property.id(), Priority::LocalValue)
    }

    /// Writes one animation tick.
    ///
    /// A tick that lands on top always notifies, even if the value repeats.
    pub fn animate<T: Clone + PartialEq + 'static>(
        &mut self,
        node: NodeId,
        property: Property<T>,
        value: T,
        clock: AnimationClock,
    ) -> Result<(), PropertyError> {
        let registry = Arc::clone(&self.registry);
        let transition = self
            .node_mut(node)?
            .store
            .animate(&registry, property, value, clock)?;
        self.after_write(&registry, node, property.id(), transition)
    }

    /// Releases the animation tier of one property.
    pub fn clear_animation(&mut self, node: NodeId, id: PropertyId) -> Result<(), PropertyError> {
        self.clear_value(node, id, Priority::Animation)
    }

    /// Releases every animation cell driven by `clock`, across the tree.
    pub fn stop_clock(&mut self, clock: AnimationClock) -> Result<(), PropertyError> {
        let registry = Arc::clone(&self.registry);
        let mut stopped = 0_usize;
        for idx in 0..self.slots.len() {
            let Some(node) = self.slots[idx].node.as_mut() else {
                continue;
            };
            let owner = node.store.owner();
            let transitions = node.store.clear_clock(clock);
            stopped += transitions.len();
            for (id, transition) in transitions {
                self.after_write(&registry, owner, id, Some(transition))?;
            }
        }
        tracing::debug!(clock = clock.0, stopped, "stopped animation clock");
        Ok(())
    }

    // =========================================================================
    // Subscriptions and invalidation
    // =========================================================================

    /// Subscribes `handler` to changes of `id` on `node`.
    ///
    /// The handler receives the tree itself and may read or write it.
    pub fn subscribe<F>(
        &mut self,
        node: NodeId,
        id: PropertyId,
        handler: F,
    ) -> Result<SubscriptionId, PropertyError>
    where
        F: Fn(&mut Self, &PropertyChange<NodeId>) + 'static,
    {
        self.node(node)?;
        Ok(self.notifier.subscribe(node, id, handler))
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Returns and resets the invalidation raised on `node` since the last
    /// call.
    pub fn take_invalidation(&mut self, node: NodeId) -> Result<PropertyFlags, PropertyError> {
        Ok(core::mem::take(&mut self.node_mut(node)?.invalidation))
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    fn after_write(
        &mut self,
        registry: &PropertyRegistry,
        node: NodeId,
        id: PropertyId,
        transition: Option<Transition>,
    ) -> Result<(), PropertyError> {
        let Some(transition) = transition else {
            return Ok(());
        };
        let Some(parent) = self.get(node).map(|owner| owner.parent) else {
            return Ok(());
        };
        let registration = registry.registration(id)?;
        let old = match transition.old {
            Some(cell) if cell.priority() > Priority::Default => cell.into_value(),
            default_cell => self.fallback(parent, id, registration, default_cell.as_ref())?,
        };
        self.settle(node, id, registration, old)?;
        if registration.inherits() {
            self.propagate(node, id, registration)?;
        }
        Ok(())
    }

    /// The effective value when no cell above [`Priority::Default`] applies.
    fn fallback(
        &self,
        parent: Option<NodeId>,
        id: PropertyId,
        registration: &PropertyRegistration,
        default_cell: Option<&ValueCell>,
    ) -> Result<ErasedValue, PropertyError> {
        if registration.inherits()
            && let Some(value) = resolve_inherited(parent, id, &|key: NodeId| self.lookup(key))?
        {
            return Ok(value.clone());
        }
        Ok(default_cell
            .map_or(registration.default_value(), ValueCell::read)
            .clone())
    }

    /// Compares `old` with the installed effective value and announces a
    /// change.
    fn settle(
        &mut self,
        node: NodeId,
        id: PropertyId,
        registration: &PropertyRegistration,
        old: ErasedValue,
    ) -> Result<(), PropertyError> {
        let resolved = self.effective(node, id)?;
        let priority = resolved.priority;
        if priority != Priority::Animation && registration.same_value(&old, resolved.value) {
            return Ok(());
        }
        let change = PropertyChange {
            owner: node,
            property: id,
            old,
            new: resolved.value.clone(),
            priority,
        };

        self.node_mut(node)?.invalidation |= registration.flags() & INVALIDATION;
        tracing::trace!(
            ?node,
            property = registration.name(),
            %priority,
            "effective value changed"
        );
        registration.notify_changed(&change.old, &change.new);
        for handler in self.notifier.snapshot(node, id) {
            handler(self, &change);
        }
        Ok(())
    }

    /// Pushes the offer of `root` down its subtree.
    fn propagate(
        &mut self,
        root: NodeId,
        id: PropertyId,
        registration: &PropertyRegistration,
    ) -> Result<(), PropertyError> {
        let mut pending = vec![root];
        while let Some(parent) = pending.pop() {
            // A handler may have removed it.
            let Some(owner) = self.get(parent) else {
                continue;
            };
            let children: SmallVec<[NodeId; 8]> = owner.children.iter().copied().collect();
            for child in children {
                // Handlers of earlier siblings may have changed the offer.
                let offer = self.parent_offer(child, id);
                if self.refresh_inherited(child, id, registration, offer.as_ref())? {
                    pending.push(child);
                }
            }
        }
        Ok(())
    }

    /// The offer of the current parent of `node`.
    fn parent_offer(&self, node: NodeId, id: PropertyId) -> Option<ErasedValue> {
        self.get(node)
            .and_then(|owner| owner.parent)
            .and_then(|parent| self.get(parent))
            .and_then(|parent| offer_of(&parent.store, id))
            .cloned()
    }

    /// Replaces the inherited cache of `node` with `offer`.
    ///
    /// Returns `true` if the cache changed and `node` is not shielded, so its
    /// own children need the new offer too.
    fn refresh_inherited(
        &mut self,
        node: NodeId,
        id: PropertyId,
        registration: &PropertyRegistration,
        offer: Option<&ErasedValue>,
    ) -> Result<bool, PropertyError> {
        let Some(owner) = self.get(node) else {
            return Ok(false);
        };
        let ladder = owner.store.ladder(id);
        let cached = ladder
            .and_then(|ladder| ladder.get(Priority::Inherited))
            .map(ValueCell::read);
        let unchanged = match (cached, offer) {
            (None, None) => true,
            (Some(cached), Some(offer)) => registration.same_value(cached, offer),
            _ => false,
        };
        if unchanged {
            return Ok(false);
        }
        let shielded = ladder
            .and_then(PriorityLadder::effective)
            .is_some_and(|cell| cell.priority().overrides_inheritance());
        let old = (!shielded).then(|| match cached {
            Some(cached) => cached.clone(),
            None => ladder
                .and_then(|ladder| ladder.get(Priority::Default))
                .map_or(registration.default_value(), ValueCell::read)
                .clone(),
        });

        let store = &mut self.node_mut(node)?.store;
        match offer {
            Some(offer) => store.put_cell(id, ValueCell::new(Priority::Inherited, offer.clone())),
            None => {
                store.take_cell(id, Priority::Inherited);
            }
        }
        tracing::trace!(
            ?node,
            property = registration.name(),
            shielded,
            "refreshed inherited value"
        );

        let Some(old) = old else {
            return Ok(false);
        };
        self.settle(node, id, registration, old)?;
        Ok(true)
    }

    /// Refreshes every inherited cache of `node` from its current parent.
    fn adopt(&mut self, node: NodeId) -> Result<(), PropertyError> {
        let registry = Arc::clone(&self.registry);
        self.node(node)?;
        for (id, registration) in registry.iter().filter(|(_, r)| r.inherits()) {
            let offer = self.parent_offer(node, id);
            if self.refresh_inherited(node, id, registration, offer.as_ref())? {
                self.propagate(node, id, registration)?;
            }
        }
        Ok(())
    }
}

/// What an owner passes down for an inheriting property.
fn offer_of(store: &ValueStore<NodeId>, id: PropertyId) -> Option<&ErasedValue> {
    store
        .ladder(id)
        .and_then(|ladder| ladder.top_above(Priority::Default))
        .map(ValueCell::read)
}
