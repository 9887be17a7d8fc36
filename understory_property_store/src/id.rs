// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property identity.
//!
//! A [`PropertyId`] pairs a slot in a [`PropertyRegistry`] with the identity
//! of that registry. Ids are only minted by registration, so a handle from
//! one registry is never mistaken for a property of another: every lookup
//! of a foreign id fails with [`PropertyError::UnregisteredProperty`].
//!
//! [`PropertyRegistry`]: crate::PropertyRegistry
//! [`PropertyError::UnregisteredProperty`]: crate::PropertyError::UnregisteredProperty

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU32, Ordering};

/// Identity of one registry instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct RegistryId(u32);

impl RegistryId {
    /// Never issued; ids carrying it resolve nowhere.
    #[cfg(test)]
    pub(crate) const NONE: Self = Self(0);

    /// Issues a fresh identity.
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A runtime property identifier, issued by
/// [`PropertyRegistry::register`](crate::PropertyRegistry::register).
///
/// Ids order by registry first, then by registration order, which is the
/// order ladders are kept in. Two properties with the same name on different
/// owner types have different ids.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId {
    registry: RegistryId,
    index: u16,
}

impl PropertyId {
    pub(crate) const fn new(registry: RegistryId, index: u16) -> Self {
        Self { registry, index }
    }

    /// An id no registry knows about.
    #[cfg(test)]
    pub(crate) const fn unregistered(index: u16) -> Self {
        Self::new(RegistryId::NONE, index)
    }

    /// Returns the registration slot of this id in its registry.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.index
    }

    pub(crate) fn issued_by(self, registry: RegistryId) -> bool {
        self.registry == registry
    }
}

impl fmt::Debug for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyId")
            .field("registry", &self.registry.0)
            .field("index", &self.index)
            .finish()
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyId({})", self.index)
    }
}

/// A typed property handle.
///
/// `T` is the value type the property was registered with, so typed reads
/// and writes cannot pass the wrong payload:
///
/// ```rust
/// use understory_property_store::{Property, PropertyMetadataBuilder, PropertyRegistry};
///
/// let mut registry = PropertyRegistry::new();
/// let width: Property<f64> = registry.register(
///     "Control",
///     "Width",
///     PropertyMetadataBuilder::new(0.0_f64).build(),
/// );
/// assert_eq!(registry.name(width.id()), Some("Width"));
///
/// // Handles are not portable between registries.
/// let other = PropertyRegistry::new();
/// assert!(other.registration(width.id()).is_err());
/// ```
pub struct Property<T> {
    id: PropertyId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Property<T> {
    pub(crate) const fn from_id(id: PropertyId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Returns the untyped id.
    #[must_use]
    #[inline]
    pub const fn id(self) -> PropertyId {
        self.id
    }
}

impl<T> Copy for Property<T> {}

impl<T> Clone for Property<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Property<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Property<T> {}

impl<T> Hash for Property<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.id)
            .field("type", &core::any::type_name::<T>())
            .finish()
    }
}

impl<T> From<Property<T>> for PropertyId {
    #[inline]
    fn from(property: Property<T>) -> Self {
        property.id
    }
}
