// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property registry.
//!
//! [`PropertyRegistry`] is an explicit object rather than global state: it
//! is filled once during start-up, then shared (typically through an `Arc`)
//! with every store and tree that resolves values against it.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use hashbrown::HashMap;

use crate::error::PropertyError;
use crate::id::{Property, PropertyId, RegistryId};
use crate::metadata::{PropertyFlags, PropertyMetadata};
use crate::value::ErasedValue;

/// A registration entry for a property.
pub struct PropertyRegistration {
    owner_type: &'static str,
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    default_value: ErasedValue,
    metadata: Box<dyn ErasedMetadata>,
}

impl PropertyRegistration {
    /// Returns the owner type that declared the property.
    #[must_use]
    #[inline]
    pub fn owner_type(&self) -> &'static str {
        self.owner_type
    }

    /// Returns the property name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the [`TypeId`] of the value type.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the name of the value type.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the property flags.
    #[must_use]
    #[inline]
    pub fn flags(&self) -> PropertyFlags {
        self.metadata.flags()
    }

    /// Returns whether the property inherits.
    #[must_use]
    #[inline]
    pub fn inherits(&self) -> bool {
        self.flags().contains(PropertyFlags::INHERITS)
    }

    /// Returns the registered default value.
    #[must_use]
    #[inline]
    pub fn default_value(&self) -> &ErasedValue {
        &self.default_value
    }

    /// Rejects values whose type differs from the registered one.
    pub fn check_type(&self, value: &ErasedValue) -> Result<(), PropertyError> {
        if value.type_id() == self.type_id {
            Ok(())
        } else {
            Err(PropertyError::TypeMismatch {
                property: self.name,
                expected: self.type_name,
                found: value.type_name(),
            })
        }
    }

    /// Type-checks, coerces and validates an incoming value.
    pub fn prepare(&self, value: ErasedValue) -> Result<ErasedValue, PropertyError> {
        self.check_type(&value)?;
        self.metadata
            .prepare(value)
            .ok_or(PropertyError::InvalidValue { property: self.name })
    }

    /// Compares two erased values with the property's comparer.
    ///
    /// Values of the wrong type never compare equal.
    #[must_use]
    pub fn same_value(&self, a: &ErasedValue, b: &ErasedValue) -> bool {
        self.metadata.same_value(a, b)
    }

    /// Runs the property's changed callback.
    pub fn notify_changed(&self, old: &ErasedValue, new: &ErasedValue) {
        self.metadata.notify_changed(old, new);
    }
}

impl core::fmt::Debug for PropertyRegistration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyRegistration")
            .field("owner_type", &self.owner_type)
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("flags", &self.flags())
            .finish_non_exhaustive()
    }
}

/// A registry of properties.
///
/// Identity is `(owner type, name)`: the same name on two owner types yields
/// two distinct properties. [`add_owner`](Self::add_owner) makes an existing
/// property addressable from another owner type without creating a new one.
///
/// # Example
///
/// ```rust
/// use understory_property_store::{PropertyMetadataBuilder, PropertyRegistry};
///
/// let mut registry = PropertyRegistry::new();
/// let font_size = registry.register(
///     "TextBlock",
///     "FontSize",
///     PropertyMetadataBuilder::new(12.0_f64).inherits(true).build(),
/// );
/// registry.add_owner(font_size, "AccessText");
///
/// assert_eq!(registry.find("TextBlock", "FontSize"), Some(font_size.id()));
/// assert_eq!(registry.find("AccessText", "FontSize"), Some(font_size.id()));
/// assert_eq!(registry.find("Border", "FontSize"), None);
/// assert!(registry.inherits(font_size.id()));
/// ```
pub struct PropertyRegistry {
    id: RegistryId,
    properties: Vec<PropertyRegistration>,
    /// Owner type → name → id.
    by_name: HashMap<&'static str, HashMap<&'static str, PropertyId>>,
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        Self {
            id: RegistryId::next(),
            properties: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl PropertyRegistry {
    /// Creates an empty registry.
    ///
    /// Each registry issues its own ids; they are unknown to every other
    /// registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a property declared by `owner_type`.
    ///
    /// # Panics
    ///
    /// Panics if `owner_type` already has a property called `name`, or if
    /// more than 65,535 properties are registered.
    pub fn register<T: Clone + PartialEq + 'static>(
        &mut self,
        owner_type: &'static str,
        name: &'static str,
        metadata: PropertyMetadata<T>,
    ) -> Property<T> {
        assert!(
            self.find(owner_type, name).is_none(),
            "Property '{owner_type}.{name}' is already registered"
        );
        assert!(
            self.properties.len() < u16::MAX as usize,
            "Too many properties registered (max {})",
            u16::MAX
        );

        #[expect(clippy::cast_possible_truncation, reason = "checked above")]
        let id = PropertyId::new(self.id, self.properties.len() as u16);

        self.properties.push(PropertyRegistration {
            owner_type,
            name,
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            default_value: ErasedValue::new(metadata.default_value().clone()),
            metadata: Box::new(metadata),
        });
        self.by_name.entry(owner_type).or_default().insert(name, id);

        Property::from_id(id)
    }

    /// Makes `property` addressable by name from `owner_type`.
    ///
    /// # Panics
    ///
    /// Panics if the property is not registered here, or if `owner_type`
    /// already has a property with the same name.
    pub fn add_owner<T>(&mut self, property: Property<T>, owner_type: &'static str) -> Property<T> {
        let name = self
            .get(property.id())
            .map(PropertyRegistration::name)
            .expect("add_owner requires a property from this registry");
        assert!(
            self.find(owner_type, name).is_none(),
            "Property '{owner_type}.{name}' is already registered"
        );
        self.by_name
            .entry(owner_type)
            .or_default()
            .insert(name, property.id());
        property
    }

    /// Returns the number of registered properties.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Looks up a property by owner type and name.
    #[must_use]
    pub fn find(&self, owner_type: &str, name: &str) -> Option<PropertyId> {
        self.by_name
            .get(owner_type)
            .and_then(|names| names.get(name))
            .copied()
    }

    /// Returns the name of a property.
    #[must_use]
    pub fn name(&self, id: PropertyId) -> Option<&'static str> {
        self.get(id).map(PropertyRegistration::name)
    }

    /// Returns the registration for a property.
    #[must_use]
    pub fn get(&self, id: PropertyId) -> Option<&PropertyRegistration> {
        if !id.issued_by(self.id) {
            return None;
        }
        self.properties.get(usize::from(id.index()))
    }

    /// Returns the registration for a property, or an error if the id is
    /// unknown to this registry.
    pub fn registration(&self, id: PropertyId) -> Result<&PropertyRegistration, PropertyError> {
        self.get(id).ok_or(PropertyError::UnregisteredProperty(id))
    }

    /// Returns whether a property inherits.
    #[must_use]
    pub fn inherits(&self, id: PropertyId) -> bool {
        self.get(id).is_some_and(PropertyRegistration::inherits)
    }

    /// Returns the flags of a property, empty when unknown.
    #[must_use]
    pub fn flags(&self, id: PropertyId) -> PropertyFlags {
        self.get(id)
            .map(PropertyRegistration::flags)
            .unwrap_or_default()
    }

    /// Returns the typed metadata of a property.
    ///
    /// Returns `None` if the property is not registered or `T` is not its
    /// value type.
    #[must_use]
    pub fn get_metadata<T: Clone + PartialEq + 'static>(
        &self,
        property: Property<T>,
    ) -> Option<&PropertyMetadata<T>> {
        self.get(property.id())
            .and_then(|r| r.metadata.as_any().downcast_ref())
    }

    /// Returns the typed metadata of a property, distinguishing an unknown
    /// id from a handle of the wrong type.
    pub fn metadata<T: Clone + PartialEq + 'static>(
        &self,
        property: Property<T>,
    ) -> Result<&PropertyMetadata<T>, PropertyError> {
        let registration = self.registration(property.id())?;
        registration
            .metadata
            .as_any()
            .downcast_ref()
            .ok_or(PropertyError::TypeMismatch {
                property: registration.name,
                expected: registration.type_name,
                found: core::any::type_name::<T>(),
            })
    }

    /// Iterates the ids of inheriting properties.
    pub fn inheriting(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.iter()
            .filter(|(_, registration)| registration.inherits())
            .map(|(id, _)| id)
    }

    /// Iterates all registered properties.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &PropertyRegistration)> {
        self.properties.iter().enumerate().map(|(i, r)| {
            #[expect(clippy::cast_possible_truncation, reason = "index < len < u16::MAX")]
            (PropertyId::new(self.id, i as u16), r)
        })
    }
}

impl core::fmt::Debug for PropertyRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyRegistry")
            .field("count", &self.properties.len())
            .field(
                "properties",
                &self
                    .properties
                    .iter()
                    .map(|r| (r.owner_type, r.name))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Type-erased metadata for heterogeneous storage.
trait ErasedMetadata: Any {
    fn as_any(&self) -> &dyn Any;
    fn flags(&self) -> PropertyFlags;
    fn prepare(&self, value: ErasedValue) -> Option<ErasedValue>;
    fn same_value(&self, a: &ErasedValue, b: &ErasedValue) -> bool;
    fn notify_changed(&self, old: &ErasedValue, new: &ErasedValue);
}

impl<T: Clone + PartialEq + 'static> ErasedMetadata for PropertyMetadata<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn flags(&self) -> PropertyFlags {
        Self::flags(self)
    }

    fn prepare(&self, value: ErasedValue) -> Option<ErasedValue> {
        if !self.coerces() {
            return Some(value);
        }
        let value = self.coerce(value.downcast_ref::<T>()?.clone());
        self.validate(&value).then(|| ErasedValue::new(value))
    }

    fn same_value(&self, a: &ErasedValue, b: &ErasedValue) -> bool {
        match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
            (Some(a), Some(b)) => Self::same_value(self, a, b),
            _ => false,
        }
    }

    fn notify_changed(&self, old: &ErasedValue, new: &ErasedValue) {
        if let (Some(old), Some(new)) = (old.downcast_ref::<T>(), new.downcast_ref::<T>()) {
            self.on_changed(old, new);
        }
    }
}
