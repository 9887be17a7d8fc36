// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property metadata definitions.
//!
//! [`PropertyMetadata`] carries a property's default value, its
//! [`PropertyFlags`], and the optional callbacks that run at the store
//! boundary. [`PropertyMetadataBuilder`] builds it.

use alloc::boxed::Box;

/// Callback invoked after the effective value changed, with old and new.
pub type PropertyChangedCallback<T> = Box<dyn Fn(&T, &T) + Send + Sync>;

/// Callback that adjusts a proposed value before it is stored.
pub type CoerceValueCallback<T> = Box<dyn Fn(T) -> T + Send + Sync>;

/// Callback that accepts or rejects a (coerced) value before it is stored.
pub type ValidateValueCallback<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Callback that decides whether two values are the same for change
/// detection.
pub type CompareValueCallback<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

bitflags::bitflags! {
    /// Static behavior flags of a property.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PropertyFlags: u8 {
        /// Unset values resolve through the owner's ancestors.
        const INHERITS        = 0b0000_0001;
        /// Changes invalidate measurement of the owner.
        const AFFECTS_MEASURE = 0b0000_0010;
        /// Changes invalidate rendering of the owner.
        const AFFECTS_RENDER  = 0b0000_0100;
    }
}

/// Metadata for a property.
///
/// # Example
///
/// ```rust
/// use understory_property_store::{PropertyFlags, PropertyMetadataBuilder};
///
/// let metadata = PropertyMetadataBuilder::new(12.0_f64)
///     .inherits(true)
///     .flags(PropertyFlags::AFFECTS_MEASURE)
///     .build();
///
/// assert_eq!(metadata.default_value(), &12.0);
/// assert!(metadata.inherits());
/// assert!(metadata.flags().contains(PropertyFlags::AFFECTS_MEASURE));
/// ```
pub struct PropertyMetadata<T: Clone + PartialEq + 'static> {
    default_value: T,
    flags: PropertyFlags,
    changed_callback: Option<PropertyChangedCallback<T>>,
    coerce_callback: Option<CoerceValueCallback<T>>,
    validate_callback: Option<ValidateValueCallback<T>>,
    compare_callback: Option<CompareValueCallback<T>>,
}

impl<T: Clone + PartialEq + 'static> PropertyMetadata<T> {
    /// Creates metadata with the given default and nothing else.
    #[must_use]
    pub fn new(default_value: T) -> Self {
        PropertyMetadataBuilder::new(default_value).build()
    }

    /// Returns the registered default value.
    #[must_use]
    #[inline]
    pub fn default_value(&self) -> &T {
        &self.default_value
    }

    /// Returns the property flags.
    #[must_use]
    #[inline]
    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    /// Returns whether unset values resolve through ancestors.
    #[must_use]
    #[inline]
    pub fn inherits(&self) -> bool {
        self.flags.contains(PropertyFlags::INHERITS)
    }

    /// Returns whether values are coerced or validated on the way in.
    #[must_use]
    #[inline]
    pub fn coerces(&self) -> bool {
        self.coerce_callback.is_some() || self.validate_callback.is_some()
    }

    /// Coerces a value using the coerce callback, if any.
    #[inline]
    pub fn coerce(&self, value: T) -> T {
        match &self.coerce_callback {
            Some(callback) => callback(value),
            None => value,
        }
    }

    /// Returns `false` if the validate callback rejects `value`.
    #[must_use]
    #[inline]
    pub fn validate(&self, value: &T) -> bool {
        self.validate_callback
            .as_ref()
            .is_none_or(|callback| callback(value))
    }

    /// Compares two values with the property's comparer.
    ///
    /// Defaults to `PartialEq`.
    #[must_use]
    #[inline]
    pub fn same_value(&self, a: &T, b: &T) -> bool {
        match &self.compare_callback {
            Some(callback) => callback(a, b),
            None => a == b,
        }
    }

    /// Invokes the changed callback if one is set.
    #[inline]
    pub fn on_changed(&self, old_value: &T, new_value: &T) {
        if let Some(callback) = &self.changed_callback {
            callback(old_value, new_value);
        }
    }
}

impl<T: Clone + PartialEq + core::fmt::Debug + 'static> core::fmt::Debug for PropertyMetadata<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyMetadata")
            .field("default_value", &self.default_value)
            .field("flags", &self.flags)
            .field("has_changed_callback", &self.changed_callback.is_some())
            .field("has_coerce_callback", &self.coerce_callback.is_some())
            .field("has_validate_callback", &self.validate_callback.is_some())
            .field("has_compare_callback", &self.compare_callback.is_some())
            .finish()
    }
}

/// Builder for [`PropertyMetadata`].
///
/// ```rust
/// use understory_property_store::PropertyMetadataBuilder;
///
/// let opacity = PropertyMetadataBuilder::new(1.0_f64)
///     .coerce(|v| v.clamp(0.0, 1.0))
///     .validate(|v| !v.is_nan())
///     .build();
///
/// assert_eq!(opacity.coerce(3.0), 1.0);
/// assert!(!opacity.validate(&f64::NAN));
/// ```
pub struct PropertyMetadataBuilder<T: Clone + PartialEq + 'static> {
    default_value: T,
    flags: PropertyFlags,
    changed_callback: Option<PropertyChangedCallback<T>>,
    coerce_callback: Option<CoerceValueCallback<T>>,
    validate_callback: Option<ValidateValueCallback<T>>,
    compare_callback: Option<CompareValueCallback<T>>,
}

impl<T: Clone + PartialEq + core::fmt::Debug + 'static> core::fmt::Debug
    for PropertyMetadataBuilder<T>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyMetadataBuilder")
            .field("default_value", &self.default_value)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq + 'static> PropertyMetadataBuilder<T> {
    /// Creates a builder with the given default value.
    #[must_use]
    pub fn new(default_value: T) -> Self {
        Self {
            default_value,
            flags: PropertyFlags::empty(),
            changed_callback: None,
            coerce_callback: None,
            validate_callback: None,
            compare_callback: None,
        }
    }

    /// Sets whether unset values resolve through ancestors.
    #[must_use]
    pub fn inherits(mut self, inherits: bool) -> Self {
        self.flags.set(PropertyFlags::INHERITS, inherits);
        self
    }

    /// Adds flags.
    #[must_use]
    pub fn flags(mut self, flags: PropertyFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Sets a callback invoked after the effective value changes.
    #[must_use]
    pub fn on_changed<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        self.changed_callback = Some(Box::new(callback));
        self
    }

    /// Sets a callback that coerces values before they are stored.
    #[must_use]
    pub fn coerce<F>(mut self, callback: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.coerce_callback = Some(Box::new(callback));
        self
    }

    /// Sets a callback that rejects values before they are stored.
    ///
    /// Runs after coercion.
    #[must_use]
    pub fn validate<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.validate_callback = Some(Box::new(callback));
        self
    }

    /// Replaces `PartialEq` for change detection.
    ///
    /// Without a comparer, values are compared with `PartialEq` even when
    /// they are shared objects: two distinct `Arc`s holding equal contents
    /// count as the same value and raise no change. Pass `Arc::ptr_eq` to
    /// compare by identity instead.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use understory_property_store::PropertyMetadataBuilder;
    ///
    /// let structural = PropertyMetadataBuilder::new(Arc::new(0_i32)).build();
    /// let identity = PropertyMetadataBuilder::new(Arc::new(0_i32))
    ///     .compare(|a, b| Arc::ptr_eq(a, b))
    ///     .build();
    ///
    /// let (a, b) = (Arc::new(1), Arc::new(1));
    /// assert!(structural.same_value(&a, &b));
    /// assert!(!identity.same_value(&a, &b));
    /// assert!(identity.same_value(&a, &Arc::clone(&a)));
    /// ```
    #[must_use]
    pub fn compare<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.compare_callback = Some(Box::new(callback));
        self
    }

    /// Builds the [`PropertyMetadata`].
    #[must_use]
    pub fn build(self) -> PropertyMetadata<T> {
        PropertyMetadata {
            default_value: self.default_value,
            flags: self.flags,
            changed_callback: self.changed_callback,
            coerce_callback: self.coerce_callback,
            validate_callback: self.validate_callback,
            compare_callback: self.compare_callback,
        }
    }
}
