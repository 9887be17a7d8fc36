// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-erased payloads for value cells.

use alloc::boxed::Box;
use core::any::{Any, TypeId};
use core::fmt;

/// A type-erased property value.
///
/// Holds any `'static + Clone` value on the heap together with its type
/// identity, so heterogeneous ladders can share one cell type.
///
/// # Example
///
/// ```rust
/// use understory_property_store::ErasedValue;
///
/// let mut value = ErasedValue::new(42_i32);
/// assert!(value.is::<i32>());
/// assert_eq!(value.downcast_ref::<i32>(), Some(&42));
///
/// *value.downcast_mut::<i32>().unwrap() = 7;
/// assert_eq!(value.clone().downcast_ref::<i32>(), Some(&7));
/// ```
pub struct ErasedValue {
    inner: Box<dyn ErasedValueTrait>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ErasedValue {
    /// Erases a concrete value.
    #[must_use]
    pub fn new<T: Clone + 'static>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            inner: Box::new(value),
        }
    }

    /// Returns the [`TypeId`] of the contained value.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name of the contained value, for diagnostics.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the contained value is a `T`.
    #[must_use]
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Borrows the value as a `T`, or `None` on a type mismatch.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        if self.is::<T>() {
            self.inner.as_any().downcast_ref()
        } else {
            None
        }
    }

    /// Mutably borrows the value as a `T`, or `None` on a type mismatch.
    ///
    /// Used to overwrite a payload in place without reallocating.
    #[must_use]
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        if self.is::<T>() {
            self.inner.as_any_mut().downcast_mut()
        } else {
            None
        }
    }
}

impl Clone for ErasedValue {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_boxed(),
            type_id: self.type_id,
            type_name: self.type_name,
        }
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedValue")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

trait ErasedValueTrait: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_boxed(&self) -> Box<dyn ErasedValueTrait>;
}

impl<T: Clone + 'static> ErasedValueTrait for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn ErasedValueTrait> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::String;

    #[test]
    fn downcast_checks_type() {
        let value = ErasedValue::new(42_i32);
        assert!(value.is::<i32>());
        assert!(!value.is::<f64>());
        assert_eq!(value.downcast_ref::<i32>(), Some(&42));
        assert_eq!(value.downcast_ref::<f64>(), None);
        assert_eq!(value.type_id(), TypeId::of::<i32>());
        assert_eq!(value.type_name(), "i32");
    }

    #[test]
    fn downcast_mut_writes_in_place() {
        let mut value = ErasedValue::new(String::from("a"));
        value.downcast_mut::<String>().unwrap().push('b');
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("ab"));
        assert!(value.downcast_mut::<i32>().is_none());
    }

    #[test]
    fn clone_is_deep() {
        let mut value = ErasedValue::new(String::from("world"));
        let cloned = value.clone();
        value.downcast_mut::<String>().unwrap().clear();
        assert_eq!(
            cloned.downcast_ref::<String>().map(String::as_str),
            Some("world")
        );
    }

    #[test]
    fn debug_names_the_type() {
        let debug = format!("{:?}", ErasedValue::new(1.5_f64));
        assert!(debug.contains("ErasedValue"));
        assert!(debug.contains("f64"));
    }
}
