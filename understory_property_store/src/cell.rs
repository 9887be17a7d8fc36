// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A single value from a single source.

use crate::priority::{AnimationClock, Priority};
use crate::value::ErasedValue;

/// One value from one priority source for one (owner, property) pair.
///
/// The tier is fixed at construction; the payload may be overwritten in
/// place, which keeps ticking animations from reallocating.
///
/// ```rust
/// use understory_property_store::{ErasedValue, Priority, ValueCell};
///
/// let mut cell = ValueCell::new(Priority::LocalValue, ErasedValue::new(1.0_f64));
/// assert!(cell.write_typed(2.0_f64));
/// assert_eq!(cell.read().downcast_ref::<f64>(), Some(&2.0));
/// assert_eq!(cell.priority(), Priority::LocalValue);
/// ```
#[derive(Clone, Debug)]
pub struct ValueCell {
    priority: Priority,
    value: ErasedValue,
    clock: Option<AnimationClock>,
}

impl ValueCell {
    /// Creates a cell at `priority`.
    #[must_use]
    pub fn new(priority: Priority, value: ErasedValue) -> Self {
        Self {
            priority,
            value,
            clock: None,
        }
    }

    /// Creates an animation-tier cell driven by `clock`.
    #[must_use]
    pub fn animated(value: ErasedValue, clock: AnimationClock) -> Self {
        Self {
            priority: Priority::Animation,
            value,
            clock: Some(clock),
        }
    }

    /// Returns the tier of this cell.
    #[must_use]
    #[inline]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the clock driving this cell, if any.
    #[must_use]
    #[inline]
    pub fn clock(&self) -> Option<AnimationClock> {
        self.clock
    }

    /// Returns the payload.
    #[must_use]
    #[inline]
    pub fn read(&self) -> &ErasedValue {
        &self.value
    }

    /// Replaces the payload. The tier does not change.
    #[inline]
    pub fn write(&mut self, value: ErasedValue) {
        self.value = value;
    }

    /// Overwrites the payload in place when it already holds a `T`.
    ///
    /// Returns `false`, leaving the cell untouched, on a type mismatch.
    pub fn write_typed<T: Clone + 'static>(&mut self, value: T) -> bool {
        match self.value.downcast_mut::<T>() {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Consumes the cell, returning its payload.
    #[must_use]
    #[inline]
    pub fn into_value(self) -> ErasedValue {
        self.value
    }

    pub(crate) fn set_clock(&mut self, clock: Option<AnimationClock>) {
        self.clock = clock;
    }
}
