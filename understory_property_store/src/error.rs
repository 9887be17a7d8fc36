// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by store and tree operations.

use crate::id::PropertyId;

/// Error returned by property store operations.
///
/// Every variant is a structural or programming error; none is transient.
/// An operation that returns an error has not mutated any ladder.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// The property id is not known to the registry in use.
    #[error("{0} is not registered")]
    UnregisteredProperty(PropertyId),
    /// The payload type differs from the property's registered value type.
    #[error("property `{property}` holds `{expected}` values, got `{found}`")]
    TypeMismatch {
        /// Name of the property.
        property: &'static str,
        /// Registered value type.
        expected: &'static str,
        /// Type of the rejected payload.
        found: &'static str,
    },
    /// The property's validate callback rejected the value.
    #[error("value rejected by validation for property `{property}`")]
    InvalidValue {
        /// Name of the property.
        property: &'static str,
    },
    /// An ancestor walk revisited an owner it had already seen.
    #[error("owner chain is cyclic (revisited an owner after {steps} steps)")]
    CyclicOwnership {
        /// Number of parent links followed before the repeat was found.
        steps: usize,
    },
    /// The node id refers to a removed node.
    #[error("node is not alive")]
    StaleNode,
    /// No property with this name is registered for the owner type.
    #[error("`{owner_type}` has no property named `{name}`")]
    UnknownProperty {
        /// Owner type the lookup was scoped to.
        owner_type: &'static str,
        /// Requested property name.
        name: alloc::string::String,
    },
}
