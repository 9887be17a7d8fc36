// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Property Store: layered property values with a single
//! effective value.
//!
//! Every (owner, property) pair keeps a small stack of competing values, one
//! per source. Reads resolve that stack to exactly one effective value;
//! writes report when the effective value changes.
//!
//! ## Core Concepts
//!
//! ### Tiers
//!
//! [`Priority`] orders the sources, highest first:
//!
//! | Tier | Written by |
//! |------|------------|
//! | `Animation` | the animation engine, once per tick |
//! | `LocalValue` | application code and the markup loader |
//! | `StyleTrigger` | the style engine, for matched triggers |
//! | `StyleBase` | the style engine, for base setters |
//! | `Inherited` | the tree, caching what an ancestor offers |
//! | `Default` | per-owner default overrides |
//!
//! A [`PriorityLadder`] holds at most one [`ValueCell`] per tier. The highest
//! occupied tier wins; with no cells the value comes from an ancestor (for
//! properties flagged [`PropertyFlags::INHERITS`]) or the registered default.
//!
//! ### Storage
//!
//! - [`PropertyRegistry`]: explicit, shared registry of property
//!   descriptors. Identity is `(owner type, name)`.
//! - [`ValueStore`]: per-owner sparse ladders. A ladder exists only while
//!   one of its tiers is occupied.
//! - [`resolve_inherited`]: the ancestor walk, with cycle detection.
//!
//! ### Change propagation
//!
//! [`ElementTree`] ties the pieces together. A write validates and coerces
//! the value, updates the ladder, compares the old and new effective values
//! with the property's comparer, runs the property's changed callback and
//! then the subscribers, and pushes inherited values down the subtree.
//! Handlers receive the tree and may write to it.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::sync::Arc;
//! use understory_property_store::{
//!     ElementTree, Priority, PropertyFlags, PropertyMetadataBuilder, PropertyRegistry,
//! };
//!
//! let mut registry = PropertyRegistry::new();
//! let width = registry.register(
//!     "Control",
//!     "Width",
//!     PropertyMetadataBuilder::new(0_i32)
//!         .flags(PropertyFlags::AFFECTS_MEASURE)
//!         .build(),
//! );
//!
//! let mut tree = ElementTree::new(Arc::new(registry));
//! let node = tree.insert("Control", None).unwrap();
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! tree.subscribe(node, width.id(), move |_, change| {
//!     sink.borrow_mut()
//!         .push((*change.old_value::<i32>().unwrap(), *change.new_value::<i32>().unwrap()));
//! })
//! .unwrap();
//!
//! tree.set_local_value(node, width, 5).unwrap();
//! // Hidden below the local value: no change.
//! tree.set_value(node, width, Priority::StyleBase, 3).unwrap();
//! tree.clear_local_value(node, width).unwrap();
//!
//! assert_eq!(*seen.borrow(), [(0, 5), (5, 3)]);
//! assert_eq!(tree.value_source(node, width.id()).unwrap(), Priority::StyleBase);
//! assert_eq!(tree.take_invalidation(node).unwrap(), PropertyFlags::AFFECTS_MEASURE);
//! ```
//!
//! ## Memory Optimizations
//!
//! | Optimization | Description |
//! |--------------|-------------|
//! | **Sparse storage** | `ValueStore` only allocates for properties with cells |
//! | **Shared defaults** | Default values live in the registry, not per owner |
//! | **Inline storage** | `SmallVec` for ladders and cells |
//! | **In-place writes** | Typed writes reuse a cell's payload allocation |
//! | **`PropertyId` as u16** | Compact property identification |
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod cell;
mod error;
mod id;
mod inherit;
mod ladder;
mod markup;
mod metadata;
mod notify;
mod priority;
mod registry;
mod store;
mod tree;
mod value;

pub use cell::ValueCell;
pub use error::PropertyError;
pub use id::{Property, PropertyId};
pub use inherit::{ParentLookup, Resolved, resolve_inherited};
pub use ladder::PriorityLadder;
pub use markup::apply_attributes;
pub use metadata::{
    CoerceValueCallback, CompareValueCallback, PropertyChangedCallback, PropertyFlags,
    PropertyMetadata, PropertyMetadataBuilder, ValidateValueCallback,
};
pub use notify::{ChangeHandler, ChangeNotifier, PropertyChange, SubscriptionId};
pub use priority::{AnimationClock, Priority};
pub use registry::{PropertyRegistration, PropertyRegistry};
pub use store::{Transition, ValueStore};
pub use tree::{ElementTree, NodeId};
pub use value::ErasedValue;
