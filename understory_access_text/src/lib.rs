// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Access Text: text widgets driven by the property store.
//!
//! [`TextBlock`] displays the `Text` property of an [`ElementTree`] node,
//! sized by the inherited `FontSize` and drawn in `Foreground`.
//! [`AccessText`] decorates it with an access key: the first underscore in
//! the text is hidden, and the following character is underlined while the
//! inherited `ShowAccessKey` property is `true`.
//!
//! Text shaping and drawing are external. Widgets talk to a [`TextShaper`]
//! and a [`DrawingContext`]; [`MonospaceShaper`] and [`Recording`] are
//! simple implementations of both.
//!
//! ```rust
//! use std::sync::Arc;
//! use understory_access_text::{AccessText, MonospaceShaper, Recording, TextProperties};
//! use understory_property_store::{ElementTree, PropertyRegistry};
//!
//! let mut registry = PropertyRegistry::new();
//! let props = TextProperties::register(&mut registry);
//! let mut tree = ElementTree::new(Arc::new(registry));
//! let window = tree.insert("Window", None).unwrap();
//! let label = tree.insert("AccessText", Some(window)).unwrap();
//! tree.set_local_value(label, props.text, String::from("_Save")).unwrap();
//!
//! let mut text = AccessText::new(label, props, MonospaceShaper::default());
//! let mut recording = Recording::new();
//! text.render(&tree, &mut recording).unwrap();
//! assert_eq!(recording.lines().count(), 0);
//!
//! // Holding Alt turns the underline on for the whole window.
//! tree.set_local_value(window, props.show_access_key, true).unwrap();
//! text.sync(&mut tree).unwrap();
//! let mut recording = Recording::new();
//! text.render(&tree, &mut recording).unwrap();
//! assert_eq!(recording.lines().count(), 1);
//! ```
//!
//! [`ElementTree`]: understory_property_store::ElementTree

#![no_std]

extern crate alloc;

mod access_text;
mod drawing;
mod properties;
mod shaping;
mod text_block;

pub use access_text::{AccessText, access_key_index, strip_access_key};
pub use drawing::{DrawCommand, DrawingContext, Pen, Recording};
pub use properties::{
    ACCESS_TEXT, DEFAULT_FONT_SIZE, DEFAULT_FOREGROUND, TEXT_BLOCK, TextProperties,
};
pub use shaping::{MonospaceLayout, MonospaceShaper, TextLayout, TextShaper};
pub use text_block::TextBlock;
