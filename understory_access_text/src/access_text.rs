// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text with an underlined access key.
//!
//! The first underscore in the text marks the access key: it is removed
//! before layout, and when `ShowAccessKey` is on the character after it is
//! underlined.

use alloc::borrow::Cow;
use alloc::string::String;

use kurbo::{Point, Size, Vec2};
use understory_property_store::{ElementTree, NodeId, PropertyError, PropertyFlags};

use crate::drawing::{DrawingContext, Pen};
use crate::properties::TextProperties;
use crate::shaping::{TextLayout, TextShaper};
use crate::text_block::TextBlock;

/// Extra height reserved below the text for the underline.
const UNDERLINE_SPACE: f64 = 1.0;

/// Offset of the underline from the bottom of the glyph box.
const UNDERLINE_OFFSET: Vec2 = Vec2::new(0.0, -0.5);

/// Returns the byte index of the access-key marker, if any.
///
/// In the stripped text this is also the index of the access key itself.
#[must_use]
pub fn access_key_index(text: &str) -> Option<usize> {
    text.find('_')
}

/// Removes the first underscore from `text`.
///
/// ```rust
/// use understory_access_text::strip_access_key;
///
/// assert_eq!(strip_access_key("_Open"), "Open");
/// assert_eq!(strip_access_key("Save _As"), "Save As");
/// assert_eq!(strip_access_key("a_b_c"), "ab_c");
/// assert_eq!(strip_access_key("Close"), "Close");
/// ```
#[must_use]
pub fn strip_access_key(text: &str) -> Cow<'_, str> {
    match access_key_index(text) {
        Some(index) => {
            let mut stripped = String::with_capacity(text.len() - 1);
            stripped.push_str(&text[..index]);
            stripped.push_str(&text[index + 1..]);
            Cow::Owned(stripped)
        }
        None => Cow::Borrowed(text),
    }
}

/// A [`TextBlock`] decorated with access-key handling.
///
/// Measure and render delegate to the wrapped block; the decorator lays out
/// the stripped text, reserves one unit of height, and draws the underline
/// after the base rendering.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use kurbo::{Point, Size};
/// use understory_access_text::{AccessText, MonospaceShaper, Recording, TextProperties};
/// use understory_property_store::{ElementTree, PropertyRegistry};
///
/// let mut registry = PropertyRegistry::new();
/// let props = TextProperties::register(&mut registry);
/// let mut tree = ElementTree::new(Arc::new(registry));
/// let menu = tree.insert("Menu", None).unwrap();
/// let label = tree.insert("AccessText", Some(menu)).unwrap();
/// tree.set_local_value(label, props.text, String::from("_File")).unwrap();
/// tree.set_local_value(label, props.font_size, 10.0).unwrap();
/// // Inherited from the menu, as when the user holds Alt.
/// tree.set_local_value(menu, props.show_access_key, true).unwrap();
///
/// let mut text = AccessText::new(label, props, MonospaceShaper::new(0.5, 1.0));
/// assert_eq!(text.measure(&tree, Size::new(100.0, 100.0)).unwrap(), Size::new(20.0, 11.0));
///
/// let mut recording = Recording::new();
/// text.render(&tree, &mut recording).unwrap();
/// let (pen, from, to) = recording.lines().next().unwrap();
/// assert_eq!(pen.thickness, 1.0);
/// assert_eq!((from, to), (Point::new(0.0, 9.5), Point::new(5.0, 9.5)));
/// ```
#[derive(Debug)]
pub struct AccessText<S: TextShaper> {
    inner: TextBlock<S>,
}

impl<S: TextShaper> AccessText<S> {
    /// Creates an access text displaying `node`.
    pub fn new(node: NodeId, properties: TextProperties, shaper: S) -> Self {
        Self {
            inner: TextBlock::new(node, properties, shaper),
        }
    }

    /// The wrapped text block.
    #[must_use]
    pub fn text_block(&self) -> &TextBlock<S> {
        &self.inner
    }

    /// The layout of the stripped text, if measured.
    #[must_use]
    pub fn layout(&self) -> Option<&S::Layout> {
        self.inner.layout()
    }

    /// See [`TextBlock::sync`].
    pub fn sync(&mut self, tree: &mut ElementTree) -> Result<PropertyFlags, PropertyError> {
        self.inner.sync(tree)
    }

    /// Returns the effective `ShowAccessKey`.
    pub fn show_access_key(&self, tree: &ElementTree) -> Result<bool, PropertyError> {
        tree.get_value(self.inner.node(), self.inner.properties().show_access_key)
    }

    /// Measures the stripped text, plus room for the underline.
    pub fn measure(&mut self, tree: &ElementTree, available: Size) -> Result<Size, PropertyError> {
        let text = self.inner.text(tree)?;
        let size = self
            .inner
            .measure_text(tree, &strip_access_key(&text), available)?;
        Ok(Size::new(size.width, size.height + UNDERLINE_SPACE))
    }

    /// Renders the text, then underlines the access key if it is shown.
    pub fn render(
        &mut self,
        tree: &ElementTree,
        context: &mut dyn DrawingContext,
    ) -> Result<(), PropertyError> {
        if self.inner.layout().is_none() {
            self.measure(tree, Size::new(f64::INFINITY, f64::INFINITY))?;
        }
        self.inner.render(tree, context)?;

        let text = self.inner.text(tree)?;
        let Some(index) = access_key_index(&text) else {
            return Ok(());
        };
        if !self.show_access_key(tree)? {
            return Ok(());
        }
        let Some(layout) = self.inner.layout() else {
            return Ok(());
        };
        let rect = layout.hit_test_text_position(index);
        let pen = Pen {
            brush: tree.get_value(self.inner.node(), self.inner.properties().foreground)?,
            thickness: 1.0,
        };
        context.draw_line(
            pen,
            Point::new(rect.x0, rect.y1) + UNDERLINE_OFFSET,
            Point::new(rect.x1, rect.y1) + UNDERLINE_OFFSET,
        );
        Ok(())
    }
}
