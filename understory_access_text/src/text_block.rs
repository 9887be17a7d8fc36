// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Plain text display.

use alloc::string::String;

use kurbo::{Point, Size};
use understory_property_store::{ElementTree, NodeId, PropertyError, PropertyFlags};

use crate::drawing::DrawingContext;
use crate::properties::TextProperties;
use crate::shaping::{TextLayout, TextShaper};

/// Displays the `Text` property of a node.
///
/// The block owns the layout of its last measure. Property values are read
/// from the [`ElementTree`] on every call, so the block itself holds no
/// copy of them.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use kurbo::Size;
/// use understory_access_text::{MonospaceShaper, Recording, TextBlock, TextProperties};
/// use understory_property_store::{ElementTree, PropertyRegistry};
///
/// let mut registry = PropertyRegistry::new();
/// let props = TextProperties::register(&mut registry);
/// let mut tree = ElementTree::new(Arc::new(registry));
/// let node = tree.insert("TextBlock", None).unwrap();
/// tree.set_local_value(node, props.text, String::from("Hello")).unwrap();
/// tree.set_local_value(node, props.font_size, 10.0).unwrap();
///
/// let mut block = TextBlock::new(node, props, MonospaceShaper::new(0.5, 1.0));
/// assert_eq!(block.measure(&tree, Size::new(100.0, 100.0)).unwrap(), Size::new(25.0, 10.0));
///
/// let mut recording = Recording::new();
/// block.render(&tree, &mut recording).unwrap();
/// assert_eq!(recording.commands.len(), 1);
/// ```
#[derive(Debug)]
pub struct TextBlock<S: TextShaper> {
    node: NodeId,
    properties: TextProperties,
    shaper: S,
    layout: Option<S::Layout>,
}

impl<S: TextShaper> TextBlock<S> {
    /// Creates a block displaying `node`.
    pub fn new(node: NodeId, properties: TextProperties, shaper: S) -> Self {
        Self {
            node,
            properties,
            shaper,
            layout: None,
        }
    }

    /// The node whose properties are displayed.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The property handles this block reads.
    #[must_use]
    pub fn properties(&self) -> TextProperties {
        self.properties
    }

    /// The layout of the last measure, if it is still valid.
    #[must_use]
    pub fn layout(&self) -> Option<&S::Layout> {
        self.layout.as_ref()
    }

    /// Drops the cached layout.
    pub fn invalidate(&mut self) {
        self.layout = None;
    }

    /// Consumes the node's pending invalidation, dropping the layout when a
    /// measure-affecting property changed.
    pub fn sync(&mut self, tree: &mut ElementTree) -> Result<PropertyFlags, PropertyError> {
        let flags = tree.take_invalidation(self.node)?;
        if flags.contains(PropertyFlags::AFFECTS_MEASURE) {
            self.invalidate();
        }
        Ok(flags)
    }

    /// Returns the effective `Text`.
    pub fn text(&self, tree: &ElementTree) -> Result<String, PropertyError> {
        tree.get_value(self.node, self.properties.text)
    }

    /// Shapes `text` with the node's font size and keeps the layout.
    ///
    /// Decorators use this to lay out text derived from the `Text`
    /// property.
    pub fn measure_text(
        &mut self,
        tree: &ElementTree,
        text: &str,
        available: Size,
    ) -> Result<Size, PropertyError> {
        let font_size = tree.get_value(self.node, self.properties.font_size)?;
        let layout = self.shaper.shape(text, font_size, available);
        let size = layout.size();
        tracing::trace!(
            node = ?self.node,
            font_size,
            width = size.width,
            height = size.height,
            "measured text"
        );
        self.layout = Some(layout);
        Ok(size)
    }

    /// Measures the `Text` property.
    pub fn measure(&mut self, tree: &ElementTree, available: Size) -> Result<Size, PropertyError> {
        let text = self.text(tree)?;
        self.measure_text(tree, &text, available)
    }

    /// Draws the layout of the last measure in the node's foreground.
    ///
    /// Measures with unbounded space first if there is no layout yet.
    pub fn render(
        &mut self,
        tree: &ElementTree,
        context: &mut dyn DrawingContext,
    ) -> Result<(), PropertyError> {
        if self.layout.is_none() {
            self.measure(tree, Size::new(f64::INFINITY, f64::INFINITY))?;
        }
        let brush = tree.get_value(self.node, self.properties.foreground)?;
        if let Some(layout) = &self.layout {
            context.draw_text(brush, Point::ZERO, layout);
        }
        Ok(())
    }
}
