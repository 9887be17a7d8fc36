// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing surface for the text widgets.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Point, Size};

use crate::shaping::TextLayout;

/// A stroke: brush color (`0xRRGGBBAA`) and thickness.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pen {
    /// Brush color.
    pub brush: u32,
    /// Stroke thickness in logical units.
    pub thickness: f64,
}

/// Receives the drawing calls of a widget.
pub trait DrawingContext {
    /// Draws `layout` with its top-left corner at `origin`.
    fn draw_text(&mut self, brush: u32, origin: Point, layout: &dyn TextLayout);

    /// Draws a straight line.
    fn draw_line(&mut self, pen: Pen, from: Point, to: Point);
}

/// A drawing call captured by [`Recording`].
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    /// A text layout.
    Text {
        /// Brush color.
        brush: u32,
        /// Top-left corner.
        origin: Point,
        /// The shaped text.
        text: String,
        /// Size of the layout.
        size: Size,
    },
    /// A line.
    Line {
        /// Stroke.
        pen: Pen,
        /// Start point.
        from: Point,
        /// End point.
        to: Point,
    },
}

/// A [`DrawingContext`] that records every call.
#[derive(Clone, Debug, Default)]
pub struct Recording {
    /// Calls in the order they were made.
    pub commands: Vec<DrawCommand>,
}

impl Recording {
    /// Creates an empty recording.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterates the recorded lines as `(pen, from, to)`.
    pub fn lines(&self) -> impl Iterator<Item = (Pen, Point, Point)> + '_ {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Line { pen, from, to } => Some((*pen, *from, *to)),
            DrawCommand::Text { .. } => None,
        })
    }
}

impl DrawingContext for Recording {
    fn draw_text(&mut self, brush: u32, origin: Point, layout: &dyn TextLayout) {
        self.commands.push(DrawCommand::Text {
            brush,
            origin,
            text: String::from(layout.text()),
            size: layout.size(),
        });
    }

    fn draw_line(&mut self, pen: Pen, from: Point, to: Point) {
        self.commands.push(DrawCommand::Line { pen, from, to });
    }
}
