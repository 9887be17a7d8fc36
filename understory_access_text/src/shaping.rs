// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The boundary to an external text engine.
//!
//! Shaping and font resolution are not done here. A [`TextShaper`] turns a
//! string into a [`TextLayout`] that can report its size and the box of a
//! text position. [`MonospaceShaper`] is a fixed-advance stand-in that is
//! good enough for tests and terminal-like surfaces.

use alloc::string::String;
use core::fmt;

use kurbo::{Rect, Size};

/// A shaped, laid-out piece of text.
pub trait TextLayout {
    /// The text that was shaped.
    fn text(&self) -> &str;

    /// The size the text occupies.
    fn size(&self) -> Size;

    /// The box of the character starting at byte `index`.
    ///
    /// An index at or past the end yields a zero-width box after the last
    /// character.
    fn hit_test_text_position(&self, index: usize) -> Rect;
}

/// Produces [`TextLayout`]s.
pub trait TextShaper {
    /// The layout type produced.
    type Layout: TextLayout + fmt::Debug;

    /// Shapes `text` at `font_size` within `constraint`.
    fn shape(&self, text: &str, font_size: f64, constraint: Size) -> Self::Layout;
}

/// Shapes text on a single line with a fixed advance per character.
///
/// ```rust
/// use kurbo::{Rect, Size};
/// use understory_access_text::{MonospaceShaper, TextLayout, TextShaper};
///
/// let shaper = MonospaceShaper::new(0.5, 1.0);
/// let layout = shaper.shape("Open", 10.0, Size::new(f64::INFINITY, f64::INFINITY));
/// assert_eq!(layout.size(), Size::new(20.0, 10.0));
/// assert_eq!(layout.hit_test_text_position(1), Rect::new(5.0, 0.0, 10.0, 10.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonospaceShaper {
    /// Advance of one character, as a fraction of the font size.
    pub advance: f64,
    /// Line height, as a fraction of the font size.
    pub line_height: f64,
}

impl MonospaceShaper {
    /// Creates a shaper with the given advance and line height ratios.
    #[must_use]
    pub const fn new(advance: f64, line_height: f64) -> Self {
        Self {
            advance,
            line_height,
        }
    }
}

impl Default for MonospaceShaper {
    fn default() -> Self {
        Self::new(0.6, 1.2)
    }
}

impl TextShaper for MonospaceShaper {
    type Layout = MonospaceLayout;

    fn shape(&self, text: &str, font_size: f64, constraint: Size) -> MonospaceLayout {
        MonospaceLayout {
            text: String::from(text),
            advance: self.advance * font_size,
            line_height: self.line_height * font_size,
            max_width: constraint.width,
        }
    }
}

/// Layout produced by [`MonospaceShaper`].
#[derive(Clone, Debug, PartialEq)]
pub struct MonospaceLayout {
    text: String,
    advance: f64,
    line_height: f64,
    max_width: f64,
}

impl MonospaceLayout {
    fn column(&self, index: usize) -> usize {
        match self.text.get(..index) {
            Some(prefix) => prefix.chars().count(),
            None => self.text.chars().count(),
        }
    }
}

impl TextLayout for MonospaceLayout {
    fn text(&self) -> &str {
        &self.text
    }

    fn size(&self) -> Size {
        let width = self.text.chars().count() as f64 * self.advance;
        Size::new(width.min(self.max_width), self.line_height)
    }

    fn hit_test_text_position(&self, index: usize) -> Rect {
        let column = self.column(index);
        let len = self.text.chars().count();
        let x0 = column as f64 * self.advance;
        let x1 = if column < len { x0 + self.advance } else { x0 };
        Rect::new(x0, 0.0, x1, self.line_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNBOUNDED: Size = Size::new(f64::INFINITY, f64::INFINITY);

    #[test]
    fn size_counts_characters_not_bytes() {
        let layout = MonospaceShaper::new(0.5, 1.0).shape("héllo", 10.0, UNBOUNDED);
        assert_eq!(layout.size(), Size::new(25.0, 10.0));
        // 'l' starts at byte 3 but column 2.
        assert_eq!(layout.hit_test_text_position(3), Rect::new(10.0, 0.0, 15.0, 10.0));
    }

    #[test]
    fn width_is_clamped_to_the_constraint() {
        let layout = MonospaceShaper::new(0.5, 1.0).shape("abcdef", 10.0, Size::new(12.0, 100.0));
        assert_eq!(layout.size().width, 12.0);
    }

    #[test]
    fn positions_past_the_end_are_zero_width() {
        let layout = MonospaceShaper::new(0.5, 1.0).shape("ab", 10.0, UNBOUNDED);
        assert_eq!(layout.hit_test_text_position(2), Rect::new(10.0, 0.0, 10.0, 10.0));
        assert_eq!(layout.hit_test_text_position(40), Rect::new(10.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn default_ratios() {
        let layout = MonospaceShaper::default().shape("a", 10.0, UNBOUNDED);
        assert_eq!(layout.size(), Size::new(6.0, 12.0));
        assert_eq!(layout.text(), "a");
    }
}
