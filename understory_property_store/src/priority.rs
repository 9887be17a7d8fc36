// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Priority tiers.

use core::fmt;

/// The source tier of a value. Higher tiers win.
///
/// Ordering follows precedence, so `a > b` means a value at `a` hides a value
/// at `b`:
///
/// ```rust
/// use understory_property_store::Priority;
///
/// assert!(Priority::Animation > Priority::LocalValue);
/// assert!(Priority::StyleTrigger > Priority::StyleBase);
/// assert_eq!(Priority::ALL[0], Priority::Animation);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Per-owner default override; below everything else.
    Default,
    /// Value propagated from an ancestor for an inheriting property.
    Inherited,
    /// Unconditional style setter.
    StyleBase,
    /// Style setter whose trigger currently matches.
    StyleTrigger,
    /// Value set directly on the owner (code or markup).
    LocalValue,
    /// Value driven by a running animation.
    Animation,
}

impl Priority {
    /// Number of tiers.
    pub const COUNT: usize = 6;

    /// All tiers, highest first.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Animation,
        Self::LocalValue,
        Self::StyleTrigger,
        Self::StyleBase,
        Self::Inherited,
        Self::Default,
    ];

    /// Returns `true` for tiers that hide inherited values.
    ///
    /// An owner holding such a value shields its subtree from ancestor
    /// changes to the same inheriting property.
    #[must_use]
    #[inline]
    pub fn overrides_inheritance(self) -> bool {
        self > Self::Inherited
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Default => "default",
            Self::Inherited => "inherited",
            Self::StyleBase => "style",
            Self::StyleTrigger => "style trigger",
            Self::LocalValue => "local",
            Self::Animation => "animation",
        };
        f.write_str(name)
    }
}

/// Identifies the animation clock that drives an animated cell.
///
/// Stopping a clock clears every animation cell linked to it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnimationClock(pub u32);
