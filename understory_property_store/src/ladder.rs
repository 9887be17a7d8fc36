// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-(owner, property) stack of competing values.
//!
//! A [`PriorityLadder`] holds at most one [`ValueCell`] per [`Priority`]
//! tier, kept sorted highest tier first. The effective value is simply the
//! first cell. With six tiers the ladder is tiny, so it stores cells inline
//! in a `SmallVec` and finds tiers by binary search, the same layout the
//! store uses for its ladders.

use smallvec::SmallVec;

use crate::cell::ValueCell;
use crate::priority::{AnimationClock, Priority};
use crate::value::ErasedValue;

/// Ordered cells for one (owner, property) pair.
///
/// Mutators report whether the top of the ladder was affected; comparing
/// the old and new effective values is left to the caller, which knows the
/// property's equality semantics and its inherited/default fallback.
///
/// # Example
///
/// ```rust
/// use understory_property_store::{ErasedValue, Priority, PriorityLadder};
///
/// let mut ladder = PriorityLadder::new();
/// assert!(ladder.set(Priority::LocalValue, ErasedValue::new(5_i32)));
/// // A lower tier does not reach the top.
/// assert!(!ladder.set(Priority::StyleBase, ErasedValue::new(3_i32)));
/// assert_eq!(ladder.effective().unwrap().read().downcast_ref::<i32>(), Some(&5));
///
/// ladder.clear(Priority::LocalValue);
/// assert_eq!(ladder.effective().unwrap().read().downcast_ref::<i32>(), Some(&3));
/// ```
#[derive(Clone, Debug, Default)]
pub struct PriorityLadder {
    /// Occupied tiers, highest first.
    cells: SmallVec<[ValueCell; 2]>,
}

impl PriorityLadder {
    /// Creates an empty ladder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn find(&self, tier: Priority) -> Result<usize, usize> {
        // Descending order, so compare the probe against the cell.
        self.cells.binary_search_by(|cell| tier.cmp(&cell.priority()))
    }

    /// Returns `true` if a write at `tier` would land on top.
    #[must_use]
    #[inline]
    pub fn reaches_top(&self, tier: Priority) -> bool {
        self.cells.first().is_none_or(|top| top.priority() <= tier)
    }

    /// Returns `true` if `tier` is the occupied top tier.
    #[must_use]
    #[inline]
    pub fn is_top(&self, tier: Priority) -> bool {
        self.cells.first().is_some_and(|top| top.priority() == tier)
    }

    /// Inserts or overwrites the cell at `tier`.
    ///
    /// Returns `true` if the top of the ladder was affected.
    pub fn set(&mut self, tier: Priority, value: ErasedValue) -> bool {
        self.insert(ValueCell::new(tier, value))
    }

    /// Inserts or overwrites a prepared cell at its own tier.
    ///
    /// Returns `true` if the top of the ladder was affected.
    pub fn insert(&mut self, cell: ValueCell) -> bool {
        let affected = self.reaches_top(cell.priority());
        match self.find(cell.priority()) {
            Ok(idx) => self.cells[idx] = cell,
            Err(idx) => self.cells.insert(idx, cell),
        }
        affected
    }

    /// Writes a typed value at `tier`, reusing the existing payload
    /// allocation when the tier is already occupied by a `T`.
    ///
    /// Returns `true` if the top of the ladder was affected.
    pub fn set_typed<T: Clone + 'static>(
        &mut self,
        tier: Priority,
        value: T,
        clock: Option<AnimationClock>,
    ) -> bool {
        let affected = self.reaches_top(tier);
        match self.find(tier) {
            Ok(idx) => {
                let cell = &mut self.cells[idx];
                if !cell.write_typed(value.clone()) {
                    cell.write(ErasedValue::new(value));
                }
                cell.set_clock(clock);
            }
            Err(idx) => {
                let mut cell = ValueCell::new(tier, ErasedValue::new(value));
                cell.set_clock(clock);
                self.cells.insert(idx, cell);
            }
        }
        affected
    }

    /// Removes the cell at `tier`, returning it.
    ///
    /// Clearing an empty tier is a no-op.
    pub fn clear(&mut self, tier: Priority) -> Option<ValueCell> {
        self.find(tier).ok().map(|idx| self.cells.remove(idx))
    }

    /// Removes the animation cell if it is driven by `clock`.
    pub fn clear_clock(&mut self, clock: AnimationClock) -> Option<ValueCell> {
        match self.get(Priority::Animation) {
            Some(cell) if cell.clock() == Some(clock) => self.clear(Priority::Animation),
            _ => None,
        }
    }

    /// Returns the highest occupied cell.
    #[must_use]
    #[inline]
    pub fn effective(&self) -> Option<&ValueCell> {
        self.cells.first()
    }

    /// Returns the highest occupied cell strictly above `tier`.
    #[must_use]
    #[inline]
    pub fn top_above(&self, tier: Priority) -> Option<&ValueCell> {
        self.cells.first().filter(|cell| cell.priority() > tier)
    }

    /// Returns the cell at `tier`.
    #[must_use]
    pub fn get(&self, tier: Priority) -> Option<&ValueCell> {
        self.find(tier).ok().map(|idx| &self.cells[idx])
    }

    /// Returns the cell at `tier` mutably.
    #[must_use]
    pub fn get_mut(&mut self, tier: Priority) -> Option<&mut ValueCell> {
        self.find(tier).ok().map(|idx| &mut self.cells[idx])
    }

    /// Returns the number of occupied tiers.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if no tier is occupied.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates occupied cells, highest first.
    pub fn iter(&self) -> impl Iterator<Item = &ValueCell> + '_ {
        self.cells.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn tier_value(tier: Priority) -> i32 {
        tier as i32
    }

    fn top_value(ladder: &PriorityLadder) -> Option<i32> {
        ladder
            .effective()
            .and_then(|cell| cell.read().downcast_ref::<i32>().copied())
    }

    fn tiers_in(mask: u32) -> Vec<Priority> {
        Priority::ALL
            .iter()
            .copied()
            .filter(|tier| mask & (1 << (*tier as u32)) != 0)
            .collect()
    }

    #[test]
    fn every_tier_combination_resolves_to_the_highest() {
        for mask in 0_u32..64 {
            let tiers = tiers_in(mask);
            let expected = tiers.iter().copied().max().map(tier_value);

            let mut ascending = PriorityLadder::new();
            for tier in tiers.iter().rev() {
                ascending.set(*tier, ErasedValue::new(tier_value(*tier)));
            }
            let mut descending = PriorityLadder::new();
            for tier in &tiers {
                descending.set(*tier, ErasedValue::new(tier_value(*tier)));
            }

            assert_eq!(top_value(&ascending), expected, "mask {mask:#08b}");
            assert_eq!(top_value(&descending), expected, "mask {mask:#08b}");
            assert_eq!(ascending.len(), tiers.len());
        }
    }

    #[test]
    fn clearing_each_tier_of_each_combination_falls_to_the_next() {
        for mask in 0_u32..64 {
            for cleared in Priority::ALL {
                let mut ladder = PriorityLadder::new();
                for tier in tiers_in(mask) {
                    ladder.set(tier, ErasedValue::new(tier_value(tier)));
                }
                let was_top = ladder.is_top(cleared);
                let removed = ladder.clear(cleared);
                assert_eq!(removed.is_some(), mask & (1 << (cleared as u32)) != 0);

                let remaining = mask & !(1 << (cleared as u32));
                let expected = tiers_in(remaining).into_iter().max().map(tier_value);
                assert_eq!(top_value(&ladder), expected);
                if !was_top && removed.is_some() {
                    // Bookkeeping only: the top is whatever it was.
                    assert!(expected > Some(tier_value(cleared)));
                }
            }
        }
    }

    #[test]
    fn random_sequences_match_a_model() {
        let mut model: [Option<i32>; Priority::COUNT] = [None; Priority::COUNT];
        let mut ladder = PriorityLadder::new();
        let mut seed = 0x2545_f491_u32;

        for step in 0..2000 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let tier = Priority::ALL[(seed >> 16) as usize % Priority::COUNT];
            let slot = tier as usize;
            let model_top = (0..Priority::COUNT).rev().find(|i| model[*i].is_some());

            if (seed >> 8) & 1 == 0 {
                let value = step;
                let expect_affected = model_top.is_none_or(|top| top <= slot);
                assert_eq!(ladder.set(tier, ErasedValue::new(value)), expect_affected);
                model[slot] = Some(value);
            } else {
                let removed = ladder.clear(tier);
                assert_eq!(removed.is_some(), model[slot].is_some());
                model[slot] = None;
            }

            let expected = (0..Priority::COUNT).rev().find_map(|i| model[i]);
            assert_eq!(top_value(&ladder), expected, "step {step}");
        }
    }

    #[test]
    fn clearing_an_empty_tier_is_a_no_op() {
        let mut ladder = PriorityLadder::new();
        ladder.set(Priority::StyleBase, ErasedValue::new(1_i32));
        assert!(ladder.clear(Priority::LocalValue).is_none());
        assert!(ladder.clear(Priority::LocalValue).is_none());
        assert_eq!(top_value(&ladder), Some(1));
        assert_eq!(ladder.len(), 1);
    }

    #[test]
    fn same_tier_last_write_wins() {
        let mut ladder = PriorityLadder::new();
        ladder.set(Priority::StyleTrigger, ErasedValue::new(1_i32));
        assert!(ladder.set(Priority::StyleTrigger, ErasedValue::new(2_i32)));
        assert_eq!(top_value(&ladder), Some(2));
        assert_eq!(ladder.len(), 1);
    }

    #[test]
    fn typed_writes_reuse_the_cell() {
        let mut ladder = PriorityLadder::new();
        ladder.set_typed(Priority::Animation, 0.0_f64, Some(AnimationClock(1)));
        let before: *const f64 = ladder
            .get(Priority::Animation)
            .and_then(|cell| cell.read().downcast_ref::<f64>())
            .unwrap();
        ladder.set_typed(Priority::Animation, 0.5_f64, Some(AnimationClock(1)));
        let after: *const f64 = ladder
            .get(Priority::Animation)
            .and_then(|cell| cell.read().downcast_ref::<f64>())
            .unwrap();
        assert_eq!(before, after);
        assert_eq!(
            ladder.effective().unwrap().read().downcast_ref::<f64>(),
            Some(&0.5)
        );
    }

    #[test]
    fn clock_clear_only_matches_its_clock() {
        let mut ladder = PriorityLadder::new();
        ladder.insert(ValueCell::animated(ErasedValue::new(1_i32), AnimationClock(3)));
        assert!(ladder.clear_clock(AnimationClock(4)).is_none());
        assert!(ladder.clear_clock(AnimationClock(3)).is_some());
        assert!(ladder.is_empty());
    }

    #[test]
    fn top_above_excludes_lower_tiers() {
        let mut ladder = PriorityLadder::new();
        ladder.set(Priority::Inherited, ErasedValue::new(1_i32));
        assert!(ladder.top_above(Priority::Inherited).is_none());
        assert!(ladder.top_above(Priority::Default).is_some());
        ladder.set(Priority::StyleBase, ErasedValue::new(2_i32));
        assert_eq!(
            ladder.top_above(Priority::Inherited).map(ValueCell::priority),
            Some(Priority::StyleBase)
        );
    }
}
