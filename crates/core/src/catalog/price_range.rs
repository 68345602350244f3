//! Two-handle price range selection.
//!
//! Dragging a handle only moves the *temporary* range; [`PriceRangeSelector::apply`]
//! commits it to the *applied* range that drives filtering. Presets commit
//! both at once. The lower handle always stays at least [`MIN_GAP`] below the
//! upper one.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lowest selectable price.
pub const PRICE_FLOOR: Decimal = Decimal::ZERO;
/// Highest selectable price.
pub const PRICE_CEILING: Decimal = Decimal::from_parts(2000, 0, 0, false, 0);
/// Minimum distance between the two handles.
pub const MIN_GAP: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// An inclusive price interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl PriceRange {
    /// The full selectable range.
    pub const FULL: Self = Self {
        min: PRICE_FLOOR,
        max: PRICE_CEILING,
    };

    #[must_use]
    pub const fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn contains(&self, price: Decimal) -> bool {
        self.min <= price && price <= self.max
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self::FULL
    }
}

/// A named shortcut range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricePreset {
    pub label: &'static str,
    #[serde(flatten)]
    pub range: PriceRange,
}

const fn dollars(amount: u32) -> Decimal {
    Decimal::from_parts(amount, 0, 0, false, 0)
}

const fn preset(label: &'static str, min: u32, max: u32) -> PricePreset {
    PricePreset {
        label,
        range: PriceRange::new(dollars(min), dollars(max)),
    }
}

/// Shortcut ranges offered next to the slider.
pub const PRICE_PRESETS: [PricePreset; 5] = [
    preset("Under $50", 0, 50),
    preset("$50 - $100", 50, 100),
    preset("$100 - $250", 100, 250),
    preset("$250 - $500", 250, 500),
    preset("$500+", 500, 2000),
];

/// State of the price slider: what the user is dragging vs. what is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRangeSelector {
    temporary: PriceRange,
    applied: PriceRange,
}

impl PriceRangeSelector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The range currently shown on the handles.
    #[must_use]
    pub const fn temporary(&self) -> PriceRange {
        self.temporary
    }

    /// The committed range used for filtering.
    #[must_use]
    pub const fn applied(&self) -> PriceRange {
        self.applied
    }

    /// True when the handles have moved since the last commit.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.temporary != self.applied
    }

    /// Move the lower handle. Clamped to `[floor, max - gap]`.
    pub fn drag_min(&mut self, value: Decimal) {
        let upper = self.temporary.max - MIN_GAP;
        self.temporary.min = value.max(PRICE_FLOOR).min(upper);
    }

    /// Move the upper handle. Clamped to `[min + gap, ceiling]`.
    pub fn drag_max(&mut self, value: Decimal) {
        let lower = self.temporary.min + MIN_GAP;
        self.temporary.max = value.min(PRICE_CEILING).max(lower);
    }

    /// Commit the temporary range.
    pub fn apply(&mut self) -> PriceRange {
        self.applied = self.temporary;
        self.applied
    }

    /// Jump to a preset, committing it immediately.
    pub fn select_preset(&mut self, preset: &PricePreset) -> PriceRange {
        self.temporary = preset.range;
        self.applied = preset.range;
        self.applied
    }

    /// Back to the full range.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_does_not_apply() {
        let mut selector = PriceRangeSelector::new();
        selector.drag_min(dollars(100));
        selector.drag_max(dollars(300));

        assert_eq!(selector.applied(), PriceRange::FULL);
        assert!(selector.has_pending_changes());

        let applied = selector.apply();
        assert_eq!(applied, PriceRange::new(dollars(100), dollars(300)));
        assert!(!selector.has_pending_changes());
    }

    #[test]
    fn test_handles_clamp_instead_of_crossing() {
        let mut selector = PriceRangeSelector::new();
        selector.drag_max(dollars(200));
        selector.drag_min(dollars(500));
        assert_eq!(selector.temporary().min, dollars(190));

        selector.drag_max(dollars(0));
        assert_eq!(selector.temporary().max, dollars(200));
    }

    #[test]
    fn test_handles_clamp_to_bounds() {
        let mut selector = PriceRangeSelector::new();
        selector.drag_min(Decimal::from(-25));
        selector.drag_max(dollars(9_999));
        assert_eq!(selector.temporary(), PriceRange::FULL);
    }

    #[test]
    fn test_gap_holds_after_any_drag() {
        let mut selector = PriceRangeSelector::new();
        for value in [0, 5, 1_995, 2_000, 1_000, 1_004, 3_000] {
            selector.drag_min(dollars(value));
            selector.drag_max(dollars(value));
            let range = selector.temporary();
            assert!(range.max - range.min >= MIN_GAP, "{range:?}");
        }
    }

    #[test]
    fn test_preset_commits_both_ranges() {
        let mut selector = PriceRangeSelector::new();
        selector.drag_min(dollars(40));
        let applied = selector.select_preset(&PRICE_PRESETS[1]);

        assert_eq!(applied, PriceRange::new(dollars(50), dollars(100)));
        assert_eq!(selector.temporary(), applied);
    }

    #[test]
    fn test_presets_respect_gap_and_bounds() {
        for preset in PRICE_PRESETS {
            assert!(preset.range.max - preset.range.min >= MIN_GAP);
            assert!(preset.range.min >= PRICE_FLOOR);
            assert!(preset.range.max <= PRICE_CEILING);
        }
    }

    #[test]
    fn test_reset() {
        let mut selector = PriceRangeSelector::new();
        selector.select_preset(&PRICE_PRESETS[4]);
        selector.reset();
        assert_eq!(selector, PriceRangeSelector::default());
    }
}
