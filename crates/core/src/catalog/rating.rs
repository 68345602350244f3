//! Star ratings and per-product rating summaries.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing [`Stars`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between 1 and 5, got {0}")]
pub struct StarsError(pub i64);

/// A single review score, 1 to 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Stars(u8);

impl Stars {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// # Errors
    ///
    /// Returns [`StarsError`] when `value` is outside 1..=5.
    pub fn new(value: i64) -> Result<Self, StarsError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(StarsError(value))
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Stars {
    type Error = StarsError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Stars> for i64 {
    fn from(stars: Stars) -> Self {
        Self::from(stars.0)
    }
}

impl From<Stars> for Decimal {
    fn from(stars: Stars) -> Self {
        Self::from(stars.0)
    }
}

/// Average rating (one decimal place) and review count for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub rating: Decimal,
    pub review_count: i32,
}

impl RatingSummary {
    #[must_use]
    pub const fn new(rating: Decimal, review_count: i32) -> Self {
        Self {
            rating,
            review_count,
        }
    }

    /// The summary as it would look with one more review.
    ///
    /// Returns a new value; `self` is untouched so callers can show the
    /// preview and later swap in the server's recomputed summary.
    #[must_use]
    pub fn with_review(&self, stars: Stars) -> Self {
        let count = self.review_count.saturating_add(1);
        let total = self.rating * Decimal::from(self.review_count) + Decimal::from(stars);
        let average = total / Decimal::from(count);
        Self {
            rating: Self::round(average),
            review_count: count,
        }
    }

    /// Summary computed from every score on record.
    #[must_use]
    pub fn from_scores(scores: &[Stars]) -> Self {
        let Ok(count) = i32::try_from(scores.len()) else {
            return Self::default();
        };
        if count == 0 {
            return Self::default();
        }
        let total: Decimal = scores.iter().copied().map(Decimal::from).sum();
        Self {
            rating: Self::round(total / Decimal::from(count)),
            review_count: count,
        }
    }

    fn round(value: Decimal) -> Decimal {
        value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stars(v: i64) -> Stars {
        Stars::new(v).unwrap()
    }

    #[test]
    fn test_stars_bounds() {
        assert!(Stars::new(0).is_err());
        assert!(Stars::new(6).is_err());
        assert!(Stars::new(-1).is_err());
        assert_eq!(stars(5).get(), 5);
    }

    #[test]
    fn test_stars_deserialize_validates() {
        assert!(serde_json::from_str::<Stars>("4").is_ok());
        assert!(serde_json::from_str::<Stars>("9").is_err());
    }

    #[test]
    fn test_with_review_leaves_original_untouched() {
        let original = RatingSummary::new(Decimal::new(40, 1), 4);
        let preview = original.with_review(stars(5));

        assert_eq!(original, RatingSummary::new(Decimal::new(40, 1), 4));
        assert_eq!(preview.review_count, 5);
        assert_eq!(preview.rating, Decimal::new(42, 1));
    }

    #[test]
    fn test_with_review_on_empty_summary() {
        let preview = RatingSummary::default().with_review(stars(3));
        assert_eq!(preview, RatingSummary::new(Decimal::from(3), 1));
    }

    #[test]
    fn test_from_scores_rounds_to_one_place() {
        let summary = RatingSummary::from_scores(&[stars(5), stars(4), stars(4)]);
        // 13 / 3 = 4.333..
        assert_eq!(summary.rating, Decimal::new(43, 1));
        assert_eq!(summary.review_count, 3);
        assert_eq!(RatingSummary::from_scores(&[]), RatingSummary::default());
    }

    #[test]
    fn test_preview_matches_recompute() {
        let existing = [stars(5), stars(3)];
        let preview = RatingSummary::from_scores(&existing).with_review(stars(4));
        let recomputed = RatingSummary::from_scores(&[stars(5), stars(3), stars(4)]);
        assert_eq!(preview, recomputed);
    }
}
