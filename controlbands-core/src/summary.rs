// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Mergeable moving-range summary
//!
//! A [`Summary`] keeps only counts and sums, so partial summaries computed at
//! different times can be combined without re-reading raw observations:
//!
//! ```text
//!   [49.6, 47.6, 49.9, 51.3, 47.8] ──► A (baseline None)
//!   [51.2, 52.6, 52.4, 53.6, 52.1] ──► B (baseline 47.8)
//!
//!   A.merge(&B) == register all ten values into one summary
//! ```
//!
//! Dispersion is the average moving range unbiased by the d2 constant for
//! subgroups of two (see the NIST handbook, section 6.3.2.2).

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// d2 unbiasing constant for a moving range of subgroup size 2
pub const D2: f64 = 1.128;

/// Count/sum aggregate of raw values and their successive absolute differences
///
/// `merge` is associative. All count and sum fields are also commutative,
/// but `last_value` always comes from the right operand, so callers fold
/// summaries oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "SummaryRepr", into = "SummaryRepr")]
pub struct Summary {
    item_count: u64,
    item_sum: f64,
    range_count: u64,
    range_sum: f64,
    last_value: Option<f64>,
}

impl Summary {
    /// Zero summary with no baseline
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero counts, continuing from an earlier observation
    pub fn seeded(last_value: Option<f64>) -> Self {
        Self {
            last_value,
            ..Self::default()
        }
    }

    /// Register every value, in order, on top of `baseline`
    pub fn from_values<I>(baseline: Option<f64>, values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut summary = Self::seeded(baseline);
        for value in values {
            summary.register(value);
        }
        summary
    }

    /// Account for one observation.
    ///
    /// Non-finite input must be rejected before it gets here.
    #[inline]
    pub fn register(&mut self, value: f64) {
        self.item_count += 1;
        self.item_sum += value;

        if let Some(last) = self.last_value {
            self.range_count += 1;
            self.range_sum += (last - value).abs();
        }

        self.last_value = Some(value);
    }

    /// Chronological concatenation of `self` followed by `other`
    #[must_use]
    pub fn merge(&self, other: &Summary) -> Summary {
        Summary {
            item_count: self.item_count + other.item_count,
            item_sum: self.item_sum + other.item_sum,
            range_count: self.range_count + other.range_count,
            range_sum: self.range_sum + other.range_sum,
            last_value: other.last_value,
        }
    }

    pub fn item_count(&self) -> u64 {
        self.item_count
    }

    pub fn item_sum(&self) -> f64 {
        self.item_sum
    }

    pub fn range_count(&self) -> u64 {
        self.range_count
    }

    pub fn range_sum(&self) -> f64 {
        self.range_sum
    }

    /// Baseline for the next moving range
    pub fn last_value(&self) -> Option<f64> {
        self.last_value
    }

    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }

    /// Mean of the registered values (0 when empty)
    pub fn mean(&self) -> f64 {
        if self.item_count == 0 {
            0.0
        } else {
            self.item_sum / self.item_count as f64
        }
    }

    /// Average moving range divided by [`D2`] (0 until a range exists)
    pub fn dispersion(&self) -> f64 {
        if self.range_count == 0 {
            0.0
        } else {
            self.range_sum / self.range_count as f64 / D2
        }
    }

    /// Check the invariants a restored summary must satisfy
    pub fn validate(&self) -> CoreResult<()> {
        if !self.item_sum.is_finite() || !self.range_sum.is_finite() {
            return Err(CoreError::CorruptSummary(format!(
                "non-finite sums (items {}, ranges {})",
                self.item_sum, self.range_sum
            )));
        }
        if self.range_sum < 0.0 {
            return Err(CoreError::CorruptSummary(format!(
                "negative range sum {}",
                self.range_sum
            )));
        }
        if self.range_count > self.item_count {
            return Err(CoreError::CorruptSummary(format!(
                "range count {} exceeds item count {}",
                self.range_count, self.item_count
            )));
        }
        if self.range_count == 0 && self.range_sum != 0.0 {
            return Err(CoreError::CorruptSummary(format!(
                "range sum {} without any ranges",
                self.range_sum
            )));
        }
        // Every item after the first (or every item, once seeded) adds a range
        if self.item_count > 0 && self.range_count < self.item_count - 1 {
            return Err(CoreError::CorruptSummary(format!(
                "{} items but only {} ranges",
                self.item_count, self.range_count
            )));
        }
        if self.item_count == 0 && (self.item_sum != 0.0 || self.range_count != 0) {
            return Err(CoreError::CorruptSummary(
                "empty summary carries sums".to_string(),
            ));
        }
        match self.last_value {
            None if self.item_count > 0 => Err(CoreError::CorruptSummary(format!(
                "{} items but no last value",
                self.item_count
            ))),
            Some(last) if !last.is_finite() => Err(CoreError::CorruptSummary(format!(
                "non-finite last value {}",
                last
            ))),
            _ => Ok(()),
        }
    }
}

/// Wire shape of a [`Summary`]; validated on the way in
#[derive(Serialize, Deserialize)]
struct SummaryRepr {
    item_count: u64,
    item_sum: f64,
    range_count: u64,
    range_sum: f64,
    last_value: Option<f64>,
}

impl From<Summary> for SummaryRepr {
    fn from(s: Summary) -> Self {
        Self {
            item_count: s.item_count,
            item_sum: s.item_sum,
            range_count: s.range_count,
            range_sum: s.range_sum,
            last_value: s.last_value,
        }
    }
}

impl TryFrom<SummaryRepr> for Summary {
    type Error = CoreError;

    fn try_from(r: SummaryRepr) -> Result<Self, Self::Error> {
        let summary = Summary {
            item_count: r.item_count,
            item_sum: r.item_sum,
            range_count: r.range_count,
            range_sum: r.range_sum,
            last_value: r.last_value,
        };
        summary.validate()?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // NIST handbook moving-range example
    const EXAMPLE_DATA: [f64; 10] = [49.6, 47.6, 49.9, 51.3, 47.8, 51.2, 52.6, 52.4, 53.6, 52.1];

    fn assert_matches_example(summary: &Summary) {
        assert_eq!(summary.item_count(), EXAMPLE_DATA.len() as u64);
        assert_eq!(summary.range_count(), EXAMPLE_DATA.len() as u64 - 1);
        assert!((summary.mean() - 50.81).abs() < 0.005);
        assert!((summary.dispersion() - 1.8778 / D2).abs() < 0.00005);
    }

    #[test]
    fn test_calculation() {
        let summary = Summary::from_values(None, EXAMPLE_DATA);
        assert_matches_example(&summary);
        assert_eq!(summary.last_value(), Some(52.1));
    }

    #[test]
    fn test_split_and_merge() {
        let first = Summary::from_values(None, EXAMPLE_DATA[..5].iter().copied());
        let second = Summary::from_values(Some(EXAMPLE_DATA[4]), EXAMPLE_DATA[5..].iter().copied());

        let merged = first.merge(&second);
        assert_matches_example(&merged);
        assert_eq!(merged.last_value(), Some(52.1));
    }

    #[test]
    fn test_merge_takes_right_baseline() {
        let left = Summary::from_values(None, [1.0, 2.0]);
        let right = Summary::from_values(Some(2.0), [9.0]);

        assert_eq!(left.merge(&right).last_value(), Some(9.0));
        assert_eq!(right.merge(&left).last_value(), Some(2.0));
        assert_eq!(left.merge(&right).item_count(), right.merge(&left).item_count());
    }

    #[test]
    fn test_merge_with_zero_is_identity_on_counts() {
        let summary = Summary::from_values(None, [3.0, 5.0, 4.0]);
        let merged = Summary::new().merge(&summary);
        assert_eq!(merged, summary);

        // Right-hand zero drops the baseline
        let merged = summary.merge(&Summary::new());
        assert_eq!(merged.item_count(), 3);
        assert_eq!(merged.last_value(), None);
    }

    #[test]
    fn test_empty_and_single_value() {
        let empty = Summary::new();
        assert_eq!(empty.mean(), 0.0);
        assert_eq!(empty.dispersion(), 0.0);
        assert!(empty.is_empty());

        let single = Summary::from_values(None, [5.0]);
        assert_eq!(single.mean(), 5.0);
        assert_eq!(single.dispersion(), 0.0);
        assert_eq!(single.range_count(), 0);
    }

    #[test]
    fn test_seeded_counts_first_range() {
        let summary = Summary::from_values(Some(3.0), [4.0, 5.0]);
        assert_eq!(summary.item_count(), 2);
        assert_eq!(summary.range_count(), 2);
        assert_eq!(summary.range_sum(), 2.0);
    }

    #[test]
    fn test_serde_round_trip() {
        let summary = Summary::from_values(None, EXAMPLE_DATA);
        let json = serde_json::to_string(&summary).unwrap();
        let restored: Summary = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, summary);
        assert_matches_example(&restored);
    }

    #[test]
    fn test_validate_rejects_corrupt_counts() {
        let json = r#"{"item_count":1,"item_sum":5.0,"range_count":2,"range_sum":1.0,"last_value":5.0}"#;
        assert!(serde_json::from_str::<Summary>(json).is_err());

        let json = r#"{"item_count":0,"item_sum":5.0,"range_count":0,"range_sum":0.0,"last_value":null}"#;
        assert!(serde_json::from_str::<Summary>(json).is_err());

        let json = r#"{"item_count":2,"item_sum":5.0,"range_count":1,"range_sum":1.0,"last_value":null}"#;
        assert!(serde_json::from_str::<Summary>(json).is_err());

        let json = r#"{"item_count":2,"item_sum":5.0,"range_count":1,"range_sum":-1.0,"last_value":2.0}"#;
        assert!(serde_json::from_str::<Summary>(json).is_err());

        let json = r#"{"item_count":3,"item_sum":3.0,"range_count":0,"range_sum":100.0,"last_value":1.0}"#;
        assert!(serde_json::from_str::<Summary>(json).is_err());

        let json = r#"{"item_count":10,"item_sum":50.0,"range_count":1,"range_sum":2.0,"last_value":5.0}"#;
        assert!(serde_json::from_str::<Summary>(json).is_err());
    }

    #[test]
    fn test_validate_accepts_reachable_counts() {
        assert!(Summary::from_values(None, [1.0, 2.0, 4.0]).validate().is_ok());
        assert!(Summary::from_values(Some(0.5), [1.0, 2.0, 4.0]).validate().is_ok());
        assert!(Summary::from_values(None, [3.0]).validate().is_ok());

        let json = r#"{"item_count":3,"item_sum":6.0,"range_count":2,"range_sum":2.0,"last_value":3.0}"#;
        assert!(serde_json::from_str::<Summary>(json).is_ok());
    }

    #[test]
    fn test_validate_accepts_seeded_zero() {
        let seeded = Summary::seeded(Some(4.0));
        assert!(seeded.validate().is_ok());
    }
}
