//! The weekly slot grid.
//!
//! A timetable week is the cartesian product of ordered day labels and
//! ordered per-day period labels (uniform across days). Each (day,
//! period) cell is one schedulable slot, addressed by a flat index:
//!
//! ```text
//! flat = day * periods_per_day + period
//! ```
//!
//! The mapping is total and bijective for the lifetime of a run. Some
//! period indices may be designated breaks; break slots are blocked for
//! every session on every day.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;

use crate::error::ConfigurationError;

/// A slot named by its grid coordinates.
///
/// Used in rule configuration, where naming "Wednesday, second period"
/// is clearer than a flat index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRef {
    /// Day index into [`SlotGrid::days`].
    pub day: usize,
    /// Period index into [`SlotGrid::periods`].
    pub period: usize,
}

impl SlotRef {
    /// Creates a slot reference.
    pub fn new(day: usize, period: usize) -> Self {
        Self { day, period }
    }

    /// Resolves this reference to a flat index, bounds-checked.
    pub fn resolve(&self, grid: &SlotGrid, rule: &str) -> Result<usize, ConfigurationError> {
        if self.day >= grid.days.len() || self.period >= grid.periods.len() {
            return Err(ConfigurationError::SlotOutOfRange {
                rule: rule.to_string(),
                day: self.day,
                period: self.period,
            });
        }
        Ok(grid.flat_index(self.day, self.period))
    }
}

/// The immutable day × period structure of a timetable week.
///
/// Constructed once per run and treated as read-only configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotGrid {
    days: Vec<String>,
    periods: Vec<String>,
    /// Period indices blocked on every day.
    breaks: BTreeSet<usize>,
}

impl SlotGrid {
    /// Creates a grid from ordered day labels, ordered period labels,
    /// and the set of break period indices.
    ///
    /// # Errors
    /// `MalformedGrid` if either label list is empty or a break index
    /// falls outside the period range.
    pub fn new(
        days: Vec<String>,
        periods: Vec<String>,
        breaks: impl IntoIterator<Item = usize>,
    ) -> Result<Self, ConfigurationError> {
        if days.is_empty() {
            return Err(ConfigurationError::MalformedGrid(
                "no day labels".to_string(),
            ));
        }
        if periods.is_empty() {
            return Err(ConfigurationError::MalformedGrid(
                "no period labels".to_string(),
            ));
        }
        let breaks: BTreeSet<usize> = breaks.into_iter().collect();
        if let Some(&bad) = breaks.iter().find(|&&b| b >= periods.len()) {
            return Err(ConfigurationError::MalformedGrid(format!(
                "break period index {bad} exceeds the {} periods per day",
                periods.len()
            )));
        }
        Ok(Self {
            days,
            periods,
            breaks,
        })
    }

    /// Ordered day labels.
    pub fn days(&self) -> &[String] {
        &self.days
    }

    /// Ordered per-day period labels.
    pub fn periods(&self) -> &[String] {
        &self.periods
    }

    /// Number of periods in each day.
    #[inline]
    pub fn periods_per_day(&self) -> usize {
        self.periods.len()
    }

    /// Total number of slots in the week.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.days.len() * self.periods.len()
    }

    /// Flat index of (day, period). Callers must pass in-range indices.
    #[inline]
    pub fn flat_index(&self, day: usize, period: usize) -> usize {
        day * self.periods.len() + period
    }

    /// Day index of a flat slot.
    #[inline]
    pub fn day_of(&self, flat: usize) -> usize {
        flat / self.periods.len()
    }

    /// Period index of a flat slot.
    #[inline]
    pub fn period_of(&self, flat: usize) -> usize {
        flat % self.periods.len()
    }

    /// Whether a flat slot is a break.
    #[inline]
    pub fn is_break(&self, flat: usize) -> bool {
        self.breaks.contains(&self.period_of(flat))
    }

    /// The flat slot range covering one day.
    pub fn day_slots(&self, day: usize) -> Range<usize> {
        let start = day * self.periods.len();
        start..start + self.periods.len()
    }

    /// Iterates all flat slot indices in order.
    pub fn slots(&self) -> Range<usize> {
        0..self.slot_count()
    }

    /// Number of non-break slots in the week.
    pub fn teachable_slot_count(&self) -> usize {
        (self.periods.len() - self.breaks.len()) * self.days.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn test_flat_index_bijection() {
        let grid = SlotGrid::new(labels("D", 3), labels("P", 4), []).unwrap();
        assert_eq!(grid.slot_count(), 12);
        for day in 0..3 {
            for period in 0..4 {
                let flat = grid.flat_index(day, period);
                assert_eq!(grid.day_of(flat), day);
                assert_eq!(grid.period_of(flat), period);
            }
        }
        // Every flat index maps back to a unique (day, period)
        let pairs: std::collections::HashSet<_> =
            grid.slots().map(|f| (grid.day_of(f), grid.period_of(f))).collect();
        assert_eq!(pairs.len(), 12);
    }

    #[test]
    fn test_break_detection() {
        let grid = SlotGrid::new(labels("D", 5), labels("P", 5), [2]).unwrap();
        for day in 0..5 {
            assert!(grid.is_break(grid.flat_index(day, 2)));
            assert!(!grid.is_break(grid.flat_index(day, 0)));
            assert!(!grid.is_break(grid.flat_index(day, 4)));
        }
        assert_eq!(grid.teachable_slot_count(), 20);
    }

    #[test]
    fn test_day_slots() {
        let grid = SlotGrid::new(labels("D", 3), labels("P", 4), []).unwrap();
        assert_eq!(grid.day_slots(0), 0..4);
        assert_eq!(grid.day_slots(2), 8..12);
    }

    #[test]
    fn test_empty_days_rejected() {
        let err = SlotGrid::new(vec![], labels("P", 4), []).unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedGrid(_)));
    }

    #[test]
    fn test_empty_periods_rejected() {
        let err = SlotGrid::new(labels("D", 5), vec![], []).unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedGrid(_)));
    }

    #[test]
    fn test_break_out_of_range_rejected() {
        let err = SlotGrid::new(labels("D", 5), labels("P", 4), [4]).unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedGrid(_)));
    }

    #[test]
    fn test_slot_ref_resolve() {
        let grid = SlotGrid::new(labels("D", 5), labels("P", 4), []).unwrap();
        assert_eq!(SlotRef::new(2, 1).resolve(&grid, "r").unwrap(), 9);

        let err = SlotRef::new(5, 0).resolve(&grid, "fixed_slots").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::SlotOutOfRange { ref rule, day: 5, period: 0 } if rule == "fixed_slots"
        ));
    }
}
