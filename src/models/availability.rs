//! Teacher unavailability and its normalization.
//!
//! Unavailability arrives in two shapes: a legacy per-day map (whole-day
//! flag or explicit period list) and a structured per-day list of clock
//! ranges. All downstream logic consumes one canonical form, the resolved
//! set of blocked (weekday, period) pairs produced by
//! [`UnavailabilityMap::resolve`].
//!
//! When both shapes name the same day, the union of the blocked periods
//! applies.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::config::{ScheduleConfig, Weekday};

/// A clock range in minutes from midnight, half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinuteRange {
    /// Range start (inclusive).
    pub start_min: u16,
    /// Range end (exclusive).
    pub end_min: u16,
}

impl MinuteRange {
    /// Creates a new range.
    pub fn new(start_min: u16, end_min: u16) -> Self {
        Self { start_min, end_min }
    }

    /// Whether this range overlaps a (start, end) window.
    pub fn overlaps(&self, start_min: u16, end_min: u16) -> bool {
        self.start_min < end_min && start_min < self.end_min
    }
}

/// Legacy per-day unavailability entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DayBlock {
    /// `true` blocks the whole day; `false` is a no-op entry.
    WholeDay(bool),
    /// Explicit blocked period numbers (1-based).
    Periods(Vec<u8>),
}

/// Per-teacher unavailability in both supported representations.
///
/// `legacy` is the flat day map; `ranges` is the structured clock-range
/// map. Either or both may be populated on one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnavailabilityMap {
    /// Legacy form: weekday to whole-day flag or period list.
    #[serde(default)]
    pub legacy: HashMap<Weekday, DayBlock>,
    /// Structured form: weekday to blocked clock ranges.
    #[serde(default)]
    pub ranges: HashMap<Weekday, Vec<MinuteRange>>,
}

impl UnavailabilityMap {
    /// Creates an empty map (always available).
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks an entire day (legacy form).
    pub fn block_day(mut self, day: Weekday) -> Self {
        self.legacy.insert(day, DayBlock::WholeDay(true));
        self
    }

    /// Blocks explicit periods on a day (legacy form).
    pub fn block_periods(mut self, day: Weekday, periods: Vec<u8>) -> Self {
        self.legacy.insert(day, DayBlock::Periods(periods));
        self
    }

    /// Blocks a clock range on a day (structured form).
    pub fn block_range(mut self, day: Weekday, range: MinuteRange) -> Self {
        self.ranges.entry(day).or_default().push(range);
        self
    }

    /// Whether no unavailability is recorded at all.
    pub fn is_empty(&self) -> bool {
        self.legacy.is_empty() && self.ranges.is_empty()
    }

    /// Resolves both representations into blocked (weekday, period) pairs.
    ///
    /// Periods outside the configured grid are dropped. A clock range
    /// blocks every period whose window it overlaps.
    pub fn resolve(&self, config: &ScheduleConfig) -> BTreeSet<(Weekday, u8)> {
        let mut blocked = BTreeSet::new();

        for (&day, entry) in &self.legacy {
            match entry {
                DayBlock::WholeDay(true) => {
                    for period in 1..=config.periods_per_day {
                        blocked.insert((day, period));
                    }
                }
                DayBlock::WholeDay(false) => {}
                DayBlock::Periods(periods) => {
                    for &period in periods {
                        if period >= 1 && period <= config.periods_per_day {
                            blocked.insert((day, period));
                        }
                    }
                }
            }
        }

        for (&day, ranges) in &self.ranges {
            for range in ranges {
                for period in 1..=config.periods_per_day {
                    let (start, end) = config.period_window(period);
                    if range.overlaps(start, end) {
                        blocked.insert((day, period));
                    }
                }
            }
        }

        blocked
    }
}
