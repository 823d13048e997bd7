//! Schedule configuration and the weekday/period time grid.
//!
//! A timetable is laid out on a grid of (weekday, period) slots. Periods
//! are 1-based and map to clock-time windows derived from the configured
//! day start and per-period duration. Friday may carry a lower period
//! ceiling than the other days.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A working weekday.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// All weekdays the grid can use, in calendar order.
    pub const ALL: [Weekday; 6] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Short display name ("Mon", "Tue", ...).
    pub fn short_name(&self) -> &'static str {
        match self {
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
        }
    }

    /// Position in calendar order (Monday = 0).
    pub fn index(&self) -> usize {
        Weekday::ALL.iter().position(|d| d == self).unwrap_or(0)
    }

    /// Whether two days are adjacent in calendar order.
    pub fn is_adjacent(&self, other: &Weekday) -> bool {
        self.index().abs_diff(other.index()) == 1
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_name())
    }
}

/// A configuration defect detected before a generation run.
///
/// Any defect is fatal: the engine refuses to create entries from a
/// broken configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDefect {
    /// Defect category.
    pub kind: ConfigDefectKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of configuration defects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigDefectKind {
    /// No working weekdays configured.
    NoWeekdays,
    /// Zero periods per day.
    NoPeriods,
    /// Zero-length period duration.
    NoPeriodDuration,
    /// No batch codes in scope.
    EmptyBatchList,
    /// Friday ceiling exceeds the period count.
    CeilingOutOfRange,
    /// Thesis day is not one of the configured weekdays.
    ThesisDayNotWorking,
}

impl ConfigDefect {
    fn new(kind: ConfigDefectKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Timetable grid configuration.
///
/// Defines the working week, the period grid, the clock mapping, and the
/// day-level policy knobs (Friday ceiling, thesis day, fatigue limits).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Working weekdays, in timetable order.
    pub days: Vec<Weekday>,
    /// Number of periods per day; periods are numbered 1..=periods_per_day.
    pub periods_per_day: u8,
    /// Day start, minutes from midnight (480 = 08:00).
    pub day_start_min: u16,
    /// Duration of one period in minutes.
    pub period_minutes: u16,
    /// Last usable period on Friday, if lower than the general ceiling.
    pub friday_period_ceiling: Option<u8>,
    /// Weekday reserved for thesis work of the most senior batch.
    pub thesis_day: Option<Weekday>,
    /// Minimum classes a section should have on any non-empty day.
    pub min_classes_per_day: u8,
    /// Maximum consecutive periods one teacher may take without a break.
    pub max_consecutive_for_teacher: u8,
    /// Batch codes in scope for a generation run.
    pub batch_codes: Vec<String>,
    /// Free-form constraint parameters.
    pub params: HashMap<String, String>,
}

impl ScheduleConfig {
    /// Creates a Monday-Friday configuration with the given grid.
    pub fn new(periods_per_day: u8, day_start_min: u16, period_minutes: u16) -> Self {
        Self {
            days: vec![
                Weekday::Monday,
                Weekday::Tuesday,
                Weekday::Wednesday,
                Weekday::Thursday,
                Weekday::Friday,
            ],
            periods_per_day,
            day_start_min,
            period_minutes,
            friday_period_ceiling: None,
            thesis_day: None,
            min_classes_per_day: 2,
            max_consecutive_for_teacher: 2,
            batch_codes: Vec::new(),
            params: HashMap::new(),
        }
    }

    /// Sets the working weekdays.
    pub fn with_days(mut self, days: Vec<Weekday>) -> Self {
        self.days = days;
        self
    }

    /// Sets the Friday period ceiling.
    pub fn with_friday_ceiling(mut self, last_period: u8) -> Self {
        self.friday_period_ceiling = Some(last_period);
        self
    }

    /// Reserves a weekday for the most senior batch's thesis work.
    pub fn with_thesis_day(mut self, day: Weekday) -> Self {
        self.thesis_day = Some(day);
        self
    }

    /// Sets the minimum classes per non-empty day.
    pub fn with_min_classes_per_day(mut self, min: u8) -> Self {
        self.min_classes_per_day = min;
        self
    }

    /// Sets the teacher consecutive-period limit.
    pub fn with_max_consecutive(mut self, max: u8) -> Self {
        self.max_consecutive_for_teacher = max;
        self
    }

    /// Adds a batch code to the run scope.
    pub fn with_batch(mut self, code: impl Into<String>) -> Self {
        self.batch_codes.push(code.into());
        self
    }

    /// Sets a free-form parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Last usable period on the given day.
    pub fn period_ceiling(&self, day: Weekday) -> u8 {
        match (day, self.friday_period_ceiling) {
            (Weekday::Friday, Some(ceiling)) => ceiling.min(self.periods_per_day),
            _ => self.periods_per_day,
        }
    }

    /// Usable periods on the given day, in order.
    pub fn periods_for(&self, day: Weekday) -> impl Iterator<Item = u8> {
        1..=self.period_ceiling(day)
    }

    /// Clock window of a period as (start, end) minutes from midnight.
    pub fn period_window(&self, period: u8) -> (u16, u16) {
        let start = self.day_start_min + u16::from(period.saturating_sub(1)) * self.period_minutes;
        (start, start + self.period_minutes)
    }

    /// End of the working day, minutes from midnight.
    pub fn day_end_min(&self) -> u16 {
        self.day_start_min + u16::from(self.periods_per_day) * self.period_minutes
    }

    /// Formats minutes-from-midnight as "HH:MM".
    pub fn format_minutes(min: u16) -> String {
        format!("{:02}:{:02}", min / 60, min % 60)
    }

    /// Validates the configuration.
    ///
    /// Returns every defect found; any defect is fatal for a run.
    pub fn validate(&self) -> Result<(), Vec<ConfigDefect>> {
        let mut defects = Vec::new();

        if self.days.is_empty() {
            defects.push(ConfigDefect::new(
                ConfigDefectKind::NoWeekdays,
                "no working weekdays configured",
            ));
        }
        if self.periods_per_day == 0 {
            defects.push(ConfigDefect::new(
                ConfigDefectKind::NoPeriods,
                "periods_per_day must be at least 1",
            ));
        }
        if self.period_minutes == 0 {
            defects.push(ConfigDefect::new(
                ConfigDefectKind::NoPeriodDuration,
                "period_minutes must be positive",
            ));
        }
        if self.batch_codes.is_empty() {
            defects.push(ConfigDefect::new(
                ConfigDefectKind::EmptyBatchList,
                "no batch codes in scope",
            ));
        }
        if let Some(ceiling) = self.friday_period_ceiling {
            if ceiling == 0 || ceiling > self.periods_per_day {
                defects.push(ConfigDefect::new(
                    ConfigDefectKind::CeilingOutOfRange,
                    format!(
                        "friday ceiling {} outside 1..={}",
                        ceiling, self.periods_per_day
                    ),
                ));
            }
        }
        if let Some(day) = self.thesis_day {
            if !self.days.contains(&day) {
                defects.push(ConfigDefect::new(
                    ConfigDefectKind::ThesisDayNotWorking,
                    format!("thesis day {day} is not a working day"),
                ));
            }
        }

        if defects.is_empty() {
            Ok(())
        } else {
            Err(defects)
        }
    }
}

impl Default for ScheduleConfig {
    /// Five days, seven periods, 08:00 start, 60-minute periods.
    fn default() -> Self {
        Self::new(7, 8 * 60, 60)
    }
}
