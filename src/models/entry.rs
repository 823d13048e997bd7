//! Timetable entry model.
//!
//! An entry is the mutable unit of a timetable: one section sitting one
//! subject in one (weekday, period) slot. Entries are created by the
//! scheduler, reassigned in place during allocation and repair, and
//! recreated wholesale on each generation run.

use serde::{Deserialize, Serialize};

use super::config::{ScheduleConfig, Weekday};

/// One scheduled class for a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableEntry {
    /// Weekday of the slot.
    pub day: Weekday,
    /// Period of the slot (1-based).
    pub period: u8,
    /// Subject code.
    pub subject_code: String,
    /// Assigned teacher; `None` while unresolved.
    pub teacher_id: Option<String>,
    /// Assigned room; `None` while unresolved.
    pub classroom_id: Option<String>,
    /// Section label, e.g. "21SW-II".
    pub section: String,
    /// Whether this entry belongs to a practical block.
    pub is_practical: bool,
    /// Whether this entry was injected beyond the regular frequency.
    pub is_extra: bool,
}

impl TimetableEntry {
    /// Creates an unresolved entry at a slot.
    pub fn new(
        day: Weekday,
        period: u8,
        subject_code: impl Into<String>,
        section: impl Into<String>,
    ) -> Self {
        Self {
            day,
            period,
            subject_code: subject_code.into(),
            teacher_id: None,
            classroom_id: None,
            section: section.into(),
            is_practical: false,
            is_extra: false,
        }
    }

    /// Sets the teacher.
    pub fn with_teacher(mut self, teacher_id: impl Into<String>) -> Self {
        self.teacher_id = Some(teacher_id.into());
        self
    }

    /// Sets the classroom.
    pub fn with_classroom(mut self, classroom_id: impl Into<String>) -> Self {
        self.classroom_id = Some(classroom_id.into());
        self
    }

    /// Marks the entry as part of a practical block.
    pub fn practical(mut self) -> Self {
        self.is_practical = true;
        self
    }

    /// Marks the entry as injected beyond the regular frequency.
    pub fn extra(mut self) -> Self {
        self.is_extra = true;
        self
    }

    /// The (weekday, period) slot of this entry.
    pub fn slot(&self) -> (Weekday, u8) {
        (self.day, self.period)
    }

    /// Clock window of this entry as (start, end) minutes from midnight.
    pub fn time_window(&self, config: &ScheduleConfig) -> (u16, u16) {
        config.period_window(self.period)
    }
}

/// Entries belonging to one section, in slot order.
pub fn entries_for_section<'a>(
    entries: &'a [TimetableEntry],
    section: &str,
) -> Vec<&'a TimetableEntry> {
    let mut found: Vec<&TimetableEntry> = entries
        .iter()
        .filter(|e| e.section == section)
        .collect();
    found.sort_by_key(|e| (e.day, e.period));
    found
}

/// Entries on one weekday for one section, in period order.
pub fn entries_for_day<'a>(
    entries: &'a [TimetableEntry],
    section: &str,
    day: Weekday,
) -> Vec<&'a TimetableEntry> {
    let mut found: Vec<&TimetableEntry> = entries
        .iter()
        .filter(|e| e.section == section && e.day == day)
        .collect();
    found.sort_by_key(|e| e.period);
    found
}
