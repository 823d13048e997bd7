//! Teacher model and teaching assignments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::availability::UnavailabilityMap;
use super::config::{ScheduleConfig, Weekday};

/// A teacher who can be assigned to timetable entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    /// Unique teacher identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Daily workload ceiling.
    pub max_classes_per_day: u8,
    /// Unavailability in either supported representation.
    pub unavailable: UnavailabilityMap,
}

impl Teacher {
    /// Creates a teacher with a default daily ceiling of 4.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            max_classes_per_day: 4,
            unavailable: UnavailabilityMap::new(),
        }
    }

    /// Sets the daily workload ceiling.
    pub fn with_max_classes_per_day(mut self, max: u8) -> Self {
        self.max_classes_per_day = max.max(1);
        self
    }

    /// Sets the unavailability map.
    pub fn with_unavailability(mut self, unavailable: UnavailabilityMap) -> Self {
        self.unavailable = unavailable;
        self
    }

    /// Resolved blocked (weekday, period) pairs for this teacher.
    pub fn blocked_slots(&self, config: &ScheduleConfig) -> BTreeSet<(Weekday, u8)> {
        self.unavailable.resolve(config)
    }

    /// Whether this teacher carries any explicit unavailability.
    pub fn has_constraints(&self) -> bool {
        !self.unavailable.is_empty()
    }
}

/// Grants a teacher the right to teach one subject for a batch.
///
/// An empty `sections` list covers every section of the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherSubjectAssignment {
    /// Teacher identifier.
    pub teacher_id: String,
    /// Subject code.
    pub subject_code: String,
    /// Batch code the subject belongs to.
    pub batch_code: String,
    /// Section labels covered; empty means all sections of the batch.
    pub sections: Vec<String>,
}

impl TeacherSubjectAssignment {
    /// Creates an assignment covering all sections of the batch.
    pub fn new(
        teacher_id: impl Into<String>,
        subject_code: impl Into<String>,
        batch_code: impl Into<String>,
    ) -> Self {
        Self {
            teacher_id: teacher_id.into(),
            subject_code: subject_code.into(),
            batch_code: batch_code.into(),
            sections: Vec::new(),
        }
    }

    /// Restricts the assignment to specific section labels.
    pub fn with_sections(mut self, sections: Vec<String>) -> Self {
        self.sections = sections;
        self
    }

    /// Whether this assignment covers a (subject, section) pair.
    pub fn covers(&self, subject_code: &str, batch_code: &str, section_label: &str) -> bool {
        self.subject_code == subject_code
            && self.batch_code == batch_code
            && (self.sections.is_empty() || self.sections.iter().any(|s| s == section_label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::availability::MinuteRange;

    #[test]
    fn test_teacher_builder() {
        let t = Teacher::new("T1", "Dr. Ayesha").with_max_classes_per_day(3);
        assert_eq!(t.id, "T1");
        assert_eq!(t.max_classes_per_day, 3);
        assert!(!t.has_constraints());
    }

    #[test]
    fn test_blocked_slots_resolution() {
        let config = ScheduleConfig::default();
        let t = Teacher::new("T1", "Dr. Ayesha").with_unavailability(
            UnavailabilityMap::new()
                .block_periods(Weekday::Monday, vec![1, 2])
                .block_range(Weekday::Friday, MinuteRange::new(480, 540)),
        );
        let blocked = t.blocked_slots(&config);
        assert!(blocked.contains(&(Weekday::Monday, 1)));
        assert!(blocked.contains(&(Weekday::Friday, 1)));
        assert_eq!(blocked.len(), 3);
        assert!(t.has_constraints());
    }

    #[test]
    fn test_assignment_covers_all_sections_when_empty() {
        let a = TeacherSubjectAssignment::new("T1", "CS-301", "21SW");
        assert!(a.covers("CS-301", "21SW", "21SW-I"));
        assert!(a.covers("CS-301", "21SW", "21SW-III"));
        assert!(!a.covers("CS-302", "21SW", "21SW-I"));
        assert!(!a.covers("CS-301", "22SW", "22SW-I"));
    }

    #[test]
    fn test_assignment_section_subset() {
        let a = TeacherSubjectAssignment::new("T1", "CS-301", "21SW")
            .with_sections(vec!["21SW-II".into()]);
        assert!(a.covers("CS-301", "21SW", "21SW-II"));
        assert!(!a.covers("CS-301", "21SW", "21SW-I"));
    }
}
