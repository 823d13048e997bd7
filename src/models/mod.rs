//! Timetabling domain models.
//!
//! Reference data is read-only during a generation run; the
//! [`TimetableEntry`] is the only mutable unit.
//!
//! # Entities
//!
//! | Type | Role |
//! |------|------|
//! | `Subject` | Theory or practical course of a batch |
//! | `Teacher` | Assignable staff with availability limits |
//! | `Classroom` | Regular room or laboratory |
//! | `Batch` / `Section` | Cohort and its concrete student groups |
//! | `ScheduleConfig` | Weekday/period grid and policy knobs |
//! | `TimetableEntry` | One scheduled class in one slot |

mod availability;
mod classroom;
mod config;
mod entry;
mod problem;
mod section;
mod subject;
mod teacher;

pub use availability::{DayBlock, MinuteRange, UnavailabilityMap};
pub use classroom::Classroom;
pub use config::{ConfigDefect, ConfigDefectKind, ScheduleConfig, Weekday};
pub use entry::{entries_for_day, entries_for_section, TimetableEntry};
pub use problem::{
    ExternalScheduleView, NoExternalSchedules, ProblemDefect, ProblemDefectKind, SnapshotView,
    TimetableProblem,
};
pub use section::{constrained_year, most_senior_year, Batch, Section};
pub use subject::{Subject, PRACTICAL_BLOCK_LEN};
pub use teacher::{Teacher, TeacherSubjectAssignment};
