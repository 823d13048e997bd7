//! Academic timetabling framework.
//!
//! Assigns theory and practical classes to weekday/period slots, teachers,
//! and rooms for a set of student sections, under a mixed hard/soft
//! constraint set. Construction is rule-enforcing and incremental;
//! optimization is population-based; validation and repair operate on the
//! finished entry set.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Subject`, `Teacher`, `Classroom`,
//!   `Batch`/`Section`, `ScheduleConfig`, `TimetableEntry`,
//!   `TimetableProblem`
//! - **`validation`**: The closed constraint set, weighted penalties, and
//!   the pure `validate` pass
//! - **`allocation`**: Room/lab allocation with building tiers, the
//!   same-lab rule, and bounded relocation cascades
//! - **`scheduler`**: Constructive section-by-section building and
//!   violation repair
//! - **`ga`**: Evolutionary optimization over candidate timetables
//! - **`engine`**: Orchestration of full generation runs
//!
//! # Example
//!
//! ```
//! use timetabler::engine::GenerationEngine;
//! use timetabler::models::{
//!     Batch, Classroom, NoExternalSchedules, ScheduleConfig, Subject, Teacher,
//!     TeacherSubjectAssignment, TimetableProblem,
//! };
//!
//! let config = ScheduleConfig::default()
//!     .with_batch("21SW")
//!     .with_min_classes_per_day(1);
//! let problem = TimetableProblem::new(config)
//!     .with_batch(Batch::new("21SW"))
//!     .with_subject(Subject::new("CS-301", "Operating Systems", "21SW").with_credits(3))
//!     .with_teacher(Teacher::new("T1", "Dr. Ayesha"))
//!     .with_classroom(Classroom::new("R1", "Room 101", "Main"))
//!     .with_assignment(TeacherSubjectAssignment::new("T1", "CS-301", "21SW"));
//!
//! let outcome = GenerationEngine::constructive()
//!     .generate(&problem, &NoExternalSchedules, 42)
//!     .unwrap();
//! assert_eq!(outcome.entries.len(), 3);
//! ```

pub mod allocation;
pub mod engine;
pub mod ga;
pub mod models;
pub mod scheduler;
pub mod validation;
