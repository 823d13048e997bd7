//! Generation input container and the external-schedule port.
//!
//! [`TimetableProblem`] bundles the read-only reference data one
//! generation run consumes. [`ExternalScheduleView`] exposes entries
//! committed by other generation contexts (other departments or
//! semesters) as a read-only snapshot for cross-schedule conflict
//! checks; the core never talks to storage directly.

use serde::{Deserialize, Serialize};

use super::classroom::Classroom;
use super::config::{ConfigDefect, ScheduleConfig, Weekday};
use super::entry::TimetableEntry;
use super::section::{Batch, Section};
use super::subject::Subject;
use super::teacher::{Teacher, TeacherSubjectAssignment};

/// A structural defect in the generation input.
///
/// Any defect is fatal: the engine aborts before creating entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDefect {
    /// Defect category.
    pub kind: ProblemDefectKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of input defects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProblemDefectKind {
    /// The schedule configuration itself is broken.
    Config(super::config::ConfigDefectKind),
    /// No classrooms at all.
    NoClassrooms,
    /// No teachers at all.
    NoTeachers,
    /// A scoped batch code has no batch record.
    UnknownBatch,
    /// A subject references a batch outside the problem.
    OrphanSubject,
    /// An assignment references an unknown teacher or subject.
    DanglingAssignment,
}

impl ProblemDefect {
    fn new(kind: ProblemDefectKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Read-only reference data for one generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimetableProblem {
    /// Subjects across all scoped batches.
    pub subjects: Vec<Subject>,
    /// Teachers available for assignment.
    pub teachers: Vec<Teacher>,
    /// Rooms and laboratories.
    pub classrooms: Vec<Classroom>,
    /// Batches (cohorts) in scope.
    pub batches: Vec<Batch>,
    /// Who may teach what, for which sections.
    pub assignments: Vec<TeacherSubjectAssignment>,
    /// Grid and policy configuration.
    pub config: ScheduleConfig,
}

impl TimetableProblem {
    /// Creates an empty problem over a configuration.
    pub fn new(config: ScheduleConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Adds a subject.
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    /// Adds a teacher.
    pub fn with_teacher(mut self, teacher: Teacher) -> Self {
        self.teachers.push(teacher);
        self
    }

    /// Adds a classroom.
    pub fn with_classroom(mut self, classroom: Classroom) -> Self {
        self.classrooms.push(classroom);
        self
    }

    /// Adds a batch.
    pub fn with_batch(mut self, batch: Batch) -> Self {
        self.batches.push(batch);
        self
    }

    /// Adds a teaching assignment.
    pub fn with_assignment(mut self, assignment: TeacherSubjectAssignment) -> Self {
        self.assignments.push(assignment);
        self
    }

    /// Sections of all scoped batches, in batch order.
    pub fn sections_in_scope(&self) -> Vec<Section> {
        self.batches
            .iter()
            .filter(|b| self.config.batch_codes.contains(&b.code))
            .flat_map(|b| b.sections())
            .collect()
    }

    /// Subjects taught to one batch.
    pub fn subjects_for_batch(&self, batch_code: &str) -> Vec<&Subject> {
        self.subjects
            .iter()
            .filter(|s| s.batch_code == batch_code)
            .collect()
    }

    /// Looks up a subject by code within a batch.
    pub fn subject(&self, code: &str, batch_code: &str) -> Option<&Subject> {
        self.subjects
            .iter()
            .find(|s| s.code == code && s.batch_code == batch_code)
    }

    /// Looks up a teacher by id.
    pub fn teacher(&self, id: &str) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.id == id)
    }

    /// Looks up a classroom by id.
    pub fn classroom(&self, id: &str) -> Option<&Classroom> {
        self.classrooms.iter().find(|c| c.id == id)
    }

    /// Teachers whose assignments cover (subject, section), in input order.
    pub fn qualified_teachers(&self, subject: &Subject, section: &Section) -> Vec<&Teacher> {
        let mut found = Vec::new();
        for assignment in &self.assignments {
            if assignment.covers(&subject.code, &section.batch_code, &section.label) {
                if let Some(teacher) = self.teacher(&assignment.teacher_id) {
                    if !found.iter().any(|t: &&Teacher| t.id == teacher.id) {
                        found.push(teacher);
                    }
                }
            }
        }
        found
    }

    /// Validates the generation input.
    ///
    /// Checks the configuration and the structural integrity of the
    /// reference data, returning every defect found.
    pub fn validate(&self) -> Result<(), Vec<ProblemDefect>> {
        let mut defects = Vec::new();

        if let Err(config_defects) = self.config.validate() {
            for ConfigDefect { kind, message } in config_defects {
                defects.push(ProblemDefect::new(ProblemDefectKind::Config(kind), message));
            }
        }

        if self.classrooms.is_empty() {
            defects.push(ProblemDefect::new(
                ProblemDefectKind::NoClassrooms,
                "no classrooms available",
            ));
        }
        if self.teachers.is_empty() {
            defects.push(ProblemDefect::new(
                ProblemDefectKind::NoTeachers,
                "no teachers available",
            ));
        }

        for code in &self.config.batch_codes {
            if !self.batches.iter().any(|b| &b.code == code) {
                defects.push(ProblemDefect::new(
                    ProblemDefectKind::UnknownBatch,
                    format!("scoped batch '{code}' has no batch record"),
                ));
            }
        }

        for subject in &self.subjects {
            if !self.batches.iter().any(|b| b.code == subject.batch_code) {
                defects.push(ProblemDefect::new(
                    ProblemDefectKind::OrphanSubject,
                    format!(
                        "subject '{}' references unknown batch '{}'",
                        subject.code, subject.batch_code
                    ),
                ));
            }
        }

        for assignment in &self.assignments {
            if self.teacher(&assignment.teacher_id).is_none() {
                defects.push(ProblemDefect::new(
                    ProblemDefectKind::DanglingAssignment,
                    format!(
                        "assignment references unknown teacher '{}'",
                        assignment.teacher_id
                    ),
                ));
            }
            if !self
                .subjects
                .iter()
                .any(|s| s.code == assignment.subject_code && s.batch_code == assignment.batch_code)
            {
                defects.push(ProblemDefect::new(
                    ProblemDefectKind::DanglingAssignment,
                    format!(
                        "assignment references unknown subject '{}' of batch '{}'",
                        assignment.subject_code, assignment.batch_code
                    ),
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

/// Read-only view of entries committed by other generation contexts.
///
/// Taken once at run start; the core does not observe updates made by
/// concurrent external runs.
pub trait ExternalScheduleView: Send + Sync {
    /// Entries committed outside this run's scope.
    fn committed_entries(&self) -> &[TimetableEntry];

    /// Whether a teacher is occupied externally at a slot.
    fn is_teacher_busy(&self, teacher_id: &str, day: Weekday, period: u8) -> bool {
        self.committed_entries().iter().any(|e| {
            e.day == day && e.period == period && e.teacher_id.as_deref() == Some(teacher_id)
        })
    }
}

/// An external view with no committed entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExternalSchedules;

impl ExternalScheduleView for NoExternalSchedules {
    fn committed_entries(&self) -> &[TimetableEntry] {
        &[]
    }
}

/// A snapshot of externally committed entries.
#[derive(Debug, Clone, Default)]
pub struct SnapshotView {
    entries: Vec<TimetableEntry>,
}

impl SnapshotView {
    /// Creates a snapshot from committed entries.
    pub fn new(entries: Vec<TimetableEntry>) -> Self {
        Self { entries }
    }
}

impl ExternalScheduleView for SnapshotView {
    fn committed_entries(&self) -> &[TimetableEntry] {
        &self.entries
    }
}
