//! Constraint validation for candidate timetables.
//!
//! [`validate`] is a pure function over an entry set: it never mutates
//! the entries, and re-validating an unchanged set yields the same
//! report. Each constraint is one variant of the closed
//! [`ConstraintKind`] enum with its own weight and evaluation, so adding
//! a constraint is a compile-checked, exhaustive change.
//!
//! The fitness score used by the optimizer is `1000 - total_penalty`,
//! where each violation contributes its kind's weight.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{
    most_senior_year, ExternalScheduleView, ScheduleConfig, TimetableEntry, TimetableProblem,
    Weekday, PRACTICAL_BLOCK_LEN,
};

/// Baseline score of a violation-free timetable.
pub const PERFECT_SCORE: i32 = 1000;

/// Reference data and precomputed lookups shared by all constraint checks.
pub struct ValidationContext<'a> {
    /// Read-only generation input.
    pub problem: &'a TimetableProblem,
    /// Snapshot of entries committed by other generation contexts.
    pub external: &'a dyn ExternalScheduleView,
    blocked_by_teacher: HashMap<String, BTreeSet<(Weekday, u8)>>,
    lab_rooms: BTreeSet<String>,
    known_rooms: BTreeSet<String>,
}

impl<'a> ValidationContext<'a> {
    /// Builds a context, resolving teacher availability once.
    pub fn new(problem: &'a TimetableProblem, external: &'a dyn ExternalScheduleView) -> Self {
        let blocked_by_teacher = problem
            .teachers
            .iter()
            .map(|t| (t.id.clone(), t.blocked_slots(&problem.config)))
            .collect();
        let lab_rooms = problem
            .classrooms
            .iter()
            .filter(|c| c.is_lab())
            .map(|c| c.id.clone())
            .collect();
        let known_rooms = problem.classrooms.iter().map(|c| c.id.clone()).collect();
        Self {
            problem,
            external,
            blocked_by_teacher,
            lab_rooms,
            known_rooms,
        }
    }

    fn config(&self) -> &ScheduleConfig {
        &self.problem.config
    }

    /// Whether the teacher has blocked this slot.
    pub fn is_blocked(&self, teacher_id: &str, day: Weekday, period: u8) -> bool {
        self.blocked_by_teacher
            .get(teacher_id)
            .is_some_and(|set| set.contains(&(day, period)))
    }

    fn is_lab(&self, room_id: &str) -> bool {
        self.lab_rooms.contains(room_id)
    }
}

/// The closed set of timetable constraints.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ConstraintKind {
    /// A teacher holds two entries in one slot.
    TeacherOverlap,
    /// A room hosts two entries in one slot.
    RoomOverlap,
    /// A section sits two entries in one slot.
    SectionOverlap,
    /// An entry falls on a slot its teacher has blocked.
    TeacherAvailability,
    /// A teacher clashes with an externally committed schedule.
    CrossScheduleConflict,
    /// A practical group uses more than one laboratory.
    SameLab,
    /// A practical group is not one contiguous single-teacher block.
    PracticalBlockShape,
    /// Practical outside a lab, theory inside one, or no room at all.
    RoomTypeCompatibility,
    /// A teacher exceeds their daily class ceiling.
    TeacherWorkload,
    /// A subject's weekly entry count differs from its target.
    SubjectFrequency,
    /// A theory subject repeats within a day or bunches on adjacent days.
    SubjectSpacing,
    /// A teacher runs too many consecutive periods without a break.
    TeacherBreak,
    /// An entry falls outside the working grid or past a day ceiling.
    WorkingHours,
    /// A class occupies the reserved thesis day of the senior batch.
    ThesisDayExclusivity,
    /// A section's day is too light or practical-only.
    DailyLoad,
}

impl ConstraintKind {
    /// All constraint kinds, in evaluation order.
    pub const ALL: [ConstraintKind; 15] = [
        ConstraintKind::TeacherOverlap,
        ConstraintKind::RoomOverlap,
        ConstraintKind::SectionOverlap,
        ConstraintKind::TeacherAvailability,
        ConstraintKind::CrossScheduleConflict,
        ConstraintKind::SameLab,
        ConstraintKind::PracticalBlockShape,
        ConstraintKind::RoomTypeCompatibility,
        ConstraintKind::TeacherWorkload,
        ConstraintKind::SubjectFrequency,
        ConstraintKind::SubjectSpacing,
        ConstraintKind::TeacherBreak,
        ConstraintKind::WorkingHours,
        ConstraintKind::ThesisDayExclusivity,
        ConstraintKind::DailyLoad,
    ];

    /// Penalty weight of one violation of this kind.
    pub fn weight(&self) -> u32 {
        match self {
            ConstraintKind::CrossScheduleConflict => 15,
            ConstraintKind::TeacherOverlap
            | ConstraintKind::RoomOverlap
            | ConstraintKind::SectionOverlap
            | ConstraintKind::TeacherAvailability
            | ConstraintKind::SameLab
            | ConstraintKind::WorkingHours
            | ConstraintKind::ThesisDayExclusivity => 10,
            ConstraintKind::TeacherWorkload => 9,
            ConstraintKind::PracticalBlockShape | ConstraintKind::RoomTypeCompatibility => 8,
            ConstraintKind::SubjectFrequency => 6,
            ConstraintKind::SubjectSpacing | ConstraintKind::TeacherBreak => 5,
            ConstraintKind::DailyLoad => 4,
        }
    }

    /// Hard constraints must never survive into an accepted solution.
    pub fn is_hard(&self) -> bool {
        self.weight() >= 10
    }

    /// Evaluates this constraint over an entry set.
    pub fn evaluate(&self, ctx: &ValidationContext, entries: &[TimetableEntry]) -> Vec<Violation> {
        match self {
            ConstraintKind::TeacherOverlap => check_teacher_overlap(entries),
            ConstraintKind::RoomOverlap => check_room_overlap(entries),
            ConstraintKind::SectionOverlap => check_section_overlap(entries),
            ConstraintKind::TeacherAvailability => check_teacher_availability(ctx, entries),
            ConstraintKind::CrossScheduleConflict => check_cross_schedule(ctx, entries),
            ConstraintKind::SameLab => check_same_lab(entries),
            ConstraintKind::PracticalBlockShape => check_practical_shape(entries),
            ConstraintKind::RoomTypeCompatibility => check_room_types(ctx, entries),
            ConstraintKind::TeacherWorkload => check_teacher_workload(ctx, entries),
            ConstraintKind::SubjectFrequency => check_subject_frequency(ctx, entries),
            ConstraintKind::SubjectSpacing => check_subject_spacing(ctx, entries),
            ConstraintKind::TeacherBreak => check_teacher_break(ctx, entries),
            ConstraintKind::WorkingHours => check_working_hours(ctx, entries),
            ConstraintKind::ThesisDayExclusivity => check_thesis_day(ctx, entries),
            ConstraintKind::DailyLoad => check_daily_load(ctx, entries),
        }
    }
}

/// One detected constraint violation.
///
/// Carries enough structured data (entities plus slot) to drive
/// automated repair, alongside a human-readable description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Violated constraint.
    pub kind: ConstraintKind,
    /// Human-readable description.
    pub message: String,
    /// Section involved, if any.
    pub section: Option<String>,
    /// Teacher involved, if any.
    pub teacher_id: Option<String>,
    /// Room involved, if any.
    pub classroom_id: Option<String>,
    /// Subject involved, if any.
    pub subject_code: Option<String>,
    /// Weekday of the offending slot, if localized.
    pub day: Option<Weekday>,
    /// Period of the offending slot, if localized (0 = whole day).
    pub period: Option<u8>,
}

impl Violation {
    /// Creates a violation with no structured references.
    pub fn new(kind: ConstraintKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            section: None,
            teacher_id: None,
            classroom_id: None,
            subject_code: None,
            day: None,
            period: None,
        }
    }

    /// Attaches the offending slot.
    pub fn at(mut self, day: Weekday, period: u8) -> Self {
        self.day = Some(day);
        self.period = Some(period);
        self
    }

    /// Attaches the section.
    pub fn in_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Attaches the teacher.
    pub fn for_teacher(mut self, teacher_id: impl Into<String>) -> Self {
        self.teacher_id = Some(teacher_id.into());
        self
    }

    /// Attaches the room.
    pub fn in_room(mut self, classroom_id: impl Into<String>) -> Self {
        self.classroom_id = Some(classroom_id.into());
        self
    }

    /// Attaches the subject.
    pub fn for_subject(mut self, subject_code: impl Into<String>) -> Self {
        self.subject_code = Some(subject_code.into());
        self
    }

    /// Penalty contributed by this violation.
    pub fn penalty(&self) -> u32 {
        self.kind.weight()
    }
}

/// Result of validating one entry set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// All violations, in constraint evaluation order.
    pub violations: Vec<Violation>,
    /// Sum of violation penalties.
    pub total_penalty: u32,
    /// `1000 - total_penalty`; higher is better.
    pub score: i32,
}

impl ValidationReport {
    /// Whether no violations were found.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of violations of one kind.
    pub fn count_for(&self, kind: ConstraintKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }

    /// Number of hard-constraint violations.
    pub fn hard_violation_count(&self) -> usize {
        self.violations.iter().filter(|v| v.kind.is_hard()).count()
    }

    /// Violation counts per constraint kind (kinds with zero omitted).
    pub fn per_kind_counts(&self) -> BTreeMap<ConstraintKind, usize> {
        let mut counts = BTreeMap::new();
        for v in &self.violations {
            *counts.entry(v.kind).or_insert(0) += 1;
        }
        counts
    }
}

/// Validates an entry set against every constraint kind.
pub fn validate(ctx: &ValidationContext, entries: &[TimetableEntry]) -> ValidationReport {
    let mut violations = Vec::new();
    for kind in ConstraintKind::ALL {
        violations.extend(kind.evaluate(ctx, entries));
    }
    let total_penalty: u32 = violations.iter().map(Violation::penalty).sum();
    ValidationReport {
        violations,
        total_penalty,
        score: PERFECT_SCORE - total_penalty as i32,
    }
}

// ---- individual checks ----

fn check_teacher_overlap(entries: &[TimetableEntry]) -> Vec<Violation> {
    let mut by_slot: BTreeMap<(&str, Weekday, u8), usize> = BTreeMap::new();
    for e in entries {
        if let Some(teacher) = e.teacher_id.as_deref() {
            *by_slot.entry((teacher, e.day, e.period)).or_insert(0) += 1;
        }
    }
    by_slot
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|((teacher, day, period), count)| {
            Violation::new(
                ConstraintKind::TeacherOverlap,
                format!("teacher {teacher} holds {count} classes at {day} period {period}"),
            )
            .for_teacher(teacher)
            .at(day, period)
        })
        .collect()
}

fn check_room_overlap(entries: &[TimetableEntry]) -> Vec<Violation> {
    let mut by_slot: BTreeMap<(&str, Weekday, u8), usize> = BTreeMap::new();
    for e in entries {
        if let Some(room) = e.classroom_id.as_deref() {
            *by_slot.entry((room, e.day, e.period)).or_insert(0) += 1;
        }
    }
    by_slot
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|((room, day, period), count)| {
            Violation::new(
                ConstraintKind::RoomOverlap,
                format!("room {room} hosts {count} classes at {day} period {period}"),
            )
            .in_room(room)
            .at(day, period)
        })
        .collect()
}

fn check_section_overlap(entries: &[TimetableEntry]) -> Vec<Violation> {
    let mut by_slot: BTreeMap<(&str, Weekday, u8), usize> = BTreeMap::new();
    for e in entries {
        *by_slot
            .entry((e.section.as_str(), e.day, e.period))
            .or_insert(0) += 1;
    }
    by_slot
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|((section, day, period), count)| {
            Violation::new(
                ConstraintKind::SectionOverlap,
                format!("section {section} sits {count} classes at {day} period {period}"),
            )
            .in_section(section)
            .at(day, period)
        })
        .collect()
}

fn check_teacher_availability(
    ctx: &ValidationContext,
    entries: &[TimetableEntry],
) -> Vec<Violation> {
    let mut violations = Vec::new();
    for e in entries {
        match e.teacher_id.as_deref() {
            Some(teacher) => {
                if ctx.is_blocked(teacher, e.day, e.period) {
                    violations.push(
                        Violation::new(
                            ConstraintKind::TeacherAvailability,
                            format!(
                                "teacher {teacher} is unavailable at {} period {}",
                                e.day, e.period
                            ),
                        )
                        .for_teacher(teacher)
                        .for_subject(&e.subject_code)
                        .in_section(&e.section)
                        .at(e.day, e.period),
                    );
                }
            }
            None => {
                violations.push(
                    Violation::new(
                        ConstraintKind::TeacherAvailability,
                        format!(
                            "no teacher assigned for {} in section {}",
                            e.subject_code, e.section
                        ),
                    )
                    .for_subject(&e.subject_code)
                    .in_section(&e.section)
                    .at(e.day, e.period),
                );
            }
        }
    }
    violations
}

fn check_cross_schedule(ctx: &ValidationContext, entries: &[TimetableEntry]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for e in entries {
        if let Some(teacher) = e.teacher_id.as_deref() {
            if ctx.external.is_teacher_busy(teacher, e.day, e.period) {
                violations.push(
                    Violation::new(
                        ConstraintKind::CrossScheduleConflict,
                        format!(
                            "teacher {teacher} already committed elsewhere at {} period {}",
                            e.day, e.period
                        ),
                    )
                    .for_teacher(teacher)
                    .in_section(&e.section)
                    .at(e.day, e.period),
                );
            }
        }
    }
    violations
}

/// Groups practical entries by (section, subject) in deterministic order.
fn practical_groups(entries: &[TimetableEntry]) -> BTreeMap<(&str, &str), Vec<&TimetableEntry>> {
    let mut groups: BTreeMap<(&str, &str), Vec<&TimetableEntry>> = BTreeMap::new();
    for e in entries.iter().filter(|e| e.is_practical) {
        groups
            .entry((e.section.as_str(), e.subject_code.as_str()))
            .or_default()
            .push(e);
    }
    groups
}

fn check_same_lab(entries: &[TimetableEntry]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for ((section, subject), group) in practical_groups(entries) {
        let rooms: BTreeSet<&str> = group
            .iter()
            .filter_map(|e| e.classroom_id.as_deref())
            .collect();
        if rooms.len() > 1 {
            violations.push(
                Violation::new(
                    ConstraintKind::SameLab,
                    format!(
                        "practical {subject} of {section} is split across labs: {}",
                        rooms.iter().copied().collect::<Vec<_>>().join(", ")
                    ),
                )
                .in_section(section)
                .for_subject(subject),
            );
        }
    }
    violations
}

fn check_practical_shape(entries: &[TimetableEntry]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for ((section, subject), mut group) in practical_groups(entries) {
        group.sort_by_key(|e| (e.day, e.period));
        let expected = usize::from(PRACTICAL_BLOCK_LEN);

        if group.len() != expected {
            violations.push(
                Violation::new(
                    ConstraintKind::PracticalBlockShape,
                    format!(
                        "practical {subject} of {section} has {} periods, expected {expected}",
                        group.len()
                    ),
                )
                .in_section(section)
                .for_subject(subject),
            );
            continue;
        }

        let day = group[0].day;
        let contiguous = group.iter().all(|e| e.day == day)
            && group.windows(2).all(|w| w[1].period == w[0].period + 1);
        if !contiguous {
            violations.push(
                Violation::new(
                    ConstraintKind::PracticalBlockShape,
                    format!("practical {subject} of {section} is not one contiguous block"),
                )
                .in_section(section)
                .for_subject(subject)
                .at(day, group[0].period),
            );
        }

        let teachers: BTreeSet<&str> = group
            .iter()
            .filter_map(|e| e.teacher_id.as_deref())
            .collect();
        if teachers.len() > 1 {
            violations.push(
                Violation::new(
                    ConstraintKind::PracticalBlockShape,
                    format!("practical {subject} of {section} spans multiple teachers"),
                )
                .in_section(section)
                .for_subject(subject)
                .at(day, group[0].period),
            );
        }
    }
    violations
}

fn check_room_types(ctx: &ValidationContext, entries: &[TimetableEntry]) -> Vec<Violation> {
    let occupied: BTreeSet<(&str, Weekday, u8)> = entries
        .iter()
        .filter_map(|e| e.classroom_id.as_deref().map(|r| (r, e.day, e.period)))
        .collect();
    let regular_room_free = |day: Weekday, period: u8| {
        ctx.known_rooms
            .iter()
            .any(|r| !ctx.is_lab(r) && !occupied.contains(&(r.as_str(), day, period)))
    };

    let mut violations = Vec::new();
    for e in entries {
        match e.classroom_id.as_deref() {
            None => {
                violations.push(
                    Violation::new(
                        ConstraintKind::RoomTypeCompatibility,
                        format!(
                            "no room assigned for {} in section {}",
                            e.subject_code, e.section
                        ),
                    )
                    .for_subject(&e.subject_code)
                    .in_section(&e.section)
                    .at(e.day, e.period),
                );
            }
            Some(room) if !ctx.known_rooms.contains(room) => {
                violations.push(
                    Violation::new(
                        ConstraintKind::RoomTypeCompatibility,
                        format!("unknown room {room} assigned in section {}", e.section),
                    )
                    .in_room(room)
                    .in_section(&e.section)
                    .at(e.day, e.period),
                );
            }
            Some(room) => {
                let lab = ctx.is_lab(room);
                if e.is_practical && !lab {
                    violations.push(
                        Violation::new(
                            ConstraintKind::RoomTypeCompatibility,
                            format!(
                                "practical {} of {} placed in regular room {room}",
                                e.subject_code, e.section
                            ),
                        )
                        .in_room(room)
                        .for_subject(&e.subject_code)
                        .in_section(&e.section)
                        .at(e.day, e.period),
                    );
                } else if !e.is_practical && lab && regular_room_free(e.day, e.period) {
                    violations.push(
                        Violation::new(
                            ConstraintKind::RoomTypeCompatibility,
                            format!(
                                "theory {} of {} occupies lab {room} while a regular room is free",
                                e.subject_code, e.section
                            ),
                        )
                        .in_room(room)
                        .for_subject(&e.subject_code)
                        .in_section(&e.section)
                        .at(e.day, e.period),
                    );
                }
            }
        }
    }
    violations
}

fn check_teacher_workload(ctx: &ValidationContext, entries: &[TimetableEntry]) -> Vec<Violation> {
    let mut per_day: BTreeMap<(&str, Weekday), usize> = BTreeMap::new();
    for e in entries {
        if let Some(teacher) = e.teacher_id.as_deref() {
            *per_day.entry((teacher, e.day)).or_insert(0) += 1;
        }
    }
    per_day
        .into_iter()
        .filter_map(|((teacher, day), count)| {
            let ceiling = ctx
                .problem
                .teacher(teacher)
                .map(|t| usize::from(t.max_classes_per_day))?;
            (count > ceiling).then(|| {
                Violation::new(
                    ConstraintKind::TeacherWorkload,
                    format!("teacher {teacher} has {count} classes on {day}, ceiling {ceiling}"),
                )
                .for_teacher(teacher)
                .at(day, 0)
            })
        })
        .collect()
}

fn check_subject_frequency(ctx: &ValidationContext, entries: &[TimetableEntry]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for section in ctx.problem.sections_in_scope() {
        for subject in ctx.problem.subjects_for_batch(&section.batch_code) {
            let actual = entries
                .iter()
                .filter(|e| {
                    e.section == section.label && e.subject_code == subject.code && !e.is_extra
                })
                .count();
            let expected = usize::from(subject.weekly_entry_count());
            if actual != expected {
                violations.push(
                    Violation::new(
                        ConstraintKind::SubjectFrequency,
                        format!(
                            "{} of {} scheduled {actual} times, expected {expected}",
                            subject.code, section.label
                        ),
                    )
                    .in_section(&section.label)
                    .for_subject(&subject.code),
                );
            }
        }
    }
    violations
}

fn check_subject_spacing(ctx: &ValidationContext, entries: &[TimetableEntry]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let day_count = ctx.config().days.len();

    for section in ctx.problem.sections_in_scope() {
        for subject in ctx.problem.subjects_for_batch(&section.batch_code) {
            if subject.is_practical {
                continue;
            }
            let mut per_day: BTreeMap<Weekday, usize> = BTreeMap::new();
            for e in entries.iter().filter(|e| {
                e.section == section.label && e.subject_code == subject.code && !e.is_extra
            }) {
                *per_day.entry(e.day).or_insert(0) += 1;
            }

            for (&day, &count) in &per_day {
                if count > 1 {
                    violations.push(
                        Violation::new(
                            ConstraintKind::SubjectSpacing,
                            format!(
                                "{} of {} repeats {count} times on {day}",
                                subject.code, section.label
                            ),
                        )
                        .in_section(&section.label)
                        .for_subject(&subject.code)
                        .at(day, 0),
                    );
                }
            }

            // Adjacent-day bunching is only penalized when the week has
            // room to spread the instances out.
            if usize::from(subject.credits) * 2 <= day_count {
                let days: Vec<Weekday> = per_day.keys().copied().collect();
                for pair in days.windows(2) {
                    if pair[0].is_adjacent(&pair[1]) {
                        violations.push(
                            Violation::new(
                                ConstraintKind::SubjectSpacing,
                                format!(
                                    "{} of {} sits on adjacent days {} and {}",
                                    subject.code, section.label, pair[0], pair[1]
                                ),
                            )
                            .in_section(&section.label)
                            .for_subject(&subject.code)
                            .at(pair[1], 0),
                        );
                    }
                }
            }
        }
    }
    violations
}

fn check_teacher_break(ctx: &ValidationContext, entries: &[TimetableEntry]) -> Vec<Violation> {
    let limit = usize::from(ctx.config().max_consecutive_for_teacher);
    let mut per_day: BTreeMap<(&str, Weekday), Vec<u8>> = BTreeMap::new();
    // Practical blocks are one-teacher by construction and exempt.
    for e in entries.iter().filter(|e| !e.is_practical) {
        if let Some(teacher) = e.teacher_id.as_deref() {
            per_day.entry((teacher, e.day)).or_default().push(e.period);
        }
    }

    let mut violations = Vec::new();
    for ((teacher, day), mut periods) in per_day {
        periods.sort_unstable();
        periods.dedup();
        let mut run_start = 0usize;
        for i in 1..=periods.len() {
            let run_broken = i == periods.len() || periods[i] != periods[i - 1] + 1;
            if run_broken {
                let run_len = i - run_start;
                if run_len > limit {
                    violations.push(
                        Violation::new(
                            ConstraintKind::TeacherBreak,
                            format!(
                                "teacher {teacher} runs {run_len} consecutive periods on {day}"
                            ),
                        )
                        .for_teacher(teacher)
                        .at(day, periods[run_start + limit]),
                    );
                }
                run_start = i;
            }
        }
    }
    violations
}

fn check_working_hours(ctx: &ValidationContext, entries: &[TimetableEntry]) -> Vec<Violation> {
    let config = ctx.config();
    let mut violations = Vec::new();
    for e in entries {
        if !config.days.contains(&e.day) {
            violations.push(
                Violation::new(
                    ConstraintKind::WorkingHours,
                    format!("{} is not a working day", e.day),
                )
                .in_section(&e.section)
                .at(e.day, e.period),
            );
        } else if e.period < 1 || e.period > config.period_ceiling(e.day) {
            violations.push(
                Violation::new(
                    ConstraintKind::WorkingHours,
                    format!(
                        "period {} exceeds the {} ceiling of {}",
                        e.period,
                        e.day,
                        config.period_ceiling(e.day)
                    ),
                )
                .in_section(&e.section)
                .for_subject(&e.subject_code)
                .at(e.day, e.period),
            );
        }
    }
    violations
}

fn check_thesis_day(ctx: &ValidationContext, entries: &[TimetableEntry]) -> Vec<Violation> {
    let Some(thesis_day) = ctx.config().thesis_day else {
        return Vec::new();
    };
    let Some(senior_year) = most_senior_year(&ctx.problem.batches) else {
        return Vec::new();
    };

    let senior_sections: BTreeSet<String> = ctx
        .problem
        .sections_in_scope()
        .into_iter()
        .filter(|s| s.year_prefix() == Some(senior_year))
        .map(|s| s.label)
        .collect();

    entries
        .iter()
        .filter(|e| e.day == thesis_day && senior_sections.contains(&e.section))
        .map(|e| {
            Violation::new(
                ConstraintKind::ThesisDayExclusivity,
                format!(
                    "{} of {} scheduled on reserved thesis day {thesis_day}",
                    e.subject_code, e.section
                ),
            )
            .in_section(&e.section)
            .for_subject(&e.subject_code)
            .at(e.day, e.period)
        })
        .collect()
}

fn check_daily_load(ctx: &ValidationContext, entries: &[TimetableEntry]) -> Vec<Violation> {
    let config = ctx.config();
    let min = usize::from(config.min_classes_per_day);
    let mut violations = Vec::new();

    for section in ctx.problem.sections_in_scope() {
        for &day in &config.days {
            let day_entries: Vec<&TimetableEntry> = entries
                .iter()
                .filter(|e| e.section == section.label && e.day == day)
                .collect();
            if day_entries.is_empty() {
                continue;
            }
            if day_entries.len() < min {
                violations.push(
                    Violation::new(
                        ConstraintKind::DailyLoad,
                        format!(
                            "{} has only {} class(es) on {day}",
                            section.label,
                            day_entries.len()
                        ),
                    )
                    .in_section(&section.label)
                    .at(day, 0),
                );
            } else if day_entries.iter().all(|e| e.is_practical) {
                violations.push(
                    Violation::new(
                        ConstraintKind::DailyLoad,
                        format!("{} has a practical-only {day}", section.label),
                    )
                    .in_section(&section.label)
                    .at(day, 0),
                );
            }
        }
    }
    violations
}
