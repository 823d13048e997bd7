//! Constructive timetable builder.
//!
//! Builds a full timetable section by section. Each section walks a
//! fixed phase sequence: practicals first (they need contiguous lab
//! blocks while the grid is empty), then theory, then day-level
//! constraint enforcement.
//!
//! An unschedulable subject instance is reported, never silently
//! dropped; the caller decides whether to accept a partial timetable.

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::context::PlacementContext;
use crate::allocation::SchedulingState;
use crate::models::{
    ExternalScheduleView, Section, Subject, TimetableEntry, TimetableProblem, Weekday,
};

/// Default bound on placement attempts per subject instance.
const DEFAULT_MAX_ATTEMPTS: usize = 75;

/// A subject instance that found no legal placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unscheduled {
    /// Section label.
    pub section: String,
    /// Subject code.
    pub subject_code: String,
    /// Why placement failed.
    pub reason: String,
}

/// Per-section build phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionPhase {
    NotStarted,
    PracticalsPlaced,
    TheoryPlaced,
    DayConstraintsEnforced,
    Done,
}

/// Builds timetables incrementally, one section at a time.
pub struct ConstructiveScheduler<'a> {
    ctx: PlacementContext<'a>,
    max_attempts: usize,
}

impl<'a> ConstructiveScheduler<'a> {
    /// Creates a scheduler over the generation input.
    pub fn new(problem: &'a TimetableProblem, external: &'a dyn ExternalScheduleView) -> Self {
        Self {
            ctx: PlacementContext::new(problem, external),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets the per-instance placement attempt bound.
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// The placement context (allocator, availability lookups).
    pub fn context(&self) -> &PlacementContext<'a> {
        &self.ctx
    }

    /// Builds every in-scope section into `state`.
    ///
    /// Randomized tie-breaks draw from `rng`, so a seeded generator
    /// reproduces the same timetable.
    pub fn build<R: Rng>(&self, state: &mut SchedulingState, rng: &mut R) -> Vec<Unscheduled> {
        let mut unscheduled = Vec::new();
        for section in self.ctx.problem.sections_in_scope() {
            unscheduled.extend(self.schedule_section(state, rng, &section));
        }
        unscheduled
    }

    fn schedule_section<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        section: &Section,
    ) -> Vec<Unscheduled> {
        let mut phase = SectionPhase::NotStarted;
        let mut unscheduled = Vec::new();
        debug!("section {} phase {phase:?}", section.label);

        let subjects = self.ctx.problem.subjects_for_batch(&section.batch_code);

        for subject in subjects.iter().filter(|s| s.is_practical) {
            if let Err(reason) = self.place_practical(state, rng, section, subject) {
                warn!(
                    "unschedulable practical {} for {}: {reason}",
                    subject.code, section.label
                );
                unscheduled.push(Unscheduled {
                    section: section.label.clone(),
                    subject_code: subject.code.clone(),
                    reason,
                });
            }
        }
        phase = SectionPhase::PracticalsPlaced;
        debug!("section {} phase {phase:?}", section.label);

        for subject in subjects.iter().filter(|s| !s.is_practical) {
            let target = usize::from(subject.credits);
            let mut placed = 0;
            for _ in 0..target {
                if self.place_theory_instance(state, rng, section, subject) {
                    placed += 1;
                }
            }
            if placed < target {
                let reason = format!("placed {placed} of {target} weekly instances");
                warn!(
                    "unschedulable theory {} for {}: {reason}",
                    subject.code, section.label
                );
                unscheduled.push(Unscheduled {
                    section: section.label.clone(),
                    subject_code: subject.code.clone(),
                    reason,
                });
            }
        }
        phase = SectionPhase::TheoryPlaced;
        debug!("section {} phase {phase:?}", section.label);

        self.enforce_day_constraints(state, rng, section);
        phase = SectionPhase::DayConstraintsEnforced;
        debug!("section {} phase {phase:?}", section.label);

        phase = SectionPhase::Done;
        debug!("section {} phase {phase:?}", section.label);
        unscheduled
    }

    /// Places one practical block: contiguous periods, one teacher, one lab.
    fn place_practical<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        section: &Section,
        subject: &Subject,
    ) -> Result<(), String> {
        let config = &self.ctx.problem.config;
        let len = self.ctx.block_len();

        let mut candidates: Vec<(Weekday, u8)> = Vec::new();
        for day in self.ctx.days_for_section(&section.label) {
            let ceiling = config.period_ceiling(day);
            if ceiling >= len {
                for start in 1..=ceiling + 1 - len {
                    candidates.push((day, start));
                }
            }
        }
        candidates.shuffle(rng);

        for (day, start) in candidates.into_iter().take(self.max_attempts) {
            let slots: Vec<(Weekday, u8)> = (start..start + len).map(|p| (day, p)).collect();
            if !slots
                .iter()
                .all(|&(d, p)| state.is_section_free(&section.label, d, p))
            {
                continue;
            }
            // The whole block needs one teacher, checked atomically.
            let Some(teacher) = self.ctx.select_teacher(state, subject, section, &slots) else {
                continue;
            };
            let Some(lab) = self.ctx.allocator.allocate_for_practical(
                state,
                rng,
                day,
                start,
                len,
                &section.label,
                &subject.code,
            ) else {
                continue;
            };
            for &(d, p) in &slots {
                state.push(
                    TimetableEntry::new(d, p, &subject.code, &section.label)
                        .with_teacher(&teacher)
                        .with_classroom(&lab)
                        .practical(),
                );
            }
            return Ok(());
        }
        Err("no day/start with a free lab and an available teacher".into())
    }

    /// Places one theory instance on a weekday the subject has not used.
    fn place_theory_instance<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        section: &Section,
        subject: &Subject,
    ) -> bool {
        let config = &self.ctx.problem.config;
        let used_days: BTreeSet<Weekday> = state
            .entries()
            .iter()
            .filter(|e| {
                e.section == section.label && e.subject_code == subject.code && !e.is_extra
            })
            .map(|e| e.day)
            .collect();

        let mut days = self.ctx.days_for_section(&section.label);
        days.retain(|d| !used_days.contains(d));
        days.shuffle(rng);
        // Lightest day first keeps the week balanced; the shuffle above
        // still varies the order among equally loaded days.
        days.sort_by_key(|&d| {
            state
                .entries()
                .iter()
                .filter(|e| e.section == section.label && e.day == d)
                .count()
        });

        let mut attempts = 0;
        for day in days {
            let mut periods: Vec<u8> = config.periods_for(day).collect();
            periods.shuffle(rng);
            for period in periods {
                attempts += 1;
                if attempts > self.max_attempts {
                    return false;
                }
                if !state.is_section_free(&section.label, day, period) {
                    continue;
                }
                let Some(teacher) =
                    self.ctx
                        .select_teacher(state, subject, section, &[(day, period)])
                else {
                    continue;
                };
                let Some(room) =
                    self.ctx
                        .allocator
                        .allocate_for_theory(state, rng, day, period, &section.label)
                else {
                    continue;
                };
                state.push(
                    TimetableEntry::new(day, period, &subject.code, &section.label)
                        .with_teacher(&teacher)
                        .with_classroom(&room),
                );
                return true;
            }
        }
        false
    }

    /// Day-level post-pass for one section.
    fn enforce_day_constraints<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        section: &Section,
    ) {
        self.inject_light_days(state, rng, section);
        self.enforce_day_ceilings(state, rng, section);
        self.clear_thesis_day(state, rng, section);
        self.enforce_teacher_breaks(state, rng, section);
    }

    /// Tops up days that are too light or practical-only with extra theory.
    fn inject_light_days<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        section: &Section,
    ) {
        let config = &self.ctx.problem.config;
        let min = usize::from(config.min_classes_per_day);
        let theory_subjects: Vec<&Subject> = self
            .ctx
            .problem
            .subjects_for_batch(&section.batch_code)
            .into_iter()
            .filter(|s| !s.is_practical)
            .collect();
        if theory_subjects.is_empty() {
            return;
        }

        for day in self.ctx.days_for_section(&section.label) {
            loop {
                let day_entries: Vec<&TimetableEntry> = state
                    .entries()
                    .iter()
                    .filter(|e| e.section == section.label && e.day == day)
                    .collect();
                if day_entries.is_empty() {
                    break;
                }
                let too_light = day_entries.len() < min;
                let practical_only = day_entries.iter().all(|e| e.is_practical);
                if !too_light && !practical_only {
                    break;
                }
                if !self.inject_extra_theory(state, rng, section, day, &theory_subjects) {
                    debug!(
                        "could not top up light {day} for {}; leaving as-is",
                        section.label
                    );
                    break;
                }
            }
        }
    }

    fn inject_extra_theory<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        section: &Section,
        day: Weekday,
        theory_subjects: &[&Subject],
    ) -> bool {
        let config = &self.ctx.problem.config;
        // Spread extras across subjects: least-scheduled first.
        let mut ranked = theory_subjects.to_vec();
        ranked.sort_by_key(|s| {
            state
                .entries()
                .iter()
                .filter(|e| e.section == section.label && e.subject_code == s.code)
                .count()
        });

        for subject in ranked {
            for period in config.periods_for(day) {
                if !state.is_section_free(&section.label, day, period) {
                    continue;
                }
                let Some(teacher) =
                    self.ctx
                        .select_teacher(state, subject, section, &[(day, period)])
                else {
                    continue;
                };
                let Some(room) =
                    self.ctx
                        .allocator
                        .allocate_for_theory(state, rng, day, period, &section.label)
                else {
                    continue;
                };
                state.push(
                    TimetableEntry::new(day, period, &subject.code, &section.label)
                        .with_teacher(&teacher)
                        .with_classroom(&room)
                        .extra(),
                );
                return true;
            }
        }
        false
    }

    /// Moves entries that sit past a day's period ceiling.
    fn enforce_day_ceilings<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        section: &Section,
    ) {
        let config = &self.ctx.problem.config;
        let late: Vec<usize> = state
            .section_entry_indices(&section.label)
            .into_iter()
            .filter(|&i| {
                let e = state.entry(i);
                e.period > config.period_ceiling(e.day)
            })
            .collect();

        for index in late {
            let day = state.entry(index).day;
            // Prefer pulling the class earlier on the same day.
            if self.ctx.try_move_entry(state, rng, index, &[day]) {
                continue;
            }
            let other_days: Vec<Weekday> = self
                .ctx
                .days_for_section(&section.label)
                .into_iter()
                .filter(|&d| d != day)
                .collect();
            if !self.ctx.try_move_entry(state, rng, index, &other_days) {
                warn!(
                    "entry past the {day} ceiling for {} could not be moved",
                    section.label
                );
            }
        }
    }

    /// Clears the reserved thesis day for senior-year sections.
    fn clear_thesis_day<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        section: &Section,
    ) {
        let Some(thesis_day) = self.ctx.problem.config.thesis_day else {
            return;
        };
        if !self.ctx.is_senior_section(&section.label) {
            return;
        }
        let target_days = self.ctx.days_for_section(&section.label);
        let on_thesis: Vec<usize> = state
            .section_entry_indices(&section.label)
            .into_iter()
            .filter(|&i| state.entry(i).day == thesis_day)
            .collect();
        for index in on_thesis {
            // A practical mover drags its whole block, which may have
            // handled later indices already.
            if state.entry(index).day != thesis_day {
                continue;
            }
            if !self.ctx.try_move_entry(state, rng, index, &target_days) {
                warn!(
                    "could not clear thesis day {thesis_day} entry for {}",
                    section.label
                );
            }
        }
    }

    /// Relocates the third consecutive period of any teacher run.
    fn enforce_teacher_breaks<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        section: &Section,
    ) {
        let limit = usize::from(self.ctx.problem.config.max_consecutive_for_teacher);
        let days = self.ctx.days_for_section(&section.label);

        for &day in &days {
            // Bounded: each pass relocates one entry, and a day cannot
            // hold more offenders than periods.
            for _ in 0..usize::from(self.ctx.problem.config.periods_per_day) {
                let mut runs: Vec<(String, Vec<(u8, usize)>)> = Vec::new();
                let mut by_teacher: BTreeMap<String, Vec<(u8, usize)>> = BTreeMap::new();
                for (i, e) in state.entries().iter().enumerate() {
                    if e.section == section.label && e.day == day && !e.is_practical {
                        if let Some(t) = &e.teacher_id {
                            by_teacher.entry(t.clone()).or_default().push((e.period, i));
                        }
                    }
                }
                for (teacher, mut periods) in by_teacher {
                    periods.sort_unstable();
                    runs.push((teacher, periods));
                }

                let mut offender: Option<usize> = None;
                'outer: for (_, periods) in &runs {
                    let mut run_start = 0usize;
                    for i in 1..=periods.len() {
                        let broken =
                            i == periods.len() || periods[i].0 != periods[i - 1].0 + 1;
                        if broken {
                            if i - run_start > limit {
                                offender = Some(periods[run_start + limit].1);
                                break 'outer;
                            }
                            run_start = i;
                        }
                    }
                }

                let Some(index) = offender else { break };
                let other_days: Vec<Weekday> =
                    days.iter().copied().filter(|&d| d != day).collect();
                if !self.ctx.try_move_entry(state, rng, index, &other_days)
                    && !self.ctx.try_move_entry(state, rng, index, &[day])
                {
                    debug!(
                        "teacher break run for {} on {day} could not be relaxed",
                        section.label
                    );
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Batch, Classroom, NoExternalSchedules, ScheduleConfig, Teacher, TeacherSubjectAssignment,
        UnavailabilityMap,
    };
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(11)
    }

    fn problem() -> TimetableProblem {
        TimetableProblem::new(ScheduleConfig::default().with_batch("21SW"))
            .with_batch(Batch::new("21SW"))
            .with_subject(Subject::new("CS-301", "Operating Systems", "21SW").with_credits(3))
            .with_subject(
                Subject::new("CS-301L", "Operating Systems Lab", "21SW")
                    .with_credits(1)
                    .practical(),
            )
            .with_teacher(Teacher::new("T1", "Dr. Ayesha"))
            .with_teacher(Teacher::new("T2", "Dr. Bilal"))
            .with_classroom(Classroom::new("R1", "Room 101", "Main"))
            .with_classroom(Classroom::new("R2", "Room 102", "Main"))
            .with_classroom(Classroom::new("L1", "Software Lab 1", "Main"))
            .with_assignment(TeacherSubjectAssignment::new("T1", "CS-301", "21SW"))
            .with_assignment(TeacherSubjectAssignment::new("T2", "CS-301L", "21SW"))
    }

    #[test]
    fn test_builds_full_section() {
        let problem = problem();
        let scheduler = ConstructiveScheduler::new(&problem, &NoExternalSchedules);
        let mut state = SchedulingState::new();
        let unscheduled = scheduler.build(&mut state, &mut rng());

        assert!(unscheduled.is_empty(), "unexpected: {unscheduled:?}");
        // 3 theory + 3-period practical, possibly plus injected extras.
        let regular: Vec<_> = state.entries().iter().filter(|e| !e.is_extra).collect();
        assert_eq!(regular.len(), 6);
    }

    #[test]
    fn test_practical_block_shape() {
        let problem = problem();
        let scheduler = ConstructiveScheduler::new(&problem, &NoExternalSchedules);
        let mut state = SchedulingState::new();
        scheduler.build(&mut state, &mut rng());

        let mut block: Vec<_> = state
            .entries()
            .iter()
            .filter(|e| e.is_practical)
            .collect();
        block.sort_by_key(|e| e.period);
        assert_eq!(block.len(), 3);
        let day = block[0].day;
        assert!(block.iter().all(|e| e.day == day));
        assert!(block.windows(2).all(|w| w[1].period == w[0].period + 1));
        assert!(block.iter().all(|e| e.classroom_id.as_deref() == Some("L1")));
        let teachers: BTreeSet<_> = block.iter().map(|e| e.teacher_id.clone()).collect();
        assert_eq!(teachers.len(), 1);
    }

    #[test]
    fn test_theory_spread_one_per_day() {
        let problem = problem();
        let scheduler = ConstructiveScheduler::new(&problem, &NoExternalSchedules);
        let mut state = SchedulingState::new();
        scheduler.build(&mut state, &mut rng());

        let days: Vec<Weekday> = state
            .entries()
            .iter()
            .filter(|e| e.subject_code == "CS-301" && !e.is_extra)
            .map(|e| e.day)
            .collect();
        let distinct: BTreeSet<_> = days.iter().collect();
        assert_eq!(days.len(), 3);
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn test_respects_teacher_unavailability() {
        let mut problem = problem();
        problem.teachers[1] = Teacher::new("T2", "Dr. Bilal").with_unavailability(
            UnavailabilityMap::new().block_periods(Weekday::Monday, vec![1, 2, 3]),
        );
        let scheduler = ConstructiveScheduler::new(&problem, &NoExternalSchedules);
        let mut state = SchedulingState::new();
        let unscheduled = scheduler.build(&mut state, &mut rng());
        assert!(unscheduled.is_empty());

        let block: Vec<_> = state.entries().iter().filter(|e| e.is_practical).collect();
        assert!(!block
            .iter()
            .any(|e| e.day == Weekday::Monday && e.period <= 3));
    }

    #[test]
    fn test_fully_blocked_teacher_reported() {
        let mut problem = problem();
        let mut all_week = UnavailabilityMap::new();
        for day in problem.config.days.clone() {
            all_week = all_week.block_day(day);
        }
        problem.teachers[1] = Teacher::new("T2", "Dr. Bilal").with_unavailability(all_week);

        let scheduler = ConstructiveScheduler::new(&problem, &NoExternalSchedules);
        let mut state = SchedulingState::new();
        let unscheduled = scheduler.build(&mut state, &mut rng());

        assert!(unscheduled
            .iter()
            .any(|u| u.subject_code == "CS-301L" && u.section == "21SW-I"));
        assert!(state.entries().iter().all(|e| !e.is_practical));
    }

    #[test]
    fn test_thesis_day_left_clear_for_senior_batch() {
        let mut problem = problem();
        problem.config = problem.config.with_thesis_day(Weekday::Friday);
        // A junior batch exists, so 21SW is the senior year.
        problem = problem.with_batch(Batch::new("23SW"));

        let scheduler = ConstructiveScheduler::new(&problem, &NoExternalSchedules);
        let mut state = SchedulingState::new();
        scheduler.build(&mut state, &mut rng());

        assert!(state
            .entries()
            .iter()
            .filter(|e| e.section == "21SW-I")
            .all(|e| e.day != Weekday::Friday));
    }

    #[test]
    fn test_friday_ceiling_respected() {
        let mut problem = problem();
        problem.config = problem.config.with_friday_ceiling(4);
        let scheduler = ConstructiveScheduler::new(&problem, &NoExternalSchedules);
        let mut state = SchedulingState::new();
        scheduler.build(&mut state, &mut rng());

        assert!(state
            .entries()
            .iter()
            .filter(|e| e.day == Weekday::Friday)
            .all(|e| e.period <= 4));
    }

    #[test]
    fn test_deterministic_under_fixed_seed() {
        let problem = problem();
        let scheduler = ConstructiveScheduler::new(&problem, &NoExternalSchedules);

        let mut state_a = SchedulingState::new();
        scheduler.build(&mut state_a, &mut SmallRng::seed_from_u64(99));
        let mut state_b = SchedulingState::new();
        scheduler.build(&mut state_b, &mut SmallRng::seed_from_u64(99));

        assert_eq!(state_a.entries(), state_b.entries());
    }

    #[test]
    fn test_two_sections_no_overlap() {
        let mut problem = problem();
        problem.batches[0] = Batch::new("21SW").with_sections(2);
        let scheduler = ConstructiveScheduler::new(&problem, &NoExternalSchedules);
        let mut state = SchedulingState::new();
        scheduler.build(&mut state, &mut rng());

        let mut seen = BTreeSet::new();
        for e in state.entries() {
            if let Some(t) = &e.teacher_id {
                assert!(
                    seen.insert((t.clone(), e.day, e.period)),
                    "teacher {t} double-booked at {} p{}",
                    e.day,
                    e.period
                );
            }
        }
    }
}
