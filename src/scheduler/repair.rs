//! Best-effort violation repair.
//!
//! The repair engine takes a validated entry set and tries to clear
//! violations one at a time. Every attempt is guarded: the state is
//! snapshotted, the mutation applied, and the result re-validated; a
//! mutation that does not strictly reduce the violation count is
//! reverted. Repair therefore never regresses a timetable.
//!
//! Strategies escalate per violation: reassign in place (teacher or
//! room at the same slot), relocate the entry (or its whole practical
//! block), and finally an any-room emergency fallback for room clashes.

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::context::PlacementContext;
use crate::allocation::SchedulingState;
use crate::models::{
    ExternalScheduleView, Section, TimetableEntry, TimetableProblem, Weekday,
};
use crate::validation::{validate, ConstraintKind, ValidationContext, Violation};

/// Default repair attempts per violation.
const DEFAULT_ATTEMPTS_PER_VIOLATION: usize = 4;

/// Full repair passes before giving up on a stuck set.
const MAX_PASSES: usize = 4;

/// Result of a targeted [`RepairEngine::resolve`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveOutcome {
    /// The (possibly) repaired entry set.
    pub entries: Vec<TimetableEntry>,
    /// Repair attempts spent.
    pub attempts: usize,
    /// Violations of the targeted kind before repair.
    pub violations_before: usize,
    /// Violations of the targeted kind after repair.
    pub violations_after: usize,
}

/// Clears timetable violations without regressing other constraints.
pub struct RepairEngine<'a> {
    ctx: PlacementContext<'a>,
    attempts_per_violation: usize,
}

impl<'a> RepairEngine<'a> {
    /// Creates a repair engine over the generation input.
    pub fn new(problem: &'a TimetableProblem, external: &'a dyn ExternalScheduleView) -> Self {
        Self {
            ctx: PlacementContext::new(problem, external),
            attempts_per_violation: DEFAULT_ATTEMPTS_PER_VIOLATION,
        }
    }

    /// Sets the attempt bound per violation.
    pub fn with_attempts_per_violation(mut self, attempts: usize) -> Self {
        self.attempts_per_violation = attempts.max(1);
        self
    }

    /// Repairs violations of every kind, hard constraints first.
    ///
    /// Returns the number of violations cleared.
    pub fn repair_all<R: Rng>(&self, state: &mut SchedulingState, rng: &mut R) -> usize {
        let vctx = ValidationContext::new(self.ctx.problem, self.ctx.external);
        let initial = validate(&vctx, state.entries()).violations.len();
        let mut current = initial;

        for pass in 0..MAX_PASSES {
            if current == 0 {
                break;
            }
            let mut report = validate(&vctx, state.entries());
            report
                .violations
                .sort_by_key(|v| std::cmp::Reverse(v.kind.weight()));

            let mut progressed = false;
            for violation in &report.violations {
                if self.repair_one(&vctx, state, rng, violation) {
                    progressed = true;
                }
            }
            current = validate(&vctx, state.entries()).violations.len();
            debug!("repair pass {pass}: {current} violations remain");
            if !progressed {
                break;
            }
        }
        initial.saturating_sub(current)
    }

    /// Repairs violations of one kind, within a global attempt budget.
    pub fn resolve<R: Rng>(
        &self,
        entries: Vec<TimetableEntry>,
        kind: ConstraintKind,
        max_attempts: usize,
        rng: &mut R,
    ) -> ResolveOutcome {
        let vctx = ValidationContext::new(self.ctx.problem, self.ctx.external);
        let mut state = SchedulingState::from_entries(entries);
        let violations_before = validate(&vctx, state.entries()).count_for(kind);
        let mut attempts = 0;

        while attempts < max_attempts {
            let report = validate(&vctx, state.entries());
            let targets: Vec<Violation> = report
                .violations
                .into_iter()
                .filter(|v| v.kind == kind)
                .collect();
            if targets.is_empty() {
                break;
            }
            let mut progressed = false;
            for violation in &targets {
                if attempts >= max_attempts {
                    break;
                }
                attempts += 1;
                if self.repair_one(&vctx, &mut state, rng, violation) {
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }

        let violations_after = validate(&vctx, state.entries()).count_for(kind);
        info!(
            "resolve {kind:?}: {violations_before} -> {violations_after} in {attempts} attempts"
        );
        ResolveOutcome {
            entries: state.into_entries(),
            attempts,
            violations_before,
            violations_after,
        }
    }

    /// Attempts up to `attempts_per_violation` strategies for one violation.
    fn repair_one<R: Rng>(
        &self,
        vctx: &ValidationContext,
        state: &mut SchedulingState,
        rng: &mut R,
        violation: &Violation,
    ) -> bool {
        for attempt in 0..self.attempts_per_violation {
            if self.guarded(vctx, state, violation.kind, |engine, state| {
                engine.apply_strategy(state, rng, violation, attempt)
            }) {
                debug!("repaired {:?} on attempt {attempt}", violation.kind);
                return true;
            }
        }
        false
    }

    /// Applies one mutation under the monotonic-or-abort rule.
    ///
    /// The mutation is kept only if the targeted kind strictly improves
    /// while the total violation count does not increase; otherwise the
    /// snapshot is restored.
    fn guarded<F>(
        &self,
        vctx: &ValidationContext,
        state: &mut SchedulingState,
        kind: ConstraintKind,
        apply: F,
    ) -> bool
    where
        F: FnOnce(&Self, &mut SchedulingState) -> bool,
    {
        let snapshot = state.clone();
        let before = validate(vctx, state.entries());
        if !apply(self, state) {
            *state = snapshot;
            return false;
        }
        let after = validate(vctx, state.entries());
        if after.violations.len() <= before.violations.len()
            && after.count_for(kind) < before.count_for(kind)
        {
            true
        } else {
            *state = snapshot;
            false
        }
    }

    /// One escalation step for one violation kind.
    fn apply_strategy<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        violation: &Violation,
        attempt: usize,
    ) -> bool {
        match violation.kind {
            ConstraintKind::SameLab => {
                let (Some(section), Some(subject)) =
                    (violation.section.as_deref(), violation.subject_code.as_deref())
                else {
                    return false;
                };
                self.collapse_lab_group(state, rng, section, subject)
            }
            ConstraintKind::PracticalBlockShape => {
                let (Some(section), Some(subject)) =
                    (violation.section.as_deref(), violation.subject_code.as_deref())
                else {
                    return false;
                };
                let days = self.ctx.days_for_section(section);
                self.ctx
                    .try_move_practical_block(state, rng, section, subject, &days)
            }
            ConstraintKind::RoomOverlap | ConstraintKind::RoomTypeCompatibility => {
                self.repair_room(state, rng, violation, attempt)
            }
            ConstraintKind::SubjectFrequency => self.repair_frequency(state, rng, violation),
            ConstraintKind::DailyLoad => self.repair_daily_load(state, rng, violation),
            ConstraintKind::TeacherOverlap
            | ConstraintKind::TeacherAvailability
            | ConstraintKind::CrossScheduleConflict
            | ConstraintKind::TeacherWorkload
            | ConstraintKind::TeacherBreak => self.repair_teacher(state, rng, violation, attempt),
            ConstraintKind::SectionOverlap
            | ConstraintKind::SubjectSpacing
            | ConstraintKind::WorkingHours
            | ConstraintKind::ThesisDayExclusivity => self.relocate_offender(state, rng, violation),
        }
    }

    /// Finds an entry matching the violation's structured references.
    fn find_offender(&self, state: &SchedulingState, violation: &Violation) -> Option<usize> {
        state.entries().iter().position(|e| {
            violation.day.is_none_or(|d| e.day == d)
                && violation
                    .period
                    .is_none_or(|p| p == 0 || e.period == p)
                && violation.section.as_deref().is_none_or(|s| e.section == s)
                && violation
                    .teacher_id
                    .as_deref()
                    .is_none_or(|t| e.teacher_id.as_deref() == Some(t))
                && violation
                    .classroom_id
                    .as_deref()
                    .is_none_or(|r| e.classroom_id.as_deref() == Some(r))
                && violation
                    .subject_code
                    .as_deref()
                    .is_none_or(|s| e.subject_code == s)
        })
    }

    /// Moves the offending entry somewhere legal.
    fn relocate_offender<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        violation: &Violation,
    ) -> bool {
        let Some(index) = self.find_offender(state, violation) else {
            return false;
        };
        let section = state.entry(index).section.clone();
        let mut days = self.ctx.days_for_section(&section);
        if violation.kind == ConstraintKind::ThesisDayExclusivity {
            if let Some(day) = violation.day {
                days.retain(|&d| d != day);
            }
        }
        self.ctx.try_move_entry(state, rng, index, &days)
    }

    /// Teacher clash strategies: swap the teacher, then move the entry.
    fn repair_teacher<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        violation: &Violation,
        attempt: usize,
    ) -> bool {
        let Some(index) = self.find_offender(state, violation) else {
            return false;
        };
        let entry = state.entry(index).clone();

        if attempt == 0 && !entry.is_practical {
            // Direct swap: another qualified teacher at the same slot.
            let section = Section::from_label(&entry.section);
            if let Some(subject) = self.ctx.problem.subject(&entry.subject_code, &section.batch_code)
            {
                let current = entry.teacher_id.as_deref();
                let candidates = self.ctx.problem.qualified_teachers(subject, &section);
                for teacher in candidates {
                    if Some(teacher.id.as_str()) != current
                        && self
                            .ctx
                            .teacher_fits(state, &teacher.id, &[(entry.day, entry.period)])
                    {
                        state.set_teacher(index, &teacher.id);
                        return true;
                    }
                }
            }
            return false;
        }
        let days = self.ctx.days_for_section(&entry.section);
        self.ctx.try_move_entry(state, rng, index, &days)
    }

    /// Room clash strategies: same-slot reallocation, relocation, then
    /// an emergency any-free-room fallback.
    fn repair_room<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        violation: &Violation,
        attempt: usize,
    ) -> bool {
        let Some(index) = self.find_offender(state, violation) else {
            return false;
        };
        let entry = state.entry(index).clone();

        if entry.is_practical {
            // The block either rebinds into a lab at its current slots or
            // moves wholesale.
            let first = state
                .entries()
                .iter()
                .filter(|e| {
                    e.is_practical
                        && e.section == entry.section
                        && e.subject_code == entry.subject_code
                })
                .map(|e| e.period)
                .min()
                .unwrap_or(entry.period);
            let len = self.ctx.block_len();
            if let Some(lab) = self.ctx.allocator.allocate_for_practical(
                state,
                rng,
                entry.day,
                first,
                len,
                &entry.section,
                &entry.subject_code,
            ) {
                let block: Vec<usize> = state
                    .entries()
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| {
                        e.is_practical
                            && e.section == entry.section
                            && e.subject_code == entry.subject_code
                    })
                    .map(|(i, _)| i)
                    .collect();
                for idx in block {
                    state.set_room(idx, &lab);
                }
                return true;
            }
            let days = self.ctx.days_for_section(&entry.section);
            return self.ctx.try_move_practical_block(
                state,
                rng,
                &entry.section,
                &entry.subject_code,
                &days,
            );
        }

        match attempt {
            0 => {
                if let Some(room) = self.ctx.allocator.allocate_for_theory(
                    state,
                    rng,
                    entry.day,
                    entry.period,
                    &entry.section,
                ) {
                    state.set_room(index, &room);
                    return true;
                }
                false
            }
            1 => {
                let days = self.ctx.days_for_section(&entry.section);
                self.ctx.try_move_entry(state, rng, index, &days)
            }
            _ => {
                // Emergency: any free room, lab or not.
                let mut rooms: Vec<&str> = self
                    .ctx
                    .problem
                    .classrooms
                    .iter()
                    .map(|c| c.id.as_str())
                    .collect();
                rooms.sort_unstable();
                for room in rooms {
                    if state.is_room_free(room, entry.day, entry.period) {
                        state.set_room(index, room);
                        return true;
                    }
                }
                false
            }
        }
    }

    /// Frequency repair: add the missing instance or drop the surplus.
    fn repair_frequency<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        violation: &Violation,
    ) -> bool {
        let (Some(section_label), Some(subject_code)) =
            (violation.section.as_deref(), violation.subject_code.as_deref())
        else {
            return false;
        };
        let section = Section::from_label(section_label);
        let Some(subject) = self.ctx.problem.subject(subject_code, &section.batch_code) else {
            return false;
        };

        let actual = state
            .entries()
            .iter()
            .filter(|e| e.section == section.label && e.subject_code == subject.code && !e.is_extra)
            .count();
        let expected = usize::from(subject.weekly_entry_count());

        if actual > expected {
            // Drop the latest surplus instance.
            if let Some(index) = state
                .entries()
                .iter()
                .rposition(|e| {
                    e.section == section.label && e.subject_code == subject.code && !e.is_extra
                })
            {
                state.remove(index);
                return true;
            }
            return false;
        }

        if subject.is_practical {
            // A broken block is easier to rebuild than to patch.
            return false;
        }

        // Place one missing theory instance on an unused day.
        let used: Vec<Weekday> = state
            .entries()
            .iter()
            .filter(|e| e.section == section.label && e.subject_code == subject.code && !e.is_extra)
            .map(|e| e.day)
            .collect();
        for day in self.ctx.days_for_section(&section.label) {
            if used.contains(&day) {
                continue;
            }
            for period in self.ctx.problem.config.periods_for(day) {
                if !state.is_section_free(&section.label, day, period) {
                    continue;
                }
                let Some(teacher) =
                    self.ctx
                        .select_teacher(state, subject, &section, &[(day, period)])
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

    /// Daily-load repair: pull a theory class from the busiest day.
    fn repair_daily_load<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        violation: &Violation,
    ) -> bool {
        let (Some(section), Some(light_day)) = (violation.section.as_deref(), violation.day)
        else {
            return false;
        };

        let mut per_day: BTreeMap<Weekday, Vec<usize>> = BTreeMap::new();
        for (i, e) in state.entries().iter().enumerate() {
            if e.section == section && !e.is_practical {
                per_day.entry(e.day).or_default().push(i);
            }
        }
        let Some((&busiest, indices)) = per_day
            .iter()
            .filter(|(&d, _)| d != light_day)
            .max_by_key(|(_, v)| v.len())
        else {
            return false;
        };
        if indices.is_empty() || busiest == light_day {
            return false;
        }
        let index = indices[indices.len() - 1];
        self.ctx.try_move_entry(state, rng, index, &[light_day])
    }

    /// Collapses a split practical group onto its majority lab.
    pub fn collapse_lab_group<R: Rng>(
        &self,
        state: &mut SchedulingState,
        _rng: &mut R,
        section: &str,
        subject_code: &str,
    ) -> bool {
        let group: Vec<usize> = state
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.is_practical && e.section == section && e.subject_code == subject_code
            })
            .map(|(i, _)| i)
            .collect();
        if group.len() < 2 {
            return false;
        }

        let mut usage: BTreeMap<&str, usize> = BTreeMap::new();
        for &i in &group {
            if let Some(room) = state.entry(i).classroom_id.as_deref() {
                *usage.entry(room).or_insert(0) += 1;
            }
        }
        // Majority lab; ties resolve lexicographically via the BTreeMap.
        let Some((majority, _)) = usage.iter().max_by_key(|(room, count)| (**count, *room))
        else {
            return false;
        };
        let majority = majority.to_string();

        let strays: Vec<usize> = group
            .into_iter()
            .filter(|&i| state.entry(i).classroom_id.as_deref() != Some(majority.as_str()))
            .collect();
        if strays.is_empty() {
            return false;
        }
        for index in strays {
            let (day, period) = state.entry(index).slot();
            if !self.ctx.allocator.vacate(state, &majority, day, &[period]) {
                return false;
            }
            state.set_room(index, &majority);
        }
        debug!("collapsed practical {section} {subject_code} onto {majority}");
        true
    }
}
