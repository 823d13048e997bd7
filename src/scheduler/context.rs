//! Shared placement machinery for construction and repair.
//!
//! Teacher selection, slot feasibility, and entry movement are used both
//! by the constructive pass and by the repair engine, so they live in
//! one [`PlacementContext`] built once per run.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeSet, HashMap};

use crate::allocation::{RoomAllocator, SchedulingState};
use crate::models::{
    most_senior_year, ExternalScheduleView, Section, Subject, TimetableProblem, Weekday,
    PRACTICAL_BLOCK_LEN,
};

/// Run-scoped reference data plus resolved availability lookups.
pub struct PlacementContext<'a> {
    /// Generation input.
    pub problem: &'a TimetableProblem,
    /// Externally committed schedules.
    pub external: &'a dyn ExternalScheduleView,
    /// Room allocator with the run's tier partition.
    pub allocator: RoomAllocator,
    blocked: HashMap<String, BTreeSet<(Weekday, u8)>>,
    senior_year: Option<u16>,
}

impl<'a> PlacementContext<'a> {
    /// Builds the context, resolving every teacher's blocked slots once.
    pub fn new(problem: &'a TimetableProblem, external: &'a dyn ExternalScheduleView) -> Self {
        let blocked = problem
            .teachers
            .iter()
            .map(|t| (t.id.clone(), t.blocked_slots(&problem.config)))
            .collect();
        Self {
            problem,
            external,
            allocator: RoomAllocator::new(&problem.classrooms, &problem.batches),
            blocked,
            senior_year: most_senior_year(&problem.batches),
        }
    }

    /// Whether a teacher has blocked a slot.
    pub fn is_blocked(&self, teacher_id: &str, day: Weekday, period: u8) -> bool {
        self.blocked
            .get(teacher_id)
            .is_some_and(|set| set.contains(&(day, period)))
    }

    /// Whether a section belongs to the most senior (thesis) year.
    pub fn is_senior_section(&self, section: &str) -> bool {
        match self.senior_year {
            Some(year) => Section::from_label(section).year_prefix() == Some(year),
            None => false,
        }
    }

    /// Working days usable by a section.
    ///
    /// The reserved thesis day is excluded for senior-year sections.
    pub fn days_for_section(&self, section: &str) -> Vec<Weekday> {
        let config = &self.problem.config;
        config
            .days
            .iter()
            .copied()
            .filter(|&day| {
                !(Some(day) == config.thesis_day && self.is_senior_section(section))
            })
            .collect()
    }

    /// Whether a teacher can take every given slot.
    ///
    /// Checks unavailability, in-run occupancy, external commitments,
    /// and the daily workload ceiling.
    pub fn teacher_fits(
        &self,
        state: &SchedulingState,
        teacher_id: &str,
        slots: &[(Weekday, u8)],
    ) -> bool {
        let Some(teacher) = self.problem.teacher(teacher_id) else {
            return false;
        };
        for &(day, period) in slots {
            if self.is_blocked(teacher_id, day, period)
                || !state.is_teacher_free(teacher_id, day, period)
                || self.external.is_teacher_busy(teacher_id, day, period)
            {
                return false;
            }
        }
        // Daily ceiling across the whole requested set.
        let mut added: HashMap<Weekday, usize> = HashMap::new();
        for &(day, _) in slots {
            *added.entry(day).or_insert(0) += 1;
        }
        added.into_iter().all(|(day, count)| {
            state.teacher_day_load(teacher_id, day) + count
                <= usize::from(teacher.max_classes_per_day)
        })
    }

    /// Picks a teacher for a subject across the given slots.
    ///
    /// Candidates are the teachers whose assignments cover the
    /// (subject, section) pair, ranked by ascending current workload;
    /// on ties, teachers with explicit unavailability go first so the
    /// constrained ones are placed while slots are plentiful.
    pub fn select_teacher(
        &self,
        state: &SchedulingState,
        subject: &Subject,
        section: &Section,
        slots: &[(Weekday, u8)],
    ) -> Option<String> {
        let mut candidates = self.problem.qualified_teachers(subject, section);
        candidates.sort_by_key(|t| {
            (
                state.teacher_load(&t.id),
                if t.has_constraints() { 0u8 } else { 1u8 },
                t.id.clone(),
            )
        });
        candidates
            .into_iter()
            .find(|t| self.teacher_fits(state, &t.id, slots))
            .map(|t| t.id.clone())
    }

    /// Moves the entry at `index` to a legal slot on one of `target_days`.
    ///
    /// Theory entries move alone; practical entries drag their whole
    /// block. Returns whether a move happened.
    pub fn try_move_entry<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        index: usize,
        target_days: &[Weekday],
    ) -> bool {
        let entry = state.entry(index).clone();
        if entry.is_practical {
            self.try_move_practical_block(state, rng, &entry.section, &entry.subject_code, target_days)
        } else {
            self.try_move_theory(state, rng, index, target_days)
        }
    }

    fn try_move_theory<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        index: usize,
        target_days: &[Weekday],
    ) -> bool {
        let entry = state.entry(index).clone();
        let config = &self.problem.config;
        let mut days = target_days.to_vec();
        days.shuffle(rng);

        for day in days {
            let mut periods: Vec<u8> = config.periods_for(day).collect();
            periods.shuffle(rng);
            for period in periods {
                if (day, period) == entry.slot() {
                    continue;
                }
                if !state.is_section_free(&entry.section, day, period) {
                    continue;
                }
                if let Some(teacher) = entry.teacher_id.as_deref() {
                    if self.is_blocked(teacher, day, period)
                        || !state.is_teacher_free(teacher, day, period)
                        || self.external.is_teacher_busy(teacher, day, period)
                    {
                        continue;
                    }
                    // Moving onto a different day must respect the
                    // teacher's daily ceiling there.
                    if day != entry.day {
                        let ceiling = self
                            .problem
                            .teacher(teacher)
                            .map(|t| usize::from(t.max_classes_per_day))
                            .unwrap_or(usize::MAX);
                        if state.teacher_day_load(teacher, day) + 1 > ceiling {
                            continue;
                        }
                    }
                }
                // Keep the room when it is free at the target, otherwise
                // ask the allocator for a new one.
                let room = match entry.classroom_id.as_deref() {
                    Some(room) if state.is_room_free(room, day, period) => Some(room.to_string()),
                    _ => self
                        .allocator
                        .allocate_for_theory(state, rng, day, period, &entry.section),
                };
                let Some(room) = room else { continue };

                state.set_slot(index, day, period);
                state.set_room(index, &room);
                debug!(
                    "moved {} {} to {day} p{period} room {room}",
                    entry.section, entry.subject_code
                );
                return true;
            }
        }
        false
    }

    /// Moves a whole practical block to a fresh (day, start) position.
    pub fn try_move_practical_block<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        section: &str,
        subject_code: &str,
        target_days: &[Weekday],
    ) -> bool {
        let block: Vec<usize> = state
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.is_practical && e.section == section && e.subject_code == subject_code
            })
            .map(|(i, _)| i)
            .collect();
        if block.is_empty() {
            return false;
        }
        let len = block.len() as u8;
        let teacher = state.entry(block[0]).teacher_id.clone();
        let old_slots: BTreeSet<(Weekday, u8)> =
            block.iter().map(|&i| state.entry(i).slot()).collect();

        let config = &self.problem.config;
        let mut days = target_days.to_vec();
        days.shuffle(rng);

        for day in days {
            let ceiling = config.period_ceiling(day);
            if ceiling < len {
                continue;
            }
            let mut starts: Vec<u8> = (1..=ceiling + 1 - len).collect();
            starts.shuffle(rng);
            for start in starts {
                let slots: Vec<(Weekday, u8)> = (start..start + len).map(|p| (day, p)).collect();
                if slots.iter().all(|s| old_slots.contains(s)) {
                    continue;
                }
                let free = slots.iter().all(|&(d, p)| {
                    (old_slots.contains(&(d, p)) || state.is_section_free(section, d, p))
                        && match teacher.as_deref() {
                            Some(t) => {
                                !self.is_blocked(t, d, p)
                                    && (old_slots.contains(&(d, p)) || state.is_teacher_free(t, d, p))
                                    && !self.external.is_teacher_busy(t, d, p)
                            }
                            None => true,
                        }
                });
                if !free {
                    continue;
                }
                let Some(lab) = self.allocator.allocate_for_practical(
                    state,
                    rng,
                    day,
                    start,
                    len,
                    section,
                    subject_code,
                ) else {
                    continue;
                };
                for (offset, &idx) in block.iter().enumerate() {
                    state.set_slot(idx, day, start + offset as u8);
                    state.set_room(idx, &lab);
                }
                debug!("moved practical {section} {subject_code} block to {day} p{start}");
                return true;
            }
        }
        false
    }

    /// Standard practical block length for this run.
    pub fn block_len(&self) -> u8 {
        PRACTICAL_BLOCK_LEN
    }
}
