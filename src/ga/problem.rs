//! Candidate timetables and their evolutionary operators.
//!
//! A candidate is one complete entry set built by the constructive
//! scheduler under randomized tie-breaks, scored by the validator's
//! weighted penalty (lower is better). [`TimetableGa`] bundles the
//! operators the runner applies: randomized construction, split-point
//! recombination of entry lists, and pairwise slot-swap mutation.

use rand::Rng;

use crate::allocation::SchedulingState;
use crate::models::{ExternalScheduleView, TimetableEntry, TimetableProblem};
use crate::scheduler::{ConstructiveScheduler, Unscheduled};
use crate::validation::{validate, ValidationContext, ValidationReport, PERFECT_SCORE};

/// Penalty marker for a candidate the runner has not scored yet.
pub(crate) const UNSCORED: u32 = u32::MAX;

/// One candidate timetable in the optimizer's population.
#[derive(Debug, Clone)]
pub struct TimetableCandidate {
    /// The candidate's full entry set.
    pub entries: Vec<TimetableEntry>,
    /// Subject instances construction could not place.
    pub unscheduled: Vec<Unscheduled>,
    /// Weighted violation penalty; the runner minimizes this.
    pub penalty: u32,
}

impl TimetableCandidate {
    /// Fitness score of this candidate; higher is better.
    pub fn score(&self) -> i32 {
        PERFECT_SCORE - self.penalty as i32
    }
}

/// Evolutionary operators over candidate timetables.
pub struct TimetableGa<'a> {
    scheduler: ConstructiveScheduler<'a>,
    vctx: ValidationContext<'a>,
}

impl<'a> TimetableGa<'a> {
    /// Builds the operator set over the generation input.
    pub fn new(problem: &'a TimetableProblem, external: &'a dyn ExternalScheduleView) -> Self {
        Self {
            scheduler: ConstructiveScheduler::new(problem, external),
            vctx: ValidationContext::new(problem, external),
        }
    }

    /// Builds one randomized constructive candidate, unscored.
    pub fn create<R: Rng>(&self, rng: &mut R) -> TimetableCandidate {
        let mut state = SchedulingState::new();
        let unscheduled = self.scheduler.build(&mut state, rng);
        TimetableCandidate {
            entries: state.into_entries(),
            unscheduled,
            penalty: UNSCORED,
        }
    }

    /// Weighted penalty of an entry set.
    pub fn evaluate(&self, entries: &[TimetableEntry]) -> u32 {
        validate(&self.vctx, entries).total_penalty
    }

    /// Full validation report for an entry set.
    pub fn report(&self, entries: &[TimetableEntry]) -> ValidationReport {
        validate(&self.vctx, entries)
    }

    /// Split-point recombination of two parents' entry lists.
    ///
    /// Each child inherits the unscheduled list of the parent that
    /// contributes its prefix.
    pub fn crossover<R: Rng>(
        &self,
        a: &TimetableCandidate,
        b: &TimetableCandidate,
        rng: &mut R,
    ) -> (TimetableCandidate, TimetableCandidate) {
        let limit = a.entries.len().min(b.entries.len());
        let cut = if limit == 0 {
            0
        } else {
            rng.random_range(0..=limit)
        };

        let mut first = a.entries[..cut].to_vec();
        first.extend_from_slice(&b.entries[cut..]);
        let mut second = b.entries[..cut].to_vec();
        second.extend_from_slice(&a.entries[cut..]);

        (
            TimetableCandidate {
                entries: first,
                unscheduled: a.unscheduled.clone(),
                penalty: UNSCORED,
            },
            TimetableCandidate {
                entries: second,
                unscheduled: b.unscheduled.clone(),
                penalty: UNSCORED,
            },
        )
    }

    /// Swaps the slots of two random entries.
    pub fn mutate<R: Rng>(&self, candidate: &mut TimetableCandidate, rng: &mut R) {
        let n = candidate.entries.len();
        if n < 2 {
            return;
        }
        let i = rng.random_range(0..n);
        let mut j = rng.random_range(0..n - 1);
        if j >= i {
            j += 1;
        }
        let (day_i, period_i) = candidate.entries[i].slot();
        let (day_j, period_j) = candidate.entries[j].slot();
        candidate.entries[i].day = day_j;
        candidate.entries[i].period = period_j;
        candidate.entries[j].day = day_i;
        candidate.entries[j].period = period_i;
        candidate.penalty = UNSCORED;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Batch, Classroom, NoExternalSchedules, ScheduleConfig, Subject, Teacher,
        TeacherSubjectAssignment, Weekday,
    };
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn problem() -> TimetableProblem {
        TimetableProblem::new(ScheduleConfig::default().with_batch("21SW"))
            .with_batch(Batch::new("21SW"))
            .with_subject(Subject::new("CS-301", "Operating Systems", "21SW").with_credits(3))
            .with_teacher(Teacher::new("T1", "Dr. Ayesha"))
            .with_classroom(Classroom::new("R1", "Room 101", "Main"))
            .with_assignment(TeacherSubjectAssignment::new("T1", "CS-301", "21SW"))
    }

    #[test]
    fn test_create_builds_full_candidate() {
        let problem = problem();
        let ga = TimetableGa::new(&problem, &NoExternalSchedules);
        let candidate = ga.create(&mut SmallRng::seed_from_u64(3));

        assert!(candidate.unscheduled.is_empty());
        assert!(candidate.entries.len() >= 3);
        assert_eq!(candidate.penalty, UNSCORED);
        assert_eq!(ga.evaluate(&candidate.entries), 0);
    }

    #[test]
    fn test_crossover_preserves_total_length() {
        let problem = problem();
        let ga = TimetableGa::new(&problem, &NoExternalSchedules);
        let mut rng = SmallRng::seed_from_u64(9);
        let a = ga.create(&mut rng);
        let b = ga.create(&mut rng);

        let (c1, c2) = ga.crossover(&a, &b, &mut rng);
        assert_eq!(
            c1.entries.len() + c2.entries.len(),
            a.entries.len() + b.entries.len()
        );
        assert_eq!(c1.penalty, UNSCORED);
    }

    #[test]
    fn test_mutate_swaps_two_slots() {
        let problem = problem();
        let ga = TimetableGa::new(&problem, &NoExternalSchedules);
        let mut candidate = TimetableCandidate {
            entries: vec![
                TimetableEntry::new(Weekday::Monday, 1, "CS-301", "21SW-I"),
                TimetableEntry::new(Weekday::Tuesday, 2, "CS-301", "21SW-I"),
                TimetableEntry::new(Weekday::Wednesday, 3, "CS-301", "21SW-I"),
                TimetableEntry::new(Weekday::Thursday, 4, "CS-301", "21SW-I"),
            ],
            unscheduled: Vec::new(),
            penalty: 0,
        };

        let before: Vec<(Weekday, u8)> = candidate.entries.iter().map(|e| e.slot()).collect();
        ga.mutate(&mut candidate, &mut SmallRng::seed_from_u64(4));
        let after: Vec<(Weekday, u8)> = candidate.entries.iter().map(|e| e.slot()).collect();

        let changed: Vec<usize> = (0..before.len()).filter(|&i| before[i] != after[i]).collect();
        assert_eq!(changed.len(), 2);
        assert_eq!(before[changed[0]], after[changed[1]]);
        assert_eq!(before[changed[1]], after[changed[0]]);
        assert_eq!(candidate.penalty, UNSCORED);
    }

    #[test]
    fn test_score_complements_penalty() {
        let candidate = TimetableCandidate {
            entries: Vec::new(),
            unscheduled: Vec::new(),
            penalty: 40,
        };
        assert_eq!(candidate.score(), PERFECT_SCORE - 40);
    }
}
