//! Generation orchestration.
//!
//! [`GenerationEngine`] drives one full timetable generation run: input
//! validation, constructive or evolutionary construction, a global
//! same-lab repair pass, best-effort violation repair, and the final
//! report. Each run builds a fresh replacement entry set; committing it
//! atomically (and discarding the previous one) is the caller's side of
//! the contract.
//!
//! The engine also exposes the standalone [`validate`](GenerationEngine::validate)
//! and [`resolve`](GenerationEngine::resolve) operations of the service
//! surface.

use log::{info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::allocation::SchedulingState;
use crate::ga::{GaConfig, GaRunner, TimetableGa};
use crate::models::{
    ExternalScheduleView, ProblemDefect, TimetableEntry, TimetableProblem, Weekday,
};
use crate::scheduler::{ConstructiveScheduler, RepairEngine, ResolveOutcome, Unscheduled};
use crate::validation::{
    validate, ConstraintKind, ValidationContext, ValidationReport, Violation,
};

/// How the engine builds candidate timetables.
#[derive(Debug, Clone)]
pub enum GenerationPolicy {
    /// One deterministic constructive pass per section.
    Constructive,
    /// Population-based optimization over randomized constructions.
    Evolutionary(GaConfig),
}

/// A condition that prevents a generation run from starting.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// The generation input failed validation.
    InvalidInput(Vec<ProblemDefect>),
    /// The optimizer configuration failed validation.
    InvalidOptimizerConfig(String),
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::InvalidInput(defects) => {
                write!(f, "invalid generation input ({} defects): ", defects.len())?;
                let messages: Vec<&str> =
                    defects.iter().map(|d| d.message.as_str()).collect();
                f.write_str(&messages.join("; "))
            }
            GenerationError::InvalidOptimizerConfig(message) => {
                write!(f, "invalid optimizer configuration: {message}")
            }
        }
    }
}

impl std::error::Error for GenerationError {}

/// Per-teacher workload figures in the final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherStats {
    /// Teacher identifier.
    pub teacher_id: String,
    /// Weekly classes assigned.
    pub total_classes: usize,
    /// Day carrying the most classes, if any are assigned.
    pub busiest_day: Option<Weekday>,
    /// Number of days with at least one class.
    pub active_days: usize,
}

/// Figures from the optimizer, when the evolutionary policy ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerStats {
    /// Generations executed.
    pub generations: usize,
    /// Whether the run stopped on the stagnation limit.
    pub stagnated: bool,
    /// Best score of the initial population.
    pub initial_score: i32,
    /// Best score at termination.
    pub final_score: i32,
}

/// Summary figures of one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Entries in the final set.
    pub entry_count: usize,
    /// Violations remaining after repair.
    pub violation_count: usize,
    /// Hard-constraint violations remaining after repair.
    pub hard_violation_count: usize,
    /// Violations cleared by the repair pass.
    pub violations_repaired: usize,
    /// Share of practical groups confined to a single lab, 0-100.
    pub same_lab_compliance_pct: f64,
    /// Entries per section.
    pub section_entry_counts: BTreeMap<String, usize>,
    /// Workload figures per assigned teacher.
    pub teacher_stats: Vec<TeacherStats>,
    /// Optimizer figures, absent under the constructive policy.
    pub optimizer: Option<OptimizerStats>,
}

/// Result of one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutcome {
    /// The replacement entry set for the batches in scope.
    pub entries: Vec<TimetableEntry>,
    /// Final fitness score; 1000 means violation-free.
    pub score: i32,
    /// Violations remaining in the final set.
    pub violations: Vec<Violation>,
    /// Subject instances that found no legal placement.
    pub unscheduled: Vec<Unscheduled>,
    /// Run statistics.
    pub stats: GenerationStats,
}

/// Drives full generation runs over a timetable problem.
pub struct GenerationEngine {
    policy: GenerationPolicy,
}

impl GenerationEngine {
    /// Creates an engine with the given construction policy.
    pub fn new(policy: GenerationPolicy) -> Self {
        Self { policy }
    }

    /// Engine using the constructive scheduler only.
    pub fn constructive() -> Self {
        Self::new(GenerationPolicy::Constructive)
    }

    /// Engine using the evolutionary optimizer.
    pub fn evolutionary(config: GaConfig) -> Self {
        Self::new(GenerationPolicy::Evolutionary(config))
    }

    /// Runs one full generation pass.
    ///
    /// The same seed over the same inputs reproduces the identical
    /// outcome. Construction failures are reported in
    /// [`GenerationOutcome::unscheduled`], never silently dropped;
    /// violations that survive repair are surfaced in the outcome.
    pub fn generate(
        &self,
        problem: &TimetableProblem,
        external: &dyn ExternalScheduleView,
        seed: u64,
    ) -> Result<GenerationOutcome, GenerationError> {
        problem.validate().map_err(GenerationError::InvalidInput)?;
        if let GenerationPolicy::Evolutionary(config) = &self.policy {
            config
                .validate()
                .map_err(GenerationError::InvalidOptimizerConfig)?;
        }

        let mut rng = SmallRng::seed_from_u64(seed);
        info!(
            "generation run: {} batches, seed {seed}",
            problem.config.batch_codes.len()
        );

        // Fresh run-scoped state; the previous entry set is replaced
        // wholesale on commit.
        let (mut state, unscheduled, optimizer) = match &self.policy {
            GenerationPolicy::Constructive => {
                let scheduler = ConstructiveScheduler::new(problem, external);
                let mut state = SchedulingState::new();
                let unscheduled = scheduler.build(&mut state, &mut rng);
                (state, unscheduled, None)
            }
            GenerationPolicy::Evolutionary(config) => {
                let ga = TimetableGa::new(problem, external);
                let outcome = GaRunner::run(&ga, config, &mut rng);
                let optimizer = OptimizerStats {
                    generations: outcome.generations,
                    stagnated: outcome.stagnated,
                    initial_score: outcome.score_history.first().copied().unwrap_or(0),
                    final_score: outcome.best.score(),
                };
                (
                    SchedulingState::from_entries(outcome.best.entries),
                    outcome.best.unscheduled,
                    Some(optimizer),
                )
            }
        };

        let repair = RepairEngine::new(problem, external);
        self.collapse_split_lab_groups(&repair, &mut state, &mut rng);
        let repaired = repair.repair_all(&mut state, &mut rng);

        let vctx = ValidationContext::new(problem, external);
        let report = validate(&vctx, state.entries());
        if report.hard_violation_count() > 0 {
            warn!(
                "{} hard violations survived repair",
                report.hard_violation_count()
            );
        }

        let entries = state.into_entries();
        let stats = self.build_stats(&entries, &report, repaired, optimizer);
        info!(
            "run complete: {} entries, {} violations, score {}",
            stats.entry_count, stats.violation_count, report.score
        );
        Ok(GenerationOutcome {
            score: report.score,
            violations: report.violations,
            unscheduled,
            stats,
            entries,
        })
    }

    /// Validates an entry set against the problem's constraints.
    pub fn validate(
        &self,
        problem: &TimetableProblem,
        external: &dyn ExternalScheduleView,
        entries: &[TimetableEntry],
    ) -> ValidationReport {
        let vctx = ValidationContext::new(problem, external);
        validate(&vctx, entries)
    }

    /// Repairs violations of one constraint kind within an attempt budget.
    pub fn resolve(
        &self,
        problem: &TimetableProblem,
        external: &dyn ExternalScheduleView,
        entries: Vec<TimetableEntry>,
        kind: ConstraintKind,
        max_attempts: usize,
        seed: u64,
    ) -> ResolveOutcome {
        let mut rng = SmallRng::seed_from_u64(seed);
        RepairEngine::new(problem, external).resolve(entries, kind, max_attempts, &mut rng)
    }

    /// Collapses every practical group that spans more than one lab.
    ///
    /// Majority-usage wins per group; the allocator relocates occupants
    /// of the winning lab where needed.
    fn collapse_split_lab_groups(
        &self,
        repair: &RepairEngine,
        state: &mut SchedulingState,
        rng: &mut SmallRng,
    ) {
        let split: Vec<(String, String)> = practical_group_rooms(state.entries())
            .into_iter()
            .filter(|(_, rooms)| rooms.len() > 1)
            .map(|((section, subject), _)| (section, subject))
            .collect();
        for (section, subject) in split {
            if !repair.collapse_lab_group(state, rng, &section, &subject) {
                warn!("practical {section} {subject} still spans multiple labs");
            }
        }
    }

    fn build_stats(
        &self,
        entries: &[TimetableEntry],
        report: &ValidationReport,
        violations_repaired: usize,
        optimizer: Option<OptimizerStats>,
    ) -> GenerationStats {
        let mut section_entry_counts: BTreeMap<String, usize> = BTreeMap::new();
        for e in entries {
            *section_entry_counts.entry(e.section.clone()).or_insert(0) += 1;
        }

        let groups = practical_group_rooms(entries);
        let same_lab_compliance_pct = if groups.is_empty() {
            100.0
        } else {
            let compliant = groups.values().filter(|rooms| rooms.len() <= 1).count();
            compliant as f64 * 100.0 / groups.len() as f64
        };

        GenerationStats {
            entry_count: entries.len(),
            violation_count: report.violations.len(),
            hard_violation_count: report.hard_violation_count(),
            violations_repaired,
            same_lab_compliance_pct,
            section_entry_counts,
            teacher_stats: teacher_stats(entries),
            optimizer,
        }
    }
}

/// Distinct rooms used by each practical (section, subject) group.
fn practical_group_rooms(
    entries: &[TimetableEntry],
) -> BTreeMap<(String, String), BTreeSet<String>> {
    let mut groups: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
    for e in entries.iter().filter(|e| e.is_practical) {
        let rooms = groups
            .entry((e.section.clone(), e.subject_code.clone()))
            .or_default();
        if let Some(room) = &e.classroom_id {
            rooms.insert(room.clone());
        }
    }
    groups
}

/// Workload figures per assigned teacher, in id order.
fn teacher_stats(entries: &[TimetableEntry]) -> Vec<TeacherStats> {
    let mut per_day: BTreeMap<&str, BTreeMap<Weekday, usize>> = BTreeMap::new();
    for e in entries {
        if let Some(teacher) = e.teacher_id.as_deref() {
            *per_day
                .entry(teacher)
                .or_default()
                .entry(e.day)
                .or_insert(0) += 1;
        }
    }
    per_day
        .into_iter()
        .map(|(teacher_id, days)| TeacherStats {
            teacher_id: teacher_id.to_string(),
            total_classes: days.values().sum(),
            busiest_day: days
                .iter()
                .max_by_key(|&(_, count)| count)
                .map(|(&day, _)| day),
            active_days: days.len(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Batch, Classroom, NoExternalSchedules, ScheduleConfig, SnapshotView, Subject, Teacher,
        TeacherSubjectAssignment, UnavailabilityMap,
    };

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn theory_scenario() -> TimetableProblem {
        init_logs();
        let config = ScheduleConfig::default()
            .with_batch("21SW")
            .with_min_classes_per_day(1);
        TimetableProblem::new(config)
            .with_batch(Batch::new("21SW"))
            .with_subject(Subject::new("CS-301", "Operating Systems", "21SW").with_credits(3))
            .with_teacher(Teacher::new("T1", "Dr. Ayesha"))
            .with_classroom(Classroom::new("R1", "Room 101", "Main"))
            .with_classroom(Classroom::new("L1", "Software Lab 1", "Main"))
            .with_assignment(TeacherSubjectAssignment::new("T1", "CS-301", "21SW"))
    }

    fn practical_scenario(unavailable: UnavailabilityMap) -> TimetableProblem {
        init_logs();
        TimetableProblem::new(ScheduleConfig::default().with_batch("21SW"))
            .with_batch(Batch::new("21SW"))
            .with_subject(
                Subject::new("CS-301L", "Operating Systems Lab", "21SW")
                    .with_credits(1)
                    .practical(),
            )
            .with_teacher(Teacher::new("T2", "Dr. Bilal").with_unavailability(unavailable))
            .with_classroom(Classroom::new("L1", "Software Lab 1", "Main"))
            .with_assignment(TeacherSubjectAssignment::new("T2", "CS-301L", "21SW"))
    }

    #[test]
    fn test_generate_three_credit_theory() {
        let problem = theory_scenario();
        let engine = GenerationEngine::constructive();
        let outcome = engine.generate(&problem, &NoExternalSchedules, 42).unwrap();

        assert_eq!(outcome.entries.len(), 3);
        assert!(outcome.violations.is_empty(), "{:?}", outcome.violations);
        assert_eq!(outcome.score, 1000);
        assert!(outcome.unscheduled.is_empty());

        let days: BTreeSet<Weekday> = outcome.entries.iter().map(|e| e.day).collect();
        assert_eq!(days.len(), 3);
        assert!(outcome
            .entries
            .iter()
            .all(|e| e.classroom_id.as_deref() == Some("R1")));
        assert!(outcome
            .entries
            .iter()
            .all(|e| e.teacher_id.as_deref() == Some("T1")));
    }

    #[test]
    fn test_generate_practical_avoids_blocked_slots() {
        let blocked =
            UnavailabilityMap::new().block_periods(Weekday::Monday, vec![1, 2, 3]);
        let problem = practical_scenario(blocked);
        let engine = GenerationEngine::constructive();
        let outcome = engine.generate(&problem, &NoExternalSchedules, 7).unwrap();

        assert!(outcome.unscheduled.is_empty());
        let mut block: Vec<&TimetableEntry> = outcome.entries.iter().collect();
        block.sort_by_key(|e| e.period);
        assert_eq!(block.len(), 3);

        let day = block[0].day;
        assert!(block.iter().all(|e| e.day == day));
        assert!(block.windows(2).all(|w| w[1].period == w[0].period + 1));
        assert!(block
            .iter()
            .all(|e| e.classroom_id.as_deref() == Some("L1")));
        assert!(!block
            .iter()
            .any(|e| e.day == Weekday::Monday && e.period <= 3));
        assert_eq!(outcome.stats.same_lab_compliance_pct, 100.0);
    }

    #[test]
    fn test_generate_reports_unschedulable_subject() {
        let mut all_week = UnavailabilityMap::new();
        for day in ScheduleConfig::default().days {
            all_week = all_week.block_day(day);
        }
        let problem = practical_scenario(all_week);
        let engine = GenerationEngine::constructive();
        let outcome = engine.generate(&problem, &NoExternalSchedules, 7).unwrap();

        assert!(outcome
            .unscheduled
            .iter()
            .any(|u| u.subject_code == "CS-301L" && u.section == "21SW-I"));
        assert!(outcome.entries.is_empty());
    }

    #[test]
    fn test_generate_deterministic_under_fixed_seed() {
        let problem = theory_scenario();
        let engine = GenerationEngine::constructive();
        let a = engine.generate(&problem, &NoExternalSchedules, 123).unwrap();
        let b = engine.generate(&problem, &NoExternalSchedules, 123).unwrap();

        assert_eq!(a.entries, b.entries);
        assert_eq!(a.score, b.score);
        assert_eq!(a.stats, b.stats);
    }

    #[test]
    fn test_generate_rejects_broken_config() {
        let problem = TimetableProblem::new(ScheduleConfig::default());
        let engine = GenerationEngine::constructive();
        let err = engine
            .generate(&problem, &NoExternalSchedules, 1)
            .unwrap_err();
        match err {
            GenerationError::InvalidInput(defects) => assert!(!defects.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_generate_rejects_broken_ga_config() {
        let problem = theory_scenario();
        let engine = GenerationEngine::evolutionary(GaConfig::fast().with_population_size(1));
        let err = engine
            .generate(&problem, &NoExternalSchedules, 1)
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidOptimizerConfig(_)));
    }

    #[test]
    fn test_generate_evolutionary_policy() {
        let problem = theory_scenario();
        let config = GaConfig::fast()
            .with_population_size(6)
            .with_max_generations(10)
            .with_parallel(false);
        let engine = GenerationEngine::evolutionary(config);
        let outcome = engine.generate(&problem, &NoExternalSchedules, 9).unwrap();

        let optimizer = outcome.stats.optimizer.as_ref().expect("optimizer stats");
        assert!(optimizer.final_score >= optimizer.initial_score);
        // The final score reflects the post-repair entry set.
        let recheck = engine.validate(&problem, &NoExternalSchedules, &outcome.entries);
        assert_eq!(recheck.score, outcome.score);
    }

    #[test]
    fn test_generate_respects_external_commitments() {
        let problem = theory_scenario();
        // T1 externally committed all Monday mornings.
        let external = SnapshotView::new(
            (1..=7)
                .map(|p| {
                    TimetableEntry::new(Weekday::Monday, p, "EE-210", "22EE-I").with_teacher("T1")
                })
                .collect(),
        );
        let engine = GenerationEngine::constructive();
        let outcome = engine.generate(&problem, &external, 3).unwrap();

        assert!(outcome
            .entries
            .iter()
            .all(|e| e.day != Weekday::Monday));
        assert!(outcome.violations.is_empty());
    }

    #[test]
    fn test_resolve_same_lab_split() {
        let problem = practical_scenario(UnavailabilityMap::new())
            .with_classroom(Classroom::new("L2", "Software Lab 2", "Main"));
        let engine = GenerationEngine::constructive();
        let entries: Vec<TimetableEntry> = [("L1", 1u8), ("L2", 2), ("L1", 3)]
            .iter()
            .map(|&(room, period)| {
                TimetableEntry::new(Weekday::Tuesday, period, "CS-301L", "21SW-I")
                    .with_teacher("T2")
                    .with_classroom(room)
                    .practical()
            })
            .collect();

        let outcome = engine.resolve(
            &problem,
            &NoExternalSchedules,
            entries,
            ConstraintKind::SameLab,
            10,
            1,
        );
        assert_eq!(outcome.violations_before, 1);
        assert_eq!(outcome.violations_after, 0);
    }

    #[test]
    fn test_generate_multi_section_invariants() {
        init_logs();
        let config = ScheduleConfig::default().with_batch("21SW").with_batch("22SW");
        let problem = TimetableProblem::new(config)
            .with_batch(Batch::new("21SW").with_sections(2))
            .with_batch(Batch::new("22SW"))
            .with_subject(Subject::new("CS-301", "Operating Systems", "21SW").with_credits(2))
            .with_subject(
                Subject::new("CS-301L", "Operating Systems Lab", "21SW")
                    .with_credits(1)
                    .practical(),
            )
            .with_subject(Subject::new("CS-201", "Data Structures", "22SW").with_credits(2))
            .with_subject(
                Subject::new("CS-201L", "Data Structures Lab", "22SW")
                    .with_credits(1)
                    .practical(),
            )
            .with_teacher(Teacher::new("T1", "Dr. Ayesha"))
            .with_teacher(Teacher::new("T2", "Dr. Bilal"))
            .with_teacher(Teacher::new("T3", "Dr. Chandio"))
            .with_classroom(Classroom::new("R1", "Room 101", "Main"))
            .with_classroom(Classroom::new("R2", "Room 102", "Main"))
            .with_classroom(Classroom::new("J1", "Room 201", "Annex").with_priority(1))
            .with_classroom(Classroom::new("L1", "Software Lab 1", "Annex").with_priority(1))
            .with_classroom(Classroom::new("L2", "Software Lab 2", "Annex").with_priority(1))
            .with_assignment(TeacherSubjectAssignment::new("T1", "CS-301", "21SW"))
            .with_assignment(TeacherSubjectAssignment::new("T2", "CS-301L", "21SW"))
            .with_assignment(TeacherSubjectAssignment::new("T3", "CS-201", "22SW"))
            .with_assignment(TeacherSubjectAssignment::new("T3", "CS-201L", "22SW"));

        let engine = GenerationEngine::constructive();
        let outcome = engine.generate(&problem, &NoExternalSchedules, 17).unwrap();
        assert!(outcome.unscheduled.is_empty(), "{:?}", outcome.unscheduled);

        // No teacher, room, or section double-booking.
        let mut teacher_slots = BTreeSet::new();
        let mut room_slots = BTreeSet::new();
        let mut section_slots = BTreeSet::new();
        for e in &outcome.entries {
            if let Some(t) = &e.teacher_id {
                assert!(teacher_slots.insert((t.clone(), e.day, e.period)));
            }
            if let Some(r) = &e.classroom_id {
                assert!(room_slots.insert((r.clone(), e.day, e.period)));
            }
            assert!(section_slots.insert((e.section.clone(), e.day, e.period)));
        }

        // Every practical group is one contiguous single-lab block.
        for section in ["21SW-I", "21SW-II", "22SW-I"] {
            let mut block: Vec<&TimetableEntry> = outcome
                .entries
                .iter()
                .filter(|e| e.section == section && e.is_practical)
                .collect();
            block.sort_by_key(|e| e.period);
            assert_eq!(block.len(), 3, "section {section}");
            assert!(block.iter().all(|e| e.day == block[0].day));
            assert!(block.windows(2).all(|w| w[1].period == w[0].period + 1));
            let rooms: BTreeSet<&str> =
                block.iter().filter_map(|e| e.classroom_id.as_deref()).collect();
            assert_eq!(rooms.len(), 1);
            let room = problem.classroom(rooms.iter().next().unwrap()).unwrap();
            assert!(room.is_lab());
        }
        assert_eq!(outcome.stats.same_lab_compliance_pct, 100.0);

        // Theory frequency equals credits, extras excluded.
        for (section, subject, credits) in
            [("21SW-I", "CS-301", 2), ("21SW-II", "CS-301", 2), ("22SW-I", "CS-201", 2)]
        {
            let count = outcome
                .entries
                .iter()
                .filter(|e| e.section == section && e.subject_code == subject && !e.is_extra)
                .count();
            assert_eq!(count, credits, "{section} {subject}");
        }
    }

    #[test]
    fn test_teacher_stats_figures() {
        let entries = vec![
            TimetableEntry::new(Weekday::Monday, 1, "A", "21SW-I").with_teacher("T1"),
            TimetableEntry::new(Weekday::Monday, 2, "B", "21SW-I").with_teacher("T1"),
            TimetableEntry::new(Weekday::Wednesday, 1, "A", "21SW-II").with_teacher("T1"),
            TimetableEntry::new(Weekday::Friday, 1, "C", "21SW-I").with_teacher("T2"),
        ];
        let stats = teacher_stats(&entries);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].teacher_id, "T1");
        assert_eq!(stats[0].total_classes, 3);
        assert_eq!(stats[0].busiest_day, Some(Weekday::Monday));
        assert_eq!(stats[0].active_days, 2);
        assert_eq!(stats[1].total_classes, 1);
    }

    #[test]
    fn test_outcome_serializes() {
        let problem = theory_scenario();
        let engine = GenerationEngine::constructive();
        let outcome = engine.generate(&problem, &NoExternalSchedules, 42).unwrap();

        let json = serde_json::to_string(&outcome).unwrap();
        let back: GenerationOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entries, outcome.entries);
        assert_eq!(back.stats, outcome.stats);
    }
}
