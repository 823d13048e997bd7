//! Room and laboratory allocation.
//!
//! The allocator answers one question: which room hosts a requested
//! (section, subject, day, period[s]) placement. Resolution order:
//!
//! 1. An existing lab binding of the practical group is mandatory.
//! 2. A section's existing theory room on the same day is reused.
//! 3. Theory stays inside the section's building tier; labs are the only
//!    cross-tier fallback.
//! 4. Occupied rooms may be freed by relocating occupants to rooms of the
//!    same class, through a depth-bounded worklist cascade.
//! 5. Among equally valid rooms, the least-used wins, with a small
//!    randomized tie-break among the top candidates.
//!
//! Every operation may return `None`; callers must treat that as an
//! infeasible placement, never as licence to break room policy.

use log::debug;
use rand::Rng;

use super::state::SchedulingState;
use crate::models::{constrained_year, Batch, Classroom, TimetableEntry, Weekday};

/// Default bound on the relocation cascade.
const DEFAULT_CASCADE_DEPTH: usize = 3;

/// How many top candidates share the randomized tie-break.
const TIE_BREAK_POOL: usize = 3;

/// Allocates rooms and labs for one generation run.
///
/// The building tier split is computed from the active batches at
/// construction time: sections of the second-most-junior year draw
/// theory rooms from the lowest-ranked building, everyone else from the
/// remaining buildings.
#[derive(Debug, Clone)]
pub struct RoomAllocator {
    labs: Vec<String>,
    senior_pool: Vec<String>,
    junior_pool: Vec<String>,
    constrained_year: Option<u16>,
    cascade_depth: usize,
}

impl RoomAllocator {
    /// Builds an allocator over the given rooms and active batches.
    pub fn new(classrooms: &[Classroom], batches: &[Batch]) -> Self {
        let mut labs: Vec<&Classroom> = classrooms.iter().filter(|c| c.is_lab()).collect();
        labs.sort_by_key(|c| (c.building_priority, c.id.clone()));

        let mut regular: Vec<&Classroom> = classrooms.iter().filter(|c| !c.is_lab()).collect();
        regular.sort_by_key(|c| (c.building_priority, c.id.clone()));

        let junior_priority = regular.iter().map(|c| c.building_priority).max();
        let split = regular
            .iter()
            .filter(|c| Some(c.building_priority) == junior_priority)
            .count();
        let (senior_pool, junior_pool) = if split == regular.len() {
            // Single building: both tiers share every regular room.
            let all: Vec<String> = regular.iter().map(|c| c.id.clone()).collect();
            (all.clone(), all)
        } else {
            (
                regular
                    .iter()
                    .filter(|c| Some(c.building_priority) != junior_priority)
                    .map(|c| c.id.clone())
                    .collect(),
                regular
                    .iter()
                    .filter(|c| Some(c.building_priority) == junior_priority)
                    .map(|c| c.id.clone())
                    .collect(),
            )
        };

        Self {
            labs: labs.into_iter().map(|c| c.id.clone()).collect(),
            senior_pool,
            junior_pool,
            constrained_year: constrained_year(batches),
            cascade_depth: DEFAULT_CASCADE_DEPTH,
        }
    }

    /// Overrides the relocation cascade depth bound.
    pub fn with_cascade_depth(mut self, depth: usize) -> Self {
        self.cascade_depth = depth;
        self
    }

    /// The lab ids known to this allocator.
    pub fn labs(&self) -> &[String] {
        &self.labs
    }

    /// Theory room pool for a section, per the tier rule.
    pub fn pool_for_section(&self, section: &str) -> &[String] {
        let year: Option<u16> = section
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .ok();
        match (year, self.constrained_year) {
            (Some(y), Some(constrained)) if y == constrained && !self.junior_pool.is_empty() => {
                &self.junior_pool
            }
            _ => &self.senior_pool,
        }
    }

    /// Allocates a laboratory for a practical block.
    ///
    /// The block spans `PRACTICAL_BLOCK_LEN` periods starting at
    /// `start_period`; the returned lab is free (possibly after
    /// relocating occupants) for all of them. An existing lab binding of
    /// the (section, subject) group is mandatory: if it cannot be freed,
    /// the placement is infeasible.
    pub fn allocate_for_practical<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        day: Weekday,
        start_period: u8,
        block_len: u8,
        section: &str,
        subject_code: &str,
    ) -> Option<String> {
        let periods: Vec<u8> = (start_period..start_period + block_len).collect();

        if let Some(bound) = state.lab_binding(section, subject_code) {
            let bound = bound.to_string();
            if self.vacate(state, &bound, day, &periods) {
                return Some(bound);
            }
            debug!(
                "lab {bound} bound to {section}/{subject_code} cannot be freed at {day} p{start_period}"
            );
            return None;
        }

        // Fully free labs first.
        let free: Vec<String> = self
            .labs
            .iter()
            .filter(|lab| periods.iter().all(|&p| state.is_room_free(lab, day, p)))
            .cloned()
            .collect();
        if let Some(lab) = self.pick_room(state, rng, &free) {
            return Some(lab);
        }

        // Otherwise try to clear one lab, least-used first.
        let mut by_usage = self.labs.clone();
        by_usage.sort_by_key(|id| (state.room_usage(id), id.clone()));
        for lab in by_usage {
            if self.vacate(state, &lab, day, &periods) {
                return Some(lab);
            }
        }
        None
    }

    /// Allocates a room for a single theory period.
    pub fn allocate_for_theory<R: Rng>(
        &self,
        state: &mut SchedulingState,
        rng: &mut R,
        day: Weekday,
        period: u8,
        section: &str,
    ) -> Option<String> {
        // Reuse the section's room for the day when the day is all-theory.
        if let Some(room) = self.day_room(state, section, day) {
            if self.vacate(state, &room, day, &[period]) {
                return Some(room);
            }
        }

        let pool = self.pool_for_section(section);
        let free: Vec<String> = pool
            .iter()
            .filter(|room| state.is_room_free(room, day, period))
            .cloned()
            .collect();
        if let Some(room) = self.pick_room(state, rng, &free) {
            return Some(room);
        }

        // Clear a pool room if the cascade allows it.
        let mut by_usage = pool.to_vec();
        by_usage.sort_by_key(|id| (state.room_usage(id), id.clone()));
        for room in by_usage {
            if self.vacate(state, &room, day, &[period]) {
                return Some(room);
            }
        }

        // Labs are the only cross-tier fallback.
        let free_labs: Vec<String> = self
            .labs
            .iter()
            .filter(|lab| state.is_room_free(lab, day, period))
            .cloned()
            .collect();
        let fallback = self.pick_room(state, rng, &free_labs);
        if let Some(ref lab) = fallback {
            debug!("theory overflow for {section} into lab {lab} at {day} p{period}");
        }
        fallback
    }

    /// The room a section's theory already uses on `day`, if the day has
    /// no practical.
    fn day_room(&self, state: &SchedulingState, section: &str, day: Weekday) -> Option<String> {
        let mut room = None;
        for e in state.entries().iter().filter(|e| e.section == section && e.day == day) {
            if e.is_practical {
                return None;
            }
            if room.is_none() {
                room = e.classroom_id.clone();
            }
        }
        room
    }

    /// Frees `room_id` at the given periods by relocating occupants.
    ///
    /// Runs an explicit worklist with a hard depth bound: each occupant
    /// is first moved directly to a free room of the same class; failing
    /// that, one alternative room is pushed to be vacated and the
    /// original retried without further cascading. Returns whether the
    /// room ended up free; relocations already performed are legal moves
    /// and are kept either way.
    pub(crate) fn vacate(
        &self,
        state: &mut SchedulingState,
        room_id: &str,
        day: Weekday,
        periods: &[u8],
    ) -> bool {
        for &period in periods {
            if !self.vacate_slot(state, room_id, day, period) {
                return false;
            }
        }
        true
    }

    fn vacate_slot(
        &self,
        state: &mut SchedulingState,
        room_id: &str,
        day: Weekday,
        period: u8,
    ) -> bool {
        let mut work: Vec<(String, usize)> = vec![(room_id.to_string(), self.cascade_depth)];

        while let Some((room, depth)) = work.pop() {
            let Some(idx) = state.occupant_of_room(&room, day, period) else {
                continue;
            };
            let occupant = state.entry(idx).clone();
            let alternatives = self.alternatives_for_occupant(state, &occupant, &room);

            if occupant.is_practical {
                // A practical occupant moves only as a whole block, and
                // only to a directly free lab; cascading under a block
                // would multiply the frontier.
                if !self.move_practical_block(state, &occupant, &alternatives) {
                    return false;
                }
                continue;
            }

            if let Some(alt) = alternatives
                .iter()
                .find(|alt| state.is_room_free(alt, occupant.day, occupant.period))
            {
                debug!(
                    "relocate {} {} from {room} to {alt} at {day} p{period}",
                    occupant.section, occupant.subject_code
                );
                state.set_room(idx, alt);
                continue;
            }

            if depth == 0 {
                debug!("relocation depth bound hit while freeing {room} at {day} p{period}");
                return false;
            }
            match alternatives.first() {
                Some(alt) => {
                    // Vacate the best alternative, then retry this room
                    // with no further cascading below it.
                    work.push((room.clone(), 0));
                    work.push((alt.clone(), depth - 1));
                }
                None => return false,
            }
        }
        true
    }

    /// Same-class relocation targets for an occupant, least-used first.
    fn alternatives_for_occupant(
        &self,
        state: &SchedulingState,
        occupant: &TimetableEntry,
        current_room: &str,
    ) -> Vec<String> {
        let source: &[String] = if occupant.is_practical {
            &self.labs
        } else {
            self.pool_for_section(&occupant.section)
        };
        let mut alternatives: Vec<String> = source
            .iter()
            .filter(|id| id.as_str() != current_room)
            .cloned()
            .collect();
        alternatives.sort_by_key(|id| (state.room_usage(id), id.clone()));
        alternatives
    }

    /// Moves a practical occupant's entire block to a directly free lab.
    fn move_practical_block(
        &self,
        state: &mut SchedulingState,
        occupant: &TimetableEntry,
        alternatives: &[String],
    ) -> bool {
        let block: Vec<usize> = state
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.is_practical
                    && e.section == occupant.section
                    && e.subject_code == occupant.subject_code
            })
            .map(|(i, _)| i)
            .collect();
        let slots: Vec<(Weekday, u8)> = block.iter().map(|&i| state.entry(i).slot()).collect();

        for alt in alternatives {
            if slots.iter().all(|&(d, p)| state.is_room_free(alt, d, p)) {
                debug!(
                    "relocate practical {} {} block to {alt}",
                    occupant.section, occupant.subject_code
                );
                for &idx in &block {
                    state.set_room(idx, alt);
                }
                return true;
            }
        }
        false
    }

    /// Least-used-first pick with a randomized tie-break among the top
    /// candidates.
    fn pick_room<R: Rng>(
        &self,
        state: &SchedulingState,
        rng: &mut R,
        candidates: &[String],
    ) -> Option<String> {
        if candidates.is_empty() {
            return None;
        }
        let mut sorted = candidates.to_vec();
        sorted.sort_by_key(|id| (state.room_usage(id), id.clone()));
        let pool = &sorted[..sorted.len().min(TIE_BREAK_POOL)];
        Some(pool[rng.random_range(0..pool.len())].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn rooms() -> Vec<Classroom> {
        vec![
            Classroom::new("R1", "Room 101", "Main").with_priority(0),
            Classroom::new("R2", "Room 102", "Main").with_priority(0),
            Classroom::new("J1", "Room 201", "Annex").with_priority(2),
            Classroom::new("L1", "Software Lab 1", "Annex").with_priority(2),
            Classroom::new("L2", "Software Lab 2", "Annex").with_priority(2),
        ]
    }

    fn batches() -> Vec<Batch> {
        vec![Batch::new("21SW"), Batch::new("22SW"), Batch::new("23SW")]
    }

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    #[test]
    fn test_tier_partition() {
        let alloc = RoomAllocator::new(&rooms(), &batches());
        // 22SW is the second-most-junior year: constrained to the Annex pool.
        assert_eq!(alloc.pool_for_section("22SW-I"), &["J1".to_string()]);
        assert_eq!(
            alloc.pool_for_section("21SW-I"),
            &["R1".to_string(), "R2".to_string()]
        );
        assert_eq!(
            alloc.pool_for_section("23SW-I"),
            &["R1".to_string(), "R2".to_string()]
        );
    }

    #[test]
    fn test_single_building_shares_pools() {
        let rooms = vec![
            Classroom::new("R1", "Room 101", "Main"),
            Classroom::new("R2", "Room 102", "Main"),
        ];
        let alloc = RoomAllocator::new(&rooms, &batches());
        assert_eq!(alloc.pool_for_section("22SW-I").len(), 2);
        assert_eq!(alloc.pool_for_section("21SW-I").len(), 2);
    }

    #[test]
    fn test_theory_allocation_prefers_pool() {
        let alloc = RoomAllocator::new(&rooms(), &batches());
        let mut state = SchedulingState::new();
        let room = alloc
            .allocate_for_theory(&mut state, &mut rng(), Weekday::Monday, 1, "21SW-I")
            .unwrap();
        assert!(room == "R1" || room == "R2");
    }

    #[test]
    fn test_theory_reuses_day_room() {
        let alloc = RoomAllocator::new(&rooms(), &batches());
        let mut state = SchedulingState::new();
        state.push(
            TimetableEntry::new(Weekday::Monday, 1, "CS-301", "21SW-I")
                .with_teacher("T1")
                .with_classroom("R2"),
        );
        let room = alloc
            .allocate_for_theory(&mut state, &mut rng(), Weekday::Monday, 2, "21SW-I")
            .unwrap();
        assert_eq!(room, "R2");
    }

    #[test]
    fn test_theory_falls_back_to_lab_when_pool_exhausted() {
        let alloc = RoomAllocator::new(&rooms(), &batches());
        let mut state = SchedulingState::new();
        // Fill both senior rooms at the slot with immovable sections
        // (other rooms in their pool are filled too).
        state.push(
            TimetableEntry::new(Weekday::Monday, 1, "A", "21SW-I")
                .with_teacher("T1")
                .with_classroom("R1"),
        );
        state.push(
            TimetableEntry::new(Weekday::Monday, 1, "B", "23SW-I")
                .with_teacher("T2")
                .with_classroom("R2"),
        );
        let room = alloc
            .allocate_for_theory(&mut state, &mut rng(), Weekday::Monday, 1, "21SW-II")
            .unwrap();
        assert!(room.starts_with('L'), "expected lab fallback, got {room}");
    }

    #[test]
    fn test_practical_allocation_and_binding() {
        let alloc = RoomAllocator::new(&rooms(), &batches());
        let mut state = SchedulingState::new();
        let lab = alloc
            .allocate_for_practical(
                &mut state,
                &mut rng(),
                Weekday::Tuesday,
                1,
                3,
                "21SW-I",
                "CS-301L",
            )
            .unwrap();
        assert!(lab.starts_with('L'));

        // Record the block; the binding then pins later calls.
        for p in 1..=3 {
            state.push(
                TimetableEntry::new(Weekday::Tuesday, p, "CS-301L", "21SW-I")
                    .with_teacher("T2")
                    .with_classroom(&lab)
                    .practical(),
            );
        }
        let again = alloc
            .allocate_for_practical(
                &mut state,
                &mut rng(),
                Weekday::Thursday,
                4,
                3,
                "21SW-I",
                "CS-301L",
            )
            .unwrap();
        assert_eq!(again, lab);
    }

    #[test]
    fn test_practical_relocates_theory_squatter() {
        let alloc = RoomAllocator::new(&rooms(), &batches());
        let mut state = SchedulingState::new();
        for p in 1..=3 {
            state.push(
                TimetableEntry::new(Weekday::Tuesday, p, "CS-301L", "21SW-I")
                    .with_teacher("T2")
                    .with_classroom("L1")
                    .practical(),
            );
        }
        // A theory squatter sits in L1 on Thursday.
        state.push(
            TimetableEntry::new(Weekday::Thursday, 4, "A", "23SW-I")
                .with_teacher("T1")
                .with_classroom("L1")
                .extra(),
        );

        let lab = alloc
            .allocate_for_practical(
                &mut state,
                &mut rng(),
                Weekday::Thursday,
                4,
                3,
                "21SW-I",
                "CS-301L",
            )
            .unwrap();
        assert_eq!(lab, "L1");
        // The squatter moved out of L1.
        let squatter = state
            .entries()
            .iter()
            .find(|e| e.subject_code == "A")
            .unwrap();
        assert_ne!(squatter.classroom_id.as_deref(), Some("L1"));
    }

    #[test]
    fn test_allocation_fails_when_everything_blocked() {
        // Only one lab; its slot occupied by another practical whose own
        // relocation is impossible (no second lab).
        let rooms = vec![
            Classroom::new("R1", "Room 101", "Main"),
            Classroom::new("L1", "Software Lab 1", "Main"),
        ];
        let alloc = RoomAllocator::new(&rooms, &batches());
        let mut state = SchedulingState::new();
        for p in 1..=3 {
            state.push(
                TimetableEntry::new(Weekday::Monday, p, "EE-210L", "22SW-I")
                    .with_teacher("T1")
                    .with_classroom("L1")
                    .practical(),
            );
        }
        let result = alloc.allocate_for_practical(
            &mut state,
            &mut rng(),
            Weekday::Monday,
            1,
            3,
            "21SW-I",
            "CS-301L",
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_pick_room_prefers_least_used() {
        let alloc = RoomAllocator::new(&rooms(), &batches());
        let mut state = SchedulingState::new();
        // Use R1 twice so R2 is least-used; with two candidates the
        // tie-break pool is both, so check usage ordering via sort only.
        state.push(
            TimetableEntry::new(Weekday::Monday, 1, "A", "21SW-I")
                .with_teacher("T1")
                .with_classroom("R1"),
        );
        state.push(
            TimetableEntry::new(Weekday::Tuesday, 1, "A", "21SW-I")
                .with_teacher("T1")
                .with_classroom("R1"),
        );
        assert!(state.room_usage("R1") > state.room_usage("R2"));
    }

    #[test]
    fn test_cascade_depth_bound_respected() {
        let alloc = RoomAllocator::new(&rooms(), &batches()).with_cascade_depth(0);
        let mut state = SchedulingState::new();
        // Both senior rooms and the fallback labs occupied; with zero
        // cascade depth nothing can be freed once direct moves fail.
        for room in ["R1", "R2", "J1", "L1", "L2"] {
            state.push(
                TimetableEntry::new(Weekday::Monday, 1, "A", format!("sec-{room}"))
                    .with_teacher(format!("t-{room}"))
                    .with_classroom(room),
            );
        }
        let result =
            alloc.allocate_for_theory(&mut state, &mut rng(), Weekday::Monday, 1, "21SW-I");
        // Direct relocation of an occupant may still succeed if a free
        // same-class room exists; here every room is taken, so the
        // allocation fails outright.
        assert!(result.is_none());
    }
}
