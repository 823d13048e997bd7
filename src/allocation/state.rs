//! Run-scoped mutable scheduling state.
//!
//! One [`SchedulingState`] owns the entry list being built plus the
//! occupancy indexes derived from it (teacher/room/section per slot, room
//! usage counters, practical lab bindings). Every mutation goes through
//! a method here so the indexes never drift from the entries, and every
//! mutation is logged.
//!
//! Each generation run starts from a fresh state; no state is shared
//! across runs.

use log::debug;
use std::collections::{BTreeSet, HashMap};

use crate::models::{TimetableEntry, Weekday};

/// Entry list plus occupancy indexes for one generation run.
#[derive(Debug, Clone, Default)]
pub struct SchedulingState {
    entries: Vec<TimetableEntry>,
    teacher_busy: BTreeSet<(String, Weekday, u8)>,
    room_busy: BTreeSet<(String, Weekday, u8)>,
    section_busy: BTreeSet<(String, Weekday, u8)>,
    room_usage: HashMap<String, u32>,
    lab_binding: HashMap<(String, String), String>,
}

impl SchedulingState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a state from an existing entry list.
    pub fn from_entries(entries: Vec<TimetableEntry>) -> Self {
        let mut state = Self::new();
        for entry in entries {
            state.push(entry);
        }
        state
    }

    /// The entries built so far.
    pub fn entries(&self) -> &[TimetableEntry] {
        &self.entries
    }

    /// Consumes the state, returning the entry list.
    pub fn into_entries(self) -> Vec<TimetableEntry> {
        self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries exist yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry, updating every index. Returns its index.
    pub fn push(&mut self, entry: TimetableEntry) -> usize {
        debug!(
            "place {} {} at {} period {} room {:?} teacher {:?}",
            entry.section,
            entry.subject_code,
            entry.day,
            entry.period,
            entry.classroom_id,
            entry.teacher_id
        );
        self.index_entry(&entry);
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Removes the entry at `index`, preserving the order of the rest.
    pub fn remove(&mut self, index: usize) -> TimetableEntry {
        let entry = self.entries.remove(index);
        debug!(
            "remove {} {} at {} period {}",
            entry.section, entry.subject_code, entry.day, entry.period
        );
        self.unindex_entry(&entry);
        entry
    }

    /// Moves the entry at `index` to a new slot.
    pub fn set_slot(&mut self, index: usize, day: Weekday, period: u8) {
        let old = self.entries[index].clone();
        self.unindex_entry(&old);
        let entry = &mut self.entries[index];
        debug!(
            "move {} {} from {} period {} to {day} period {period}",
            entry.section, entry.subject_code, entry.day, entry.period
        );
        entry.day = day;
        entry.period = period;
        let updated = entry.clone();
        self.index_entry(&updated);
    }

    /// Reassigns the room of the entry at `index`.
    pub fn set_room(&mut self, index: usize, room_id: &str) {
        let old = self.entries[index].clone();
        self.unindex_entry(&old);
        let entry = &mut self.entries[index];
        debug!(
            "reassign {} {} at {} period {} from room {:?} to {room_id}",
            entry.section, entry.subject_code, entry.day, entry.period, entry.classroom_id
        );
        entry.classroom_id = Some(room_id.to_string());
        let updated = entry.clone();
        self.index_entry(&updated);
    }

    /// Reassigns the teacher of the entry at `index`.
    pub fn set_teacher(&mut self, index: usize, teacher_id: &str) {
        let old = self.entries[index].clone();
        self.unindex_entry(&old);
        self.entries[index].teacher_id = Some(teacher_id.to_string());
        let updated = self.entries[index].clone();
        self.index_entry(&updated);
    }

    fn index_entry(&mut self, entry: &TimetableEntry) {
        let slot = (entry.day, entry.period);
        if let Some(teacher) = &entry.teacher_id {
            self.teacher_busy.insert((teacher.clone(), slot.0, slot.1));
        }
        if let Some(room) = &entry.classroom_id {
            self.room_busy.insert((room.clone(), slot.0, slot.1));
            *self.room_usage.entry(room.clone()).or_insert(0) += 1;
            if entry.is_practical {
                self.lab_binding
                    .entry((entry.section.clone(), entry.subject_code.clone()))
                    .or_insert_with(|| room.clone());
            }
        }
        self.section_busy.insert((entry.section.clone(), slot.0, slot.1));
    }

    fn unindex_entry(&mut self, entry: &TimetableEntry) {
        let slot = (entry.day, entry.period);
        if let Some(teacher) = &entry.teacher_id {
            self.teacher_busy.remove(&(teacher.clone(), slot.0, slot.1));
        }
        if let Some(room) = &entry.classroom_id {
            self.room_busy.remove(&(room.clone(), slot.0, slot.1));
        }
        self.section_busy
            .remove(&(entry.section.clone(), slot.0, slot.1));
        if entry.is_practical {
            // Rebind to whatever lab the remaining block entries use.
            let key = (entry.section.clone(), entry.subject_code.clone());
            self.lab_binding.remove(&key);
            if let Some(room) = self
                .entries
                .iter()
                .filter(|e| {
                    e.is_practical
                        && e.section == entry.section
                        && e.subject_code == entry.subject_code
                        && !(e.day == entry.day && e.period == entry.period)
                })
                .find_map(|e| e.classroom_id.clone())
            {
                self.lab_binding.insert(key, room);
            }
        }
    }

    /// Whether a teacher is free at a slot within this run.
    pub fn is_teacher_free(&self, teacher_id: &str, day: Weekday, period: u8) -> bool {
        !self
            .teacher_busy
            .contains(&(teacher_id.to_string(), day, period))
    }

    /// Whether a room is free at a slot.
    pub fn is_room_free(&self, room_id: &str, day: Weekday, period: u8) -> bool {
        !self.room_busy.contains(&(room_id.to_string(), day, period))
    }

    /// Whether a section is free at a slot.
    pub fn is_section_free(&self, section: &str, day: Weekday, period: u8) -> bool {
        !self
            .section_busy
            .contains(&(section.to_string(), day, period))
    }

    /// Total weekly entries currently assigned to a teacher.
    pub fn teacher_load(&self, teacher_id: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.teacher_id.as_deref() == Some(teacher_id))
            .count()
    }

    /// Entries assigned to a teacher on one day.
    pub fn teacher_day_load(&self, teacher_id: &str, day: Weekday) -> usize {
        self.entries
            .iter()
            .filter(|e| e.teacher_id.as_deref() == Some(teacher_id) && e.day == day)
            .count()
    }

    /// How many times a room has been allocated in this run.
    pub fn room_usage(&self, room_id: &str) -> u32 {
        self.room_usage.get(room_id).copied().unwrap_or(0)
    }

    /// Lab bound to a practical (section, subject) group, if any.
    pub fn lab_binding(&self, section: &str, subject_code: &str) -> Option<&str> {
        self.lab_binding
            .get(&(section.to_string(), subject_code.to_string()))
            .map(String::as_str)
    }

    /// Index of the entry occupying a room at a slot.
    pub fn occupant_of_room(&self, room_id: &str, day: Weekday, period: u8) -> Option<usize> {
        self.entries.iter().position(|e| {
            e.classroom_id.as_deref() == Some(room_id) && e.day == day && e.period == period
        })
    }

    /// Indices of a section's entries, in insertion order.
    pub fn section_entry_indices(&self, section: &str) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.section == section)
            .map(|(i, _)| i)
            .collect()
    }

    /// Entry at an index.
    pub fn entry(&self, index: usize) -> &TimetableEntry {
        &self.entries[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(day: Weekday, period: u8) -> TimetableEntry {
        TimetableEntry::new(day, period, "CS-301", "21SW-I")
            .with_teacher("T1")
            .with_classroom("R1")
    }

    #[test]
    fn test_push_indexes_slots() {
        let mut state = SchedulingState::new();
        state.push(entry(Weekday::Monday, 1));

        assert!(!state.is_teacher_free("T1", Weekday::Monday, 1));
        assert!(!state.is_room_free("R1", Weekday::Monday, 1));
        assert!(!state.is_section_free("21SW-I", Weekday::Monday, 1));
        assert!(state.is_teacher_free("T1", Weekday::Monday, 2));
        assert_eq!(state.room_usage("R1"), 1);
    }

    #[test]
    fn test_remove_clears_indexes() {
        let mut state = SchedulingState::new();
        state.push(entry(Weekday::Monday, 1));
        state.remove(0);

        assert!(state.is_teacher_free("T1", Weekday::Monday, 1));
        assert!(state.is_room_free("R1", Weekday::Monday, 1));
        assert!(state.is_empty());
    }

    #[test]
    fn test_set_slot_moves_occupancy() {
        let mut state = SchedulingState::new();
        state.push(entry(Weekday::Monday, 1));
        state.set_slot(0, Weekday::Tuesday, 3);

        assert!(state.is_room_free("R1", Weekday::Monday, 1));
        assert!(!state.is_room_free("R1", Weekday::Tuesday, 3));
        assert_eq!(state.entry(0).slot(), (Weekday::Tuesday, 3));
    }

    #[test]
    fn test_set_room_updates_occupancy() {
        let mut state = SchedulingState::new();
        state.push(entry(Weekday::Monday, 1));
        state.set_room(0, "R2");

        assert!(state.is_room_free("R1", Weekday::Monday, 1));
        assert!(!state.is_room_free("R2", Weekday::Monday, 1));
    }

    #[test]
    fn test_lab_binding_follows_block() {
        let mut state = SchedulingState::new();
        for p in 1..=3 {
            state.push(
                TimetableEntry::new(Weekday::Tuesday, p, "CS-301L", "21SW-I")
                    .with_teacher("T2")
                    .with_classroom("L1")
                    .practical(),
            );
        }
        assert_eq!(state.lab_binding("21SW-I", "CS-301L"), Some("L1"));

        // Rebinding survives removal of one block period.
        state.remove(0);
        assert_eq!(state.lab_binding("21SW-I", "CS-301L"), Some("L1"));

        state.remove(0);
        state.remove(0);
        assert_eq!(state.lab_binding("21SW-I", "CS-301L"), None);
    }

    #[test]
    fn test_loads_and_occupant() {
        let mut state = SchedulingState::new();
        state.push(entry(Weekday::Monday, 1));
        state.push(entry(Weekday::Monday, 2));
        state.push(entry(Weekday::Tuesday, 1));

        assert_eq!(state.teacher_load("T1"), 3);
        assert_eq!(state.teacher_day_load("T1", Weekday::Monday), 2);
        assert_eq!(state.occupant_of_room("R1", Weekday::Monday, 2), Some(1));
        assert_eq!(state.occupant_of_room("R1", Weekday::Friday, 1), None);
    }

    #[test]
    fn test_from_entries_roundtrip() {
        let entries = vec![entry(Weekday::Monday, 1), entry(Weekday::Tuesday, 2)];
        let state = SchedulingState::from_entries(entries.clone());
        assert_eq!(state.entries(), entries.as_slice());
        assert!(!state.is_section_free("21SW-I", Weekday::Tuesday, 2));
    }
}
