//! Classroom model.
//!
//! Rooms are partitioned into laboratories and regular rooms. Whether a
//! room is a laboratory is derived from its name. Buildings carry a
//! priority ordinal used by the allocator's tier rule.

use serde::{Deserialize, Serialize};

/// A room that can host classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classroom {
    /// Unique room identifier.
    pub id: String,
    /// Human-readable name; "lab"/"laboratory" in the name marks a lab.
    pub name: String,
    /// Building the room belongs to.
    pub building: String,
    /// Building ordinal; lower values rank first in allocation.
    pub building_priority: u8,
}

impl Classroom {
    /// Creates a new classroom.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        building: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            building: building.into(),
            building_priority: 0,
        }
    }

    /// Sets the building priority ordinal.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.building_priority = priority;
        self
    }

    /// Whether this room is a laboratory, derived from its name.
    pub fn is_lab(&self) -> bool {
        let name = self.name.to_ascii_lowercase();
        name.contains("laboratory") || name.contains("lab")
    }
}
