//! Subject model.
//!
//! A subject is either a theory course (scheduled `credits` times per
//! week, at most once per day) or a practical course (one weekly session
//! of consecutive periods in a single laboratory).

use serde::{Deserialize, Serialize};

/// Length of a practical session in consecutive periods.
pub const PRACTICAL_BLOCK_LEN: u8 = 3;

/// A course taught to one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject code, unique per batch up to a theory/practical pair.
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Credit count; weekly theory instances equal this number.
    pub credits: u8,
    /// Whether this is a practical (lab) subject.
    pub is_practical: bool,
    /// Code of the batch that takes this subject.
    pub batch_code: String,
}

impl Subject {
    /// Creates a theory subject with one credit.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        batch_code: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            credits: 1,
            is_practical: false,
            batch_code: batch_code.into(),
        }
    }

    /// Sets the credit count.
    pub fn with_credits(mut self, credits: u8) -> Self {
        self.credits = credits.max(1);
        self
    }

    /// Marks this subject as practical.
    pub fn practical(mut self) -> Self {
        self.is_practical = true;
        self
    }

    /// Weekly entry count a complete timetable carries for this subject.
    ///
    /// Theory subjects appear `credits` times; a practical subject
    /// occupies one block of [`PRACTICAL_BLOCK_LEN`] periods.
    pub fn weekly_entry_count(&self) -> u8 {
        if self.is_practical {
            PRACTICAL_BLOCK_LEN
        } else {
            self.credits
        }
    }
}
