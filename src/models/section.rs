//! Batch and section models.
//!
//! A batch is a cohort ("21SW") comprising one or more sections
//! ("21SW-I", "21SW-II"). Seniority is derived from the leading year
//! digits of the batch code: a lower year number means the cohort
//! enrolled earlier and is more senior.

use serde::{Deserialize, Serialize};

/// A cohort of students identified by a year-prefixed code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Batch code, e.g. "21SW".
    pub code: String,
    /// Number of parallel sections.
    pub num_sections: u8,
    /// Academic year the batch is currently in (1-based).
    pub academic_year: u8,
    /// Current semester (1-based).
    pub semester: u8,
}

/// A concrete student group receiving one timetable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Section {
    /// Owning batch code.
    pub batch_code: String,
    /// Full section label, e.g. "21SW-II".
    pub label: String,
}

impl Batch {
    /// Creates a single-section batch.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            num_sections: 1,
            academic_year: 1,
            semester: 1,
        }
    }

    /// Sets the number of sections.
    pub fn with_sections(mut self, n: u8) -> Self {
        self.num_sections = n.max(1);
        self
    }

    /// Sets academic year and semester.
    pub fn with_year_semester(mut self, year: u8, semester: u8) -> Self {
        self.academic_year = year;
        self.semester = semester;
        self
    }

    /// Leading year digits of the code ("21SW" -> 21).
    ///
    /// Returns `None` when the code has no numeric prefix; such batches
    /// rank after all year-prefixed ones.
    pub fn year_prefix(&self) -> Option<u16> {
        let digits: String = self.code.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }

    /// Sections of this batch, labelled with roman numerals.
    pub fn sections(&self) -> Vec<Section> {
        (1..=self.num_sections)
            .map(|i| Section {
                batch_code: self.code.clone(),
                label: format!("{}-{}", self.code, roman(i)),
            })
            .collect()
    }
}

impl Section {
    /// Creates a section from batch code and label.
    pub fn new(batch_code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            batch_code: batch_code.into(),
            label: label.into(),
        }
    }

    /// Recovers a section from its label ("21SW-II" -> batch "21SW").
    pub fn from_label(label: impl Into<String>) -> Self {
        let label = label.into();
        let batch_code = label
            .rsplit_once('-')
            .map(|(batch, _)| batch.to_string())
            .unwrap_or_else(|| label.clone());
        Self { batch_code, label }
    }

    /// Leading year digits of the section's batch code.
    pub fn year_prefix(&self) -> Option<u16> {
        let digits: String = self
            .batch_code
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
}

/// Roman numeral for a small section index.
fn roman(n: u8) -> &'static str {
    const NUMERALS: [&str; 12] = [
        "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII",
    ];
    NUMERALS.get(usize::from(n).saturating_sub(1)).unwrap_or(&"XII")
}

/// The most senior year among the given batches (lowest year prefix).
pub fn most_senior_year(batches: &[Batch]) -> Option<u16> {
    batches.iter().filter_map(|b| b.year_prefix()).min()
}

/// The year treated as the constrained building tier.
///
/// Distinct year prefixes are ordered most-junior-first (highest year
/// number first); the second entry is the constrained year. With fewer
/// than two distinct years there is no constrained tier.
pub fn constrained_year(batches: &[Batch]) -> Option<u16> {
    let mut years: Vec<u16> = batches.iter().filter_map(|b| b.year_prefix()).collect();
    years.sort_unstable();
    years.dedup();
    years.reverse();
    years.get(1).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_sections() {
        let batch = Batch::new("21SW").with_sections(3);
        let sections = batch.sections();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].label, "21SW-I");
        assert_eq!(sections[1].label, "21SW-II");
        assert_eq!(sections[2].label, "21SW-III");
        assert_eq!(sections[2].batch_code, "21SW");
    }

    #[test]
    fn test_year_prefix() {
        assert_eq!(Batch::new("21SW").year_prefix(), Some(21));
        assert_eq!(Batch::new("23CS").year_prefix(), Some(23));
        assert_eq!(Batch::new("PHD").year_prefix(), None);
        assert_eq!(Section::new("22SW", "22SW-I").year_prefix(), Some(22));
    }

    #[test]
    fn test_section_from_label() {
        let s = Section::from_label("21SW-II");
        assert_eq!(s.batch_code, "21SW");
        assert_eq!(s.label, "21SW-II");
        // Labels without a dash fall back to the whole string.
        assert_eq!(Section::from_label("21SW").batch_code, "21SW");
    }

    #[test]
    fn test_most_senior_year() {
        let batches = vec![Batch::new("23SW"), Batch::new("21SW"), Batch::new("22SW")];
        assert_eq!(most_senior_year(&batches), Some(21));
        assert_eq!(most_senior_year(&[]), None);
    }

    #[test]
    fn test_constrained_year_is_second_most_junior() {
        let batches = vec![
            Batch::new("21SW"),
            Batch::new("22SW"),
            Batch::new("23SW"),
            Batch::new("24SW"),
        ];
        assert_eq!(constrained_year(&batches), Some(23));
    }

    #[test]
    fn test_constrained_year_needs_two_years() {
        assert_eq!(constrained_year(&[Batch::new("21SW")]), None);
        // Duplicate years count once
        let batches = vec![Batch::new("21SW"), Batch::new("21CS")];
        assert_eq!(constrained_year(&batches), None);
    }

    #[test]
    fn test_constrained_year_ignores_non_numeric() {
        let batches = vec![Batch::new("PHD"), Batch::new("22SW"), Batch::new("21SW")];
        assert_eq!(constrained_year(&batches), Some(21));
    }
}
