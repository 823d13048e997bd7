//! Constructive scheduling and violation repair.
//!
//! [`ConstructiveScheduler`] builds a timetable section by section;
//! [`RepairEngine`] clears violations from an existing entry set under a
//! monotonic-or-abort rule. Both share the placement machinery in
//! [`PlacementContext`].

mod constructive;
mod context;
mod repair;

pub use constructive::{ConstructiveScheduler, Unscheduled};
pub use context::PlacementContext;
pub use repair::{RepairEngine, ResolveOutcome};
