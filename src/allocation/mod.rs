//! Room/lab allocation and run-scoped scheduling state.
//!
//! [`SchedulingState`] owns the entry list being built and its occupancy
//! indexes; [`RoomAllocator`] decides which room hosts each placement,
//! relocating occupants through a bounded cascade when slots collide.

mod allocator;
mod state;

pub use allocator::RoomAllocator;
pub use state::SchedulingState;
