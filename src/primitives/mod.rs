//! Lock-free building blocks shared between a worker and the outside world.
//!
//! - [`CycleCounter`] atomic counter of completed work cycles
//! - [`ConcurrentQueue`] multi-producer FIFO used for mailboxes, results and errors
//! - [`ParallelRunner`] drives a closure across parallel units (stress helper)

mod counter;
mod parallel;
mod queue;

pub use counter::CycleCounter;
pub use parallel::{ParallelReport, ParallelRunner};
pub use queue::ConcurrentQueue;
