//! Scheduler runner -- admission, lifecycle and the dispatch loop.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructor, admission, options and accessors
//! - `lifecycle`: run / pause / continue / stop
//! - `dispatch`: the batch loop spawned by `run()` and `resume()`

mod core;
mod dispatch;
mod lifecycle;

pub use self::core::Scheduler;
