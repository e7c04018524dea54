//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Statistics: recomputes derived cache statistics at a fixed interval

mod stats;

pub use stats::spawn_stats_task;
