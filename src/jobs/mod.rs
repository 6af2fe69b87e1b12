//! Tick orchestration: the lock file, the harvesting pipeline and the
//! interval scheduler that drives it.

pub mod lock;
pub mod pipeline;
pub mod runner;
pub mod scheduler;

pub use lock::TickLock;
pub use pipeline::{FeedFailure, Pipeline};
pub use runner::{TickReport, TickRunner};
pub use scheduler::{
    Scheduler, SchedulerConfig, SchedulerState, TickOutcome, spawn_signal_listener,
};
