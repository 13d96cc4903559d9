//! Core supervision state, free of process I/O

pub mod counts;
pub mod events;
pub mod exit;

pub use counts::ClusterCounts;
pub use events::{SupervisorEvent, WorkerHandle};
pub use exit::ExitReason;
