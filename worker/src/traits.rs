//! Service trait definitions for dependency injection
//!
//! The worker's only outbound I/O seam besides the notifier is its channel to
//! the master, abstracted here for testability.

use shared::{SharedResult, WorkerMessage};

/// One-way, unacknowledged channel to the supervising master
#[mockall::automock]
pub trait MasterLink: Send + Sync {
    /// Write one message; at most once, no retry
    fn send(&self, message: &WorkerMessage) -> SharedResult<()>;

    /// Whether a master is listening at all
    fn is_connected(&self) -> bool;
}
