//! Trait definitions with mockall annotations for testing
//!
//! The supervisor talks to the operating system only through these seams,
//! so the control loop can be driven in tests with mocks.

use tokio::sync::mpsc;

use crate::core::{SupervisorEvent, WorkerHandle};
use crate::error::SupervisorResult;

/// Outcome of the startup environment check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvReport {
    /// Optional variables that are not set
    pub missing_optional: Vec<String>,
}

/// Startup environment validation
#[mockall::automock]
pub trait EnvValidator: Send + Sync {
    /// Check required and optional variables.
    ///
    /// # Returns
    /// The optional variables that are unset, or a configuration error
    /// naming every missing required variable
    fn validate(&self) -> SupervisorResult<EnvReport>;
}

/// Worker process management
///
/// Spawning hands the implementation a sender on which it must deliver every
/// IPC message of the new worker followed by exactly one exit event.
#[mockall::automock]
#[async_trait::async_trait]
pub trait WorkerSpawner: Send + Sync {
    /// Start one worker process
    ///
    /// # Parameters
    /// - `events`: Channel for the worker's messages and its exit
    ///
    /// # Returns
    /// Handle identifying the new worker
    async fn spawn_worker(&self, events: mpsc::Sender<SupervisorEvent>) -> SupervisorResult<WorkerHandle>;

    /// Ask a worker to shut down gracefully
    async fn terminate_worker(&self, pid: u32) -> SupervisorResult<()>;
}
