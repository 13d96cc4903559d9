//! Master process library for a supervised pool of HTTP workers
//!
//! The supervisor spawns N worker processes, replaces every worker that exits,
//! aggregates the request counters workers report over their IPC channel and
//! raises a push notification for every crash report it receives.

pub mod config;
pub mod core;
pub mod error;
pub mod services;
pub mod supervisor;
pub mod traits;

// Re-export commonly used types
pub use config::{Args, SupervisorConfig};
pub use self::core::{ClusterCounts, ExitReason, SupervisorEvent, WorkerHandle};
pub use error::{SupervisorError, SupervisorResult};
pub use self::supervisor::Supervisor;
pub use traits::{EnvReport, EnvValidator, WorkerSpawner};

// Re-export mocks for integration tests
pub use traits::{MockEnvValidator, MockWorkerSpawner};
