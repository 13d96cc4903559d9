//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Global process ID singleton - set once at startup
static PROCESS_ID: OnceLock<ProcessId> = OnceLock::new();

/// Identity of a process in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessId {
    /// The supervising master process (singleton)
    Master,
    /// A worker process, identified by its OS pid
    Worker(u32),
}

impl ProcessId {
    /// Initialize the global process ID for the master
    pub fn init_master() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Master)
    }

    /// Initialize the global process ID for a worker using the current pid
    pub fn init_worker() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Worker(std::process::id()))
    }

    /// Get the global process ID.
    ///
    /// Falls back to a worker identity for the current pid when no `init_*`
    /// call happened, which is what library code running under tests expects.
    pub fn current() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Worker(std::process::id()))
    }

    pub fn is_master(&self) -> bool {
        matches!(self, ProcessId::Master)
    }

    /// OS pid of the process this identity names
    pub fn pid(&self) -> u32 {
        match self {
            ProcessId::Master => std::process::id(),
            ProcessId::Worker(pid) => *pid,
        }
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessId::Master => write!(f, "master"),
            ProcessId::Worker(pid) => write!(f, "worker_{pid}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_id_display() {
        assert_eq!(ProcessId::Master.to_string(), "master");
        assert_eq!(ProcessId::Worker(4242).to_string(), "worker_4242");
    }

    #[test]
    fn test_worker_pid() {
        assert_eq!(ProcessId::Worker(17).pid(), 17);
        assert!(ProcessId::Master.is_master());
        assert!(!ProcessId::Worker(17).is_master());
    }
}
