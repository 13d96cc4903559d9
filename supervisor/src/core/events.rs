//! Events delivered to the supervisor control loop

use shared::WorkerMessage;

use super::exit::ExitReason;

/// Identity of a spawned worker; the supervisor keeps nothing else per worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerHandle {
    pub pid: u32,
}

/// Something happened to one worker
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorEvent {
    /// A decoded IPC message from the worker
    Message { pid: u32, message: WorkerMessage },
    /// The worker process is gone
    Exited { pid: u32, reason: ExitReason },
}

impl SupervisorEvent {
    pub fn pid(&self) -> u32 {
        match self {
            SupervisorEvent::Message { pid, .. } | SupervisorEvent::Exited { pid, .. } => *pid,
        }
    }
}
