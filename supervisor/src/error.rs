//! Supervisor-specific error types

use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Failed to spawn worker process: {message}")]
    WorkerSpawnFailed { message: String },

    #[error("Failed to signal worker {pid}: {message}")]
    WorkerSignalFailed { pid: u32, message: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SupervisorError {
    pub fn config(field: impl Into<String>) -> Self {
        Self::ConfigurationError { field: field.into() }
    }

    pub fn spawn(message: impl Into<String>) -> Self {
        Self::WorkerSpawnFailed { message: message.into() }
    }

    pub fn signal(pid: u32, message: impl Into<String>) -> Self {
        Self::WorkerSignalFailed {
            pid,
            message: message.into(),
        }
    }
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
