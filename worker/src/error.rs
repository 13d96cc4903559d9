//! Worker-specific error types

use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to bind {addr}: {message}")]
    BindFailed { addr: String, message: String },

    #[error("HTTP server error: {message}")]
    ServerError { message: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl WorkerError {
    pub fn bind(addr: impl ToString, message: impl Into<String>) -> Self {
        Self::BindFailed {
            addr: addr.to_string(),
            message: message.into(),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::ServerError { message: message.into() }
    }
}

pub type WorkerResult<T> = Result<T, WorkerError>;
