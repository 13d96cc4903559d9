//! Shared error types for the cluster

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Serialization failed: {message}")]
    SerializationError { message: String },

    #[error("Deserialization failed: {message}")]
    DeserializationError { message: String },

    #[error("Message protocol error: {message}")]
    ProtocolError { message: String },

    #[error("IPC channel error: {message}")]
    ChannelError { message: String },

    #[error("Graceful shutdown failed: {message}")]
    ShutdownError { message: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SharedError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolError { message: message.into() }
    }

    pub fn channel(message: impl Into<String>) -> Self {
        Self::ChannelError { message: message.into() }
    }

    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::ShutdownError { message: message.into() }
    }
}

pub type SharedResult<T> = Result<T, SharedError>;
