//! Shared building blocks for the cluster supervisor and its workers
//!
//! Contains the pieces both process roles need: process identity, logging,
//! the worker → master IPC protocol, request metadata, the push notification
//! dispatcher and the graceful shutdown coordinator.

// Lets the exported logging macros resolve `shared::` from inside this crate
extern crate self as shared;

pub mod errors;
pub mod logging;
pub mod messages;
pub mod notification;
pub mod shutdown;
pub mod time;
pub mod types;

pub use errors::*;
pub use types::*;

pub use messages::{RequestData, WorkerMessage, MASTER_CHANNEL_ENV};
pub use notification::{Notification, Notifier, NotifyOutcome, PushoverCredentials, PushoverNotifier};
pub use shutdown::{DisconnectHook, ShutdownCoordinator, EXIT_FAILURE, EXIT_OK};
