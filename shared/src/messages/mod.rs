//! Message types exchanged between cluster processes
//!
//! - `worker`: worker → master IPC protocol (JSON lines)
//! - `request`: diagnostic metadata describing an in-flight request

pub mod request;
pub mod worker;

pub use request::RequestData;
pub use worker::{WorkerMessage, MASTER_CHANNEL_ENV};
