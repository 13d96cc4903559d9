//! Worker → master IPC protocol
//!
//! Every message is a single JSON object on its own line, written by the
//! worker to its stdout and read by the master. The protocol is one-way and
//! unacknowledged.

use serde::{Deserialize, Serialize};

use super::request::RequestData;
use crate::errors::{SharedError, SharedResult};

/// Upper bound for a single encoded message line
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Set by the master on every worker it spawns; a worker started without it
/// has no master to report to
pub const MASTER_CHANNEL_ENV: &str = "CLUSTER_MASTER_CHANNEL";

/// Messages a worker can send to the master
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Counter deltas accumulated since the previous flush
    RequestCounts {
        #[serde(rename = "requestCount", default)]
        request_count: u64,
        #[serde(rename = "customRequestCount", default)]
        custom_request_count: u64,
    },

    /// A fatal fault; the sender is about to exit
    Error {
        #[serde(default)]
        error: String,
        #[serde(rename = "requestData", default)]
        request_data: Option<RequestData>,
    },
}

impl WorkerMessage {
    /// Encode as a single newline-terminated line
    pub fn to_line(&self) -> SharedResult<String> {
        let mut line = serde_json::to_string(self).map_err(|e| SharedError::SerializationError {
            message: format!("Failed to encode worker message: {e}"),
        })?;
        line.push('\n');
        Ok(line)
    }

    /// Decode one line; anything that is not one of the known variants is rejected
    pub fn parse_line(line: &str) -> SharedResult<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(SharedError::protocol("Empty IPC line"));
        }
        if trimmed.len() > MAX_LINE_BYTES {
            return Err(SharedError::protocol(format!(
                "IPC line of {} bytes exceeds limit",
                trimmed.len()
            )));
        }

        serde_json::from_str(trimmed).map_err(|e| SharedError::DeserializationError {
            message: format!("Unrecognised worker message: {e}"),
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            WorkerMessage::RequestCounts { .. } => "request_counts",
            WorkerMessage::Error { .. } => "error",
        }
    }
}
