//! Channels from a worker to its master
//!
//! A worker spawned by the supervisor finds [`MASTER_CHANNEL_ENV`] set and
//! writes its IPC messages as JSON lines on stdout. A worker started by hand
//! has no master; its messages are dropped.

use std::io::Write;
use std::sync::Arc;

use shared::{process_debug, ProcessId, SharedError, SharedResult, WorkerMessage, MASTER_CHANNEL_ENV};

use crate::traits::MasterLink;

/// Master link writing JSON lines to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutLink;

impl MasterLink for StdoutLink {
    fn send(&self, message: &WorkerMessage) -> SharedResult<()> {
        let line = message.to_line()?;

        // One locked write per message keeps lines whole
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(line.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| SharedError::channel(format!("Failed to write to master: {e}")))
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// Link used when the worker runs without a master
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedLink;

impl MasterLink for DetachedLink {
    fn send(&self, message: &WorkerMessage) -> SharedResult<()> {
        process_debug!(ProcessId::current(), "No master attached, dropping {} message", message.type_name());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        false
    }
}

/// Pick the link from the environment the master spawned us with
pub fn from_env() -> Arc<dyn MasterLink> {
    link_for(std::env::var(MASTER_CHANNEL_ENV).ok().as_deref())
}

pub fn link_for(channel: Option<&str>) -> Arc<dyn MasterLink> {
    match channel {
        Some("stdout") => Arc::new(StdoutLink),
        _ => Arc::new(DetachedLink),
    }
}
