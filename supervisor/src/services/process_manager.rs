//! Real worker process management
//!
//! Spawns worker executables with their stdout wired as the IPC channel and
//! stops them with SIGTERM so they run their own graceful shutdown.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use tokio::process::Command;
use tokio::sync::mpsc;

use shared::{process_debug, ProcessId};

use super::output_handler::{configure_worker_stdio, spawn_worker_monitor};
use crate::core::{SupervisorEvent, WorkerHandle};
use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::WorkerSpawner;

/// Spawner launching real OS processes
pub struct RealWorkerSpawner {
    /// Worker executable
    program: PathBuf,

    /// Extra arguments passed to every worker
    args: Vec<OsString>,

    /// Log level passed to spawned workers
    log_level: String,
}

impl RealWorkerSpawner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            log_level: "info".to_string(),
        }
    }

    /// Append an argument (fluent API)
    pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Configure log level (fluent API)
    pub fn with_log_level(mut self, log_level: impl Into<String>) -> Self {
        self.log_level = log_level.into();
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).env("LOG_LEVEL", &self.log_level).kill_on_drop(false);
        configure_worker_stdio(&mut cmd);

        // Own process group: a terminal Ctrl+C reaches only the master, which
        // then relays SIGTERM to each worker
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }
}

#[async_trait]
impl WorkerSpawner for RealWorkerSpawner {
    async fn spawn_worker(&self, events: mpsc::Sender<SupervisorEvent>) -> SupervisorResult<WorkerHandle> {
        let child = self
            .build_command()
            .spawn()
            .map_err(|e| SupervisorError::spawn(format!("{}: {}", self.program.display(), e)))?;

        let Some(pid) = child.id() else {
            return Err(SupervisorError::spawn("Worker exited before its pid could be read"));
        };

        process_debug!(ProcessId::current(), "Spawned worker {} from {}", pid, self.program.display());
        spawn_worker_monitor(child, pid, events);

        Ok(WorkerHandle { pid })
    }

    #[cfg(unix)]
    async fn terminate_worker(&self, pid: u32) -> SupervisorResult<()> {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        let raw = i32::try_from(pid).map_err(|_| SupervisorError::signal(pid, "pid out of range"))?;
        match signal::kill(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) => Ok(()),
            // Already gone; its exit event is on the way
            Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(SupervisorError::signal(pid, e.to_string())),
        }
    }

    #[cfg(not(unix))]
    async fn terminate_worker(&self, pid: u32) -> SupervisorResult<()> {
        Err(SupervisorError::signal(pid, "graceful termination requires a unix host"))
    }
}
