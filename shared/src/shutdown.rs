//! Graceful shutdown coordination
//!
//! Each process owns one [`ShutdownCoordinator`]. The first SIGINT/SIGTERM
//! starts the graceful path; a second one while that path is running forces an
//! immediate exit with code 1. There is deliberately no timeout on the drain.

use async_trait::async_trait;
use std::fmt::Display;
use std::sync::Arc;

use crate::errors::SharedResult;
use crate::logging;
use crate::types::ProcessId;
use crate::{process_error, process_info, process_warn};

/// Exit code for a clean graceful shutdown
pub const EXIT_OK: i32 = 0;

/// Exit code for every fatal path
pub const EXIT_FAILURE: i32 = 1;

/// An external stateful dependency that must be released before exit
#[mockall::automock]
#[async_trait]
pub trait DisconnectHook: Send + Sync {
    /// Name used in log lines
    fn name(&self) -> String;

    async fn disconnect(&self) -> SharedResult<()>;
}

/// Waits for a termination signal and returns its name.
///
/// Each call creates independent signal listeners.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    };
    Ok(name)
}

/// Waits for a termination signal and returns its name.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("CTRL_C")
}

/// Resolves on the first termination signal and arms the forced exit.
///
/// Suitable as an axum graceful-shutdown future. If signal registration fails
/// the future never resolves, leaving the process to be stopped externally.
pub async fn shutdown_signal() {
    match wait_for_shutdown_signal().await {
        Ok(signal) => {
            process_info!(
                ProcessId::current(),
                pid = ProcessId::current().pid(),
                "{} received: starting graceful shutdown...",
                signal
            );
            arm_forced_exit();
        }
        Err(e) => {
            logging::log_error(ProcessId::current(), "Signal handler registration", &e);
            std::future::pending::<()>().await;
        }
    }
}

/// A repeated signal during shutdown terminates the process immediately
fn arm_forced_exit() {
    tokio::spawn(async {
        if let Ok(signal) = wait_for_shutdown_signal().await {
            process_warn!(
                ProcessId::current(),
                "{} received again during shutdown, forcing exit",
                signal
            );
            std::process::exit(EXIT_FAILURE);
        }
    });
}

/// Runs the post-drain half of the graceful shutdown path
#[derive(Default, Clone)]
pub struct ShutdownCoordinator {
    hooks: Vec<Arc<dyn DisconnectHook>>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dependency to disconnect after the server has drained (fluent API)
    pub fn with_hook(mut self, hook: Arc<dyn DisconnectHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Finish shutdown once the listener has stopped and connections drained.
    ///
    /// Every hook is attempted even if an earlier step failed. Returns the exit
    /// code the process should terminate with.
    pub async fn complete<E: Display>(&self, drained: Result<(), E>) -> i32 {
        let mut exit_code = EXIT_OK;

        match drained {
            Ok(()) => process_info!(ProcessId::current(), "Server closed"),
            Err(e) => {
                process_error!(ProcessId::current(), error = %e, "Error during graceful shutdown");
                exit_code = EXIT_FAILURE;
            }
        }

        for hook in &self.hooks {
            match hook.disconnect().await {
                Ok(()) => process_info!(ProcessId::current(), "{} connection closed", hook.name()),
                Err(e) => {
                    process_error!(
                        ProcessId::current(),
                        error = %e,
                        "Error during graceful shutdown while closing {}",
                        hook.name()
                    );
                    exit_code = EXIT_FAILURE;
                }
            }
        }

        if exit_code == EXIT_OK {
            logging::log_success(ProcessId::current(), "Shutdown complete. Exiting.");
        }
        exit_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SharedError;

    fn hook(name: &'static str, result: fn() -> SharedResult<()>) -> Arc<dyn DisconnectHook> {
        let mut mock = MockDisconnectHook::new();
        mock.expect_name().return_const(name.to_string());
        mock.expect_disconnect().times(1).returning(move || result());
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_clean_shutdown_exits_zero() {
        let coordinator = ShutdownCoordinator::new().with_hook(hook("database", || Ok(())));

        let code = coordinator.complete::<SharedError>(Ok(())).await;
        assert_eq!(code, EXIT_OK);
    }

    #[tokio::test]
    async fn test_drain_error_still_runs_hooks() {
        let coordinator = ShutdownCoordinator::new().with_hook(hook("database", || Ok(())));

        let code = coordinator.complete(Err(SharedError::shutdown("listener"))).await;
        assert_eq!(code, EXIT_FAILURE);
    }

    #[tokio::test]
    async fn test_failing_hook_exits_non_zero_and_continues() {
        let coordinator = ShutdownCoordinator::new()
            .with_hook(hook("database", || Err(SharedError::shutdown("socket closed"))))
            .with_hook(hook("cache", || Ok(())));

        assert_eq!(coordinator.hook_count(), 2);
        let code = coordinator.complete::<SharedError>(Ok(())).await;
        assert_eq!(code, EXIT_FAILURE);
    }

    #[tokio::test]
    async fn test_no_hooks() {
        let code = ShutdownCoordinator::new().complete::<SharedError>(Ok(())).await;
        assert_eq!(code, EXIT_OK);
    }
}
