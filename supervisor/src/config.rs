//! Command line and environment configuration for the master process

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use shared::EXIT_FAILURE;

use crate::error::{SupervisorError, SupervisorResult};

/// Master process that keeps a pool of worker processes alive
#[derive(Parser, Debug, Clone)]
#[command(name = "supervisor")]
#[command(about = "Supervises a pool of HTTP worker processes and relays their crash reports")]
pub struct Args {
    /// Number of worker processes (clamped to the logical core count)
    #[arg(long, env = "NUM_WORKERS", default_value_t = 1)]
    pub workers: usize,

    /// Port the workers serve on
    #[arg(long, env = "PORT", default_value_t = 8888)]
    pub port: u16,

    /// Worker executable (defaults to `worker` next to this binary)
    #[arg(long, env = "WORKER_BIN")]
    pub worker_bin: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Deployment environment name, shown in the startup banner
    #[arg(long, env = "APP_ENV")]
    pub app_env: Option<String>,

    /// Seconds between aggregate request count log lines
    #[arg(long, default_value_t = 30)]
    pub count_log_secs: u64,
}

/// Exit code for a command line that cannot be used; `None` for help and version output
pub fn parse_failure_code(error: &clap::Error) -> Option<i32> {
    error.use_stderr().then_some(EXIT_FAILURE)
}

/// Resolved supervisor settings
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Live workers to maintain
    pub worker_count: usize,
    /// Host logical cores the worker count was clamped to
    pub available_cores: usize,
    pub count_log_interval: Duration,
    /// How often a failed respawn is retried
    pub vacancy_retry_interval: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            available_cores: available_cores(),
            count_log_interval: Duration::from_secs(30),
            vacancy_retry_interval: Duration::from_secs(1),
        }
    }
}

impl SupervisorConfig {
    pub fn from_args(args: &Args) -> Self {
        let cores = available_cores();
        Self {
            worker_count: clamp_worker_count(args.workers, cores),
            available_cores: cores,
            count_log_interval: Duration::from_secs(args.count_log_secs.max(1)),
            ..Self::default()
        }
    }

    /// Set worker count without clamping (fluent API, for tests)
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }
}

/// Never fewer than one worker, never more than the host has cores
pub fn clamp_worker_count(requested: usize, cores: usize) -> usize {
    requested.clamp(1, cores.max(1))
}

fn available_cores() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Locate the worker executable
pub fn resolve_worker_bin(explicit: Option<&PathBuf>) -> SupervisorResult<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.clone());
    }

    let current = std::env::current_exe()
        .map_err(|e| SupervisorError::config(format!("Cannot locate current executable: {e}")))?;
    let dir = current
        .parent()
        .ok_or_else(|| SupervisorError::config("Current executable has no parent directory"))?;
    Ok(dir.join(format!("worker{}", std::env::consts::EXE_SUFFIX)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_worker_count() {
        assert_eq!(clamp_worker_count(4, 8), 4);
        assert_eq!(clamp_worker_count(16, 8), 8);
        assert_eq!(clamp_worker_count(0, 8), 1);
        assert_eq!(clamp_worker_count(3, 0), 1);
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["supervisor"]);
        assert_eq!(args.count_log_secs, 30);
    }

    #[test]
    fn test_config_from_args() {
        let args = Args::parse_from(["supervisor", "--workers", "1", "--count-log-secs", "5"]);
        let config = SupervisorConfig::from_args(&args);
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.count_log_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_malformed_values_are_startup_failures() {
        let error = Args::try_parse_from(["supervisor", "--port", "eighty"]).unwrap_err();
        assert_eq!(parse_failure_code(&error), Some(1));

        let error = Args::try_parse_from(["supervisor", "--workers", "-3"]).unwrap_err();
        assert_eq!(parse_failure_code(&error), Some(1));
    }

    #[test]
    fn test_help_is_not_a_failure() {
        let error = Args::try_parse_from(["supervisor", "--help"]).unwrap_err();
        assert_eq!(parse_failure_code(&error), None);
    }

    #[test]
    fn test_explicit_worker_bin_wins() {
        let path = PathBuf::from("/opt/app/worker");
        assert_eq!(resolve_worker_bin(Some(&path)).unwrap(), path);
    }

    #[test]
    fn test_default_worker_bin_is_sibling() {
        let resolved = resolve_worker_bin(None).unwrap();
        let current = std::env::current_exe().unwrap();
        assert_eq!(resolved.parent(), current.parent());
    }
}
