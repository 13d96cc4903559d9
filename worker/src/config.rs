//! Command line and environment configuration for a worker process

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::crash::EXIT_DELAY;
use crate::telemetry::RouteRules;

/// Worker process spawned by the supervisor
#[derive(Parser, Debug, Clone)]
#[command(name = "worker")]
#[command(about = "HTTP worker process with request telemetry and crash reporting")]
pub struct Args {
    /// Port for the HTTP server (shared by every worker)
    #[arg(long, env = "PORT", default_value_t = 8888)]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Emit one access log line per counted request
    #[arg(long, env = "LOG_ENABLED", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub log_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Paths that are never counted
    #[arg(long, value_delimiter = ',', default_value = "/health,/favicon.ico")]
    pub whitelist: Vec<String>,

    /// URL prefixes counted as custom routes
    #[arg(long, value_delimiter = ',', default_value = "/c/,/custom-response")]
    pub custom_prefixes: Vec<String>,

    /// Seconds between request-count flushes to the master
    #[arg(long, default_value_t = 30)]
    pub flush_secs: u64,

    /// Seconds between local request-count log lines
    #[arg(long, default_value_t = 60)]
    pub log_secs: u64,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub bind_address: SocketAddr,
    pub log_enabled: bool,
    pub rules: RouteRules,
    pub flush_interval: Duration,
    pub log_interval: Duration,
    /// Longest time between a fatal fault and process exit
    pub exit_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8888)),
            log_enabled: false,
            rules: RouteRules::default(),
            flush_interval: Duration::from_secs(30),
            log_interval: Duration::from_secs(60),
            exit_delay: EXIT_DELAY,
        }
    }
}

impl WorkerConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            bind_address: SocketAddr::new(args.host, args.port),
            log_enabled: args.log_enabled,
            rules: RouteRules {
                whitelist: normalize_list(&args.whitelist),
                custom_prefixes: args.custom_prefixes.iter().filter(|p| !p.is_empty()).cloned().collect(),
            },
            flush_interval: Duration::from_secs(args.flush_secs.max(1)),
            log_interval: Duration::from_secs(args.log_secs.max(1)),
            exit_delay: EXIT_DELAY,
        }
    }

    /// Bind to an explicit address (fluent API)
    pub fn with_bind_address(mut self, bind_address: SocketAddr) -> Self {
        self.bind_address = bind_address;
        self
    }

    /// Configure access logging (fluent API)
    pub fn with_log_enabled(mut self, log_enabled: bool) -> Self {
        self.log_enabled = log_enabled;
        self
    }
}

fn normalize_list(paths: &[String]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}
