//! Shared logging utilities for consistent tracing across all processes
//!
//! Every process calls [`init_tracing`] once after its [`ProcessId`] is set.
//! Workers log to stderr because their stdout carries the IPC channel.

use crate::types::ProcessId;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

/// Crate targets each process enables at the requested level
fn level_filter(process_id: &ProcessId, base_level: &str) -> String {
    match process_id {
        ProcessId::Master => {
            format!("supervisor={base_level},shared={base_level},reqwest=warn,hyper=warn")
        }
        ProcessId::Worker(_) => {
            format!("worker={base_level},shared={base_level},tower=warn,hyper=warn,axum={base_level}")
        }
    }
}

/// Initialize tracing subscriber with process-specific configuration
pub fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt};

    let process_id = ProcessId::current();
    let base_level = log_level.unwrap_or("info");
    let env_filter = EnvFilter::new(level_filter(process_id, base_level));

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    // try_init: a second call (tests, embedded use) keeps the first subscriber
    let _ = match process_id {
        ProcessId::Master => builder.try_init(),
        ProcessId::Worker(_) => builder.with_writer(std::io::stderr).try_init(),
    };
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for process-aware info logging
#[macro_export]
macro_rules! process_info {
    ($process_id:expr, $($arg:tt)*) => {
        tracing::info!(
            process = %$process_id,
            timestamp = shared::logging::format_timestamp(),
            $($arg)*
        )
    };
}

/// Macro for process-aware warning logging
#[macro_export]
macro_rules! process_warn {
    ($process_id:expr, $($arg:tt)*) => {
        tracing::warn!(
            process = %$process_id,
            timestamp = shared::logging::format_timestamp(),
            $($arg)*
        )
    };
}

/// Macro for process-aware error logging
#[macro_export]
macro_rules! process_error {
    ($process_id:expr, $($arg:tt)*) => {
        tracing::error!(
            process = %$process_id,
            timestamp = shared::logging::format_timestamp(),
            $($arg)*
        )
    };
}

/// Macro for process-aware debug logging
#[macro_export]
macro_rules! process_debug {
    ($process_id:expr, $($arg:tt)*) => {
        tracing::debug!(
            process = %$process_id,
            timestamp = shared::logging::format_timestamp(),
            $($arg)*
        )
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(process_id: &ProcessId, details: &str) {
    info!(
        process = %process_id,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(process_id: &ProcessId, reason: &str) {
    info!(
        process = %process_id,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(process_id: &ProcessId, context: &str, error: &dyn std::fmt::Display) {
    error!(
        process = %process_id,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for warnings that do not stop the process
pub fn log_warning(process_id: &ProcessId, message: &str) {
    warn!(
        process = %process_id,
        timestamp = format_timestamp(),
        "⚠️ {}",
        message
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(process_id: &ProcessId, message: &str) {
    info!(
        process = %process_id,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}
