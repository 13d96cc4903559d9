//! Environment variable validation run once before any worker starts
//!
//! Variables are read from:
//! 1. `.env` file in the current directory or parent directories (if present)
//! 2. System environment variables
//!
//! Environment variables take precedence over .env file values.
//!
//! ## Required
//! - `APP_ENV`: deployment environment name
//!
//! ## Optional
//! - `PORT`, `NUM_WORKERS`, `LOG_ENABLED`
//! - `PUSHOVER_USER_KEY`, `PUSHOVER_API_TOKEN`: crash notifications are
//!   skipped when either is missing

use shared::notification::{API_TOKEN_ENV, USER_KEY_ENV};
use shared::{process_debug, ProcessId};

use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::{EnvReport, EnvValidator};

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Validator backed by the process environment
pub struct RealEnvValidator {
    lookup: Lookup,
    load_dotenv: bool,
}

impl RealEnvValidator {
    pub const REQUIRED_VARS: &'static [&'static str] = &["APP_ENV"];

    pub const OPTIONAL_VARS: &'static [&'static str] =
        &["PORT", "NUM_WORKERS", "LOG_ENABLED", USER_KEY_ENV, API_TOKEN_ENV];

    pub fn new() -> Self {
        Self {
            lookup: Box::new(|name| std::env::var(name).ok()),
            load_dotenv: true,
        }
    }

    /// Read variables through `lookup` instead of the process environment
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
            load_dotenv: false,
        }
    }

    /// Present at all, even if empty
    fn is_set(&self, name: &str) -> bool {
        (self.lookup)(name).is_some()
    }
}

impl Default for RealEnvValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvValidator for RealEnvValidator {
    fn validate(&self) -> SupervisorResult<EnvReport> {
        if self.load_dotenv {
            // Missing .env is fine
            let _ = dotenv::dotenv();
        }

        let missing_required: Vec<&str> = Self::REQUIRED_VARS
            .iter()
            .copied()
            .filter(|name| !self.is_set(name))
            .collect();

        if !missing_required.is_empty() {
            return Err(SupervisorError::config(format!(
                "Missing required environment variables: {}",
                missing_required.join(", ")
            )));
        }

        let missing_optional: Vec<String> = Self::OPTIONAL_VARS
            .iter()
            .filter(|name| !self.is_set(name))
            .map(|name| name.to_string())
            .collect();

        process_debug!(
            ProcessId::current(),
            "Environment validated ({} optional variables unset)",
            missing_optional.len()
        );

        Ok(EnvReport { missing_optional })
    }
}
