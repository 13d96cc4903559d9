//! HTTP service shell
//!
//! A minimal router with the request-context and telemetry middleware every
//! request passes through.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use crate::config::WorkerConfig;
use crate::telemetry::SharedTelemetry;

pub use routes::build_router;

/// State shared by every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub telemetry: SharedTelemetry,
    pub config: Arc<WorkerConfig>,
}
