//! HTTP worker process of the cluster
//!
//! Serves requests on the port shared with its sibling workers, counts them,
//! reports the counts to the master and turns any fatal fault into a crash
//! report followed by a bounded exit.

pub mod config;
pub mod context;
pub mod crash;
pub mod error;
pub mod services;
pub mod telemetry;
pub mod traits;
pub mod web;
pub mod worker_impl;

pub use config::{Args, WorkerConfig};
pub use crash::{CrashReporter, ErrorReport, Fault, FaultKind};
pub use error::{WorkerError, WorkerResult};
pub use telemetry::{RequestTelemetry, RouteRules, SharedTelemetry, TelemetrySnapshot};
pub use worker_impl::Worker;

pub use traits::{MasterLink, MockMasterLink};
pub use services::{DetachedLink, StdoutLink};
