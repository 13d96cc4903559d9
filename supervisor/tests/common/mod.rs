//! Common test utilities and infrastructure
//!
//! Shared fixtures and builders used across the supervisor test suites.

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::TestFixtures;
pub use helpers::{SupervisorBuilder, TestHelpers, WorkerPool};
