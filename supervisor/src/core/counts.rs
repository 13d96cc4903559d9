//! Lifetime request aggregate held by the master

use std::time::Duration;

use shared::time::time_difference;

/// Sum of every request-count delta received from any worker.
///
/// Monotonic: never reset, not even when the worker that reported a delta
/// is later replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterCounts {
    pub request_count: u64,
    pub custom_request_count: u64,
}

impl ClusterCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one worker's deltas
    pub fn absorb(&mut self, request_count: u64, custom_request_count: u64) {
        self.request_count = self.request_count.saturating_add(request_count);
        self.custom_request_count = self.custom_request_count.saturating_add(custom_request_count);
    }

    /// Lines logged on every count interval
    pub fn summary_lines(&self, uptime: Duration) -> [String; 2] {
        let diff = time_difference(uptime);
        [
            format!("[Count] {} requests in {}", self.request_count, diff),
            format!("[Count] {} custom requests in {}", self.custom_request_count, diff),
        ]
    }
}
