//! Per-worker request counters
//!
//! Every counted request is recorded twice: in a lifetime snapshot that is
//! never reset and only logged locally, and in a send window that is handed
//! to the master on every flush and then cleared.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::interval_at;

use shared::time::time_difference;
use shared::{logging, process_debug, process_info, ProcessId, WorkerMessage};

use crate::traits::MasterLink;

/// Request telemetry shared with the HTTP layer
pub type SharedTelemetry = Arc<Mutex<RequestTelemetry>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub request_count: u64,
    pub custom_request_count: u64,
    pub path_counts: BTreeMap<String, u64>,
}

impl TelemetrySnapshot {
    fn record(&mut self, path: &str, is_custom_route: bool) {
        self.request_count += 1;
        if is_custom_route {
            self.custom_request_count += 1;
        }
        *self.path_counts.entry(path.to_string()).or_insert(0) += 1;
    }

    /// Nothing worth reporting
    pub fn is_idle(&self) -> bool {
        self.request_count == 0 && self.custom_request_count == 0
    }
}

/// Which URLs are skipped and which count as custom routes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRules {
    /// Normalized paths that are never counted
    pub whitelist: Vec<String>,
    /// URL prefixes of custom routes
    pub custom_prefixes: Vec<String>,
}

impl Default for RouteRules {
    fn default() -> Self {
        Self {
            whitelist: vec!["/health".to_string(), "/favicon.ico".to_string()],
            custom_prefixes: vec!["/c/".to_string(), "/custom-response".to_string()],
        }
    }
}

impl RouteRules {
    pub fn is_whitelisted(&self, normalized_path: &str) -> bool {
        self.whitelist.iter().any(|path| path.eq_ignore_ascii_case(normalized_path))
    }

    pub fn is_custom(&self, url: &str) -> bool {
        self.custom_prefixes.iter().any(|prefix| url.starts_with(prefix.as_str()))
    }
}

/// Strip the query string and lower-case
pub fn normalize_path(url: &str) -> String {
    url.split('?').next().unwrap_or_default().to_lowercase()
}

#[derive(Debug)]
pub struct RequestTelemetry {
    lifetime: TelemetrySnapshot,
    window: TelemetrySnapshot,
    rules: RouteRules,
    started_at: Instant,
}

impl RequestTelemetry {
    pub fn new(rules: RouteRules) -> Self {
        Self {
            lifetime: TelemetrySnapshot::default(),
            window: TelemetrySnapshot::default(),
            rules,
            started_at: Instant::now(),
        }
    }

    pub fn shared(rules: RouteRules) -> SharedTelemetry {
        Arc::new(Mutex::new(Self::new(rules)))
    }

    /// Middleware entry point; returns whether the request was counted
    pub fn observe(&mut self, url: &str) -> bool {
        let path = normalize_path(url);
        if self.rules.is_whitelisted(&path) {
            return false;
        }
        let is_custom = self.rules.is_custom(url);
        self.record_request(&path, is_custom);
        true
    }

    pub fn record_request(&mut self, normalized_path: &str, is_custom_route: bool) {
        self.lifetime.record(normalized_path, is_custom_route);
        self.window.record(normalized_path, is_custom_route);
    }

    /// Hand out the current window and start a new one
    pub fn take_window(&mut self) -> TelemetrySnapshot {
        std::mem::take(&mut self.window)
    }

    pub fn lifetime(&self) -> &TelemetrySnapshot {
        &self.lifetime
    }

    pub fn window(&self) -> &TelemetrySnapshot {
        &self.window
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Send the window deltas to the master; idle windows are not sent
pub async fn flush_window(telemetry: &SharedTelemetry, link: &dyn MasterLink) -> Option<WorkerMessage> {
    let window = telemetry.lock().await.take_window();
    if window.is_idle() {
        return None;
    }

    let message = WorkerMessage::RequestCounts {
        request_count: window.request_count,
        custom_request_count: window.custom_request_count,
    };
    if let Err(e) = link.send(&message) {
        logging::log_error(ProcessId::current(), "Sending request counts", &e);
    }
    Some(message)
}

/// Periodically flush the send window
pub fn spawn_flush_loop(telemetry: SharedTelemetry, link: Arc<dyn MasterLink>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            if let Some(message) = flush_window(&telemetry, link.as_ref()).await {
                process_debug!(ProcessId::current(), "Flushed {:?}", message);
            }
        }
    })
}

/// Periodically log the lifetime snapshot
pub fn spawn_log_loop(telemetry: SharedTelemetry, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            let (snapshot, uptime) = {
                let telemetry = telemetry.lock().await;
                (telemetry.lifetime().clone(), telemetry.uptime())
            };
            let counts = serde_json::to_string(&snapshot).unwrap_or_default();
            process_info!(
                ProcessId::current(),
                counts = %counts,
                "[Logger - Request Counts] {}",
                time_difference(uptime)
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockMasterLink;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/Products/1?limit=5&skip=2"), "/products/1");
        assert_eq!(normalize_path("/c/ABC"), "/c/abc");
        assert_eq!(normalize_path("?only=query"), "");
    }

    #[test]
    fn test_counts_k_requests_and_j_custom() {
        let mut telemetry = RequestTelemetry::new(RouteRules::default());
        let urls = [
            "/products",
            "/c/abc",
            "/products?limit=10",
            "/custom-response/xyz",
            "/health",
            "/favicon.ico",
            "/users/1",
            "/c/def?x=1",
            "/HEALTH",
        ];

        for url in urls {
            telemetry.observe(url);
        }

        let lifetime = telemetry.lifetime();
        assert_eq!(lifetime.request_count, 6);
        assert_eq!(lifetime.custom_request_count, 3);
        assert_eq!(lifetime.path_counts.get("/products"), Some(&2));
        assert!(!lifetime.path_counts.contains_key("/health"));
        assert_eq!(telemetry.window(), telemetry.lifetime());
    }

    #[test]
    fn test_whitelisted_requests_are_invisible() {
        let mut telemetry = RequestTelemetry::new(RouteRules::default());

        assert!(!telemetry.observe("/health"));
        assert!(!telemetry.observe("/favicon.ico?v=2"));

        assert!(telemetry.lifetime().is_idle());
        assert!(telemetry.lifetime().path_counts.is_empty());
    }

    #[test]
    fn test_views_differ_only_by_reset() {
        let mut telemetry = RequestTelemetry::new(RouteRules::default());
        telemetry.observe("/a");
        telemetry.observe("/c/b");

        let first = telemetry.take_window();
        assert_eq!(first.request_count, 2);
        assert_eq!(first.custom_request_count, 1);
        assert!(telemetry.window().is_idle());

        telemetry.observe("/a");
        assert_eq!(telemetry.window().request_count, 1);
        assert_eq!(telemetry.lifetime().request_count, 3);
        assert_eq!(telemetry.lifetime().path_counts.get("/a"), Some(&2));
    }

    #[test]
    fn test_custom_rules() {
        let rules = RouteRules {
            whitelist: vec!["/ping".to_string()],
            custom_prefixes: vec!["/x/".to_string()],
        };
        let mut telemetry = RequestTelemetry::new(rules);

        telemetry.observe("/ping");
        telemetry.observe("/health");
        telemetry.observe("/x/1");

        assert_eq!(telemetry.lifetime().request_count, 2);
        assert_eq!(telemetry.lifetime().custom_request_count, 1);
    }

    #[tokio::test]
    async fn test_flush_sends_window_deltas() {
        let telemetry = RequestTelemetry::shared(RouteRules::default());
        {
            let mut telemetry = telemetry.lock().await;
            telemetry.observe("/a");
            telemetry.observe("/c/b");
            telemetry.observe("/c/c");
        }

        let mut link = MockMasterLink::new();
        link.expect_send()
            .withf(|message| {
                *message
                    == WorkerMessage::RequestCounts {
                        request_count: 3,
                        custom_request_count: 2,
                    }
            })
            .times(1)
            .returning(|_| Ok(()));

        assert!(flush_window(&telemetry, &link).await.is_some());
        // Window is now empty: nothing is sent
        assert!(flush_window(&telemetry, &link).await.is_none());
        assert_eq!(telemetry.lock().await.lifetime().request_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_loop_ticks_on_period() {
        let telemetry = RequestTelemetry::shared(RouteRules::default());
        telemetry.lock().await.observe("/a");

        let mut link = MockMasterLink::new();
        link.expect_send().times(1).returning(|_| Ok(()));
        let link: Arc<dyn MasterLink> = Arc::new(link);

        let handle = spawn_flush_loop(telemetry.clone(), link, Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(telemetry.lock().await.window().request_count, 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(telemetry.lock().await.window().is_idle());

        handle.abort();
    }
}
