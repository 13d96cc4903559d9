//! Test helper utilities for worker integration tests

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use shared::{SharedResult, WorkerMessage};
use worker::{MasterLink, Worker, WorkerConfig};

use super::TestFixtures;

pub struct TestHelpers;

impl TestHelpers {
    /// Worker on a loopback address with the given link
    pub fn worker(link: Arc<dyn MasterLink>) -> Worker {
        Worker::new(WorkerConfig::default().with_bind_address(TestFixtures::loopback()), link)
    }

    /// Worker whose link records every message
    pub fn recording_worker() -> (Worker, RecordingLink) {
        let link = RecordingLink::default();
        (Self::worker(Arc::new(link.clone())), link)
    }

    /// Send one request through the router
    pub async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => {
                let bytes = serde_json::to_vec(&body).unwrap();
                builder
                    .header("content-type", "application/json")
                    .header("content-length", bytes.len())
                    .body(Body::from(bytes))
                    .unwrap()
            }
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
        Self::call(router, "GET", uri, None).await
    }
}

/// Master link that keeps what it was sent
#[derive(Clone, Default)]
pub struct RecordingLink {
    sent: Arc<Mutex<Vec<WorkerMessage>>>,
}

impl RecordingLink {
    pub fn sent(&self) -> Vec<WorkerMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl MasterLink for RecordingLink {
    fn send(&self, message: &WorkerMessage) -> SharedResult<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}
