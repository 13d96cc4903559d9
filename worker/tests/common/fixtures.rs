//! Test fixtures for worker tests

use serde_json::json;
use shared::RequestData;
use std::collections::BTreeMap;
use std::net::SocketAddr;

pub struct TestFixtures;

impl TestFixtures {
    /// Any free loopback port
    pub fn loopback() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    /// Nine requests: six counted, three of them custom routes
    pub fn mixed_urls() -> Vec<&'static str> {
        vec![
            "/products",
            "/c/abc",
            "/products?limit=10",
            "/custom-response/xyz",
            "/health",
            "/favicon.ico",
            "/users/1",
            "/c/def?x=1",
            "/HEALTH",
        ]
    }

    pub fn request_data() -> RequestData {
        RequestData {
            request_id: Some("req-7".to_string()),
            method: Some("POST".to_string()),
            original_url: Some("/c/orders?expand=true".to_string()),
            path: Some("/c/orders".to_string()),
            ip: Some("203.0.113.9".to_string()),
            user_agent: Some("curl/8.0".to_string()),
            query: BTreeMap::from([("expand".to_string(), "true".to_string())]),
            body: Some(json!({"sku": "A-1", "qty": 2})),
            ..RequestData::default()
        }
    }
}
