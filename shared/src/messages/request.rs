//! Request metadata attached to crash reports and notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serializable snapshot of the request that was in flight when a fault hit.
///
/// Every field is optional on the wire so that a master can accept reports
/// from workers that only know part of the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestData {
    pub request_id: Option<String>,
    pub method: Option<String>,
    pub original_url: Option<String>,
    pub path: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub query: BTreeMap<String, String>,
    pub params: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl RequestData {
    /// URL to display: original URL first, falling back to the bare path
    pub fn display_url(&self) -> Option<&str> {
        self.original_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .or_else(|| self.path.as_deref().filter(|path| !path.is_empty()))
    }

    /// Body value if it carries anything worth rendering
    pub fn non_empty_body(&self) -> Option<&serde_json::Value> {
        match self.body.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::Object(map) if map.is_empty() => None,
            serde_json::Value::Array(items) if items.is_empty() => None,
            serde_json::Value::String(text) if text.is_empty() => None,
            body => Some(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names_are_camel_case() {
        let data = RequestData {
            method: Some("GET".to_string()),
            original_url: Some("/products?limit=5".to_string()),
            user_agent: Some("curl/8.0".to_string()),
            ..Default::default()
        };

        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["originalUrl"], "/products?limit=5");
        assert_eq!(value["userAgent"], "curl/8.0");
    }

    #[test]
    fn test_partial_objects_deserialize() {
        let data: RequestData = serde_json::from_value(json!({
            "method": "POST",
            "extraField": true
        }))
        .unwrap();

        assert_eq!(data.method.as_deref(), Some("POST"));
        assert!(data.query.is_empty());
        assert!(data.original_url.is_none());
    }

    #[test]
    fn test_display_url_falls_back_to_path() {
        let mut data = RequestData {
            path: Some("/users/1".to_string()),
            ..Default::default()
        };
        assert_eq!(data.display_url(), Some("/users/1"));

        data.original_url = Some("/users/1?select=id".to_string());
        assert_eq!(data.display_url(), Some("/users/1?select=id"));
    }

    #[test]
    fn test_empty_bodies_are_ignored() {
        let mut data = RequestData::default();
        assert!(data.non_empty_body().is_none());

        data.body = Some(json!({}));
        assert!(data.non_empty_body().is_none());

        data.body = Some(json!({"title": "x"}));
        assert!(data.non_empty_body().is_some());
    }
}
