//! Request middleware
//!
//! `request_context` is the outermost layer: it snapshots the request into a
//! [`RequestData`] and runs the rest of the chain inside that context.
//! `track_requests` feeds the telemetry counter and writes the access log.

use axum::body::Body;
use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::{ConnectInfo, RawPathParams, Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, REFERER, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Instant;
use uuid::Uuid;

use shared::{process_info, process_warn, ProcessId, RequestData};

use super::AppState;
use crate::context;

/// Largest JSON body copied into the request context
pub const MAX_BUFFERED_BODY: usize = 64 * 1024;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
const FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Bind the request's diagnostic context for the rest of the chain
pub async fn request_context(
    params: Result<RawPathParams, RawPathParamsRejection>,
    req: Request,
    next: Next,
) -> Response {
    let (mut data, req) = match build_request_data(req).await {
        Ok(built) => built,
        Err(rejection) => return rejection,
    };
    if let Ok(params) = params {
        data.params = params
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
    }

    context::run(data, next.run(req)).await
}

/// Count the request and, when enabled, log it once the response is ready
pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let url = original_url(req.uri());
    let counted = state.telemetry.lock().await.observe(&url);

    if !counted || !state.config.log_enabled {
        return next.run(req).await;
    }

    let started = Instant::now();
    let method = req.method().clone();
    let ip = client_ip(&req);
    let referrer = header_value(req.headers(), &REFERER);
    let user_agent = header_value(req.headers(), &USER_AGENT);

    let response = next.run(req).await;

    process_info!(
        ProcessId::current(),
        method = %method,
        status = response.status().as_u16(),
        total_time_ms = %format!("{:.3}", started.elapsed().as_secs_f64() * 1000.0),
        ip = ip.as_deref().unwrap_or("-"),
        url = %url,
        referrer = referrer.as_deref().unwrap_or("-"),
        user_agent = user_agent.as_deref().unwrap_or("-"),
        "HTTP Request"
    );
    response
}

/// Snapshot everything but the path params; returns the request to continue with.
///
/// A body that cannot be read is answered with 400 instead.
pub async fn build_request_data(req: Request) -> Result<(RequestData, Request), Response> {
    let headers = req.headers();
    let uri = req.uri();

    let data = RequestData {
        request_id: Some(header_value(headers, &REQUEST_ID).unwrap_or_else(|| Uuid::new_v4().to_string())),
        method: Some(req.method().to_string()),
        original_url: Some(original_url(uri)),
        path: Some(uri.path().to_string()),
        ip: client_ip(&req),
        user_agent: header_value(headers, &USER_AGENT),
        referer: header_value(headers, &REFERER),
        query: parse_query(uri.query()),
        params: BTreeMap::new(),
        body: None,
        timestamp: Some(Utc::now()),
    };

    let (req, body) = buffer_json_body(req).await?;
    Ok((RequestData { body, ..data }, req))
}

/// Path and query as the client sent them
pub fn original_url(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

fn parse_query(query: Option<&str>) -> BTreeMap<String, String> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

fn header_value(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// First forwarded address, else the peer address
fn client_ip(req: &Request) -> Option<String> {
    if let Some(forwarded) = header_value(req.headers(), &FORWARDED_FOR) {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
            return Some(first.to_string());
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

fn is_json(headers: &HeaderMap) -> bool {
    header_value(headers, &CONTENT_TYPE)
        .map(|value| value.to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false)
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    header_value(headers, &CONTENT_LENGTH).and_then(|value| value.parse().ok())
}

/// Copy a small JSON body so it can be attached to crash reports
async fn buffer_json_body(req: Request) -> Result<(Request, Option<serde_json::Value>), Response> {
    if !is_json(req.headers()) {
        return Ok((req, None));
    }
    match content_length(req.headers()) {
        Some(len) if len > 0 && len <= MAX_BUFFERED_BODY => {}
        _ => return Ok((req, None)),
    }

    let (parts, body) = req.into_parts();
    match axum::body::to_bytes(body, MAX_BUFFERED_BODY).await {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes).ok();
            Ok((Request::from_parts(parts, Body::from(bytes)), value))
        }
        Err(e) => {
            process_warn!(ProcessId::current(), "Failed to buffer request body: {}", e);
            Err((StatusCode::BAD_REQUEST, format!("Failed to read request body: {e}")).into_response())
        }
    }
}
