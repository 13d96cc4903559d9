//! Composition of bounded, human readable alert messages

use crate::messages::RequestData;

/// Hard limit imposed by the push endpoint
pub const MAX_MESSAGE_CHARS: usize = 1024;

/// Longest request body rendered in an alert
pub const MAX_BODY_CHARS: usize = 200;

const ELLIPSIS: &str = "...";

/// Render the request fields that are present, one per line
pub fn format_request_details(request: &RequestData) -> String {
    let mut parts = Vec::new();

    if let Some(method) = non_empty(&request.method) {
        parts.push(format!("Method: {method}"));
    }
    if let Some(url) = request.display_url() {
        parts.push(format!("URL: {url}"));
    }
    if let Some(ip) = non_empty(&request.ip) {
        parts.push(format!("IP: {ip}"));
    }
    if let Some(user_agent) = non_empty(&request.user_agent) {
        parts.push(format!("User-Agent: {user_agent}"));
    }
    if !request.query.is_empty() {
        parts.push(format!("Query: {}", to_json(&request.query)));
    }
    if !request.params.is_empty() {
        parts.push(format!("Params: {}", to_json(&request.params)));
    }
    if let Some(body) = request.non_empty_body() {
        let body = to_json(body);
        parts.push(format!("Body: {}", truncate_chars(&body, MAX_BODY_CHARS)));
    }
    if let Some(referer) = non_empty(&request.referer) {
        parts.push(format!("Referer: {referer}"));
    }
    if let Some(timestamp) = &request.timestamp {
        parts.push(format!("Time: {}", timestamp.to_rfc3339()));
    }

    parts.join("\n")
}

/// Alert sent by the master when a worker reports a fatal error
pub fn compose_worker_died(worker_pid: u32, error: &str, request: Option<&RequestData>) -> String {
    let message = format!("Worker with ID {worker_pid} has died.\n\nError: {}", error_summary(error));
    truncate_message(&with_request_details(message, request))
}

/// Alert sent by a worker about its own fatal error
pub fn compose_process_error(error: &str, request: Option<&RequestData>) -> String {
    let message = format!("Error: {}", error_summary(error));
    truncate_message(&with_request_details(message, request))
}

/// Clamp a message to [`MAX_MESSAGE_CHARS`], marking the cut with an ellipsis
pub fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message.to_string();
    }
    let kept: String = message.chars().take(MAX_MESSAGE_CHARS - ELLIPSIS.len()).collect();
    format!("{kept}{ELLIPSIS}")
}

/// First line of an error/stack trace
pub fn error_summary(error: &str) -> &str {
    match error.lines().next().map(str::trim_end) {
        Some(line) if !line.is_empty() => line,
        _ => "Unknown error",
    }
}

fn with_request_details(mut message: String, request: Option<&RequestData>) -> String {
    if let Some(request) = request {
        message.push_str("\n\nRequest Details:\n");
        message.push_str(&format_request_details(request));
    }
    message
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit).collect();
    format!("{kept}{ELLIPSIS}")
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
