//! Test fixtures and data for supervisor tests

use shared::{RequestData, WorkerMessage};
use supervisor::ExitReason;

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// First pid handed out by the fake worker pool
    pub const FIRST_PID: u32 = 1000;

    pub const DEFAULT_WORKER_COUNT: usize = 3;

    pub const STACK_TRACE: &'static str = "panicked at 'boom', src/web/routes.rs:42:9\n   0: worker::web::routes::explode";

    /// Every way a worker can go away
    pub fn exit_reasons() -> Vec<ExitReason> {
        vec![
            ExitReason::Clean,
            ExitReason::Code(1),
            ExitReason::Code(137),
            ExitReason::Signal("SIGKILL".to_string()),
            ExitReason::Signal("SIGSEGV".to_string()),
        ]
    }

    pub fn counts(request_count: u64, custom_request_count: u64) -> WorkerMessage {
        WorkerMessage::RequestCounts {
            request_count,
            custom_request_count,
        }
    }

    pub fn request_data() -> RequestData {
        RequestData {
            method: Some("POST".to_string()),
            original_url: Some("/c/orders?expand=true".to_string()),
            path: Some("/c/orders".to_string()),
            ip: Some("10.0.0.7".to_string()),
            ..RequestData::default()
        }
    }

    pub fn crash(request_data: Option<RequestData>) -> WorkerMessage {
        WorkerMessage::Error {
            error: Self::STACK_TRACE.to_string(),
            request_data,
        }
    }
}
