//! Fatal fault handling
//!
//! A panic anywhere in the worker, or an `Err` from a task started with
//! [`spawn_supervised`], is fatal. The first fault is captured together with
//! the request context that was current when it happened, logged, pushed as a
//! notification, reported to the master and then the process exits with
//! code 1 after at most the configured exit delay. Later faults are logged
//! and otherwise ignored.
//!
//! Capturing runs synchronously on the faulting thread (inside the panic hook
//! the task-local context is still set). Delivery needs the runtime, so the
//! report is handed to a reporter task; a detached watchdog thread enforces
//! the exit deadline even if that task never gets to run.

use chrono::{DateTime, Utc};
use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use shared::notification::compose_process_error;
use shared::{
    process_debug, process_error, process_warn, Notification, Notifier, NotifyOutcome, ProcessId, RequestData,
    WorkerMessage, EXIT_FAILURE,
};

use crate::context;
use crate::traits::MasterLink;

/// Default upper bound between capture and exit
pub const EXIT_DELAY: Duration = Duration::from_millis(300);

const MAX_BACKTRACE_LEN: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Uncaught panic
    Panic,
    /// Error returned from a supervised task
    TaskError,
}

/// A fatal fault as observed at the point it happened
#[derive(Debug, Clone)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
    /// Source location (file:line:col) if known
    pub location: Option<String>,
    pub backtrace: Option<String>,
}

impl Fault {
    pub fn panic(payload: &(dyn Any + Send), location: Option<String>) -> Self {
        Self {
            kind: FaultKind::Panic,
            message: panic_message(payload),
            location,
            backtrace: Some(capture_backtrace()),
        }
    }

    pub fn task_error(error: impl Display) -> Self {
        Self {
            kind: FaultKind::TaskError,
            message: error.to_string(),
            location: None,
            backtrace: Some(capture_backtrace()),
        }
    }

    /// Message, location and backtrace, first line being the message
    pub fn stack_trace(&self) -> String {
        let mut trace = self.message.clone();
        if let Some(location) = &self.location {
            trace.push_str(&format!("\n    at {location}"));
        }
        if let Some(backtrace) = self.backtrace.as_deref().filter(|bt| !bt.trim().is_empty()) {
            trace.push('\n');
            trace.push_str(backtrace);
        }
        trace
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn capture_backtrace() -> String {
    let backtrace = Backtrace::force_capture().to_string();
    if backtrace.len() <= MAX_BACKTRACE_LEN {
        return backtrace;
    }
    let mut end = MAX_BACKTRACE_LEN;
    while !backtrace.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n... [truncated]", &backtrace[..end])
}

/// Everything known about a fault once it has been captured
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub worker_id: u32,
    pub message: String,
    pub stack_trace: String,
    pub request_data: Option<RequestData>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorReport {
    /// Text of the fault log entry
    pub fn log_line(&self) -> String {
        let mut line = format!(
            "Uncaught exception in process {}: {}\n{}",
            self.worker_id, self.message, self.stack_trace
        );
        if let Some(request) = &self.request_data {
            line.push_str(&format!(
                "\nRequest: {} {}",
                request.method.as_deref().unwrap_or("-"),
                request.display_url().unwrap_or("-")
            ));
        }
        line
    }

    pub fn notification(&self) -> Notification {
        Notification::new(
            format!("Error in Process {}", self.worker_id),
            compose_process_error(&self.stack_trace, self.request_data.as_ref()),
        )
    }

    pub fn to_message(&self) -> WorkerMessage {
        WorkerMessage::Error {
            error: self.stack_trace.clone(),
            request_data: self.request_data.clone(),
        }
    }
}

/// Read the context and log the fault
pub fn capture_and_log(fault: Fault) -> ErrorReport {
    let report = ErrorReport {
        worker_id: ProcessId::current().pid(),
        message: fault.message.clone(),
        stack_trace: fault.stack_trace(),
        request_data: context::current(),
        timestamp: Utc::now(),
    };

    process_error!(
        ProcessId::current(),
        kind = ?fault.kind,
        request = ?report.request_data,
        "{}",
        report.log_line()
    );
    report
}

/// Delivers a captured report: notification, IPC message, exit code
pub struct CrashReporter {
    link: Arc<dyn MasterLink>,
    notifier: Arc<dyn Notifier>,
    exit_delay: Duration,
}

impl CrashReporter {
    pub fn new(link: Arc<dyn MasterLink>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            link,
            notifier,
            exit_delay: EXIT_DELAY,
        }
    }

    /// Configure exit delay (fluent API)
    pub fn with_exit_delay(mut self, exit_delay: Duration) -> Self {
        self.exit_delay = exit_delay;
        self
    }

    pub fn exit_delay(&self) -> Duration {
        self.exit_delay
    }

    /// Start the notification, tell the master, wait for the notification up
    /// to the exit delay. Returns the exit code.
    pub async fn deliver(&self, report: ErrorReport) -> i32 {
        let notifier = Arc::clone(&self.notifier);
        let notification = report.notification();
        let pending = tokio::spawn(async move { notifier.notify(notification).await });

        if let Err(e) = self.link.send(&report.to_message()) {
            process_error!(ProcessId::current(), "Failed to report error to master: {}", e);
        }

        match tokio::time::timeout(self.exit_delay, pending).await {
            Ok(Ok(NotifyOutcome::Failed(reason))) => {
                process_error!(ProcessId::current(), "Failed to send process error push notification: {}", reason);
            }
            Ok(Ok(outcome)) => process_debug!(ProcessId::current(), "Crash notification: {:?}", outcome),
            Ok(Err(e)) => {
                process_error!(ProcessId::current(), "Failed to send process error push notification: {}", e);
            }
            Err(_) => process_warn!(ProcessId::current(), "Crash notification still pending at exit"),
        }

        EXIT_FAILURE
    }

    async fn run(self, mut reports: mpsc::UnboundedReceiver<ErrorReport>) {
        if let Some(report) = reports.recv().await {
            let code = self.deliver(report).await;
            std::process::exit(code);
        }
    }
}

struct FaultChannel {
    reports: mpsc::UnboundedSender<ErrorReport>,
    exit_delay: Duration,
    fired: AtomicBool,
}

static FAULT_CHANNEL: OnceLock<FaultChannel> = OnceLock::new();

/// Install the process-wide panic hook and start the reporter task.
///
/// Must be called once from inside the runtime. Returns `None` if a reporter
/// was already installed.
pub fn install(reporter: CrashReporter) -> Option<JoinHandle<()>> {
    let (reports, receiver) = mpsc::unbounded_channel();
    let channel = FaultChannel {
        reports,
        exit_delay: reporter.exit_delay,
        fired: AtomicBool::new(false),
    };
    if FAULT_CHANNEL.set(channel).is_err() {
        process_warn!(ProcessId::current(), "Crash reporter already installed");
        return None;
    }

    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()));
        report_fault(Fault::panic(info.payload(), location));
    }));

    Some(tokio::spawn(reporter.run(receiver)))
}

/// Entry point for every fatal fault
pub fn report_fault(fault: Fault) {
    let Some(channel) = FAULT_CHANNEL.get() else {
        // No reporter: log and leave the outcome to the caller
        capture_and_log(fault);
        return;
    };

    if channel.fired.swap(true, Ordering::SeqCst) {
        process_warn!(ProcessId::current(), "Ignoring fault during teardown: {}", fault.message);
        return;
    }

    let report = capture_and_log(fault);
    arm_watchdog(channel.exit_delay);
    if channel.reports.send(report).is_err() {
        process_error!(ProcessId::current(), "Crash reporter is gone, exiting");
        std::process::exit(EXIT_FAILURE);
    }
}

/// Force the exit at the deadline; a detached thread never keeps the process alive
fn arm_watchdog(delay: Duration) {
    let spawned = std::thread::Builder::new()
        .name("crash-watchdog".to_string())
        .spawn(move || {
            std::thread::sleep(delay);
            std::process::exit(EXIT_FAILURE);
        });
    if let Err(e) = spawned {
        process_error!(ProcessId::current(), "Failed to start crash watchdog: {}", e);
    }
}

/// Spawn a task whose `Err` is treated as a fatal fault.
///
/// The task inherits the caller's request context.
pub fn spawn_supervised<F, E>(fut: F) -> JoinHandle<()>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    context::spawn_in_context(async move {
        if let Err(e) = fut.await {
            report_fault(Fault::task_error(e));
        }
    })
}
