//! Reads a worker's IPC channel and reports its exit
//!
//! The worker's stdout carries its IPC messages, one JSON object per line; its
//! stderr is inherited so worker logs land on the master's terminal. One
//! monitor task per worker forwards every decoded message and then, once the
//! channel is closed, waits for the process and sends exactly one exit event.
//! Messages from a worker therefore always reach the control loop before its
//! exit.

use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use shared::{process_debug, process_warn, ProcessId, WorkerMessage, MASTER_CHANNEL_ENV};

use crate::core::{ExitReason, SupervisorEvent};

/// Wire a worker command for the stdout IPC channel
pub fn configure_worker_stdio(cmd: &mut Command) {
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .stdin(Stdio::null())
        .env(MASTER_CHANNEL_ENV, "stdout");
}

/// Forward every message on `reader`, returning once the stream closes
///
/// Lines that are not UTF-8 or not a valid message are skipped; the stream is
/// drained to the end so the worker never blocks on a full pipe.
pub async fn forward_messages<R>(reader: R, pid: u32, events: &mpsc::Sender<SupervisorEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let Ok(line) = std::str::from_utf8(&buf) else {
                    process_warn!(ProcessId::current(), "Ignoring non UTF-8 line from worker {}", pid);
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match WorkerMessage::parse_line(line) {
                    Ok(message) => {
                        if events.send(SupervisorEvent::Message { pid, message }).await.is_err() {
                            // Control loop is gone; keep draining so the worker never blocks
                            process_debug!(ProcessId::current(), "Dropping message from worker {}", pid);
                        }
                    }
                    Err(e) => {
                        process_warn!(ProcessId::current(), "Ignoring malformed message from worker {}: {}", pid, e);
                    }
                }
            }
            Err(e) => {
                process_warn!(ProcessId::current(), "IPC channel of worker {} failed: {}", pid, e);
                break;
            }
        }
    }
}

/// Spawn the task owning `child` until it exits
pub fn spawn_worker_monitor(mut child: Child, pid: u32, events: mpsc::Sender<SupervisorEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(stdout) = child.stdout.take() {
            forward_messages(stdout, pid, &events).await;
        }

        let reason = match child.wait().await {
            Ok(status) => ExitReason::from_status(status),
            Err(e) => ExitReason::Unknown(e.to_string()),
        };

        if events.send(SupervisorEvent::Exited { pid, reason }).await.is_err() {
            process_debug!(ProcessId::current(), "Worker {} exited after the control loop stopped", pid);
        }
    })
}
