//! Main worker implementation
//!
//! Owns the telemetry counter and the master link, binds the shared port and
//! serves the router until the shutdown future resolves.

use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpSocket};

use shared::{process_debug, process_info, ProcessId};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::telemetry::{self, RequestTelemetry, SharedTelemetry};
use crate::traits::MasterLink;
use crate::web::{build_router, AppState};

const LISTEN_BACKLOG: u32 = 1024;

/// One worker process with injected master link
pub struct Worker {
    config: Arc<WorkerConfig>,
    telemetry: SharedTelemetry,
    link: Arc<dyn MasterLink>,
}

impl Worker {
    pub fn new(config: WorkerConfig, link: Arc<dyn MasterLink>) -> Self {
        let telemetry = RequestTelemetry::shared(config.rules.clone());
        Self {
            config: Arc::new(config),
            telemetry,
            link,
        }
    }

    pub fn telemetry(&self) -> SharedTelemetry {
        self.telemetry.clone()
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn router(&self) -> Router {
        build_router(AppState {
            telemetry: self.telemetry.clone(),
            config: self.config.clone(),
        })
    }

    /// Bind the configured address; every worker binds the same port
    pub fn bind(&self) -> WorkerResult<TcpListener> {
        bind_shared(self.config.bind_address)
    }

    /// Serve until `shutdown` resolves and all open connections have finished
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> WorkerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let flush_task = telemetry::spawn_flush_loop(
            self.telemetry.clone(),
            self.link.clone(),
            self.config.flush_interval,
        );
        let log_task = telemetry::spawn_log_loop(self.telemetry.clone(), self.config.log_interval);

        if let Ok(addr) = listener.local_addr() {
            process_info!(
                ProcessId::current(),
                "Worker {} listening on http://{}",
                ProcessId::current().pid(),
                addr
            );
        }

        let served = axum::serve(
            listener,
            self.router().into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| WorkerError::server(e.to_string()));

        flush_task.abort();
        log_task.abort();

        // Deltas of the last partial window
        if telemetry::flush_window(&self.telemetry, self.link.as_ref()).await.is_some() {
            process_debug!(ProcessId::current(), "Flushed final request counts");
        }

        served
    }
}

/// Listener with address and port reuse so several processes can share a port
pub fn bind_shared(addr: SocketAddr) -> WorkerResult<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(|e| WorkerError::bind(addr, e.to_string()))?;

    socket
        .set_reuseaddr(true)
        .map_err(|e| WorkerError::bind(addr, e.to_string()))?;
    #[cfg(unix)]
    socket
        .set_reuseport(true)
        .map_err(|e| WorkerError::bind(addr, e.to_string()))?;

    socket.bind(addr).map_err(|e| WorkerError::bind(addr, e.to_string()))?;
    socket
        .listen(LISTEN_BACKLOG)
        .map_err(|e| WorkerError::bind(addr, e.to_string()))
}
