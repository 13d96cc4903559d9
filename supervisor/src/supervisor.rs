//! Master control loop
//!
//! Keeps the configured number of workers alive, merges their request-count
//! deltas and turns their crash reports into push notifications. All state is
//! owned by the loop and events are handled one at a time.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{interval, interval_at, MissedTickBehavior};

use shared::notification::compose_worker_died;
use shared::{
    process_debug, process_error, process_info, process_warn, Notification, Notifier, NotifyOutcome, ProcessId,
    RequestData, WorkerMessage,
};

use crate::config::SupervisorConfig;
use crate::core::{ClusterCounts, ExitReason, SupervisorEvent};
use crate::error::SupervisorResult;
use crate::traits::WorkerSpawner;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Worker pool supervisor with injected dependencies
pub struct Supervisor<S, N> {
    config: SupervisorConfig,
    spawner: S,
    notifier: Arc<N>,

    /// Pids of live workers
    workers: BTreeSet<u32>,

    /// Lifetime request aggregate, never reset
    counts: ClusterCounts,
    started_at: Instant,

    /// Set once shutdown begins; exits are no longer replaced
    shutting_down: bool,

    /// Notifications still in flight
    notifications: JoinSet<NotifyOutcome>,

    events_tx: mpsc::Sender<SupervisorEvent>,
    events_rx: mpsc::Receiver<SupervisorEvent>,

    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl<S, N> Supervisor<S, N>
where
    S: WorkerSpawner + 'static,
    N: Notifier + 'static,
{
    pub fn new(config: SupervisorConfig, spawner: S, notifier: N) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        Self {
            config,
            spawner,
            notifier: Arc::new(notifier),
            workers: BTreeSet::new(),
            counts: ClusterCounts::new(),
            started_at: Instant::now(),
            shutting_down: false,
            notifications: JoinSet::new(),
            events_tx,
            events_rx,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Spawn workers until the pool is full
    pub async fn start(&mut self) {
        self.fill_vacancies().await;
        process_info!(
            ProcessId::current(),
            "Started {}/{} workers",
            self.workers.len(),
            self.config.worker_count
        );
    }

    /// Slots without a live worker
    pub fn vacancies(&self) -> usize {
        self.config.worker_count.saturating_sub(self.workers.len())
    }

    /// Try to fill every vacancy; stops at the first spawn failure
    pub async fn fill_vacancies(&mut self) {
        while !self.shutting_down && self.vacancies() > 0 {
            match self.spawner.spawn_worker(self.events_tx.clone()).await {
                Ok(handle) => {
                    self.workers.insert(handle.pid);
                    process_info!(ProcessId::current(), "Worker {} started", handle.pid);
                }
                Err(e) => {
                    process_error!(
                        ProcessId::current(),
                        "Failed to spawn worker: {}. Retrying in {:?}",
                        e,
                        self.config.vacancy_retry_interval
                    );
                    break;
                }
            }
        }
    }

    pub async fn handle_event(&mut self, event: SupervisorEvent) {
        match event {
            SupervisorEvent::Message { pid, message } => self.handle_message(pid, message),
            SupervisorEvent::Exited { pid, reason } => self.handle_exit(pid, reason).await,
        }
    }

    pub fn handle_message(&mut self, pid: u32, message: WorkerMessage) {
        match message {
            WorkerMessage::RequestCounts {
                request_count,
                custom_request_count,
            } => {
                self.counts.absorb(request_count, custom_request_count);
            }
            WorkerMessage::Error { error, request_data } => {
                self.report_worker_error(pid, &error, request_data.as_ref());
            }
        }
    }

    fn report_worker_error(&mut self, pid: u32, error: &str, request_data: Option<&RequestData>) {
        process_error!(ProcessId::current(), request = ?request_data, "Worker {} reported error: {}", pid, error);

        let notification = Notification::new(
            format!("Cluster Alert: Worker {pid} Died"),
            compose_worker_died(pid, error, request_data),
        );
        let notifier = Arc::clone(&self.notifier);
        self.notifications.spawn(async move { notifier.notify(notification).await });
    }

    /// Forget the worker and, unless shutting down, start exactly one replacement
    pub async fn handle_exit(&mut self, pid: u32, reason: ExitReason) {
        if !self.workers.remove(&pid) {
            process_debug!(ProcessId::current(), "Exit of unknown worker {} ignored", pid);
            return;
        }

        if self.shutting_down {
            process_info!(ProcessId::current(), "Worker {} stopped. {}", pid, reason);
            return;
        }

        process_warn!(ProcessId::current(), "Worker {} died. {}", pid, reason);
        self.fill_vacancies().await;
    }

    pub fn live_workers(&self) -> Vec<u32> {
        self.workers.iter().copied().collect()
    }

    pub fn counts(&self) -> ClusterCounts {
        self.counts
    }

    /// Sender handed to spawned workers; exposed for tests that inject events
    pub fn event_sender(&self) -> mpsc::Sender<SupervisorEvent> {
        self.events_tx.clone()
    }

    /// Get shutdown sender for external shutdown requests
    pub fn get_shutdown_sender(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    fn log_counts(&self) {
        for line in self.counts.summary_lines(self.started_at.elapsed()) {
            process_info!(ProcessId::current(), "{}", line);
        }
    }

    /// Main event loop; returns once shutdown has completed
    pub async fn run(&mut self) -> SupervisorResult<()> {
        self.start().await;

        let period = self.config.count_log_interval;
        let mut count_interval = interval_at(tokio::time::Instant::now() + period, period);
        let mut vacancy_interval = interval(self.config.vacancy_retry_interval);
        vacancy_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event).await;
                },

                _ = count_interval.tick() => {
                    self.log_counts();
                },

                // Retry spawns that failed earlier
                _ = vacancy_interval.tick(), if self.vacancies() > 0 => {
                    self.fill_vacancies().await;
                },

                Some(joined) = self.notifications.join_next(), if !self.notifications.is_empty() => {
                    if let Err(e) = joined {
                        process_error!(ProcessId::current(), "Notification task failed: {}", e);
                    }
                },

                Some(_) = self.shutdown_rx.recv() => {
                    process_debug!(ProcessId::current(), "Shutting down supervisor...");
                    return self.shutdown().await;
                }
            }
        }
    }

    /// Stop respawning, SIGTERM every live worker and wait for all of them to exit
    pub async fn shutdown(&mut self) -> SupervisorResult<()> {
        self.shutting_down = true;
        let mut result = Ok(());

        for pid in self.live_workers() {
            if let Err(e) = self.spawner.terminate_worker(pid).await {
                process_error!(ProcessId::current(), "{}", e);
                // No exit event is coming for a worker we could not signal
                self.workers.remove(&pid);
                result = Err(e);
            }
        }

        while !self.workers.is_empty() {
            match self.events_rx.recv().await {
                Some(event) => self.handle_event(event).await,
                None => break,
            }
        }

        self.flush_notifications().await;
        self.log_counts();

        match &result {
            Ok(()) => process_info!(ProcessId::current(), "All workers stopped"),
            Err(_) => process_warn!(ProcessId::current(), "Some workers could not be stopped"),
        }
        result
    }

    /// Wait for every in-flight notification and return their outcomes
    pub async fn flush_notifications(&mut self) -> Vec<NotifyOutcome> {
        let mut outcomes = Vec::new();
        while let Some(joined) = self.notifications.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => outcomes.push(NotifyOutcome::Failed(e.to_string())),
            }
        }
        outcomes
    }
}

