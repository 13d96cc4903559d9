//! Test helpers and builder patterns for supervisor tests
//!
//! `WorkerPool` is a fake process table behind a `MockWorkerSpawner`: it hands
//! out sequential pids, can fail a number of spawns, and answers terminate
//! requests by posting the matching exit event.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use shared::notification::MockNotifier;
use shared::{Notification, NotifyOutcome};
use supervisor::{
    ExitReason, MockWorkerSpawner, Supervisor, SupervisorConfig, SupervisorError, SupervisorEvent, SupervisorResult,
    WorkerHandle,
};

use super::fixtures::TestFixtures;

#[derive(Default)]
struct PoolState {
    next_pid: u32,
    spawned: Vec<u32>,
    terminated: Vec<u32>,
    failures_left: usize,
    events: Option<mpsc::Sender<SupervisorEvent>>,
}

/// Fake worker processes shared between a test and its supervisor
#[derive(Clone, Default)]
pub struct WorkerPool {
    state: Arc<Mutex<PoolState>>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::failing_first(0)
    }

    /// Pool whose first `failures` spawn attempts fail
    pub fn failing_first(failures: usize) -> Self {
        let state = PoolState {
            next_pid: TestFixtures::FIRST_PID,
            failures_left: failures,
            ..PoolState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Mock spawner backed by this pool
    pub fn spawner(&self) -> MockWorkerSpawner {
        let mut mock = MockWorkerSpawner::new();

        let pool = self.clone();
        mock.expect_spawn_worker().returning(move |events| pool.spawn(events));

        let pool = self.clone();
        mock.expect_terminate_worker().returning(move |pid| pool.terminate(pid));

        mock
    }

    fn spawn(&self, events: mpsc::Sender<SupervisorEvent>) -> SupervisorResult<WorkerHandle> {
        let mut state = self.state.lock().unwrap();
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(SupervisorError::spawn("fork failed"));
        }

        let pid = state.next_pid;
        state.next_pid += 1;
        state.spawned.push(pid);
        state.events = Some(events);
        Ok(WorkerHandle { pid })
    }

    fn terminate(&self, pid: u32) -> SupervisorResult<()> {
        let mut state = self.state.lock().unwrap();
        state.terminated.push(pid);
        if let Some(events) = &state.events {
            let exit = SupervisorEvent::Exited {
                pid,
                reason: ExitReason::Signal("SIGTERM".to_string()),
            };
            events.try_send(exit).expect("event channel has room");
        }
        Ok(())
    }

    pub fn spawned(&self) -> Vec<u32> {
        self.state.lock().unwrap().spawned.clone()
    }

    pub fn terminated(&self) -> Vec<u32> {
        self.state.lock().unwrap().terminated.clone()
    }
}

/// Builder pattern for creating test supervisors with sensible defaults
pub struct SupervisorBuilder {
    config: SupervisorConfig,
    pool: WorkerPool,
    notifier: MockNotifier,
}

impl SupervisorBuilder {
    /// Create a new builder; the default notifier accepts anything and skips it
    pub fn new() -> Self {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().returning(|_| NotifyOutcome::Skipped);

        Self {
            config: SupervisorConfig::default().with_worker_count(TestFixtures::DEFAULT_WORKER_COUNT),
            pool: WorkerPool::new(),
            notifier,
        }
    }

    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.config = self.config.with_worker_count(count);
        self
    }

    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_vacancy_retry(mut self, interval: Duration) -> Self {
        self.config.vacancy_retry_interval = interval;
        self
    }

    /// Replace the notifier with one recording every notification into `sent`
    pub fn with_recording_notifier(mut self, sent: Arc<Mutex<Vec<Notification>>>) -> Self {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().returning(move |notification| {
            sent.lock().unwrap().push(notification);
            NotifyOutcome::Delivered
        });
        self.notifier = notifier;
        self
    }

    pub fn build(self) -> (Supervisor<MockWorkerSpawner, MockNotifier>, WorkerPool) {
        let spawner = self.pool.spawner();
        (Supervisor::new(self.config, spawner, self.notifier), self.pool)
    }
}

impl Default for SupervisorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Common test helper functions
pub struct TestHelpers;

impl TestHelpers {
    /// Supervisor with `count` workers already started
    pub async fn started(count: usize) -> (Supervisor<MockWorkerSpawner, MockNotifier>, WorkerPool) {
        let (mut supervisor, pool) = SupervisorBuilder::new().with_worker_count(count).build();
        supervisor.start().await;
        (supervisor, pool)
    }

    /// Assert the live set has the expected size and holds only spawned pids
    pub fn assert_pool(supervisor: &Supervisor<MockWorkerSpawner, MockNotifier>, pool: &WorkerPool, live: usize) {
        let workers = supervisor.live_workers();
        assert_eq!(workers.len(), live, "live workers: {workers:?}");
        let spawned = pool.spawned();
        assert!(workers.iter().all(|pid| spawned.contains(pid)));
    }
}
