//! Interval scheduler driving the reconciler.

use crate::reconcile::{ReconcileOutcome, ReconcileStats, Reconciler};
use crate::transport::ContactsClient;
use docfy_storage::{ContactBoxRegistry, ContactStore};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Lifecycle of the watcher's timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// No timer is active.
    Idle,
    /// The timer fires every interval.
    Running,
    /// Stop was requested; the timer task is finishing an in-flight run.
    Stopping,
}

impl WatcherState {
    /// Returns true while the timer is active.
    pub fn is_active(&self) -> bool {
        matches!(self, WatcherState::Running)
    }

    /// Returns true if `start()` would launch a new timer.
    pub fn can_start(&self) -> bool {
        !matches!(self, WatcherState::Running)
    }
}

#[derive(Debug)]
struct Inner {
    state: WatcherState,
    generation: u64,
    stop_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

/// Runs reconciliation on a fixed cadence.
///
/// `start()` and `stop()` are idempotent. Stopping prevents future ticks
/// only; an in-flight reconciliation runs to completion. Overlapping runs
/// (a forced run during a scheduled one) are skipped by the reconciler.
pub struct Watcher<C, R, S>
where
    C: ContactsClient + 'static,
    R: ContactBoxRegistry + 'static,
    S: ContactStore + 'static,
{
    reconciler: Arc<Reconciler<C, R, S>>,
    interval: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl<C, R, S> Watcher<C, R, S>
where
    C: ContactsClient + 'static,
    R: ContactBoxRegistry + 'static,
    S: ContactStore + 'static,
{
    /// Creates an idle watcher using the reconciler's configured interval.
    pub fn new(reconciler: Arc<Reconciler<C, R, S>>) -> Self {
        let interval = reconciler.config().watch_interval;
        Self::with_interval(reconciler, interval)
    }

    /// Creates an idle watcher with an explicit interval.
    pub fn with_interval(reconciler: Arc<Reconciler<C, R, S>>, interval: Duration) -> Self {
        Self {
            reconciler,
            interval: interval.max(Duration::from_millis(1)),
            inner: Arc::new(Mutex::new(Inner {
                state: WatcherState::Idle,
                generation: 0,
                stop_tx: None,
                task: None,
            })),
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> WatcherState {
        self.inner.lock().state
    }

    /// Gets the interval between scheduled runs.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Gets the reconciler's stats.
    pub fn stats(&self) -> ReconcileStats {
        self.reconciler.stats()
    }

    /// Gets the reconciler.
    pub fn reconciler(&self) -> &Arc<Reconciler<C, R, S>> {
        &self.reconciler
    }

    /// Starts the timer. The first run happens one interval from now.
    ///
    /// Returns false if the timer was already running. Must be called from
    /// within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut inner = self.inner.lock();
        if !inner.state.can_start() {
            return false;
        }

        inner.generation += 1;
        let generation = inner.generation;
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(Self::run_timer(
            Arc::clone(&self.reconciler),
            Arc::clone(&self.inner),
            self.interval,
            generation,
            stop_rx,
        ));

        inner.state = WatcherState::Running;
        inner.stop_tx = Some(stop_tx);
        inner.task = Some(task);
        info!(interval_secs = self.interval.as_secs(), "watcher started");
        true
    }

    /// Stops the timer.
    ///
    /// Returns false if it was not running.
    pub fn stop(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != WatcherState::Running {
            return false;
        }
        if let Some(stop_tx) = inner.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        inner.state = WatcherState::Stopping;
        info!("watcher stopping");
        true
    }

    /// Runs one reconciliation now, independent of the timer.
    pub async fn force_now(&self) -> ReconcileOutcome {
        self.reconciler.reconcile().await
    }

    /// Spawns one reconciliation and returns immediately.
    pub fn trigger_now(&self) -> JoinHandle<ReconcileOutcome> {
        let reconciler = Arc::clone(&self.reconciler);
        tokio::spawn(async move { reconciler.reconcile().await })
    }

    /// Stops the timer and waits for its task to exit, letting an in-flight
    /// run complete.
    pub async fn shutdown(&self) {
        self.stop();
        let task = self.inner.lock().task.take();
        if let Some(task) = task {
            let _ = task.await;
        }
        let mut inner = self.inner.lock();
        if inner.state == WatcherState::Stopping {
            inner.state = WatcherState::Idle;
        }
    }

    async fn run_timer(
        reconciler: Arc<Reconciler<C, R, S>>,
        inner: Arc<Mutex<Inner>>,
        period: Duration,
        generation: u64,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    // A stop issued during the previous run must win over a missed tick.
                    if *stop_rx.borrow() {
                        break;
                    }
                    debug!(generation, "watcher tick");
                    reconciler.reconcile().await;
                }
            }
        }

        let mut inner = inner.lock();
        if inner.generation == generation {
            inner.state = WatcherState::Idle;
            inner.stop_tx = None;
            inner.task = None;
        }
        info!(generation, "watcher stopped");
    }
}

impl<C, R, S> Drop for Watcher<C, R, S>
where
    C: ContactsClient + 'static,
    R: ContactBoxRegistry + 'static,
    S: ContactStore + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}
