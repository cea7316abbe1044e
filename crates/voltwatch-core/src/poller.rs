// ── Realtime poller ──
//
// Periodically fetches the latest reading, keeps a bounded history and
// publishes the result through a `watch` channel. Ticks never fail: every
// outcome, including errors, is folded into `PollerState`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::buffer::HistoryBuffer;
use crate::cost::estimate_instantaneous_cost;
use crate::error::{CoreError, ErrorKind};
use crate::model::{EnergySample, normalize_sample};
use crate::session::Session;

// ── ConnectionState ──────────────────────────────────────────────

/// Derived from the most recent tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    #[default]
    Disconnected,
}

/// Snapshot published after every applied tick.
#[derive(Debug, Clone, Serialize)]
pub struct PollerState {
    /// Last good sample. Kept across failed ticks.
    pub current: Option<EnergySample>,
    pub connection: ConnectionState,
    pub history: HistoryBuffer,
    pub last_error: Option<String>,
    pub last_error_kind: Option<ErrorKind>,
    pub ticks: u64,
    pub failures: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PollerState {
    fn new(capacity: usize) -> Self {
        Self {
            current: None,
            connection: ConnectionState::Disconnected,
            history: HistoryBuffer::new(capacity),
            last_error: None,
            last_error_kind: None,
            ticks: 0,
            failures: 0,
            updated_at: None,
        }
    }
}

/// What a single `tick()` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// New sample applied.
    Updated,
    /// Failure applied to state.
    Failed(ErrorKind),
    /// Another tick was still in flight.
    Skipped,
    /// Resolved after `stop()` (or a restart); state untouched.
    Discarded,
    /// Poller is stopped; nothing was fetched.
    Stopped,
}

// ── Lifecycle ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug)]
struct Lifecycle {
    /// Bumped by `stop()`; ticks started under an older epoch are discarded.
    epoch: u64,
    phase: Phase,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

// ── RealtimePoller ───────────────────────────────────────────────

/// Cheaply cloneable; clones drive the same poller.
#[derive(Clone, Debug)]
pub struct RealtimePoller {
    inner: Arc<PollerInner>,
}

#[derive(Debug)]
struct PollerInner {
    session: Session,
    interval: Duration,
    state: watch::Sender<PollerState>,
    lifecycle: Mutex<Lifecycle>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag on every exit path.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RealtimePoller {
    pub fn new(session: Session) -> Self {
        let config = session.config();
        let interval = config.poll_interval;
        let (state, _) = watch::channel(PollerState::new(config.history_capacity));
        let cancel = session.cancel_token().child_token();
        Self {
            inner: Arc::new(PollerInner {
                session,
                interval,
                state,
                lifecycle: Mutex::new(Lifecycle {
                    epoch: 0,
                    phase: Phase::Idle,
                    cancel,
                    task: None,
                }),
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> PollerState {
        self.inner.state.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle().phase == Phase::Running
    }

    /// Cost of the current sample's energy at the rate in effect now.
    pub fn estimated_cost(&self) -> Option<f64> {
        let state = self.inner.state.borrow();
        state
            .current
            .as_ref()
            .map(|s| estimate_instantaneous_cost(s.energy, &Local::now(), self.inner.session.tariff()))
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Fetch, normalize and apply one reading.
    pub async fn tick(&self) -> TickOutcome {
        let (epoch, cancel) = {
            let lc = self.lifecycle();
            if lc.phase == Phase::Stopped {
                return TickOutcome::Stopped;
            }
            (lc.epoch, lc.cancel.clone())
        };

        if self.inner.in_flight.swap(true, Ordering::AcqRel) {
            debug!("tick already in flight, skipping");
            return TickOutcome::Skipped;
        }
        let _in_flight = InFlight(&self.inner.in_flight);

        let result = self.fetch(&cancel).await;
        self.apply(epoch, result)
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<EnergySample, CoreError> {
        let session = &self.inner.session;
        let raw = session.latest_reading(cancel).await?;
        normalize_sample(&raw, session.device_id(), Utc::now().fixed_offset())
    }

    /// Apply under the lifecycle lock so `stop()` either sees the update
    /// or the update sees the bumped epoch.
    fn apply(&self, epoch: u64, result: Result<EnergySample, CoreError>) -> TickOutcome {
        let lc = self.lifecycle();
        if lc.epoch != epoch || lc.phase == Phase::Stopped {
            debug!("discarding tick resolved after stop");
            return TickOutcome::Discarded;
        }

        match result {
            Ok(sample) => {
                trace!(power = sample.power, "sample received");
                self.inner.state.send_modify(|s| {
                    s.history.push(sample.clone());
                    s.current = Some(sample);
                    s.connection = ConnectionState::Connected;
                    s.last_error = None;
                    s.last_error_kind = None;
                    s.ticks += 1;
                    s.updated_at = Some(Utc::now());
                });
                TickOutcome::Updated
            }
            Err(CoreError::Cancelled) => TickOutcome::Discarded,
            Err(e) => {
                let kind = e.kind();
                warn!(kind = %kind, error = %e, "poll failed");
                self.inner.state.send_modify(|s| {
                    s.connection = ConnectionState::Disconnected;
                    s.last_error = Some(e.to_string());
                    s.last_error_kind = Some(kind);
                    s.ticks += 1;
                    s.failures += 1;
                    s.updated_at = Some(Utc::now());
                });
                TickOutcome::Failed(kind)
            }
        }
    }

    /// Tick now, then every interval. No-op while already running.
    pub fn start(&self) {
        let mut lc = self.lifecycle();
        if lc.phase == Phase::Running {
            return;
        }
        if lc.cancel.is_cancelled() {
            lc.cancel = self.inner.session.cancel_token().child_token();
        }
        lc.phase = Phase::Running;

        let poller = self.clone();
        let cancel = lc.cancel.clone();
        lc.task = Some(tokio::spawn(poll_task(poller, self.inner.interval, cancel)));
        info!(interval = ?self.inner.interval, "realtime polling started");
    }

    /// Cancel the timer and any in-flight request, then wait for the task.
    /// State is frozen from here until the next `start()`.
    pub async fn stop(&self) {
        let task = {
            let mut lc = self.lifecycle();
            lc.epoch += 1;
            lc.phase = Phase::Stopped;
            lc.cancel.cancel();
            lc.task.take()
        };
        if let Some(handle) = task {
            if let Err(e) = handle.await {
                warn!(error = %e, "poll task ended abnormally");
            }
        }
        info!("realtime polling stopped");
    }
}

async fn poll_task(poller: RealtimePoller, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let outcome = poller.tick().await;
                trace!(?outcome, "poll tick");
                if outcome == TickOutcome::Stopped {
                    break;
                }
            }
        }
    }
    debug!("poll task exiting");
}
