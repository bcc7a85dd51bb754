use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Scheduling abstraction for the one-second question timer.
///
/// Every tick carries the epoch of the timer that produced it. The epoch
/// changes on `start`, `pause`, `resume` and `cancel`, so a tick queued
/// before any of those no longer matches [`Ticker::epoch`].
pub trait Ticker: Send + Sync {
    /// Start a fresh timer, cancelling any timer already running.
    fn start(&mut self);
    /// Stop ticking but remember that a timer is in progress.
    fn pause(&mut self);
    /// Restart ticking after `pause`. No-op if not paused.
    fn resume(&mut self);
    /// Stop the timer for good.
    fn cancel(&mut self);
    /// True while ticks are being delivered.
    fn is_running(&self) -> bool;
    /// Epoch of the current timer.
    fn epoch(&self) -> u64;
}

//
// ─── TOKIO TICKER ──────────────────────────────────────────────────────────────
//

/// Ticker backed by a spawned `tokio::time::interval` task.
///
/// Ticks arrive on the receiver returned by [`TokioTicker::new`], tagged with
/// the epoch of the timer that sent them. Cancelling aborts the task, so no
/// further ticks are produced. `start` and `resume` must be called from
/// within a Tokio runtime.
pub struct TokioTicker {
    period: Duration,
    sender: mpsc::UnboundedSender<u64>,
    task: Option<JoinHandle<()>>,
    paused: bool,
    epoch: u64,
}

impl TokioTicker {
    #[must_use]
    pub fn new(period: Duration) -> (Self, mpsc::UnboundedReceiver<u64>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let ticker = Self {
            period,
            sender,
            task: None,
            paused: false,
            epoch: 0,
        };
        (ticker, receiver)
    }

    #[must_use]
    pub fn every_second() -> (Self, mpsc::UnboundedReceiver<u64>) {
        Self::new(Duration::from_secs(1))
    }

    fn spawn(&mut self) {
        let period = self.period;
        let epoch = self.epoch;
        let sender = self.sender.clone();
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if sender.send(epoch).is_err() {
                    break;
                }
            }
        }));
    }

    fn abort(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Ticker for TokioTicker {
    fn start(&mut self) {
        self.abort();
        self.paused = false;
        self.spawn();
    }

    fn pause(&mut self) {
        if self.task.is_some() {
            self.abort();
            self.paused = true;
        }
    }

    fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.epoch = self.epoch.wrapping_add(1);
            self.spawn();
        }
    }

    fn cancel(&mut self) {
        self.abort();
        self.paused = false;
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl Drop for TokioTicker {
    fn drop(&mut self) {
        self.abort();
    }
}

//
// ─── MANUAL TICKER ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Default)]
struct ManualState {
    running: AtomicBool,
    paused: AtomicBool,
    starts: AtomicU32,
    cancels: AtomicU32,
    epoch: AtomicU64,
}

/// Ticker without a clock, for tests and hosts that drive ticks themselves.
/// Feed [`Ticker::epoch`] to `GameSession::tick` to simulate a live tick.
///
/// Clones share state, so a test can keep one handle for inspection while the
/// session owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualTicker {
    state: Arc<ManualState>,
}

impl ManualTicker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.paused.load(Ordering::SeqCst)
    }

    /// Number of times `start` was called.
    #[must_use]
    pub fn starts(&self) -> u32 {
        self.state.starts.load(Ordering::SeqCst)
    }

    /// Number of times `cancel` was called.
    #[must_use]
    pub fn cancels(&self) -> u32 {
        self.state.cancels.load(Ordering::SeqCst)
    }
}

impl Ticker for ManualTicker {
    fn start(&mut self) {
        self.state.starts.fetch_add(1, Ordering::SeqCst);
        self.state.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.paused.store(false, Ordering::SeqCst);
        self.state.running.store(true, Ordering::SeqCst);
    }

    fn pause(&mut self) {
        if self.state.running.swap(false, Ordering::SeqCst) {
            self.state.epoch.fetch_add(1, Ordering::SeqCst);
            self.state.paused.store(true, Ordering::SeqCst);
        }
    }

    fn resume(&mut self) {
        if self.state.paused.swap(false, Ordering::SeqCst) {
            self.state.epoch.fetch_add(1, Ordering::SeqCst);
            self.state.running.store(true, Ordering::SeqCst);
        }
    }

    fn cancel(&mut self) {
        self.state.cancels.fetch_add(1, Ordering::SeqCst);
        self.state.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.running.store(false, Ordering::SeqCst);
        self.state.paused.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    fn epoch(&self) -> u64 {
        self.state.epoch.load(Ordering::SeqCst)
    }
}
