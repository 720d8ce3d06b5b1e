//! Visibility-aware polling with overlap control and update suppression.
//!
//! A [`SmartPoller`] owns a recurring fetch task. Its behaviour:
//!
//! - **Initial fetch**: exactly one fetch on start, regardless of `enabled`
//!   or visibility. Reconfiguration never repeats it.
//! - **Periodic fetch**: while `enabled && visible`, a fetch every `interval`.
//!   Entering that condition triggers an immediate fetch instead of waiting
//!   for the next period; leaving it cancels the timer.
//! - **Overlap control**: a trigger while a fetch is in flight is dropped,
//!   never queued.
//! - **Update suppression**: successful results are fingerprinted through
//!   their JSON serialization. An unchanged fingerprint leaves `data` as is
//!   and publishes no change notification.
//! - **Errors**: a failed fetch always updates `error`/`is_error` and never
//!   stops the schedule. The next successful fetch clears the error.
//! - **Teardown**: stopping the poller detaches in-flight fetches; their
//!   results are ignored. Once `stop` returns the snapshot no longer
//!   changes, even on a multi-threaded runtime where the poll loop may be
//!   running on another worker at that moment.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Visibility   │   │ PollerHandle │   │ fetch task   │
//! │ watch        │   │ controls +   │   │ (spawned per │
//! │              │   │ refetch cmds │   │  fetch)      │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!        │                  │                  │
//!        ▼                  ▼                  ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                 poll loop (one task)                 │
//! │  schedule • overlap control • fingerprint • publish  │
//! └──────────────────────────┬───────────────────────────┘
//!                            ▼
//!                 watch<PollSnapshot<T>>
//! ```

use crate::libs::config::{PollingConfig, MAX_POLL_INTERVAL, MIN_POLL_INTERVAL};
use crate::libs::error::{PacerError, PollError};
use crate::libs::messages::Message;
use crate::libs::visibility::{VisibilityEvents, VisibilitySignal};
use crate::{msg_debug, msg_warning};
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Boxed future returned by a fetch function.
pub type FetchFuture<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>>;

type FetchFn<T> = Arc<dyn Fn() -> FetchFuture<T> + Send + Sync>;

/// Consumer-visible state of a poller.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot<T> {
    /// Last accepted payload. Kept when a later fetch fails.
    pub data: Option<T>,
    /// `true` while a fetch is in flight and no payload has been accepted yet.
    pub is_loading: bool,
    pub is_error: bool,
    pub error: Option<PollError>,
}

impl<T> Default for PollSnapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            is_error: false,
            error: None,
        }
    }
}

/// Runtime-adjustable poller settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollControls {
    pub interval: Duration,
    pub enabled: bool,
}

impl PollControls {
    fn should_run(&self, visible: bool) -> bool {
        self.enabled && visible
    }
}

impl From<&PollingConfig> for PollControls {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            enabled: config.enabled,
        }
    }
}

enum PollCommand {
    Refetch(oneshot::Sender<()>),
}

/// Cloneable control surface of a [`SmartPoller`].
///
/// Handles stay valid across `stop`/`start` cycles of the poller they were
/// taken from.
#[derive(Clone)]
pub struct PollerHandle {
    controls: Arc<watch::Sender<PollControls>>,
    commands: Arc<Mutex<Option<mpsc::UnboundedSender<PollCommand>>>>,
}

impl PollerHandle {
    pub fn controls(&self) -> PollControls {
        *self.controls.borrow()
    }

    /// Enables or disables periodic polling. Re-enabling fetches immediately.
    pub fn set_enabled(&self, enabled: bool) {
        self.controls.send_if_modified(|controls| {
            let modified = controls.enabled != enabled;
            controls.enabled = enabled;
            modified
        });
    }

    /// Changes the polling period. A running schedule restarts from now.
    pub fn set_interval(&self, interval: Duration) {
        let interval = interval.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL);
        self.controls.send_if_modified(|controls| {
            let modified = controls.interval != interval;
            controls.interval = interval;
            modified
        });
    }

    /// Triggers a fetch outside the schedule and waits until it settles.
    ///
    /// If a fetch is already in flight no new one is started; the call
    /// resolves when the in-flight fetch settles.
    pub async fn refetch(&self) -> Result<(), PacerError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        {
            let commands = self.commands.lock();
            let sender = commands.as_ref().ok_or(PacerError::NotRunning("poller"))?;
            sender
                .send(PollCommand::Refetch(ack_tx))
                .map_err(|_| PacerError::NotRunning("poller"))?;
        }
        ack_rx.await.map_err(|_| PacerError::NotRunning("poller"))
    }
}

/// Recurring fetch task gated by visibility and an enable switch.
///
/// ```rust,no_run
/// use pacer::libs::config::PollingConfig;
/// use pacer::libs::polling::SmartPoller;
/// use pacer::libs::visibility::VisibilitySignal;
///
/// # async fn demo() {
/// let mut poller = SmartPoller::new(
///     || async { Ok::<_, anyhow::Error>(vec![1, 2, 3]) },
///     PollingConfig { interval: 10_000, enabled: true },
///     VisibilitySignal::new(true),
/// );
/// poller.start();
/// let mut updates = poller.subscribe();
/// updates.changed().await.ok();
/// println!("{:?}", updates.borrow().data);
/// # }
/// ```
pub struct SmartPoller<T> {
    fetch: FetchFn<T>,
    visibility: VisibilitySignal,
    handle: PollerHandle,
    state: Arc<watch::Sender<PollSnapshot<T>>>,
    /// Set when the current run is torn down.
    closed: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl<T> SmartPoller<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    pub fn new<F, Fut>(fetch: F, config: PollingConfig, visibility: VisibilitySignal) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let fetch: FetchFn<T> = Arc::new(move || Box::pin(fetch()) as FetchFuture<T>);
        let (controls, _) = watch::channel(PollControls::from(&config));
        let (state, _) = watch::channel(PollSnapshot::default());
        Self {
            fetch,
            visibility,
            handle: PollerHandle {
                controls: Arc::new(controls),
                commands: Arc::new(Mutex::new(None)),
            },
            state: Arc::new(state),
            closed: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// Performs the initial fetch and starts following visibility and controls.
    ///
    /// Must be called from within a tokio runtime. Calling it again while
    /// running is a no-op.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }

        let controls = self.handle.controls();
        msg_debug!(Message::PollerStarted {
            interval: controls.interval,
            enabled: controls.enabled,
        });

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        *self.handle.commands.lock() = Some(command_tx);
        self.closed = Arc::new(AtomicBool::new(false));

        // The initial fetch is dispatched synchronously so callers observe
        // the loading state as soon as `start` returns.
        let mut runner = PollLoop {
            fetch: Arc::clone(&self.fetch),
            state: Arc::clone(&self.state),
            closed: Arc::clone(&self.closed),
            fingerprint: None,
            in_flight: None,
            waiters: Vec::new(),
        };
        runner.begin_fetch(Trigger::Initial);

        // Subscribe before reading the current value so no change falls in between.
        let visibility_events = self.visibility.events();
        let visible = self.visibility.is_visible();
        let controls_rx = self.handle.controls.subscribe();
        self.task = Some(tokio::spawn(runner.run(visible, visibility_events, controls_rx, command_rx)));
    }

    /// Stops polling. In-flight fetches finish in the background and their
    /// results are discarded.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            msg_debug!(Message::PollerStopped);
            self.close();
            task.abort();
        }
        self.handle.commands.lock().take();
    }

    /// Marks the run closed while holding the state lock: a publish already
    /// in progress completes before this returns, later ones are dropped.
    fn close(&self) {
        self.state.send_if_modified(|_| {
            self.closed.store(true, Ordering::SeqCst);
            false
        });
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn handle(&self) -> PollerHandle {
        self.handle.clone()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.handle.set_enabled(enabled);
    }

    pub fn set_interval(&self, interval: Duration) {
        self.handle.set_interval(interval);
    }

    pub async fn refetch(&self) -> Result<(), PacerError> {
        self.handle.refetch().await
    }

    pub fn snapshot(&self) -> PollSnapshot<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot<T>> {
        self.state.subscribe()
    }
}

impl<T> Drop for SmartPoller<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            self.closed.store(true, Ordering::SeqCst);
            task.abort();
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Initial,
    Tick,
    Resume,
    Manual,
}

impl Trigger {
    fn as_str(&self) -> &'static str {
        match self {
            Trigger::Initial => "initial",
            Trigger::Tick => "tick",
            Trigger::Resume => "resume",
            Trigger::Manual => "manual",
        }
    }
}

struct PollLoop<T> {
    fetch: FetchFn<T>,
    state: Arc<watch::Sender<PollSnapshot<T>>>,
    closed: Arc<AtomicBool>,
    /// Serialized form of the last accepted payload.
    fingerprint: Option<String>,
    in_flight: Option<JoinHandle<anyhow::Result<T>>>,
    waiters: Vec<oneshot::Sender<()>>,
}

impl<T> PollLoop<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    async fn run(
        mut self,
        mut visible: bool,
        mut visibility: VisibilityEvents,
        mut controls_rx: watch::Receiver<PollControls>,
        mut command_rx: mpsc::UnboundedReceiver<PollCommand>,
    ) {
        let mut controls = *controls_rx.borrow_and_update();
        let mut ticker = controls.should_run(visible).then(|| schedule(controls.interval));

        loop {
            tokio::select! {
                _ = next_tick(&mut ticker) => self.begin_fetch(Trigger::Tick),
                result = settle(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.accept(result);
                }
                Some(now_visible) = visibility.recv() => {
                    let previous = controls.should_run(visible);
                    visible = now_visible;
                    self.reschedule(&mut ticker, previous, controls, controls.should_run(visible));
                }
                Ok(()) = controls_rx.changed() => {
                    let previous_controls = controls;
                    controls = *controls_rx.borrow_and_update();
                    let previous = previous_controls.should_run(visible);
                    let running = controls.should_run(visible);
                    if previous && running && previous_controls.interval != controls.interval {
                        ticker = Some(schedule(controls.interval));
                    } else {
                        self.reschedule(&mut ticker, previous, controls, running);
                    }
                }
                Some(command) = command_rx.recv() => match command {
                    PollCommand::Refetch(ack) => {
                        self.begin_fetch(Trigger::Manual);
                        self.waiters.push(ack);
                    }
                },
            }
        }
    }

    fn reschedule(&mut self, ticker: &mut Option<Interval>, previous: bool, controls: PollControls, running: bool) {
        match (previous, running) {
            (false, true) => {
                msg_debug!(Message::PollerResumed);
                *ticker = Some(schedule(controls.interval));
                self.begin_fetch(Trigger::Resume);
            }
            (true, false) => {
                msg_debug!(Message::PollerPaused);
                *ticker = None;
            }
            _ => {}
        }
    }

    fn begin_fetch(&mut self, trigger: Trigger) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if self.in_flight.is_some() {
            msg_debug!(Message::FetchSkippedInFlight(trigger.as_str()));
            return;
        }

        msg_debug!(Message::FetchStarted(trigger.as_str()));
        self.in_flight = Some(tokio::spawn((self.fetch)()));
        self.publish(|snapshot| {
            let loading = snapshot.data.is_none();
            let modified = snapshot.is_loading != loading;
            snapshot.is_loading = loading;
            modified
        });
    }

    fn accept(&mut self, result: anyhow::Result<T>) {
        match result {
            Ok(data) => {
                let fingerprint = fingerprint(&data);
                let unchanged = fingerprint.is_some() && fingerprint == self.fingerprint;
                if unchanged {
                    msg_debug!(Message::FetchUnchanged);
                } else {
                    self.fingerprint = fingerprint;
                }
                self.publish(|snapshot| {
                    let mut modified = false;
                    if snapshot.is_loading {
                        snapshot.is_loading = false;
                        modified = true;
                    }
                    if snapshot.is_error || snapshot.error.is_some() {
                        snapshot.is_error = false;
                        snapshot.error = None;
                        modified = true;
                    }
                    if !unchanged {
                        snapshot.data = Some(data);
                        modified = true;
                    }
                    modified
                });
            }
            Err(err) => {
                let error = PollError::from(&err);
                msg_warning!(Message::FetchFailed(error.message.clone()));
                self.publish(|snapshot| {
                    snapshot.is_loading = false;
                    snapshot.is_error = true;
                    snapshot.error = Some(error);
                    true
                });
            }
        }

        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    /// Applies `update` unless the run was closed. The check happens under
    /// the state lock, so it is ordered with [`SmartPoller::stop`].
    fn publish<F>(&self, update: F)
    where
        F: FnOnce(&mut PollSnapshot<T>) -> bool,
    {
        self.state
            .send_if_modified(|snapshot| !self.closed.load(Ordering::SeqCst) && update(snapshot));
    }
}

/// Structural fingerprint of a payload, `None` if it cannot be serialized.
///
/// Unserializable payloads are always treated as changed.
pub fn fingerprint<T: Serialize>(value: &T) -> Option<String> {
    serde_json::to_string(value).ok()
}

fn schedule(period: Duration) -> Interval {
    let period = period.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL);
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn settle<T>(in_flight: &mut Option<JoinHandle<anyhow::Result<T>>>) -> anyhow::Result<T> {
    match in_flight {
        Some(handle) => match handle.await {
            Ok(result) => result,
            Err(join_error) => Err(anyhow::anyhow!("fetch task failed: {}", join_error)),
        },
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structurally_equal_payloads_share_a_fingerprint() {
        assert_eq!(fingerprint(&json!({"count": 1})), fingerprint(&json!({"count": 1})));
        assert_ne!(fingerprint(&json!({"count": 1})), fingerprint(&json!({"count": 2})));
    }

    #[test]
    fn controls_require_enabled_and_visible() {
        let controls = PollControls {
            interval: Duration::from_secs(1),
            enabled: true,
        };
        assert!(controls.should_run(true));
        assert!(!controls.should_run(false));
        assert!(!PollControls { enabled: false, ..controls }.should_run(true));
    }

    #[test]
    fn zero_interval_is_raised_to_minimum() {
        let config = PollingConfig { interval: 0, enabled: true };
        assert_eq!(PollControls::from(&config).interval, MIN_POLL_INTERVAL);
    }
}
