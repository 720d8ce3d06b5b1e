//! Inactivity timeout with a warning countdown.
//!
//! Built on top of an [`IdleDetector`] whose timeout is the silent part of
//! the countdown (`timeout - warning_before`). When the detector reports a
//! new idle episode the engine:
//!
//! 1. fires `on_warning` once and enters the warning phase;
//! 2. recomputes `remaining_seconds` from the clock on a fixed 1 s tick
//!    (`ceil((warning_before - elapsed) / 1000)`, never below zero), so the
//!    value stays correct even if ticks are delayed;
//! 3. when the countdown reaches zero fires `on_timeout` once, sets the
//!    terminal flag and stops ticking.
//!
//! Activity resuming clears everything without a callback. A manual
//! [`InactivityTimeout::reset_timer`] clears the state and restarts the
//! idle timer, which is how a caller extends a session.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pacer::libs::config::InactivityConfig;
//! use pacer::libs::inactivity::InactivityTimeout;
//! use pacer::libs::input::InputFeed;
//! use pacer::libs::visibility::VisibilitySignal;
//!
//! # async fn demo() {
//! let config = InactivityConfig { timeout: 900_000, warning_before: 60_000 };
//! let mut session = InactivityTimeout::new(config, VisibilitySignal::new(true), InputFeed::new())
//!     .on_warning(|| println!("are you still there?"))
//!     .on_timeout(|| println!("signed out"));
//! session.start();
//! # }
//! ```

use crate::libs::config::InactivityConfig;
use crate::libs::idle::{IdleDetector, IdleSnapshot};
use crate::libs::input::InputFeed;
use crate::libs::messages::Message;
use crate::libs::visibility::VisibilitySignal;
use crate::{msg_debug, msg_info};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(1);

/// Value of `remaining_seconds` outside the warning and timed-out phases.
pub const NOT_COUNTING: i64 = -1;

/// Public state of an [`InactivityTimeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InactivitySnapshot {
    /// `true` once the user has been idle long enough to start counting down.
    pub idle: bool,
    pub visible: bool,
    /// `true` during the countdown, before the final timeout.
    pub is_warning: bool,
    /// `true` after the full timeout has elapsed.
    pub is_timed_out: bool,
    /// Seconds left until timeout, or [`NOT_COUNTING`].
    pub remaining_seconds: i64,
}

impl InactivitySnapshot {
    fn fresh(visible: bool) -> Self {
        Self {
            idle: false,
            visible,
            is_warning: false,
            is_timed_out: false,
            remaining_seconds: NOT_COUNTING,
        }
    }
}

type Callback = Box<dyn FnMut() + Send>;

#[derive(Default)]
struct Callbacks {
    on_warning: Option<Callback>,
    on_timeout: Option<Callback>,
}

/// Two-phase inactivity countdown.
pub struct InactivityTimeout {
    config: InactivityConfig,
    detector: IdleDetector,
    state: Arc<watch::Sender<InactivitySnapshot>>,
    callbacks: Arc<Mutex<Callbacks>>,
    reset: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl InactivityTimeout {
    pub fn new(config: InactivityConfig, visibility: VisibilitySignal, input: InputFeed) -> Self {
        let (state, _) = watch::channel(InactivitySnapshot::fresh(visibility.is_visible()));
        let detector = IdleDetector::new(config.idle_threshold(), visibility, input);
        Self {
            config,
            detector,
            state: Arc::new(state),
            callbacks: Arc::new(Mutex::new(Callbacks::default())),
            reset: Arc::new(Notify::new()),
            task: None,
        }
    }

    /// Called once per idle episode when the warning phase begins.
    pub fn on_warning<F>(self, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.callbacks.lock().on_warning = Some(Box::new(callback));
        self
    }

    /// Called once per idle episode when the full timeout elapses.
    pub fn on_timeout<F>(self, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.callbacks.lock().on_timeout = Some(Box::new(callback));
        self
    }

    pub fn config(&self) -> &InactivityConfig {
        &self.config
    }

    /// Starts the idle detector and the countdown engine.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }

        msg_debug!(Message::InactivityStarted {
            timeout: self.config.timeout,
            warning_before: self.config.warning_before.min(self.config.timeout),
        });

        let idle_rx = self.detector.subscribe();
        self.detector.start();

        let engine = CountdownEngine {
            warning_window: self.config.warning_window(),
            state: Arc::clone(&self.state),
            callbacks: Arc::clone(&self.callbacks),
            episode: idle_rx.borrow().episode,
            countdown: None,
            timed_out: false,
        };
        self.task = Some(tokio::spawn(engine.run(idle_rx, Arc::clone(&self.reset))));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.detector.stop();
    }

    /// Clears the warning and timed-out state and restarts the idle timer.
    ///
    /// The cleared state is visible immediately; the next idle episode starts
    /// a full `timeout` later.
    pub fn reset_timer(&self) {
        msg_debug!(Message::InactivityReset);
        let visible = self.detector.snapshot().visible;
        self.state.send_if_modified(|snapshot| {
            let fresh = InactivitySnapshot::fresh(visible);
            let modified = *snapshot != fresh;
            *snapshot = fresh;
            modified
        });
        self.reset.notify_one();
        self.detector.touch();
    }

    pub fn snapshot(&self) -> InactivitySnapshot {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<InactivitySnapshot> {
        self.state.subscribe()
    }
}

impl Drop for InactivityTimeout {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Clone, Copy)]
enum Phase {
    Warning,
    TimedOut,
}

struct Countdown {
    started: Instant,
    ticker: Interval,
}

struct CountdownEngine {
    warning_window: Duration,
    state: Arc<watch::Sender<InactivitySnapshot>>,
    callbacks: Arc<Mutex<Callbacks>>,
    /// Idle episode the engine has already armed for.
    episode: u64,
    countdown: Option<Countdown>,
    timed_out: bool,
}

impl CountdownEngine {
    async fn run(mut self, mut idle_rx: watch::Receiver<IdleSnapshot>, reset: Arc<Notify>) {
        let initial = *idle_rx.borrow_and_update();
        self.apply(initial);

        loop {
            tokio::select! {
                changed = idle_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = *idle_rx.borrow_and_update();
                    self.apply(snapshot);
                }
                _ = next_tick(&mut self.countdown) => self.tick(),
                _ = reset.notified() => {
                    // The detector has been touched; the current episode must not re-arm.
                    self.countdown = None;
                    self.timed_out = false;
                }
            }
        }
    }

    fn apply(&mut self, upstream: IdleSnapshot) {
        if !upstream.idle {
            self.countdown = None;
            self.timed_out = false;
            self.publish(|s| *s = InactivitySnapshot::fresh(upstream.visible));
            return;
        }

        if upstream.episode != self.episode {
            self.episode = upstream.episode;
            self.timed_out = false;
            let started = upstream.idle_since.unwrap_or_else(Instant::now);
            self.begin_warning(started, upstream.visible);
        } else {
            self.publish(|s| s.visible = upstream.visible);
        }
    }

    fn begin_warning(&mut self, started: Instant, visible: bool) {
        let remaining = self.remaining_seconds(started);
        let expired = remaining == 0;

        if expired {
            self.timed_out = true;
            self.countdown = None;
        } else {
            let mut ticker = time::interval_at(started + TICK, TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            self.countdown = Some(Countdown { started, ticker });
        }

        msg_info!(Message::WarningPhaseEntered(remaining));
        self.publish(|s| {
            *s = InactivitySnapshot {
                idle: true,
                visible,
                is_warning: !expired,
                is_timed_out: expired,
                remaining_seconds: remaining,
            }
        });

        self.fire(Phase::Warning);
        if expired {
            msg_info!(Message::SessionTimedOut);
            self.fire(Phase::TimedOut);
        }
    }

    fn tick(&mut self) {
        let Some(countdown) = self.countdown.as_ref() else {
            return;
        };
        let remaining = self.remaining_seconds(countdown.started);
        if remaining > 0 {
            self.publish(|s| s.remaining_seconds = remaining);
            return;
        }
        if self.timed_out {
            return;
        }

        self.timed_out = true;
        self.countdown = None;
        msg_info!(Message::SessionTimedOut);
        self.publish(|s| {
            s.idle = true;
            s.is_warning = false;
            s.is_timed_out = true;
            s.remaining_seconds = 0;
        });
        self.fire(Phase::TimedOut);
    }

    fn fire(&self, phase: Phase) {
        let mut callbacks = self.callbacks.lock();
        let callback = match phase {
            Phase::Warning => callbacks.on_warning.as_mut(),
            Phase::TimedOut => callbacks.on_timeout.as_mut(),
        };
        if let Some(callback) = callback {
            callback();
        }
    }

    fn remaining_seconds(&self, started: Instant) -> i64 {
        remaining_seconds(self.warning_window, started.elapsed())
    }

    fn publish(&self, update: impl FnOnce(&mut InactivitySnapshot)) {
        self.state.send_if_modified(|snapshot| {
            let before = *snapshot;
            update(snapshot);
            *snapshot != before
        });
    }
}

/// Whole seconds left in a warning window after `elapsed`, rounded up.
pub fn remaining_seconds(window: Duration, elapsed: Duration) -> i64 {
    let left = window.saturating_sub(elapsed).as_millis();
    i64::try_from(left.div_ceil(1000)).unwrap_or(i64::MAX)
}

async fn next_tick(countdown: &mut Option<Countdown>) {
    match countdown {
        Some(countdown) => {
            countdown.ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
