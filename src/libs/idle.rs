//! Idle detection combined with visibility.
//!
//! The detector is a two-state machine (`Active`, `Idle`) driven by a single
//! trailing deadline:
//!
//! - every qualifying input event moves the deadline to `now + timeout`,
//!   so a burst of events leaves exactly one pending deadline (debounce);
//! - reaching the deadline switches to `Idle` and starts a new idle episode;
//! - a qualifying event, a hidden→visible transition or [`IdleDetector::touch`]
//!   switches back to `Active`.
//!
//! The state is published as an [`IdleSnapshot`] through a watch channel.
//! Input events that do not change the state (moving the deadline while
//! already active) publish nothing.

use crate::libs::config::IdleConfig;
use crate::libs::input::{InputEvent, InputFeed};
use crate::libs::messages::Message;
use crate::libs::visibility::{VisibilityEvents, VisibilitySignal};
use crate::msg_debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// Public state of an [`IdleDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleSnapshot {
    pub idle: bool,
    pub visible: bool,
    /// Number of idle episodes so far. Incremented on every Active→Idle transition.
    pub episode: u64,
    /// Start of the current idle episode, `None` while active.
    pub idle_since: Option<Instant>,
}

/// Trailing-inactivity detector.
pub struct IdleDetector {
    timeout: Duration,
    visibility: VisibilitySignal,
    input: InputFeed,
    state: Arc<watch::Sender<IdleSnapshot>>,
    touch: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl IdleDetector {
    pub fn new(timeout: Duration, visibility: VisibilitySignal, input: InputFeed) -> Self {
        let (state, _) = watch::channel(IdleSnapshot {
            idle: false,
            visible: visibility.is_visible(),
            episode: 0,
            idle_since: None,
        });
        Self {
            timeout,
            visibility,
            input,
            state: Arc::new(state),
            touch: Arc::new(Notify::new()),
            task: None,
        }
    }

    pub fn from_config(config: &IdleConfig, visibility: VisibilitySignal, input: InputFeed) -> Self {
        Self::new(config.timeout(), visibility, input)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Attaches to the input and visibility feeds and arms the idle deadline.
    ///
    /// Must be called from within a tokio runtime. Calling it again while
    /// running is a no-op.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }

        msg_debug!(Message::IdleDetectorStarted(self.timeout));

        let runner = IdleLoop {
            timeout: self.timeout,
            state: Arc::clone(&self.state),
            episode: self.state.borrow().episode,
        };
        // Subscribe before spawning so no event sent after `start` returns is missed.
        let visibility_events = self.visibility.events();
        let visible = self.visibility.is_visible();
        let input_rx = self.input.subscribe();
        let touch = Arc::clone(&self.touch);
        self.task = Some(tokio::spawn(runner.run(visible, visibility_events, input_rx, touch)));
    }

    /// Detaches from the feeds and cancels the pending deadline.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Resets the inactivity timer as if a qualifying event had arrived.
    pub fn touch(&self) {
        self.touch.notify_one();
    }

    pub fn snapshot(&self) -> IdleSnapshot {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<IdleSnapshot> {
        self.state.subscribe()
    }
}

impl Drop for IdleDetector {
    fn drop(&mut self) {
        self.stop();
    }
}

struct IdleLoop {
    timeout: Duration,
    state: Arc<watch::Sender<IdleSnapshot>>,
    episode: u64,
}

impl IdleLoop {
    async fn run(
        mut self,
        mut visible: bool,
        mut visibility: VisibilityEvents,
        mut input_rx: broadcast::Receiver<InputEvent>,
        touch: Arc<Notify>,
    ) {
        let mut idle = false;
        let mut deadline = Instant::now() + self.timeout;
        let mut input_open = true;
        let mut visibility_open = true;

        self.publish(false, visible, None);

        loop {
            tokio::select! {
                _ = time::sleep_until(deadline), if !idle => {
                    idle = true;
                    self.episode += 1;
                    msg_debug!(Message::IdleEpisodeStarted(self.episode));
                    self.publish(true, visible, Some(deadline));
                }
                received = input_rx.recv(), if input_open => match received {
                    Ok(event) if event.is_qualifying() => {
                        deadline = self.reset(&mut idle, visible);
                    }
                    Ok(_) => {}
                    // Some events were dropped; at least one of them was input.
                    Err(RecvError::Lagged(_)) => {
                        deadline = self.reset(&mut idle, visible);
                    }
                    Err(RecvError::Closed) => input_open = false,
                },
                received = visibility.recv(), if visibility_open => {
                    let Some(now_visible) = received else {
                        visibility_open = false;
                        continue;
                    };
                    let became_visible = now_visible && !visible;
                    visible = now_visible;
                    if became_visible {
                        deadline = self.reset(&mut idle, visible);
                    } else {
                        let since = self.state.borrow().idle_since;
                        self.publish(idle, visible, since);
                    }
                }
                _ = touch.notified() => {
                    deadline = self.reset(&mut idle, visible);
                }
            }
        }
    }

    /// Switches to `Active` and returns the new deadline.
    fn reset(&self, idle: &mut bool, visible: bool) -> Instant {
        if *idle {
            msg_debug!(Message::IdleEpisodeEnded(self.episode));
        }
        *idle = false;
        self.publish(false, visible, None);
        Instant::now() + self.timeout
    }

    fn publish(&self, idle: bool, visible: bool, idle_since: Option<Instant>) {
        let episode = self.episode;
        self.state.send_if_modified(|snapshot| {
            let next = IdleSnapshot {
                idle,
                visible,
                episode,
                idle_since,
            };
            if *snapshot == next {
                return false;
            }
            *snapshot = next;
            true
        });
    }
}
