//! Foreground/background state of the host surface.
//!
//! `VisibilitySignal` is the leaf every other component reads. The host owns
//! the platform hook (a document visibility event, a window focus callback,
//! a compositor notification) and forwards each raw change through
//! [`VisibilitySignal::set_visible`]. Components subscribe to the shared
//! channel and never talk to the platform themselves.
//!
//! ## Raw notifications
//!
//! Every call to `set_visible` is delivered to [`VisibilitySignal::events`]
//! receivers as its own event, even when the value did not change and even
//! when a hidden→visible pair arrives before the receiver gets to run.
//! Consumers that need edge-only semantics (the idle detector, the focus
//! effect) keep the previous value and compare.
//!
//! [`VisibilitySignal::subscribe`] only tracks the current value: changes
//! made back to back may reach it as a single notification.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pacer::libs::visibility::VisibilitySignal;
//!
//! # async fn demo() {
//! let signal = VisibilitySignal::new(true);
//! let subscription = signal.on_change(|visible| println!("visible: {}", visible));
//!
//! signal.set_visible(false);
//! subscription.unsubscribe();
//! # }
//! ```

use crate::libs::messages::Message;
use crate::msg_debug;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Raw events buffered per receiver before it starts lagging.
const EVENT_CAPACITY: usize = 64;

/// Shared handle over the host's visibility state.
///
/// Clones observe and mutate the same underlying state.
#[derive(Debug, Clone)]
pub struct VisibilitySignal {
    tx: Arc<watch::Sender<bool>>,
    events: broadcast::Sender<bool>,
    supported: bool,
}

impl VisibilitySignal {
    /// Creates a signal backed by a real platform feed with the given initial value.
    pub fn new(visible: bool) -> Self {
        Self::with_support(visible, true)
    }

    /// Creates a signal for hosts without a visibility feed.
    ///
    /// The surface is assumed to be in the foreground so that nothing
    /// downstream gets throttled by a missing capability.
    pub fn unsupported() -> Self {
        Self::with_support(true, false)
    }

    fn with_support(visible: bool, supported: bool) -> Self {
        let (tx, _) = watch::channel(visible);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tx: Arc::new(tx),
            events,
            supported,
        }
    }

    /// Whether the host supplies a real visibility feed.
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Current visibility.
    pub fn is_visible(&self) -> bool {
        *self.tx.borrow()
    }

    /// Forwards a raw change event from the host.
    ///
    /// Subscribers are notified even if `visible` equals the current value.
    pub fn set_visible(&self, visible: bool) {
        msg_debug!(Message::VisibilityChanged(visible));
        self.tx.send_replace(visible);
        // No receivers is not an error.
        let _ = self.events.send(visible);
    }

    /// Returns a receiver tracking the current value.
    ///
    /// Back-to-back changes may be merged into one notification. Use
    /// [`VisibilitySignal::events`] to observe each of them. Dropping the
    /// receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Returns a receiver that yields every raw change event in order.
    ///
    /// Only events sent after this call are delivered.
    pub fn events(&self) -> VisibilityEvents {
        VisibilityEvents {
            rx: self.events.subscribe(),
            current: self.tx.subscribe(),
        }
    }

    /// Invokes `callback` with the new value on every raw change event.
    ///
    /// Must be called from within a tokio runtime. The callback runs until the
    /// returned [`Subscription`] is dropped or unsubscribed.
    pub fn on_change<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(bool) + Send + 'static,
    {
        let mut events = self.events();
        let handle = tokio::spawn(async move {
            while let Some(visible) = events.recv().await {
                callback(visible);
            }
        });
        Subscription { handle: Some(handle) }
    }
}

/// Ordered feed of raw visibility events.
#[derive(Debug)]
pub struct VisibilityEvents {
    rx: broadcast::Receiver<bool>,
    current: watch::Receiver<bool>,
}

impl VisibilityEvents {
    /// Waits for the next raw event. Returns `None` once every
    /// [`VisibilitySignal`] clone is gone.
    ///
    /// A receiver that fell more than a buffer's worth behind gets the
    /// current value in place of the events it missed.
    pub async fn recv(&mut self) -> Option<bool> {
        match self.rx.recv().await {
            Ok(visible) => Some(visible),
            Err(RecvError::Lagged(skipped)) => {
                msg_debug!(Message::VisibilityEventsLagged(skipped));
                Some(*self.current.borrow())
            }
            Err(RecvError::Closed) => None,
        }
    }
}

impl Default for VisibilitySignal {
    fn default() -> Self {
        Self::unsupported()
    }
}

/// Callback registration returned by [`VisibilitySignal::on_change`].
#[derive(Debug)]
pub struct Subscription {
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Detaches the callback. Equivalent to dropping the subscription.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}
