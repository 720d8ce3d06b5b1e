//! User-input event feed.
//!
//! The host forwards raw input events (pointer, keyboard, scroll, touch)
//! into an [`InputFeed`]. Idle detection only reacts to the fixed set of
//! qualifying events; everything else is ignored.
//!
//! With the `system-input` feature the feed can also be driven by the
//! operating system's global input hooks via [`spawn_system_listener`].

use std::fmt;
use tokio::sync::broadcast;

/// Buffer size of the broadcast channel. A lagging subscriber only needs to
/// know that *something* happened, so a small buffer is enough.
const FEED_CAPACITY: usize = 64;

/// Kind of a raw user-input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
    PointerMove,
    KeyDown,
    PointerDown,
    Scroll,
    TouchStart,
    /// Any other input (key release, pointer up, focus, ...). Never resets idle timers.
    Other,
}

impl InputEvent {
    /// The events that count as user activity.
    pub const QUALIFYING: [InputEvent; 5] = [
        InputEvent::PointerMove,
        InputEvent::KeyDown,
        InputEvent::PointerDown,
        InputEvent::Scroll,
        InputEvent::TouchStart,
    ];

    pub fn is_qualifying(&self) -> bool {
        !matches!(self, InputEvent::Other)
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputEvent::PointerMove => "pointermove",
            InputEvent::KeyDown => "keydown",
            InputEvent::PointerDown => "pointerdown",
            InputEvent::Scroll => "scroll",
            InputEvent::TouchStart => "touchstart",
            InputEvent::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// Shared, multiply-observed input feed.
#[derive(Debug, Clone)]
pub struct InputFeed {
    tx: broadcast::Sender<InputEvent>,
}

impl InputFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    /// Forwards an event from the host. Events without subscribers are dropped.
    pub fn emit(&self, event: InputEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InputEvent> {
        self.tx.subscribe()
    }
}

impl Default for InputFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Listens to global keyboard, mouse and wheel events and forwards them into `feed`.
///
/// The listener runs on a dedicated OS thread because the platform hook
/// blocks. It is restarted after a failure.
#[cfg(feature = "system-input")]
pub fn spawn_system_listener(feed: InputFeed) -> std::thread::JoinHandle<()> {
    use crate::libs::messages::Message;
    use crate::msg_warning;
    use rdev::{listen, Event, EventType};
    use std::time::Duration;

    std::thread::spawn(move || loop {
        let listener_feed = feed.clone();
        if let Err(e) = listen(move |event: Event| {
            let mapped = match event.event_type {
                EventType::KeyPress(_) => InputEvent::KeyDown,
                EventType::ButtonPress(_) => InputEvent::PointerDown,
                EventType::MouseMove { .. } => InputEvent::PointerMove,
                EventType::Wheel { .. } => InputEvent::Scroll,
                _ => InputEvent::Other,
            };
            listener_feed.emit(mapped);
        }) {
            msg_warning!(Message::InputListenerFailed(format!("{:?}", e)));
            std::thread::sleep(Duration::from_secs(1));
        } else {
            break;
        }
    })
}
