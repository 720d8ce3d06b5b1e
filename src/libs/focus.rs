//! Edge-triggered foreground/background callbacks.
//!
//! [`PageFocusEffect`] turns the raw visibility feed into two edge callbacks:
//! `on_visible` for hidden→visible and `on_hidden` for visible→hidden.
//! Nothing fires on start or for repeated notifications with the same value.
//!
//! `on_visible` may hand back a cleanup closure. The pending cleanup runs
//! right before the next `on_visible` and when the effect stops.

use crate::libs::messages::Message;
use crate::libs::visibility::{VisibilityEvents, VisibilitySignal};
use crate::msg_debug;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Cleanup returned from an `on_visible` callback.
pub type Cleanup = Box<dyn FnOnce() + Send>;

type VisibleCallback = Box<dyn FnMut() -> Option<Cleanup> + Send>;
type HiddenCallback = Box<dyn FnMut() + Send>;

#[derive(Default)]
struct FocusCallbacks {
    on_visible: Option<VisibleCallback>,
    on_hidden: Option<HiddenCallback>,
    pending_cleanup: Option<Cleanup>,
}

impl FocusCallbacks {
    fn visible(&mut self) {
        if let Some(cleanup) = self.pending_cleanup.take() {
            cleanup();
        }
        if let Some(callback) = self.on_visible.as_mut() {
            self.pending_cleanup = callback();
        }
    }

    fn hidden(&mut self) {
        if let Some(callback) = self.on_hidden.as_mut() {
            callback();
        }
    }
}

pub struct PageFocusEffect {
    visibility: VisibilitySignal,
    callbacks: Arc<Mutex<FocusCallbacks>>,
    task: Option<JoinHandle<()>>,
}

impl PageFocusEffect {
    pub fn new(visibility: VisibilitySignal) -> Self {
        Self {
            visibility,
            callbacks: Arc::new(Mutex::new(FocusCallbacks::default())),
            task: None,
        }
    }

    pub fn on_visible<F>(self, callback: F) -> Self
    where
        F: FnMut() -> Option<Cleanup> + Send + 'static,
    {
        self.callbacks.lock().on_visible = Some(Box::new(callback));
        self
    }

    pub fn on_hidden<F>(self, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.callbacks.lock().on_hidden = Some(Box::new(callback));
        self
    }

    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let events = self.visibility.events();
        let visible = self.visibility.is_visible();
        let callbacks = Arc::clone(&self.callbacks);
        self.task = Some(tokio::spawn(follow_edges(visible, events, callbacks)));
    }

    /// Detaches from the visibility feed and runs the pending cleanup, if any.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let cleanup = self.callbacks.lock().pending_cleanup.take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for PageFocusEffect {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn follow_edges(mut visible: bool, mut events: VisibilityEvents, callbacks: Arc<Mutex<FocusCallbacks>>) {
    while let Some(now_visible) = events.recv().await {
        if now_visible == visible {
            continue;
        }
        visible = now_visible;
        msg_debug!(Message::FocusEdge(visible));
        let mut guard = callbacks.lock();
        if visible {
            guard.visible();
        } else {
            guard.hidden();
        }
    }
}
