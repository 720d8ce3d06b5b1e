//! Pauses media playback while the surface is in the background.

use crate::libs::messages::Message;
use crate::libs::visibility::VisibilitySignal;
use crate::msg_debug;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Player controlled by [`AutoPause`].
#[async_trait]
pub trait MediaPlayback: Send + Sync {
    async fn pause(&self) -> anyhow::Result<()>;
    async fn play(&self) -> anyhow::Result<()>;
}

pub struct AutoPause {
    visibility: VisibilitySignal,
    media: Arc<dyn MediaPlayback>,
    task: Option<JoinHandle<()>>,
}

impl AutoPause {
    pub fn new(media: Arc<dyn MediaPlayback>, visibility: VisibilitySignal) -> Self {
        Self {
            visibility,
            media,
            task: None,
        }
    }

    /// Applies the current visibility once, then follows every change.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let mut events = self.visibility.events();
        let visible = self.visibility.is_visible();
        let media = Arc::clone(&self.media);
        self.task = Some(tokio::spawn(async move {
            apply(media.as_ref(), visible).await;
            while let Some(visible) = events.recv().await {
                apply(media.as_ref(), visible).await;
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for AutoPause {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn apply(media: &dyn MediaPlayback, visible: bool) {
    let result = if visible { media.play().await } else { media.pause().await };
    // Autoplay restrictions and similar refusals are expected; keep going.
    if let Err(err) = result {
        msg_debug!(Message::PlaybackRefused(err.to_string()));
    }
}
