//! Screen wake lock management.
//!
//! The platform side is injected as a [`WakeLockProvider`] that hands out
//! [`WakeLockSentinel`]s. Platforms may release a lock on their own (most do
//! when the surface goes to the background); with `auto_reacquire` on, a lock
//! the caller still wants is requested again once the surface is visible.

use crate::libs::config::WakeLockConfig;
use crate::libs::messages::Message;
use crate::libs::visibility::VisibilitySignal;
use crate::{msg_debug, msg_info, msg_warning};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Platform wake-lock API.
#[async_trait]
pub trait WakeLockProvider: Send + Sync {
    fn is_supported(&self) -> bool;
    /// Acquires a screen wake lock.
    async fn acquire(&self) -> anyhow::Result<Arc<dyn WakeLockSentinel>>;
}

/// A held wake lock.
#[async_trait]
pub trait WakeLockSentinel: Send + Sync {
    /// `true` once the lock has been released, by the caller or the platform.
    fn is_released(&self) -> bool;
    async fn release(&self) -> anyhow::Result<()>;
}

/// Provider for hosts without a wake-lock API.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedWakeLock;

#[async_trait]
impl WakeLockProvider for UnsupportedWakeLock {
    fn is_supported(&self) -> bool {
        false
    }

    async fn acquire(&self) -> anyhow::Result<Arc<dyn WakeLockSentinel>> {
        anyhow::bail!("wake lock is not supported on this host")
    }
}

struct Shared {
    provider: Arc<dyn WakeLockProvider>,
    sentinel: Mutex<Option<Arc<dyn WakeLockSentinel>>>,
    /// Whether the caller wants a lock held.
    wanted: AtomicBool,
    /// Serializes acquire/release so concurrent requests cannot stack locks.
    gate: tokio::sync::Mutex<()>,
}

impl Shared {
    fn live_sentinel(&self) -> Option<Arc<dyn WakeLockSentinel>> {
        self.sentinel.lock().as_ref().filter(|sentinel| !sentinel.is_released()).cloned()
    }

    async fn request(&self) {
        if !self.provider.is_supported() {
            return;
        }
        let _gate = self.gate.lock().await;
        if self.live_sentinel().is_some() {
            return;
        }

        match self.provider.acquire().await {
            Ok(sentinel) => {
                *self.sentinel.lock() = Some(sentinel);
                self.wanted.store(true, Ordering::SeqCst);
                msg_info!(Message::WakeLockAcquired);
            }
            Err(err) => msg_warning!(Message::WakeLockFailed(err.to_string())),
        }
    }

    async fn release(&self) {
        self.wanted.store(false, Ordering::SeqCst);
        let _gate = self.gate.lock().await;
        let Some(sentinel) = self.sentinel.lock().take() else {
            return;
        };
        if sentinel.is_released() {
            return;
        }
        match sentinel.release().await {
            Ok(()) => msg_info!(Message::WakeLockReleased),
            Err(err) => msg_warning!(Message::WakeLockFailed(err.to_string())),
        }
    }
}

pub struct WakeLock {
    config: WakeLockConfig,
    visibility: VisibilitySignal,
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl WakeLock {
    pub fn new(config: WakeLockConfig, provider: Arc<dyn WakeLockProvider>, visibility: VisibilitySignal) -> Self {
        Self {
            config,
            visibility,
            shared: Arc::new(Shared {
                provider,
                sentinel: Mutex::new(None),
                wanted: AtomicBool::new(false),
                gate: tokio::sync::Mutex::new(()),
            }),
            task: None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.shared.provider.is_supported()
    }

    /// `true` while a lock is held and not released by the platform.
    pub fn is_active(&self) -> bool {
        self.shared.live_sentinel().is_some()
    }

    /// Requests a lock. A no-op when unsupported or already holding one.
    /// Provider failures are logged and swallowed.
    pub async fn request(&self) {
        self.shared.request().await;
    }

    /// Releases the lock and stops wanting one.
    pub async fn release(&self) {
        self.shared.release().await;
    }

    /// Starts watching visibility for re-acquisition.
    ///
    /// Must be called from within a tokio runtime. Without `auto_reacquire`
    /// there is nothing to watch and no task is spawned.
    pub fn start(&mut self) {
        if self.task.is_some() || !self.config.auto_reacquire {
            return;
        }
        let mut events = self.visibility.events();
        let shared = Arc::clone(&self.shared);
        self.task = Some(tokio::spawn(async move {
            while let Some(visible) = events.recv().await {
                if visible && shared.wanted.load(Ordering::SeqCst) && shared.live_sentinel().is_none() {
                    msg_debug!(Message::WakeLockReacquiring);
                    shared.request().await;
                }
            }
        }));
    }

    /// Stops re-acquisition and releases a held lock in the background.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let Some(sentinel) = self.shared.sentinel.lock().take() else {
            return;
        };
        if sentinel.is_released() {
            return;
        }
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                if let Err(err) = sentinel.release().await {
                    msg_warning!(Message::WakeLockFailed(err.to_string()));
                }
            });
        }
    }
}

impl Drop for WakeLock {
    fn drop(&mut self) {
        self.stop();
    }
}
