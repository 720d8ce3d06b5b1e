//! Battery status, for consumers that want to back off on low power.

use crate::libs::config::BatteryConfig;
use crate::libs::messages::Message;
use crate::{msg_debug, msg_info};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Raw reading forwarded by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryReading {
    pub charging: bool,
    /// Charge level in `0.0..=1.0`.
    pub level: f64,
}

/// Shared handle over the host's battery feed.
///
/// Holds `None` until the host delivers its first reading, and forever on
/// hosts without a battery API.
#[derive(Debug, Clone)]
pub struct BatterySignal {
    tx: Arc<watch::Sender<Option<BatteryReading>>>,
}

impl BatterySignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn reading(&self) -> Option<BatteryReading> {
        *self.tx.borrow()
    }

    pub fn update(&self, reading: BatteryReading) {
        self.tx.send_replace(Some(reading));
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<BatteryReading>> {
        self.tx.subscribe()
    }
}

impl Default for BatterySignal {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryState {
    pub charging: bool,
    pub level: f64,
    pub is_low_battery: bool,
    pub is_supported: bool,
}

impl BatteryState {
    /// Derives the public state, falling back to optimistic defaults when
    /// there is no reading.
    pub fn from_reading(reading: Option<BatteryReading>, low_threshold: f64) -> Self {
        match reading {
            Some(reading) => Self {
                charging: reading.charging,
                level: reading.level,
                is_low_battery: !reading.charging && reading.level < low_threshold,
                is_supported: true,
            },
            None => Self::default(),
        }
    }
}

impl Default for BatteryState {
    fn default() -> Self {
        Self {
            charging: true,
            level: 1.0,
            is_low_battery: false,
            is_supported: false,
        }
    }
}

pub struct BatteryMonitor {
    config: BatteryConfig,
    signal: BatterySignal,
    state: Arc<watch::Sender<BatteryState>>,
    task: Option<JoinHandle<()>>,
}

impl BatteryMonitor {
    pub fn new(config: BatteryConfig, signal: BatterySignal) -> Self {
        let (state, _) = watch::channel(BatteryState::from_reading(signal.reading(), config.low_threshold));
        Self {
            config,
            signal,
            state: Arc::new(state),
            task: None,
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let mut rx = self.signal.subscribe();
        let state = Arc::clone(&self.state);
        let low_threshold = self.config.low_threshold;

        self.task = Some(tokio::spawn(async move {
            let mut low = false;
            loop {
                let next = BatteryState::from_reading(*rx.borrow_and_update(), low_threshold);
                if next.is_low_battery != low {
                    low = next.is_low_battery;
                    if low {
                        msg_info!(Message::BatteryLow(next.level));
                    } else {
                        msg_debug!(Message::BatteryRecovered);
                    }
                }
                state.send_if_modified(|current| {
                    let modified = *current != next;
                    *current = next;
                    modified
                });
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn snapshot(&self) -> BatteryState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<BatteryState> {
        self.state.subscribe()
    }
}

impl Drop for BatteryMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
