//! Network reachability and network-aware polling.
//!
//! [`NetworkSignal`] carries the host's online/offline state and link-quality
//! classification. [`NetworkAwarePoller`] wraps a [`SmartPoller`] and:
//!
//! - pauses polling while offline (unless `pause_offline` is off), resuming
//!   with an immediate fetch when the host comes back online;
//! - multiplies the interval by `slow_multiplier` on slow links (2g and
//!   slow-2g).
//!
//! The wrapper only drives the inner poller through its public
//! [`PollerHandle`]; it never touches the inner schedule directly.

use crate::libs::config::NetworkPollingConfig;
use crate::libs::error::PacerError;
use crate::libs::messages::Message;
use crate::libs::polling::{PollSnapshot, PollerHandle, SmartPoller};
use crate::libs::visibility::VisibilitySignal;
use crate::{msg_debug, msg_info};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Effective connection type reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkQuality {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
}

impl LinkQuality {
    /// Whether polling should slow down on this link.
    pub fn is_slow(&self) -> bool {
        matches!(self, LinkQuality::Slow2g | LinkQuality::TwoG)
    }
}

/// Snapshot of the host's network state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStatus {
    pub online: bool,
    /// `None` when the host cannot classify the link.
    pub link: Option<LinkQuality>,
}

/// Shared handle over the host's network state.
#[derive(Debug, Clone)]
pub struct NetworkSignal {
    tx: Arc<watch::Sender<NetworkStatus>>,
    supported: bool,
}

impl NetworkSignal {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(NetworkStatus { online, link: None });
        Self {
            tx: Arc::new(tx),
            supported: true,
        }
    }

    /// Signal for hosts without reachability notifications: always online,
    /// link unknown.
    pub fn unsupported() -> Self {
        let (tx, _) = watch::channel(NetworkStatus {
            online: true,
            link: None,
        });
        Self {
            tx: Arc::new(tx),
            supported: false,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn status(&self) -> NetworkStatus {
        *self.tx.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.status().online
    }

    /// Forwards an online/offline notification from the host.
    pub fn set_online(&self, online: bool) {
        msg_debug!(Message::NetworkChanged(online));
        self.tx.send_modify(|status| status.online = online);
    }

    /// Forwards a link-quality change from the host.
    pub fn set_link(&self, link: Option<LinkQuality>) {
        self.tx.send_modify(|status| status.link = link);
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.tx.subscribe()
    }
}

impl Default for NetworkSignal {
    fn default() -> Self {
        Self::unsupported()
    }
}

/// Polling interval after link-quality adjustment.
pub fn effective_interval(base: Duration, slow_multiplier: u32, link: Option<LinkQuality>) -> Duration {
    match link {
        Some(link) if link.is_slow() => base.checked_mul(slow_multiplier).unwrap_or(Duration::MAX),
        _ => base,
    }
}

/// State of a [`NetworkAwarePoller`].
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkAwareSnapshot<T> {
    pub poll: PollSnapshot<T>,
    pub is_online: bool,
    pub effective_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Gate {
    base_interval: Duration,
    slow_multiplier: u32,
    pause_offline: bool,
}

impl Gate {
    /// Pushes the gated controls for `status` into the inner poller.
    fn apply(&self, handle: &PollerHandle, enabled: bool, status: NetworkStatus) -> Duration {
        let interval = effective_interval(self.base_interval, self.slow_multiplier, status.link);
        let gated = if self.pause_offline { enabled && status.online } else { enabled };
        handle.set_interval(interval);
        handle.set_enabled(gated);
        interval
    }
}

/// [`SmartPoller`] gated by reachability and link quality.
pub struct NetworkAwarePoller<T> {
    inner: SmartPoller<T>,
    network: NetworkSignal,
    gate: Gate,
    enabled: Arc<watch::Sender<bool>>,
    state: Arc<watch::Sender<NetworkAwareSnapshot<T>>>,
    closed: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl<T> NetworkAwarePoller<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    pub fn new<F, Fut>(fetch: F, config: NetworkPollingConfig, visibility: VisibilitySignal, network: NetworkSignal) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let gate = Gate {
            base_interval: config.polling.interval(),
            slow_multiplier: config.slow_multiplier,
            pause_offline: config.pause_offline,
        };
        let inner = SmartPoller::new(fetch, config.polling.clone(), visibility);

        // Gate the inner poller before it ever starts so its first schedule
        // already reflects the current network state.
        let status = network.status();
        let interval = gate.apply(&inner.handle(), config.polling.enabled, status);

        let (enabled, _) = watch::channel(config.polling.enabled);
        let (state, _) = watch::channel(NetworkAwareSnapshot {
            poll: inner.snapshot(),
            is_online: status.online,
            effective_interval: interval,
        });

        Self {
            inner,
            network,
            gate,
            enabled: Arc::new(enabled),
            state: Arc::new(state),
            closed: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// Starts the inner poller and begins following the network signal.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }

        let status = self.network.status();
        msg_info!(Message::NetworkPollerStarted {
            online: status.online,
            slow: status.link.is_some_and(|link| link.is_slow()),
        });

        self.closed = Arc::new(AtomicBool::new(false));
        let relay = NetworkRelay {
            gate: self.gate,
            handle: self.inner.handle(),
            state: Arc::clone(&self.state),
            closed: Arc::clone(&self.closed),
        };
        let network_rx = self.network.subscribe();
        let enabled_rx = self.enabled.subscribe();
        let poll_rx = self.inner.subscribe();

        self.inner.start();
        self.task = Some(tokio::spawn(relay.run(network_rx, enabled_rx, poll_rx)));
    }

    /// Stops the relay and the inner poller. The snapshot no longer changes
    /// once this returns.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            // Closing under the state lock orders it with the relay's publishes.
            self.state.send_if_modified(|_| {
                self.closed.store(true, Ordering::SeqCst);
                false
            });
            task.abort();
        }
        self.inner.stop();
    }

    /// Caller-side enable switch. Offline gating is applied on top of it.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.send_if_modified(|current| {
            let modified = *current != enabled;
            *current = enabled;
            modified
        });
    }

    pub async fn refetch(&self) -> Result<(), PacerError> {
        self.inner.refetch().await
    }

    /// Current state, combining the inner poller's latest snapshot with the
    /// network signal.
    pub fn snapshot(&self) -> NetworkAwareSnapshot<T> {
        let status = self.network.status();
        NetworkAwareSnapshot {
            poll: self.inner.snapshot(),
            is_online: status.online,
            effective_interval: effective_interval(self.gate.base_interval, self.gate.slow_multiplier, status.link),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkAwareSnapshot<T>> {
        self.state.subscribe()
    }
}

impl<T> Drop for NetworkAwarePoller<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            self.closed.store(true, Ordering::SeqCst);
            task.abort();
        }
    }
}

struct NetworkRelay<T> {
    gate: Gate,
    handle: PollerHandle,
    state: Arc<watch::Sender<NetworkAwareSnapshot<T>>>,
    closed: Arc<AtomicBool>,
}

impl<T> NetworkRelay<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn run(
        self,
        mut network_rx: watch::Receiver<NetworkStatus>,
        mut enabled_rx: watch::Receiver<bool>,
        mut poll_rx: watch::Receiver<PollSnapshot<T>>,
    ) {
        let mut status = *network_rx.borrow_and_update();
        let mut enabled = *enabled_rx.borrow_and_update();
        self.regate(enabled, status);
        let poll = poll_rx.borrow_and_update().clone();
        self.publish(|snapshot| {
            snapshot.poll = poll;
            true
        });

        loop {
            tokio::select! {
                Ok(()) = network_rx.changed() => {
                    let previous = status;
                    status = *network_rx.borrow_and_update();
                    if previous.online != status.online {
                        msg_info!(Message::NetworkChanged(status.online));
                    }
                    self.regate(enabled, status);
                }
                Ok(()) = enabled_rx.changed() => {
                    enabled = *enabled_rx.borrow_and_update();
                    self.regate(enabled, status);
                }
                Ok(()) = poll_rx.changed() => {
                    let poll = poll_rx.borrow_and_update().clone();
                    self.publish(|snapshot| {
                        snapshot.poll = poll;
                        true
                    });
                }
                else => break,
            }
        }
    }

    fn regate(&self, enabled: bool, status: NetworkStatus) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let interval = self.gate.apply(&self.handle, enabled, status);
        self.publish(|snapshot| {
            let modified = snapshot.is_online != status.online || snapshot.effective_interval != interval;
            snapshot.is_online = status.online;
            snapshot.effective_interval = interval;
            modified
        });
    }

    fn publish<F>(&self, update: F)
    where
        F: FnOnce(&mut NetworkAwareSnapshot<T>) -> bool,
    {
        self.state
            .send_if_modified(|snapshot| !self.closed.load(Ordering::SeqCst) && update(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_2g_and_slower_count_as_slow() {
        assert!(LinkQuality::Slow2g.is_slow());
        assert!(LinkQuality::TwoG.is_slow());
        assert!(!LinkQuality::ThreeG.is_slow());
        assert!(!LinkQuality::FourG.is_slow());
    }

    #[test]
    fn slow_links_multiply_the_interval() {
        let base = Duration::from_secs(5);
        assert_eq!(effective_interval(base, 3, Some(LinkQuality::TwoG)), Duration::from_secs(15));
        assert_eq!(effective_interval(base, 3, Some(LinkQuality::FourG)), base);
        assert_eq!(effective_interval(base, 3, None), base);
    }

    #[test]
    fn oversized_multiplier_saturates() {
        let base = Duration::from_millis(u64::MAX);
        assert_eq!(effective_interval(base, u32::MAX, Some(LinkQuality::Slow2g)), Duration::MAX);
    }

    #[test]
    fn link_quality_uses_effective_type_names() {
        let link: LinkQuality = serde_json::from_str("\"slow-2g\"").unwrap();
        assert_eq!(link, LinkQuality::Slow2g);
    }
}
