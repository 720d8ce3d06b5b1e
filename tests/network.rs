#[cfg(test)]
mod tests {
    use pacer::libs::config::{NetworkPollingConfig, PollingConfig};
    use pacer::libs::network::{LinkQuality, NetworkAwarePoller, NetworkSignal};
    use pacer::libs::visibility::VisibilitySignal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use test_context::{test_context, AsyncTestContext};
    use tokio::time::sleep;

    struct NetworkTestContext {
        visibility: VisibilitySignal,
        network: NetworkSignal,
        calls: Arc<AtomicUsize>,
    }

    impl NetworkTestContext {
        fn poller(&self, pause_offline: bool) -> NetworkAwarePoller<usize> {
            let calls = Arc::clone(&self.calls);
            NetworkAwarePoller::new(
                move || {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { Ok::<_, anyhow::Error>(n) }
                },
                NetworkPollingConfig {
                    polling: PollingConfig {
                        interval: 1_000,
                        enabled: true,
                    },
                    slow_multiplier: 3,
                    pause_offline,
                },
                self.visibility.clone(),
                self.network.clone(),
            )
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AsyncTestContext for NetworkTestContext {
        async fn setup() -> Self {
            NetworkTestContext {
                visibility: VisibilitySignal::new(true),
                network: NetworkSignal::new(true),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance(ms: u64) {
        sleep(Duration::from_millis(ms)).await;
        settle().await;
    }

    #[test_context(NetworkTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_polls_normally_online(ctx: &mut NetworkTestContext) {
        let mut poller = ctx.poller(true);
        poller.start();
        settle().await;

        let snapshot = poller.snapshot();
        assert!(snapshot.is_online);
        assert_eq!(snapshot.effective_interval, Duration::from_millis(1_000));
        assert_eq!(snapshot.poll.data, Some(1));

        advance(3_000).await;
        assert_eq!(ctx.calls(), 4);
    }

    #[test_context(NetworkTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_offline_pauses_and_reconnect_fetches(ctx: &mut NetworkTestContext) {
        let mut poller = ctx.poller(true);
        poller.start();
        settle().await;

        ctx.network.set_online(false);
        settle().await;
        assert!(!poller.snapshot().is_online);
        advance(5_000).await;
        assert_eq!(ctx.calls(), 1);

        ctx.network.set_online(true);
        settle().await;
        assert_eq!(ctx.calls(), 2);
        assert!(poller.subscribe().borrow().is_online);
    }

    #[test_context(NetworkTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_offline_polling_continues_when_not_pausing(ctx: &mut NetworkTestContext) {
        let mut poller = ctx.poller(false);
        poller.start();
        settle().await;

        ctx.network.set_online(false);
        settle().await;
        advance(3_000).await;
        assert_eq!(ctx.calls(), 4);
        assert!(!poller.snapshot().is_online);
    }

    #[test_context(NetworkTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_slow_link_stretches_interval(ctx: &mut NetworkTestContext) {
        ctx.network.set_link(Some(LinkQuality::TwoG));
        let mut poller = ctx.poller(true);
        assert_eq!(poller.snapshot().effective_interval, Duration::from_millis(3_000));

        poller.start();
        settle().await;
        advance(2_900).await;
        assert_eq!(ctx.calls(), 1);
        advance(200).await;
        assert_eq!(ctx.calls(), 2);

        ctx.network.set_link(Some(LinkQuality::FourG));
        settle().await;
        assert_eq!(poller.snapshot().effective_interval, Duration::from_millis(1_000));
    }

    #[test_context(NetworkTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_starting_offline_only_fetches_initially(ctx: &mut NetworkTestContext) {
        ctx.network.set_online(false);
        let mut poller = ctx.poller(true);
        poller.start();
        advance(5_000).await;
        assert_eq!(ctx.calls(), 1);
        assert!(!poller.snapshot().is_online);
    }

    #[test_context(NetworkTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_caller_disable_wins_over_online(ctx: &mut NetworkTestContext) {
        let mut poller = ctx.poller(true);
        poller.start();
        settle().await;

        poller.set_enabled(false);
        settle().await;
        ctx.network.set_online(false);
        settle().await;
        ctx.network.set_online(true);
        settle().await;
        advance(3_000).await;
        assert_eq!(ctx.calls(), 1);

        poller.set_enabled(true);
        settle().await;
        assert_eq!(ctx.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_network_counts_as_online() {
        let network = NetworkSignal::unsupported();
        assert!(network.is_online());
        assert!(!network.is_supported());
        assert_eq!(network.status().link, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_state_change_after_stop_on_worker_threads() {
        let network = NetworkSignal::new(true);
        for _ in 0..100 {
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&calls);
            let mut poller = NetworkAwarePoller::new(
                move || {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    async move { Ok::<_, anyhow::Error>(n) }
                },
                NetworkPollingConfig {
                    polling: PollingConfig { interval: 1, enabled: true },
                    ..NetworkPollingConfig::default()
                },
                VisibilitySignal::new(true),
                network.clone(),
            );
            let mut rx = poller.subscribe();
            poller.start();
            while calls.load(Ordering::SeqCst) < 3 {
                sleep(Duration::from_millis(1)).await;
            }

            poller.stop();
            rx.borrow_and_update();
            network.set_link(Some(LinkQuality::TwoG));
            sleep(Duration::from_millis(2)).await;
            assert!(!rx.has_changed().unwrap());
            network.set_link(None);
        }
    }
}
