#[cfg(test)]
mod tests {
    use pacer::libs::config::InactivityConfig;
    use pacer::libs::inactivity::{InactivityTimeout, NOT_COUNTING};
    use pacer::libs::input::{InputEvent, InputFeed};
    use pacer::libs::visibility::VisibilitySignal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use test_context::{test_context, AsyncTestContext};
    use tokio::time::sleep;

    struct InactivityTestContext {
        visibility: VisibilitySignal,
        input: InputFeed,
        warnings: Arc<AtomicUsize>,
        timeouts: Arc<AtomicUsize>,
    }

    impl InactivityTestContext {
        /// Builds and starts a session with counting callbacks.
        async fn session(&self, timeout: u64, warning_before: u64) -> InactivityTimeout {
            let warnings = Arc::clone(&self.warnings);
            let timeouts = Arc::clone(&self.timeouts);
            let mut session = InactivityTimeout::new(
                InactivityConfig { timeout, warning_before },
                self.visibility.clone(),
                self.input.clone(),
            )
            .on_warning(move || {
                warnings.fetch_add(1, Ordering::SeqCst);
            })
            .on_timeout(move || {
                timeouts.fetch_add(1, Ordering::SeqCst);
            });
            session.start();
            settle().await;
            session
        }

        fn warnings(&self) -> usize {
            self.warnings.load(Ordering::SeqCst)
        }

        fn timeouts(&self) -> usize {
            self.timeouts.load(Ordering::SeqCst)
        }
    }

    impl AsyncTestContext for InactivityTestContext {
        async fn setup() -> Self {
            InactivityTestContext {
                visibility: VisibilitySignal::new(true),
                input: InputFeed::new(),
                warnings: Arc::new(AtomicUsize::new(0)),
                timeouts: Arc::new(AtomicUsize::new(0)),
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

    #[test_context(InactivityTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_fresh_session_is_not_counting(ctx: &mut InactivityTestContext) {
        let session = ctx.session(10_000, 5_000).await;
        let snapshot = session.snapshot();

        assert!(!snapshot.idle);
        assert!(snapshot.visible);
        assert!(!snapshot.is_warning);
        assert!(!snapshot.is_timed_out);
        assert_eq!(snapshot.remaining_seconds, NOT_COUNTING);
    }

    #[test_context(InactivityTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_warning_then_timeout(ctx: &mut InactivityTestContext) {
        let session = ctx.session(10_000, 5_000).await;

        advance(4_990).await;
        assert!(!session.snapshot().is_warning);
        assert_eq!(ctx.warnings(), 0);

        advance(11).await;
        let warning = session.snapshot();
        assert!(warning.idle);
        assert!(warning.is_warning);
        assert!(!warning.is_timed_out);
        assert!((1..=5).contains(&warning.remaining_seconds));
        assert_eq!(ctx.warnings(), 1);

        advance(5_000).await;
        let timed_out = session.snapshot();
        assert!(timed_out.is_timed_out);
        assert!(!timed_out.is_warning);
        assert_eq!(timed_out.remaining_seconds, 0);
        assert_eq!(ctx.timeouts(), 1);
        assert_eq!(ctx.warnings(), 1);
    }

    #[test_context(InactivityTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_countdown_decreases_every_second(ctx: &mut InactivityTestContext) {
        let session = ctx.session(10_000, 5_000).await;
        advance(5_001).await;
        assert_eq!(session.snapshot().remaining_seconds, 5);

        let mut seen = Vec::new();
        for _ in 0..4 {
            advance(1_000).await;
            seen.push(session.snapshot().remaining_seconds);
        }
        assert_eq!(seen, vec![4, 3, 2, 1]);
    }

    #[test_context(InactivityTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_once_per_episode(ctx: &mut InactivityTestContext) {
        let session = ctx.session(2_000, 1_000).await;

        advance(10_000).await;
        assert!(session.snapshot().is_timed_out);
        assert_eq!(ctx.warnings(), 1);
        assert_eq!(ctx.timeouts(), 1);
    }

    #[test_context(InactivityTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_activity_during_warning_clears_state(ctx: &mut InactivityTestContext) {
        let session = ctx.session(10_000, 5_000).await;
        advance(6_000).await;
        assert!(session.snapshot().is_warning);

        ctx.input.emit(InputEvent::PointerDown);
        settle().await;
        let snapshot = session.snapshot();
        assert!(!snapshot.idle);
        assert!(!snapshot.is_warning);
        assert_eq!(snapshot.remaining_seconds, NOT_COUNTING);

        // The old countdown would have expired at 10 s.
        advance(4_500).await;
        assert_eq!(ctx.timeouts(), 0);
        assert!(!session.snapshot().is_timed_out);
    }

    #[test_context(InactivityTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_activity_after_timeout_starts_over(ctx: &mut InactivityTestContext) {
        let session = ctx.session(2_000, 1_000).await;
        advance(2_001).await;
        assert!(session.snapshot().is_timed_out);

        ctx.input.emit(InputEvent::KeyDown);
        settle().await;
        assert!(!session.snapshot().is_timed_out);

        advance(2_001).await;
        assert!(session.snapshot().is_timed_out);
        assert_eq!(ctx.warnings(), 2);
        assert_eq!(ctx.timeouts(), 2);
    }

    #[test_context(InactivityTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_reset_timer_extends_session(ctx: &mut InactivityTestContext) {
        let session = ctx.session(10_000, 5_000).await;
        advance(7_000).await;
        assert!(session.snapshot().is_warning);

        session.reset_timer();
        // Cleared before any task runs.
        let snapshot = session.snapshot();
        assert!(!snapshot.is_warning);
        assert_eq!(snapshot.remaining_seconds, NOT_COUNTING);
        settle().await;

        // A full silent period must pass again before the next warning.
        advance(4_990).await;
        assert_eq!(ctx.warnings(), 1);
        advance(11).await;
        assert_eq!(ctx.warnings(), 2);
        assert!(session.snapshot().is_warning);
        assert_eq!(ctx.timeouts(), 0);
    }

    #[test_context(InactivityTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_hiding_does_not_reset_countdown(ctx: &mut InactivityTestContext) {
        let session = ctx.session(10_000, 5_000).await;
        advance(6_000).await;

        ctx.visibility.set_visible(false);
        settle().await;
        let hidden = session.snapshot();
        assert!(hidden.is_warning);
        assert!(!hidden.visible);

        advance(4_001).await;
        assert_eq!(ctx.timeouts(), 1);
    }

    #[test_context(InactivityTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_warning_longer_than_timeout_is_clamped(ctx: &mut InactivityTestContext) {
        let session = ctx.session(3_000, 10_000).await;

        let warning = session.snapshot();
        assert!(warning.is_warning);
        assert_eq!(warning.remaining_seconds, 3);
        assert_eq!(ctx.warnings(), 1);

        advance(3_001).await;
        assert!(session.snapshot().is_timed_out);
        assert_eq!(ctx.timeouts(), 1);
    }

    #[test_context(InactivityTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_zero_warning_window_fires_both_callbacks(ctx: &mut InactivityTestContext) {
        let session = ctx.session(2_000, 0).await;

        advance(2_001).await;
        let snapshot = session.snapshot();
        assert!(snapshot.is_timed_out);
        assert!(!snapshot.is_warning);
        assert_eq!(ctx.warnings(), 1);
        assert_eq!(ctx.timeouts(), 1);
    }

    #[test_context(InactivityTestContext)]
    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_countdown(ctx: &mut InactivityTestContext) {
        let mut session = ctx.session(2_000, 1_000).await;
        advance(1_500).await;
        assert!(session.snapshot().is_warning);

        session.stop();
        advance(5_000).await;
        assert_eq!(ctx.timeouts(), 0);
    }
}
