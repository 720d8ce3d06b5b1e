use std::time::Duration;

/// Every log line the crate emits.
#[derive(Debug, Clone)]
pub enum Message {
    // === SIGNAL MESSAGES ===
    VisibilityChanged(bool),
    VisibilityEventsLagged(u64), // skipped events
    NetworkChanged(bool),
    InputListenerFailed(String),
    FocusEdge(bool),

    // === IDLE MESSAGES ===
    IdleDetectorStarted(Duration), // timeout
    IdleEpisodeStarted(u64),  // episode
    IdleEpisodeEnded(u64),    // episode

    // === INACTIVITY MESSAGES ===
    InactivityStarted { timeout: u64, warning_before: u64 },
    InactivityReset,
    WarningPhaseEntered(i64), // remaining seconds
    SessionTimedOut,

    // === POLLING MESSAGES ===
    PollerStarted { interval: Duration, enabled: bool },
    PollerStopped,
    PollerResumed,
    PollerPaused,
    FetchStarted(&'static str),         // trigger
    FetchSkippedInFlight(&'static str), // trigger
    FetchUnchanged,
    FetchFailed(String),
    NetworkPollerStarted { online: bool, slow: bool },

    // === PERIPHERAL MESSAGES ===
    BatteryLow(f64),
    BatteryRecovered,
    WakeLockAcquired,
    WakeLockReleased,
    WakeLockReacquiring,
    WakeLockFailed(String),
    PlaybackRefused(String),

    // === CONFIG MESSAGES ===
    ConfigFileMissing(String),
    LoggingInitFailed(String),
}
