//! Display implementation for pacer log messages.
//!
//! All message text lives in this one match so wording stays consistent
//! across components.

use super::types::Message;
use std::fmt::{Display, Formatter, Result};

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter) -> Result {
        let text = match self {
            // === SIGNAL MESSAGES ===
            Message::VisibilityChanged(true) => "Surface became visible".to_string(),
            Message::VisibilityChanged(false) => "Surface became hidden".to_string(),
            Message::VisibilityEventsLagged(skipped) => {
                format!("Visibility receiver fell behind, {} events skipped", skipped)
            }
            Message::NetworkChanged(true) => "Network is online".to_string(),
            Message::NetworkChanged(false) => "Network is offline".to_string(),
            Message::InputListenerFailed(e) => format!("Input listener failed, retrying: {}", e),
            Message::FocusEdge(true) => "Focus gained".to_string(),
            Message::FocusEdge(false) => "Focus lost".to_string(),

            // === IDLE MESSAGES ===
            Message::IdleDetectorStarted(timeout) => format!("Idle detector started (timeout: {} ms)", timeout.as_millis()),
            Message::IdleEpisodeStarted(episode) => format!("User went idle (episode {})", episode),
            Message::IdleEpisodeEnded(episode) => format!("User active again (episode {} ended)", episode),

            // === INACTIVITY MESSAGES ===
            Message::InactivityStarted { timeout, warning_before } => format!(
                "Inactivity timeout armed (timeout: {} ms, warning: {} ms)",
                timeout, warning_before
            ),
            Message::InactivityReset => "Inactivity timer reset".to_string(),
            Message::WarningPhaseEntered(remaining) => format!("Inactivity warning: {} s remaining", remaining),
            Message::SessionTimedOut => "Session timed out due to inactivity".to_string(),

            // === POLLING MESSAGES ===
            Message::PollerStarted { interval, enabled } => format!(
                "Poller started (interval: {} ms, enabled: {})",
                interval.as_millis(),
                on_off(*enabled)
            ),
            Message::PollerStopped => "Poller stopped".to_string(),
            Message::PollerResumed => "Polling resumed".to_string(),
            Message::PollerPaused => "Polling paused".to_string(),
            Message::FetchStarted(trigger) => format!("Fetch started ({})", trigger),
            Message::FetchSkippedInFlight(trigger) => format!("Fetch skipped ({}): previous fetch still in flight", trigger),
            Message::FetchUnchanged => "Fetch result unchanged, update suppressed".to_string(),
            Message::FetchFailed(e) => format!("Fetch failed: {}", e),
            Message::NetworkPollerStarted { online, slow } => format!(
                "Network-aware poller started (online: {}, slow link: {})",
                on_off(*online),
                on_off(*slow)
            ),

            // === PERIPHERAL MESSAGES ===
            Message::BatteryLow(level) => format!("Battery low: {:.0}%", level * 100.0),
            Message::BatteryRecovered => "Battery no longer low".to_string(),
            Message::WakeLockAcquired => "Wake lock acquired".to_string(),
            Message::WakeLockReleased => "Wake lock released".to_string(),
            Message::WakeLockReacquiring => "Re-acquiring wake lock after surface became visible".to_string(),
            Message::WakeLockFailed(e) => format!("Wake lock operation failed: {}", e),
            Message::PlaybackRefused(e) => format!("Media playback refused: {}", e),

            // === CONFIG MESSAGES ===
            Message::ConfigFileMissing(path) => format!("Configuration file {} not found, using defaults", path),
            Message::LoggingInitFailed(e) => format!("Logging already initialized: {}", e),
        };
        write!(f, "{}", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn durations_are_logged_without_truncation() {
        let interval = Duration::from_secs(u64::MAX);
        let text = Message::PollerStarted { interval, enabled: true }.to_string();
        assert!(text.contains(&interval.as_millis().to_string()), "{}", text);

        let text = Message::IdleDetectorStarted(Duration::from_millis(1_500)).to_string();
        assert_eq!(text, "Idle detector started (timeout: 1500 ms)");
    }
}
