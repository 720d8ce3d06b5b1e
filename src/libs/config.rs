//! Configuration for every scheduling component.
//!
//! Each component has its own settings structure with documented defaults.
//! They can be built in code, or grouped in a [`Config`] and loaded from a
//! JSON file where every section and every field is optional.
//!
//! All durations are stored as milliseconds (`u64`) and exposed as
//! [`Duration`] through accessor methods that apply clamping rules.
//!
//! ## Example file
//!
//! ```json
//! {
//!   "inactivity": { "timeout": 900000, "warning_before": 120000 },
//!   "polling": { "interval": 10000 },
//!   "network": { "interval": 10000, "slow_multiplier": 4 }
//! }
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pacer::libs::config::Config;
//!
//! let config = Config::read("pacer.json")?;
//! let inactivity = config.inactivity_or_default();
//! println!("idle threshold: {:?}", inactivity.idle_threshold());
//! # Ok::<(), pacer::libs::error::PacerError>(())
//! ```

use crate::libs::error::PacerError;
use crate::libs::messages::Message;
use crate::msg_debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

/// Smallest polling period accepted by the poller.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Largest polling period the poller schedules; longer periods are capped.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Idle detector settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct IdleConfig {
    /// Milliseconds without qualifying input before the user is considered idle.
    ///
    /// Zero makes the detector idle immediately after start and after every reset.
    pub timeout: u64,
}

impl IdleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

impl Default for IdleConfig {
    /// One minute of inactivity.
    fn default() -> Self {
        IdleConfig { timeout: 60_000 }
    }
}

/// Inactivity countdown settings.
///
/// The countdown has two phases: a silent idle period of
/// `timeout - warning_before` ms, then a warning phase of `warning_before` ms
/// that ends in the terminal timed-out state.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct InactivityConfig {
    /// Total inactivity in milliseconds before the session times out.
    pub timeout: u64,

    /// Length of the warning phase in milliseconds.
    ///
    /// Values larger than `timeout` are clamped down to `timeout`, which
    /// makes the warning phase start as soon as the countdown is armed.
    pub warning_before: u64,
}

impl InactivityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Warning window after clamping to `timeout`.
    pub fn warning_window(&self) -> Duration {
        Duration::from_millis(self.warning_before.min(self.timeout))
    }

    /// Silent idle period fed to the idle detector.
    pub fn idle_threshold(&self) -> Duration {
        self.timeout() - self.warning_window()
    }
}

impl Default for InactivityConfig {
    /// Five minutes total, the last minute of which is the warning phase.
    fn default() -> Self {
        InactivityConfig {
            timeout: 300_000,
            warning_before: 60_000,
        }
    }
}

/// Visibility-aware poller settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct PollingConfig {
    /// Polling period in milliseconds.
    pub interval: u64,

    /// Whether periodic polling is enabled.
    ///
    /// The initial fetch on start happens even when this is `false`.
    pub enabled: bool,
}

impl PollingConfig {
    /// Polling period, clamped to [`MIN_POLL_INTERVAL`]..=[`MAX_POLL_INTERVAL`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval).clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            interval: 5_000,
            enabled: true,
        }
    }
}

/// Network-aware poller settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkPollingConfig {
    #[serde(flatten)]
    pub polling: PollingConfig,

    /// Factor applied to the interval on slow links (2g and slower).
    pub slow_multiplier: u32,

    /// Whether polling pauses while the host reports being offline.
    pub pause_offline: bool,
}

impl Default for NetworkPollingConfig {
    fn default() -> Self {
        NetworkPollingConfig {
            polling: PollingConfig::default(),
            slow_multiplier: 3,
            pause_offline: true,
        }
    }
}

/// Battery monitor settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BatteryConfig {
    /// Level (0..=1) below which a discharging battery counts as low.
    pub low_threshold: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        BatteryConfig { low_threshold: 0.15 }
    }
}

/// Wake lock settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct WakeLockConfig {
    /// Re-request a wanted lock when the surface becomes visible again.
    pub auto_reacquire: bool,
}

impl Default for WakeLockConfig {
    fn default() -> Self {
        WakeLockConfig { auto_reacquire: true }
    }
}

/// Root configuration container.
///
/// Sections are optional; missing sections fall back to their defaults
/// through the `*_or_default` accessors.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle: Option<IdleConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactivity: Option<InactivityConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub polling: Option<PollingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkPollingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<BatteryConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wake_lock: Option<WakeLockConfig>,
}

impl Config {
    /// Reads configuration from a JSON file.
    ///
    /// A missing file yields the default configuration. Any other I/O error
    /// or malformed JSON is reported.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, PacerError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                msg_debug!(Message::ConfigFileMissing(path.display().to_string()));
                Ok(Config::default())
            }
            Err(source) => Err(PacerError::ConfigRead {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parses configuration from a JSON string.
    pub fn from_json(contents: &str) -> Result<Self, PacerError> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn idle_or_default(&self) -> IdleConfig {
        self.idle.clone().unwrap_or_default()
    }

    pub fn inactivity_or_default(&self) -> InactivityConfig {
        self.inactivity.clone().unwrap_or_default()
    }

    pub fn polling_or_default(&self) -> PollingConfig {
        self.polling.clone().unwrap_or_default()
    }

    pub fn network_or_default(&self) -> NetworkPollingConfig {
        self.network.clone().unwrap_or_default()
    }

    pub fn battery_or_default(&self) -> BatteryConfig {
        self.battery.clone().unwrap_or_default()
    }

    pub fn wake_lock_or_default(&self) -> WakeLockConfig {
        self.wake_lock.clone().unwrap_or_default()
    }
}
