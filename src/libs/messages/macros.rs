//! Logging macros over [`Message`](super::Message).
//!
//! Every macro routes to `tracing`; the host decides where events go by
//! installing a subscriber (see [`crate::libs::logging::init`]).
//!
//! ## Debug Mode Detection
//!
//! `msg_debug!` is silent unless debug mode is on:
//! - **`PACER_DEBUG`**: explicit debug flag
//! - **`RUST_LOG`**: standard Rust logging configuration
//!
//! The result is cached on first use.
//!
//! ## Usage
//!
//! ```rust
//! use pacer::libs::messages::Message;
//! use pacer::{msg_debug, msg_info};
//!
//! msg_info!(Message::PollerResumed);
//! msg_debug!(Message::FetchUnchanged);
//! ```

use std::sync::OnceLock;

static DEBUG_MODE: OnceLock<bool> = OnceLock::new();

/// Checks if debug mode is enabled. Cached after the first call.
#[doc(hidden)]
pub fn is_debug_mode() -> bool {
    *DEBUG_MODE.get_or_init(|| std::env::var("PACER_DEBUG").is_ok() || std::env::var("RUST_LOG").is_ok())
}

/// Logs a warning with ⚠️ prefix.
#[macro_export]
macro_rules! msg_warning {
    ($msg:expr) => {
        tracing::warn!("⚠️ {}", $msg)
    };
}

/// Logs an informational message with ℹ️ prefix.
#[macro_export]
macro_rules! msg_info {
    ($msg:expr) => {
        tracing::info!("ℹ️ {}", $msg)
    };
}

/// Debug-only message with 🔍 prefix.
///
/// Suppressed entirely, message construction included, when debug mode is off.
#[macro_export]
macro_rules! msg_debug {
    ($msg:expr) => {
        if $crate::libs::messages::macros::is_debug_mode() {
            tracing::debug!("🔍 {}", $msg);
        }
    };
}
