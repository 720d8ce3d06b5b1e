//! Subscriber setup for hosts that do not install their own.

use crate::libs::messages::Message;
use crate::msg_debug;
use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber filtered by `PACER_LOG`, then `RUST_LOG`,
/// defaulting to `info`.
///
/// Safe to call more than once; only the first call takes effect.
pub fn init() {
    let filter = EnvFilter::try_from_env("PACER_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init() {
        msg_debug!(Message::LoggingInitFailed(e.to_string()));
    }
}
