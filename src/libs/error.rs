//! Error types.
//!
//! Nothing in this crate is fatal to the host. Fetch failures are captured
//! into [`PollError`] and surfaced through poll snapshots; [`PacerError`]
//! covers configuration loading and calls on components that are not running.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PacerError {
    #[error("failed to read configuration file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("{0} is not running")]
    NotRunning(&'static str),
}

/// A failed fetch, as exposed in poll snapshots.
///
/// The message is the error's top-level description, so a fetch failing
/// with `anyhow!("Network error")` yields `"Network error"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PollError {
    pub message: String,
}

impl PollError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl From<&anyhow::Error> for PollError {
    fn from(err: &anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<anyhow::Error> for PollError {
    fn from(err: anyhow::Error) -> Self {
        Self::from(&err)
    }
}
