//! Core library modules for pacer.
//!
//! ## Layers
//!
//! - **Signals**: [`visibility`], [`input`], [`network`] and the battery feed,
//!   shared handles the host pushes platform events into
//! - **Timing**: [`idle`] detection and the [`inactivity`] countdown
//! - **Polling**: [`polling`] and its network-aware wrapper in [`network`]
//! - **Effects**: [`focus`], [`wake_lock`], [`auto_pause`], [`battery`]
//! - **Infrastructure**: [`config`], [`error`], [`logging`], [`messages`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pacer::libs::config::Config;
//! use pacer::libs::idle::IdleDetector;
//! use pacer::libs::input::InputFeed;
//! use pacer::libs::visibility::VisibilitySignal;
//!
//! # async fn demo() -> Result<(), pacer::libs::error::PacerError> {
//! let config = Config::read("pacer.json")?;
//! let visibility = VisibilitySignal::new(true);
//! let input = InputFeed::new();
//!
//! let mut idle = IdleDetector::from_config(&config.idle_or_default(), visibility, input.clone());
//! idle.start();
//! # Ok(())
//! # }
//! ```

pub mod auto_pause;
pub mod battery;
pub mod config;
pub mod error;
pub mod focus;
pub mod idle;
pub mod inactivity;
pub mod input;
pub mod logging;
pub mod messages;
pub mod network;
pub mod polling;
pub mod visibility;
pub mod wake_lock;
