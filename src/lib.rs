//! # Pacer - adaptive scheduling for interactive clients
//!
//! Building blocks that make background work react to what the user and the
//! host are doing.
//!
//! ## Features
//!
//! - **Visibility Signal**: foreground/background state shared by every component
//! - **Idle Detection**: trailing-window inactivity, reset by input or refocus
//! - **Inactivity Timeout**: warning countdown followed by a session timeout
//! - **Smart Polling**: visibility-gated polling with overlap control and
//!   duplicate-result suppression
//! - **Network-Aware Polling**: pauses offline and slows down on slow links
//! - **Effects**: focus edges, wake lock, battery status, auto-pause
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pacer::libs::config::PollingConfig;
//! use pacer::libs::polling::SmartPoller;
//! use pacer::libs::visibility::VisibilitySignal;
//!
//! #[tokio::main]
//! async fn main() {
//!     pacer::libs::logging::init();
//!
//!     let visibility = VisibilitySignal::new(true);
//!     let mut poller = SmartPoller::new(
//!         || async { Ok::<_, anyhow::Error>("pong".to_string()) },
//!         PollingConfig::default(),
//!         visibility.clone(),
//!     );
//!     poller.start();
//!
//!     // Forward platform events as they arrive.
//!     visibility.set_visible(false);
//! }
//! ```

pub mod libs;
