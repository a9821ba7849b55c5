//! Terminal User Interface module for sahaayak
//!
//! This module provides a keyboard-driven dashboard that keeps a complaint
//! table in sync with the server, shows status-change notifications as
//! toasts, and lets staff update complaints or citizens leave feedback.
//! Terminal focus stands in for page visibility: polling pauses while the
//! window is unfocused.

#[cfg(feature = "tui")]
mod app;
#[cfg(feature = "tui")]
mod bridge;
#[cfg(feature = "tui")]
mod connection;
#[cfg(feature = "tui")]
mod notifications;
#[cfg(feature = "tui")]
mod views;

#[cfg(feature = "tui")]
pub use app::run_tui;
#[cfg(feature = "tui")]
pub use bridge::{ChannelNotifier, ChannelView, UiEvent};
#[cfg(feature = "tui")]
pub use notifications::{NotificationLevel, NotificationManager, Toast};
