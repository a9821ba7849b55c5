//! Server health as seen through polling
//!
//! There is no persistent connection; health is inferred from the outcome of
//! the most recent fetches.

use chrono::{DateTime, Local};
use ratatui::style::Color;

/// Connection state enum
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// No fetch has completed yet
    Connecting,
    /// Last fetch succeeded
    Connected { last_sync: DateTime<Local> },
    /// One or more consecutive fetches failed
    Failing { failures: u32, message: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }

    /// Record a successful fetch.
    pub fn record_success(&mut self, at: DateTime<Local>) {
        *self = ConnectionState::Connected { last_sync: at };
    }

    /// Record a failed fetch.
    pub fn record_failure(&mut self, message: impl Into<String>) {
        let failures = match self {
            ConnectionState::Failing { failures, .. } => failures.saturating_add(1),
            _ => 1,
        };
        *self = ConnectionState::Failing {
            failures,
            message: message.into(),
        };
    }

    pub fn indicator(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "○",
            ConnectionState::Connected { .. } => "●",
            ConnectionState::Failing { .. } => "✗",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            ConnectionState::Connecting => Color::Yellow,
            ConnectionState::Connected { .. } => Color::Green,
            ConnectionState::Failing { .. } => Color::Red,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ConnectionState::Connecting => "Connecting...".to_string(),
            ConnectionState::Connected { last_sync } => {
                format!("Synced {}", last_sync.format("%H:%M:%S"))
            }
            ConnectionState::Failing { failures: 1, message } => message.clone(),
            ConnectionState::Failing { failures, message } => {
                format!("{} ({} failed refreshes)", message, failures)
            }
        }
    }
}
