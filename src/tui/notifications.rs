//! Notifications module for the TUI
//!
//! Provides toasts with auto-dismiss and overflow handling, plus a history
//! of every notification shown this session.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::render::relative_age;

/// Maximum number of toasts to display at once
const MAX_VISIBLE_TOASTS: usize = 3;

/// Default auto-dismiss duration in seconds
const DEFAULT_DISMISS_SECONDS: u64 = 5;

/// Maximum history entries to keep
const MAX_HISTORY_ENTRIES: usize = 100;

/// Notification level (determines styling and bell behavior)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Informational message
    Info,
    /// A complaint changed status
    StatusChange,
    /// Action succeeded (status set, feedback sent)
    Success,
    /// Action failed
    Error,
}

impl NotificationLevel {
    pub fn color(&self) -> ratatui::style::Color {
        use ratatui::style::Color;
        match self {
            NotificationLevel::Info => Color::Blue,
            NotificationLevel::StatusChange => Color::Cyan,
            NotificationLevel::Success => Color::Green,
            NotificationLevel::Error => Color::Red,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            NotificationLevel::Info => "ℹ",
            NotificationLevel::StatusChange => "🔔",
            NotificationLevel::Success => "✓",
            NotificationLevel::Error => "✗",
        }
    }

    /// Whether this level should trigger a bell
    pub fn should_bell(&self) -> bool {
        matches!(self, NotificationLevel::StatusChange)
    }
}

/// A single toast notification
#[derive(Debug, Clone)]
pub struct Toast {
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: Instant,
    /// How long before auto-dismiss
    pub duration: Duration,
}

impl Toast {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            created_at: Instant::now(),
            duration: Duration::from_secs(DEFAULT_DISMISS_SECONDS),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.duration
    }
}

/// Entry in the notification history
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub level: NotificationLevel,
    pub message: String,
    pub timestamp: DateTime<Local>,
}

impl HistoryEntry {
    /// Format relative time since notification
    pub fn relative_time(&self) -> String {
        relative_age(self.timestamp.naive_local(), Local::now().naive_local())
    }
}

/// Notification manager - handles toasts and history
#[derive(Debug)]
pub struct NotificationManager {
    /// Active toasts (newest first)
    toasts: VecDeque<Toast>,
    /// Notification history (newest first)
    history: VecDeque<HistoryEntry>,
    pub bell_enabled: bool,
    pub history_visible: bool,
    /// Selected history index (for navigation)
    pub history_selected: usize,
    /// Count of toasts not displayed
    pub overflow_count: usize,
    bell_pending: bool,
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationManager {
    pub fn new() -> Self {
        Self {
            toasts: VecDeque::new(),
            history: VecDeque::new(),
            bell_enabled: true,
            history_visible: false,
            history_selected: 0,
            overflow_count: 0,
            bell_pending: false,
        }
    }

    /// Add a new notification
    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        let toast = Toast::new(level, message);

        self.history.push_front(HistoryEntry {
            level,
            message: toast.message.clone(),
            timestamp: Local::now(),
        });
        if self.history.len() > MAX_HISTORY_ENTRIES {
            self.history.pop_back();
        }

        self.toasts.push_front(toast);
        self.update_overflow();

        if self.bell_enabled && level.should_bell() {
            self.bell_pending = true;
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.notify(NotificationLevel::Info, message);
    }

    pub fn status_change(&mut self, message: impl Into<String>) {
        self.notify(NotificationLevel::StatusChange, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.notify(NotificationLevel::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.notify(NotificationLevel::Error, message);
    }

    /// Remove expired toasts
    pub fn cleanup(&mut self) {
        self.toasts.retain(|t| !t.is_expired());
        self.update_overflow();
    }

    /// Dismiss all toasts
    pub fn dismiss_all(&mut self) {
        self.toasts.clear();
        self.update_overflow();
    }

    /// Get visible toasts (limited by MAX_VISIBLE_TOASTS)
    pub fn visible_toasts(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter().take(MAX_VISIBLE_TOASTS)
    }

    pub fn has_toasts(&self) -> bool {
        !self.toasts.is_empty()
    }

    fn update_overflow(&mut self) {
        self.overflow_count = self.toasts.len().saturating_sub(MAX_VISIBLE_TOASTS);
    }

    /// Toggle history overlay visibility
    pub fn toggle_history(&mut self) {
        self.history_visible = !self.history_visible;
        if self.history_visible {
            self.history_selected = 0;
        }
    }

    pub fn close_history(&mut self) {
        self.history_visible = false;
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn history_is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn history_next(&mut self) {
        if self.history_selected < self.history.len().saturating_sub(1) {
            self.history_selected += 1;
        }
    }

    pub fn history_previous(&mut self) {
        self.history_selected = self.history_selected.saturating_sub(1);
    }

    /// Should the terminal bell be rung? Returns true once per notification.
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.bell_pending)
    }
}
