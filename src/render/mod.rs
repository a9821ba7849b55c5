//! Rendering of complaint records.
//!
//! The [`View`] trait is what the synchronizer keeps up to date. The helpers
//! here are the display rules shared by every view: the HTML table
//! ([`html`]), the plain terminal table ([`text`]) and the TUI.

pub mod html;
pub mod text;

use chrono::NaiveDateTime;

use crate::api::{ApiError, Feed};
use crate::models::{Complaint, Status};

pub use html::HtmlTableView;
pub use text::TerminalView;

/// A rendered view of the complaint list.
///
/// Methods take `&self` because the synchronizer drives the view from its
/// polling tasks; implementations use interior mutability.
pub trait View: Send + Sync {
    /// A fetch started (`true`) or finished (`false`).
    fn show_loading(&self, _loading: bool) {}

    /// Replace the rendered rows with `records`.
    fn show_records(&self, records: &[Complaint]);

    /// Replace the rendered rows with a failure message.
    fn show_error(&self, error: &ApiError);
}

/// Which table is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Staff dashboard: every complaint, with status/priority controls
    Dashboard,
    /// Citizen view: one citizen's complaints, with feedback actions
    Citizen,
}

impl Layout {
    pub fn for_feed(feed: &Feed) -> Self {
        if feed.is_citizen() {
            Layout::Citizen
        } else {
            Layout::Dashboard
        }
    }

    /// Number of table columns (used for placeholder rows).
    pub fn columns(&self) -> usize {
        match self {
            Layout::Dashboard => 11,
            Layout::Citizen => 7,
        }
    }

    /// Placeholder shown when a fetch returns no records.
    pub fn empty_message(&self) -> &'static str {
        match self {
            Layout::Dashboard => "No complaints found.",
            Layout::Citizen => "No complaints found for your name.",
        }
    }

    /// Placeholder shown when a fetch fails.
    pub fn error_message(&self) -> &'static str {
        match self {
            Layout::Dashboard => "Error loading complaints. Check server connection.",
            Layout::Citizen => "Error loading complaints. Please check your connection.",
        }
    }
}

/// What a citizen can do with a complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitizenAction {
    /// Resolved and not yet rated
    RateAndFeedback,
    /// Already rated (1-5)
    Rated(u8),
    AwaitingResolution,
}

impl CitizenAction {
    pub fn for_complaint(complaint: &Complaint) -> Self {
        match complaint.rating {
            Some(rating) => CitizenAction::Rated(rating),
            None if complaint.status == Status::Resolved => CitizenAction::RateAndFeedback,
            None => CitizenAction::AwaitingResolution,
        }
    }

    pub fn label(&self) -> String {
        match self {
            CitizenAction::RateAndFeedback => "Rate & Feedback".to_string(),
            CitizenAction::Rated(rating) => format!("⭐ {}/5", rating),
            CitizenAction::AwaitingResolution => "Awaiting resolution".to_string(),
        }
    }
}

/// Coordinates line, if the complaint has a location.
pub fn coordinates_text(complaint: &Complaint) -> Option<String> {
    complaint
        .coordinates()
        .map(|(lat, lon)| format!("Lat: {}, Lng: {}", lat, lon))
}

/// Address for display.
pub fn address_text(complaint: &Complaint) -> &str {
    match complaint.address.as_deref() {
        Some(a) if !a.is_empty() => a,
        _ => "Not available",
    }
}

/// One-line location summary.
pub fn location_text(complaint: &Complaint) -> String {
    match coordinates_text(complaint) {
        Some(coords) => format!("{} 📍 {}", coords, address_text(complaint)),
        None => "Location not available".to_string(),
    }
}

/// Format the age of a timestamp relative to `now`.
pub fn relative_age(timestamp: NaiveDateTime, now: NaiveDateTime) -> String {
    let duration = now.signed_duration_since(timestamp);

    if duration.num_seconds() < 60 {
        "just now".to_string()
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else {
        format!("{}d ago", duration.num_days())
    }
}

/// Truncate to `max` characters, marking the cut with `...`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}
