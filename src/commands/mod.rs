//! Command implementations for the sahaayak CLI.
//!
//! One-shot commands talk to the API once and return a [`CommandResult`];
//! `main` prints it as JSON or human-readable text. Long-running watch mode
//! lives in [`watch`].

pub mod watch;

use std::path::PathBuf;

use serde::Serialize;

use crate::api::{ApiClient, ApiError};
use crate::config::{self, ResolvedConfig};
use crate::models::{
    Complaint, ComplaintFilter, ComplaintId, FeedbackRequest, MyComplaintsQuery, Priority, Status,
};
use crate::render::{Layout, html, text};
use crate::{Error, Result};

pub use watch::{WatchOptions, watch_plain};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Serialize a result, falling back to an error object if serialization fails.
fn json_or_error<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

// === Listing ===

/// Result of `shk list` / `shk mine`.
#[derive(Serialize)]
pub struct ComplaintList {
    pub count: usize,
    pub complaints: Vec<Complaint>,
    #[serde(skip)]
    pub layout: Layout,
    /// Render as an HTML table body instead
    #[serde(skip)]
    pub html: bool,
}

impl ComplaintList {
    fn new(layout: Layout, complaints: Vec<Complaint>, html: bool) -> Self {
        Self {
            count: complaints.len(),
            complaints,
            layout,
            html,
        }
    }
}

impl CommandResult for ComplaintList {
    fn to_json(&self) -> String {
        if self.html {
            return json_or_error(&serde_json::json!({
                "count": self.count,
                "html": html::render_rows(self.layout, &self.complaints),
            }));
        }
        json_or_error(self)
    }

    fn to_human(&self) -> String {
        if self.html {
            return html::render_rows(self.layout, &self.complaints);
        }
        text::render_table(self.layout, &self.complaints)
    }
}

/// Fetch the staff dashboard once.
pub async fn list(client: &ApiClient, filter: &ComplaintFilter, html: bool) -> Result<ComplaintList> {
    let complaints = client.list_complaints(filter).await?;
    Ok(ComplaintList::new(Layout::Dashboard, complaints, html))
}

/// Fetch one citizen's complaints once.
pub async fn mine(client: &ApiClient, query: &MyComplaintsQuery, html: bool) -> Result<ComplaintList> {
    let complaints = client.my_complaints(query).await?;
    Ok(ComplaintList::new(Layout::Citizen, complaints, html))
}

// === Mutations ===

/// Result of `shk set-status`.
#[derive(Serialize)]
pub struct StatusUpdated {
    pub id: ComplaintId,
    pub status: Status,
}

impl CommandResult for StatusUpdated {
    fn to_json(&self) -> String {
        json_or_error(self)
    }

    fn to_human(&self) -> String {
        format!("Complaint #{} status set to {}", self.id, self.status)
    }
}

pub async fn set_status(client: &ApiClient, id: ComplaintId, status: Status) -> Result<StatusUpdated> {
    client.update_status(id, status).await?;
    tracing::info!(id, status = %status, "updated complaint status");
    Ok(StatusUpdated { id, status })
}

/// Result of `shk set-priority`.
#[derive(Serialize)]
pub struct PriorityUpdated {
    pub id: ComplaintId,
    pub priority: Priority,
}

impl CommandResult for PriorityUpdated {
    fn to_json(&self) -> String {
        json_or_error(self)
    }

    fn to_human(&self) -> String {
        format!("Complaint #{} priority set to {}", self.id, self.priority)
    }
}

pub async fn set_priority(
    client: &ApiClient,
    id: ComplaintId,
    priority: Priority,
) -> Result<PriorityUpdated> {
    client.update_priority(id, priority).await?;
    tracing::info!(id, priority = %priority, "updated complaint priority");
    Ok(PriorityUpdated { id, priority })
}

/// Shown after feedback is accepted.
pub const FEEDBACK_THANKS: &str = "Thank you for your feedback!";

/// Result of `shk feedback`.
#[derive(Serialize)]
pub struct FeedbackSubmitted {
    pub id: ComplaintId,
    pub rating: u8,
    pub message: &'static str,
}

impl CommandResult for FeedbackSubmitted {
    fn to_json(&self) -> String {
        json_or_error(self)
    }

    fn to_human(&self) -> String {
        self.message.to_string()
    }
}

/// Map a feedback submission failure to the message a citizen sees.
pub fn feedback_error_message(error: &ApiError) -> String {
    match error {
        ApiError::Rejected { message, .. } => format!("Error submitting feedback: {}", message),
        _ => "Error submitting feedback. Please try again.".to_string(),
    }
}

pub async fn feedback(
    client: &ApiClient,
    id: ComplaintId,
    rating: u8,
    message: &str,
) -> Result<FeedbackSubmitted> {
    let request = FeedbackRequest::new(rating, message)?;
    if let Err(e) = client.submit_feedback(id, &request).await {
        tracing::warn!(id, error = %e, "feedback submission failed");
        return Err(Error::Other(feedback_error_message(&e)));
    }
    Ok(FeedbackSubmitted {
        id,
        rating,
        message: FEEDBACK_THANKS,
    })
}

// === Config ===

/// Result of `shk config show`.
#[derive(Serialize)]
pub struct ConfigShow {
    pub path: PathBuf,
    pub config: ResolvedConfig,
}

impl CommandResult for ConfigShow {
    fn to_json(&self) -> String {
        json_or_error(self)
    }

    fn to_human(&self) -> String {
        let c = &self.config;
        let prune = match &c.prune_after_misses {
            Some(r) => format!("{} ({})", r.value, r.source),
            None => "never (default)".to_string(),
        };
        let lines = [
            format!("Config file: {}", self.path.display()),
            String::new(),
            format!("  server-url:           {} ({})", c.server_url.value, c.server_url.source),
            format!(
                "  poll-interval-secs:   {} ({})",
                c.poll_interval_secs.value, c.poll_interval_secs.source
            ),
            format!(
                "  request-timeout-secs: {} ({})",
                c.request_timeout_secs.value, c.request_timeout_secs.source
            ),
            format!(
                "  notifications:        {} ({})",
                c.notifications.value, c.notifications.source
            ),
            format!(
                "  output-format:        {} ({})",
                c.output_format.value, c.output_format.source
            ),
            format!("  prune-after-misses:   {}", prune),
        ];
        lines.join("\n")
    }
}

pub fn config_show(resolved: ResolvedConfig) -> Result<ConfigShow> {
    Ok(ConfigShow {
        path: config::config_path()?,
        config: resolved,
    })
}

/// Result of `shk config set`.
#[derive(Serialize)]
pub struct ConfigSet {
    pub key: String,
    pub value: String,
    pub path: PathBuf,
}

impl CommandResult for ConfigSet {
    fn to_json(&self) -> String {
        json_or_error(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path.display())
    }
}

pub fn config_set(key: &str, value: &str) -> Result<ConfigSet> {
    let mut file = config::read_config()?;
    file.set(key, value).map_err(Error::Config)?;
    let path = config::write_config(&file)?;
    Ok(ConfigSet {
        key: key.to_string(),
        value: value.trim().to_string(),
        path,
    })
}

/// Result of `shk config path`.
#[derive(Serialize)]
pub struct ConfigPath {
    pub path: PathBuf,
    pub exists: bool,
}

impl CommandResult for ConfigPath {
    fn to_json(&self) -> String {
        json_or_error(self)
    }

    fn to_human(&self) -> String {
        if self.exists {
            self.path.display().to_string()
        } else {
            format!("{} (not created yet)", self.path.display())
        }
    }
}

pub fn config_path() -> Result<ConfigPath> {
    let path = config::config_path()?;
    Ok(ConfigPath {
        exists: path.exists(),
        path,
    })
}
