//! Data models for Sahaayak.
//!
//! A [`Complaint`] is one citizen-reported civic issue as served by
//! `/api/complaints` and `/api/my-complaints`. Only `id` and `status` take
//! part in synchronization; everything else is display payload.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// Server-assigned complaint identifier.
pub type ComplaintId = i64;

/// Timestamp format used by the server for `created_at`.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Complaint lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

impl Status {
    /// Every status, in workflow order.
    pub const ALL: [Status; 3] = [Status::Pending, Status::InProgress, Status::Resolved];

    /// Parse from user input, case-insensitive.
    ///
    /// Accepts the wire form (`In Progress`) as well as `in-progress`,
    /// `in_progress` and `inprogress`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Status::Pending),
            "in progress" | "in-progress" | "in_progress" | "inprogress" => {
                Some(Status::InProgress)
            }
            "resolved" => Some(Status::Resolved),
            _ => None,
        }
    }

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::InProgress => "In Progress",
            Status::Resolved => "Resolved",
        }
    }

    /// Style class used by the dashboard (`status <class>`).
    pub fn css_class(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "inprogress",
            Status::Resolved => "resolved",
        }
    }

    /// The next status in workflow order, wrapping around.
    pub fn next(&self) -> Self {
        match self {
            Status::Pending => Status::InProgress,
            Status::InProgress => Status::Resolved,
            Status::Resolved => Status::Pending,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Status::parse(s).ok_or_else(|| {
            format!(
                "invalid status '{}': expected Pending, In Progress or Resolved",
                s
            )
        })
    }
}

/// Complaint priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    /// Parse from user input, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    /// Style class used by the dashboard (`priority <class>`).
    pub fn css_class(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// The next priority, wrapping around.
    pub fn next(&self) -> Self {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Low,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Priority::parse(s)
            .ok_or_else(|| format!("invalid priority '{}': expected Low, Medium or High", s))
    }
}

/// A complaint record as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: ComplaintId,
    /// Citizen name
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Photo URL (relative to the server)
    #[serde(default)]
    pub photo: Option<String>,
    /// Voice note URL (relative to the server)
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub longitude: Option<f64>,
    /// Reverse-geocoded address
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: Status,
    /// Priority set by staff
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Priority computed by the server from nearby complaints
    #[serde(default)]
    pub auto_priority: Option<Priority>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Complaint {
    /// Create a complaint with only an id and status set.
    pub fn new(id: ComplaintId, status: Status) -> Self {
        Self {
            id,
            name: None,
            description: None,
            category: None,
            photo: None,
            voice: None,
            latitude: None,
            longitude: None,
            address: None,
            status,
            priority: None,
            auto_priority: None,
            rating: None,
            feedback: None,
            created_at: None,
        }
    }

    /// Category for display, defaulting to "Other".
    pub fn display_category(&self) -> &str {
        match self.category.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => "Other",
        }
    }

    /// Citizen name for display.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(n) if !n.is_empty() => n,
            _ => "N/A",
        }
    }

    /// Auto-priority for display, defaulting to Medium.
    pub fn display_auto_priority(&self) -> Priority {
        self.auto_priority.unwrap_or_default()
    }

    /// Both coordinates, if the complaint carries a location.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Parse `created_at` into a timestamp.
    pub fn created_at_parsed(&self) -> Option<NaiveDateTime> {
        self.created_at
            .as_deref()
            .and_then(|s| NaiveDateTime::parse_from_str(s, CREATED_AT_FORMAT).ok())
    }

    /// Whether the citizen may rate this complaint.
    pub fn is_feedback_eligible(&self) -> bool {
        self.status == Status::Resolved && self.rating.is_none()
    }
}

/// Treat `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Coordinates arrive as numbers, numeric strings, empty strings or null.
fn lenient_coordinate<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Filters for the staff dashboard feed (`/api/complaints`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplaintFilter {
    pub status: Option<Status>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub priority: Option<Priority>,
}

impl ComplaintFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Query string pairs, in `status, category, date, priority` order.
    /// Empty values are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            pairs.push(("category", category.to_string()));
        }
        if let Some(date) = self.date {
            pairs.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(priority) = self.priority {
            pairs.push(("priority", priority.as_str().to_string()));
        }
        pairs
    }
}

/// Sort order for the citizen feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            _ => Err(format!("invalid sort '{}': expected newest or oldest", s)),
        }
    }
}

/// Query for the citizen feed (`/api/my-complaints`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MyComplaintsQuery {
    name: String,
    pub status: Option<Status>,
    pub sort: SortOrder,
}

impl MyComplaintsQuery {
    /// Create a query for one citizen. The name must not be blank.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidInput(
                "Please enter your name to view your complaints.".to_string(),
            ));
        }
        Ok(Self {
            name,
            status: None,
            sort: SortOrder::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_status(mut self, status: Option<Status>) -> Self {
        self.status = status;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Query string pairs. `sort` is always sent.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("name", self.name.clone())];
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        pairs.push(("sort", self.sort.as_str().to_string()));
        pairs
    }
}

/// Post-resolution feedback from a citizen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackRequest {
    pub rating: u8,
    pub feedback: String,
}

impl FeedbackRequest {
    pub fn new(rating: u8, feedback: impl Into<String>) -> Result<Self> {
        if !(1..=5).contains(&rating) {
            return Err(Error::InvalidInput(format!(
                "rating must be between 1 and 5, got {}",
                rating
            )));
        }
        Ok(Self {
            rating,
            feedback: feedback.into(),
        })
    }
}

/// A status change observed between two fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusTransition {
    pub id: ComplaintId,
    pub from: Status,
    pub to: Status,
}

impl StatusTransition {
    /// Notification text for this transition.
    pub fn message(&self) -> String {
        format!("Complaint #{} status updated: {}", self.id, self.to)
    }
}
