//! Access to the Sahaayak complaints REST API.
//!
//! [`ApiClient`] speaks the HTTP contract; [`ComplaintSource`] is the seam the
//! synchronizer polls through, so tests can swap in an in-memory source.

mod client;

use async_trait::async_trait;

use crate::models::{Complaint, ComplaintFilter, MyComplaintsQuery};

pub use client::{ApiClient, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVER_URL};

/// Failure talking to the API.
///
/// Every variant is recoverable: callers render it in place and wait for the
/// next poll.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection refused, DNS failure, timeout, or a body that could not be read
    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Non-success HTTP status without an error body
    #[error("HTTP error! status: {status}")]
    Status { status: u16 },

    /// Body was not the JSON we expected
    #[error("Malformed response: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Server answered with an explicit `{"error": "..."}`
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Short human-readable description for in-place display.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(e) if e.is_timeout() => {
                "The complaints server took too long to respond".to_string()
            }
            ApiError::Transport(_) => "Could not reach the complaints server".to_string(),
            ApiError::Status { status } => format!("The server returned HTTP {}", status),
            ApiError::Malformed(_) => "The server sent an unexpected response".to_string(),
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::InvalidUrl(url) => format!("Invalid server URL: {}", url),
        }
    }

    /// Whether the request never produced an HTTP response.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

/// Something that can produce the current set of complaints.
#[async_trait]
pub trait ComplaintSource: Send + Sync {
    /// Fetch the current records.
    async fn fetch(&self) -> Result<Vec<Complaint>, ApiError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Which complaints feed to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    /// Staff dashboard (`/api/complaints`)
    Dashboard(ComplaintFilter),
    /// One citizen's complaints (`/api/my-complaints`)
    Citizen(MyComplaintsQuery),
}

impl Feed {
    pub fn is_citizen(&self) -> bool {
        matches!(self, Feed::Citizen(_))
    }
}

/// A [`ComplaintSource`] backed by the HTTP API.
#[derive(Debug, Clone)]
pub struct ApiFeed {
    client: ApiClient,
    feed: Feed,
}

impl ApiFeed {
    pub fn new(client: ApiClient, feed: Feed) -> Self {
        Self { client, feed }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }
}

#[async_trait]
impl ComplaintSource for ApiFeed {
    async fn fetch(&self) -> Result<Vec<Complaint>, ApiError> {
        match &self.feed {
            Feed::Dashboard(filter) => self.client.list_complaints(filter).await,
            Feed::Citizen(query) => self.client.my_complaints(query).await,
        }
    }

    fn describe(&self) -> String {
        match &self.feed {
            Feed::Dashboard(_) => format!("{}api/complaints", self.client.base_url()),
            Feed::Citizen(query) => format!(
                "{}api/my-complaints (name={})",
                self.client.base_url(),
                query.name()
            ),
        }
    }
}
