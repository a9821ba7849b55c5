//! reqwest-backed client for the complaints endpoints.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::ApiError;
use crate::models::{
    Complaint, ComplaintFilter, ComplaintId, FeedbackRequest, MyComplaintsQuery, Priority, Status,
};

/// Default server address (the Flask development server)
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error envelope returned by the server on rejection.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the complaints API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    /// Create a client for `server_url` with a per-request timeout.
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut base = Url::parse(server_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", server_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(server_url.to_string()));
        }
        // Endpoints are joined relative to the base, so keep any path prefix.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self { http, base })
    }

    /// Base URL, always ending in `/`.
    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{}{}: {}", self.base, path, e)))
    }

    /// `GET /api/complaints` with optional filters.
    pub async fn list_complaints(
        &self,
        filter: &ComplaintFilter,
    ) -> Result<Vec<Complaint>, ApiError> {
        let url = self.endpoint("api/complaints")?;
        let response = self
            .http
            .get(url)
            .query(&filter.query_pairs())
            .send()
            .await
            .map_err(ApiError::Transport)?;
        decode_json(response).await
    }

    /// `GET /api/my-complaints` for one citizen.
    pub async fn my_complaints(
        &self,
        query: &MyComplaintsQuery,
    ) -> Result<Vec<Complaint>, ApiError> {
        let url = self.endpoint("api/my-complaints")?;
        let response = self
            .http
            .get(url)
            .query(&query.query_pairs())
            .send()
            .await
            .map_err(ApiError::Transport)?;
        decode_json(response).await
    }

    /// `PUT /api/complaints/{id}/status`
    pub async fn update_status(&self, id: ComplaintId, status: Status) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/complaints/{}/status", id))?;
        let response = self
            .http
            .put(url)
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .map_err(ApiError::Transport)?;
        expect_ok(response).await
    }

    /// `PUT /api/update-priority/{id}`
    pub async fn update_priority(
        &self,
        id: ComplaintId,
        priority: Priority,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/update-priority/{}", id))?;
        let response = self
            .http
            .put(url)
            .json(&serde_json::json!({ "priority": priority }))
            .send()
            .await
            .map_err(ApiError::Transport)?;
        expect_ok(response).await
    }

    /// `POST /api/complaints/{id}/feedback`
    pub async fn submit_feedback(
        &self,
        id: ComplaintId,
        feedback: &FeedbackRequest,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/complaints/{}/feedback", id))?;
        let response = self
            .http
            .post(url)
            .json(feedback)
            .send()
            .await
            .map_err(ApiError::Transport)?;
        expect_ok(response).await
    }
}

async fn read_body(response: Response) -> Result<(StatusCode, String), ApiError> {
    let status = response.status();
    let body = response.text().await.map_err(ApiError::Transport)?;
    Ok((status, body))
}

/// Map a non-success status to `Rejected` (with an error body) or `Status`.
fn check_status(status: StatusCode, body: &str) -> Result<(), ApiError> {
    if status.is_success() {
        return Ok(());
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error }) => Err(ApiError::Rejected {
            status: status.as_u16(),
            message: error,
        }),
        Err(_) => Err(ApiError::Status {
            status: status.as_u16(),
        }),
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let (status, body) = read_body(response).await?;
    check_status(status, &body)?;
    serde_json::from_str(&body).map_err(ApiError::Malformed)
}

/// Mutation responses only matter for their status, unless they carry an
/// explicit error field.
async fn expect_ok(response: Response) -> Result<(), ApiError> {
    let (status, body) = read_body(response).await?;
    check_status(status, &body)?;
    if let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(&body) {
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message: error,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_server_url() {
        let result = ApiClient::new("not a url", DEFAULT_REQUEST_TIMEOUT);
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
        let result = ApiClient::new("mailto:someone@example.com", DEFAULT_REQUEST_TIMEOUT);
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let client = ApiClient::new("http://example.com/sahaayak", DEFAULT_REQUEST_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "http://example.com/sahaayak/");
        assert_eq!(
            client.endpoint("api/complaints").unwrap().as_str(),
            "http://example.com/sahaayak/api/complaints"
        );
    }

    #[test]
    fn test_check_status_success() {
        assert!(check_status(StatusCode::OK, "").is_ok());
    }

    #[test]
    fn test_check_status_with_error_body_is_rejection() {
        let err = check_status(
            StatusCode::BAD_REQUEST,
            r#"{"error": "Rating must be between 1 and 5"}"#,
        )
        .unwrap_err();
        match err {
            ApiError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Rating must be between 1 and 5");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_check_status_without_error_body() {
        let err = check_status(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>").unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 500 }));
    }
}
