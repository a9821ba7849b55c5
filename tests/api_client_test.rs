//! `ApiClient` against canned HTTP responses.

use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use sahaayak::api::{ApiClient, ApiError};
use sahaayak::models::{
    ComplaintFilter, FeedbackRequest, MyComplaintsQuery, Priority, SortOrder, Status,
};
use serde_json::json;

/// Serve `app` on a random port and return a client for it.
async fn serve(app: Router) -> ApiClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    ApiClient::new(&url, Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_lenient_record_decoding() {
    let app = Router::new().route(
        "/api/complaints",
        get(|| async {
            Json(json!([
                {
                    "id": 1,
                    "status": "In Progress",
                    "latitude": "12.5",
                    "longitude": 77.25,
                    "priority": "High",
                    "created_at": "2026-10-01 09:30:00"
                },
                { "id": 2, "status": null, "latitude": "", "longitude": null }
            ]))
        }),
    );
    let client = serve(app).await;

    let records = client.list_complaints(&ComplaintFilter::new()).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].status, Status::InProgress);
    assert_eq!(records[0].coordinates(), Some((12.5, 77.25)));
    assert_eq!(records[0].priority, Some(Priority::High));
    assert!(records[0].created_at_parsed().is_some());

    assert_eq!(records[1].status, Status::Pending);
    assert_eq!(records[1].coordinates(), None);
    assert_eq!(records[1].display_category(), "Other");
}

#[tokio::test]
async fn test_citizen_query_reaches_server() {
    let app = Router::new().route(
        "/api/my-complaints",
        get(
            |axum::extract::Query(q): axum::extract::Query<std::collections::HashMap<String, String>>| async move {
                // Echo the query back through the description field
                let echoed = format!(
                    "{}|{}|{}",
                    q.get("name").cloned().unwrap_or_default(),
                    q.get("status").cloned().unwrap_or_default(),
                    q.get("sort").cloned().unwrap_or_default()
                );
                Json(json!([{ "id": 4, "status": "Resolved", "description": echoed }]))
            },
        ),
    );
    let client = serve(app).await;

    let query = MyComplaintsQuery::new("Meera Nair")
        .unwrap()
        .with_status(Some(Status::Resolved))
        .with_sort(SortOrder::Oldest);
    let records = client.my_complaints(&query).await.unwrap();
    assert_eq!(
        records[0].description.as_deref(),
        Some("Meera Nair|Resolved|oldest")
    );
}

#[tokio::test]
async fn test_server_error_without_body() {
    let app = Router::new().route(
        "/api/complaints",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "<h1>Internal Server Error</h1>") }),
    );
    let client = serve(app).await;

    let err = client.list_complaints(&ComplaintFilter::new()).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 500 }));
    assert_eq!(err.user_message(), "The server returned HTTP 500");
}

#[tokio::test]
async fn test_malformed_bodies() {
    let app = Router::new()
        .route("/api/complaints", get(|| async { "definitely not json" }))
        .route(
            "/api/my-complaints",
            get(|| async { Json(json!({ "complaints": [] })) }),
        );
    let client = serve(app).await;

    let err = client.list_complaints(&ComplaintFilter::new()).await.unwrap_err();
    assert!(matches!(err, ApiError::Malformed(_)));

    // An object where an array is expected
    let query = MyComplaintsQuery::new("Asha").unwrap();
    let err = client.my_complaints(&query).await.unwrap_err();
    assert!(matches!(err, ApiError::Malformed(_)));
}

#[tokio::test]
async fn test_unknown_status_is_malformed() {
    let app = Router::new().route(
        "/api/complaints",
        get(|| async { Json(json!([{ "id": 1, "status": "Closed" }])) }),
    );
    let client = serve(app).await;

    let err = client.list_complaints(&ComplaintFilter::new()).await.unwrap_err();
    assert!(matches!(err, ApiError::Malformed(_)));
}

#[tokio::test]
async fn test_feedback_rejection_carries_message() {
    let app = Router::new().route(
        "/api/complaints/:id/feedback",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Feedback already submitted" })),
            )
        }),
    );
    let client = serve(app).await;

    let request = FeedbackRequest::new(4, "Quick fix").unwrap();
    let err = client.submit_feedback(11, &request).await.unwrap_err();
    match err {
        ApiError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Feedback already submitted");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ok_status_with_error_field_is_rejection() {
    let app = Router::new().route(
        "/api/update-priority/:id",
        axum::routing::put(|| async { Json(json!({ "error": "Invalid priority" })) }),
    );
    let client = serve(app).await;

    let err = client.update_priority(3, Priority::Low).await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected { status: 200, .. }));
}

#[tokio::test]
async fn test_unreachable_server() {
    // Bind then drop to get a port nothing listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = ApiClient::new(&format!("http://127.0.0.1:{}", port), Duration::from_secs(2)).unwrap();

    let err = client.list_complaints(&ComplaintFilter::new()).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.user_message(), "Could not reach the complaints server");
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let app = Router::new().route(
        "/api/complaints",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!([]))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let client = ApiClient::new(&url, Duration::from_millis(200)).unwrap();

    let err = client.list_complaints(&ComplaintFilter::new()).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(
        err.user_message(),
        "The complaints server took too long to respond"
    );
}
