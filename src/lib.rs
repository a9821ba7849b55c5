//! Sahaayak - a status watcher for civic complaint tracking.
//!
//! This library provides the core functionality for the `shk` CLI tool:
//! fetching complaints from the Sahaayak REST API, rendering them, keeping
//! the rendered view in sync by polling, and notifying on status changes.

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod models;
pub mod notify;
pub mod render;
pub mod sync;
pub mod tui;

pub use api::ApiError;

/// Library-level error type for Sahaayak operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Sahaayak operations.
pub type Result<T> = std::result::Result<T, Error>;
