//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The [`SahaayakConfig`] struct mirroring the file
//! - Serialization/deserialization to/from KDL format
//! - Per-key parsing for `shk config set`
//! - Validation

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

use crate::notify::Permission;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keys accepted in config.kdl and by `shk config set`.
pub const CONFIG_KEYS: [&str; 6] = [
    "server-url",
    "poll-interval-secs",
    "request-timeout-secs",
    "notifications",
    "output-format",
    "prune-after-misses",
];

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// server-url "http://localhost:5000"
/// poll-interval-secs 15
/// request-timeout-secs 10
/// notifications "ask"  // or "granted" / "denied"
/// output-format "human"  // or "json"
/// prune-after-misses 20
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SahaayakConfig {
    /// Base URL of the complaints service
    pub server_url: Option<String>,

    /// Seconds between refreshes while watching
    pub poll_interval_secs: Option<u64>,

    /// Seconds before a request is abandoned
    pub request_timeout_secs: Option<u64>,

    /// Remembered answer to the notification permission prompt
    pub notifications: Option<Permission>,

    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Forget complaints missing from this many consecutive refreshes
    pub prune_after_misses: Option<u32>,
}

fn first_string<'a>(doc: &'a KdlDocument, key: &str) -> Option<&'a str> {
    doc.get(key)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
}

fn first_integer(doc: &KdlDocument, key: &str) -> Option<i128> {
    doc.get(key)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_integer())
}

fn push_string(doc: &mut KdlDocument, key: &str, value: &str) {
    let mut node = KdlNode::new(key);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    doc.nodes_mut().push(node);
}

fn push_integer(doc: &mut KdlDocument, key: &str, value: i128) {
    let mut node = KdlNode::new(key);
    node.push(KdlEntry::new(KdlValue::Integer(value)));
    doc.nodes_mut().push(node);
}

fn parse_seconds(key: &str, value: &str) -> Result<u64, String> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs >= 1 => Ok(secs),
        _ => Err(format!("{} must be a whole number of seconds >= 1, got '{}'", key, value)),
    }
}

impl SahaayakConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(url) = &self.server_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!(
                    "server-url must start with http:// or https://, got '{}'",
                    url
                ));
            }
        }
        if self.poll_interval_secs == Some(0) {
            return Err("poll-interval-secs must be >= 1".to_string());
        }
        if self.request_timeout_secs == Some(0) {
            return Err("request-timeout-secs must be >= 1".to_string());
        }
        Ok(())
    }

    /// Parse config from a KDL document. Out-of-range values are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let positive_secs =
            |key: &str| first_integer(doc, key).and_then(|i| u64::try_from(i).ok().filter(|&n| n >= 1));

        Self {
            server_url: first_string(doc, "server-url").map(|s| s.to_string()),
            poll_interval_secs: positive_secs("poll-interval-secs"),
            request_timeout_secs: positive_secs("request-timeout-secs"),
            notifications: first_string(doc, "notifications").and_then(Permission::parse),
            output_format: first_string(doc, "output-format").and_then(OutputFormat::parse),
            prune_after_misses: first_integer(doc, "prune-after-misses")
                .and_then(|i| u32::try_from(i).ok()),
        }
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(url) = &self.server_url {
            push_string(&mut doc, "server-url", url);
        }
        if let Some(secs) = self.poll_interval_secs {
            push_integer(&mut doc, "poll-interval-secs", secs as i128);
        }
        if let Some(secs) = self.request_timeout_secs {
            push_integer(&mut doc, "request-timeout-secs", secs as i128);
        }
        if let Some(permission) = self.notifications {
            push_string(&mut doc, "notifications", permission.as_str());
        }
        if let Some(format) = self.output_format {
            push_string(&mut doc, "output-format", format.as_str());
        }
        if let Some(misses) = self.prune_after_misses {
            push_integer(&mut doc, "prune-after-misses", misses as i128);
        }

        doc
    }

    /// Set one key from its textual form, as given to `shk config set`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "server-url" => {
                let candidate = Self {
                    server_url: Some(value.trim().to_string()),
                    ..Self::default()
                };
                candidate.validate()?;
                self.server_url = candidate.server_url;
            }
            "poll-interval-secs" => self.poll_interval_secs = Some(parse_seconds(key, value)?),
            "request-timeout-secs" => self.request_timeout_secs = Some(parse_seconds(key, value)?),
            "notifications" => {
                self.notifications = Some(Permission::parse(value).ok_or_else(|| {
                    format!("notifications must be ask, granted or denied, got '{}'", value)
                })?);
            }
            "output-format" => {
                self.output_format = Some(OutputFormat::parse(value).ok_or_else(|| {
                    format!("output-format must be json or human, got '{}'", value)
                })?);
            }
            "prune-after-misses" => {
                let misses = value.trim().parse::<u32>().map_err(|_| {
                    format!("prune-after-misses must be a whole number, got '{}'", value)
                })?;
                self.prune_after_misses = Some(misses);
            }
            _ => {
                return Err(format!(
                    "Unknown config key '{}'. Valid keys: {}",
                    key,
                    CONFIG_KEYS.join(", ")
                ));
            }
        }
        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &SahaayakConfig) {
        if other.server_url.is_some() {
            self.server_url = other.server_url.clone();
        }
        if other.poll_interval_secs.is_some() {
            self.poll_interval_secs = other.poll_interval_secs;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        if other.notifications.is_some() {
            self.notifications = other.notifications;
        }
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.prune_after_misses.is_some() {
            self.prune_after_misses = other.prune_after_misses;
        }
    }
}
