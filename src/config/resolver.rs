//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment (`SHK_SERVER_URL`)
//! 3. config.kdl (`~/.config/sahaayak/config.kdl`, or `$SHK_CONFIG_DIR/config.kdl`)
//! 4. Built-in defaults

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use kdl::KdlDocument;
use serde::Serialize;

use super::schema::{OutputFormat, SahaayakConfig};
use crate::api::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVER_URL};
use crate::notify::Permission;
use crate::sync::DEFAULT_POLL_INTERVAL;
use crate::{Error, Result};

/// Environment variable overriding the server URL.
pub const SERVER_URL_ENV: &str = "SHK_SERVER_URL";

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "SHK_CONFIG_DIR";

const CONFIG_FILE_NAME: &str = "config.kdl";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    ConfigFile,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile => write!(f, "config"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub server_url: Resolved<String>,
    pub poll_interval_secs: Resolved<u64>,
    pub request_timeout_secs: Resolved<u64>,
    pub notifications: Resolved<Permission>,
    pub output_format: Resolved<OutputFormat>,
    /// Unset means observed complaints are never forgotten
    pub prune_after_misses: Option<Resolved<u32>>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            server_url: Resolved::new(DEFAULT_SERVER_URL.to_string(), ValueSource::Default),
            poll_interval_secs: Resolved::new(DEFAULT_POLL_INTERVAL.as_secs(), ValueSource::Default),
            request_timeout_secs: Resolved::new(
                DEFAULT_REQUEST_TIMEOUT.as_secs(),
                ValueSource::Default,
            ),
            notifications: Resolved::new(Permission::Undecided, ValueSource::Default),
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            prune_after_misses: None,
        }
    }
}

impl ResolvedConfig {
    pub fn server_url(&self) -> &str {
        &self.server_url.value
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.value)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.value)
    }

    pub fn notifications(&self) -> Permission {
        self.notifications.value
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    pub fn prune_after_misses(&self) -> Option<u32> {
        self.prune_after_misses.as_ref().map(|r| r.value)
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub server_url: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = Some(secs);
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

/// Directory holding config.kdl.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let base = dirs::config_dir()
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
    Ok(base.join("sahaayak"))
}

/// Path of config.kdl.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Read config.kdl. A missing file is an empty config.
pub fn read_config() -> Result<SahaayakConfig> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(SahaayakConfig::new());
    }
    let content = fs::read_to_string(&path)?;
    let doc: KdlDocument = content
        .parse()
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    Ok(SahaayakConfig::from_kdl(&doc))
}

/// Write config.kdl, creating its directory if needed.
pub fn write_config(config: &SahaayakConfig) -> Result<PathBuf> {
    config.validate().map_err(Error::Config)?;
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut doc = config.to_kdl();
    doc.autoformat();
    fs::write(&path, doc.to_string())?;
    tracing::debug!(path = %path.display(), "wrote config");
    Ok(path)
}

/// Resolve configuration from an already-loaded file config.
///
/// Precedence (highest to lowest):
/// 1. CLI flags (from `overrides`)
/// 2. `SHK_SERVER_URL` environment variable (server URL only)
/// 3. config.kdl
/// 4. Built-in defaults
pub fn resolve_with(file: &SahaayakConfig, overrides: &ConfigOverrides) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();

    // Resolve server_url
    let env_url = std::env::var(SERVER_URL_ENV).ok().filter(|v| !v.is_empty());
    if let Some(url) = &overrides.server_url {
        result.server_url = Resolved::new(url.clone(), ValueSource::CliFlag);
    } else if let Some(url) = env_url {
        result.server_url = Resolved::new(url, ValueSource::EnvVar(SERVER_URL_ENV.to_string()));
    } else if let Some(url) = &file.server_url {
        result.server_url = Resolved::new(url.clone(), ValueSource::ConfigFile);
    }

    // Resolve poll_interval_secs
    if let Some(secs) = overrides.poll_interval_secs {
        result.poll_interval_secs = Resolved::new(secs.max(1), ValueSource::CliFlag);
    } else if let Some(secs) = file.poll_interval_secs {
        result.poll_interval_secs = Resolved::new(secs, ValueSource::ConfigFile);
    }

    if let Some(secs) = file.request_timeout_secs {
        result.request_timeout_secs = Resolved::new(secs, ValueSource::ConfigFile);
    }

    if let Some(permission) = file.notifications {
        result.notifications = Resolved::new(permission, ValueSource::ConfigFile);
    }

    // Resolve output_format
    if let Some(format) = overrides.output_format {
        result.output_format = Resolved::new(format, ValueSource::CliFlag);
    } else if let Some(format) = file.output_format {
        result.output_format = Resolved::new(format, ValueSource::ConfigFile);
    }

    result.prune_after_misses = file
        .prune_after_misses
        .filter(|&n| n > 0)
        .map(|n| Resolved::new(n, ValueSource::ConfigFile));

    result
}

/// Load config.kdl and resolve it against `overrides` and the environment.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let file = read_config()?;
    Ok(resolve_with(&file, overrides))
}
