//! Configuration for sahaayak.
//!
//! ## config.kdl - User preferences
//!
//! Located at `~/.config/sahaayak/config.kdl` (or `$SHK_CONFIG_DIR/config.kdl`).
//!
//! Contains:
//! - `server-url` - Base URL of the complaints service
//! - `poll-interval-secs` - Refresh period while watching (default 15)
//! - `request-timeout-secs` - Per-request timeout (default 10)
//! - `notifications` - "ask", "granted" or "denied"
//! - `output-format` - "json" or "human"
//! - `prune-after-misses` - Forget complaints missing from N refreshes
//!
//! ## Precedence
//!
//! CLI flag > environment > config.kdl > defaults.
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONFIG_DIR_ENV, ConfigOverrides, Resolved, ResolvedConfig, SERVER_URL_ENV, ValueSource,
    config_path, read_config, resolve_config, resolve_with, write_config,
};
pub use schema::{CONFIG_KEYS, OutputFormat, SahaayakConfig};
