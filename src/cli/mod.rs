//! CLI argument definitions for sahaayak.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::models::{ComplaintFilter, ComplaintId, Priority, SortOrder, Status};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("SHK_GIT_COMMIT"),
    ", built ",
    env!("SHK_BUILD_TIMESTAMP"),
    ")"
);

/// Sahaayak - track civic complaints and get notified when their status changes.
///
/// Start with `shk watch` for the staff dashboard or `shk watch --name <you>`
/// to follow your own complaints.
#[derive(Parser, Debug)]
#[command(name = "shk")]
#[command(author, version, long_version = LONG_VERSION, about = "Track civic complaints and get notified when their status changes", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Base URL of the complaints server.
    /// Can also be set via SHK_SERVER_URL or `shk config set server-url`.
    #[arg(long = "server", global = true, value_name = "URL")]
    pub server: Option<String>,

    /// Log debug events to stderr (overridden by SHK_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Dashboard filters shared by `list` and `watch`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only complaints with this status (Pending, "In Progress", Resolved)
    #[arg(long)]
    pub status: Option<Status>,

    /// Only complaints in this category
    #[arg(long)]
    pub category: Option<String>,

    /// Only complaints filed on this date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Only complaints with this priority (Low, Medium, High)
    #[arg(long)]
    pub priority: Option<Priority>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> ComplaintFilter {
        ComplaintFilter {
            status: self.status,
            category: self.category.clone(),
            date: self.date,
            priority: self.priority,
        }
    }
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List complaints on the staff dashboard
    List {
        #[command(flatten)]
        filters: FilterArgs,

        /// Print the dashboard table body as HTML
        #[arg(long)]
        html: bool,
    },

    /// List one citizen's complaints
    Mine {
        /// Name the complaints were filed under
        #[arg(long)]
        name: String,

        /// Only complaints with this status
        #[arg(long)]
        status: Option<Status>,

        /// newest or oldest first
        #[arg(long, default_value = "newest")]
        sort: SortOrder,

        /// Print the citizen table body as HTML
        #[arg(long)]
        html: bool,
    },

    /// Change a complaint's status (staff)
    SetStatus {
        /// Complaint ID
        id: ComplaintId,
        /// New status (Pending, "In Progress", Resolved)
        status: Status,
    },

    /// Change a complaint's priority (staff)
    SetPriority {
        /// Complaint ID
        id: ComplaintId,
        /// New priority (Low, Medium, High)
        priority: Priority,
    },

    /// Rate a resolved complaint
    Feedback {
        /// Complaint ID
        id: ComplaintId,

        /// Rating from 1 to 5
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,

        /// Optional comments
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Watch complaints, refreshing periodically and notifying on status changes
    ///
    /// Opens the interactive dashboard unless --plain is given or the
    /// terminal is not interactive.
    Watch {
        #[command(flatten)]
        filters: FilterArgs,

        /// Follow one citizen's complaints instead of the staff dashboard
        #[arg(long, conflicts_with_all = ["category", "date", "priority"])]
        name: Option<String>,

        /// newest or oldest first (citizen view)
        #[arg(long, default_value = "newest")]
        sort: SortOrder,

        /// Print each refresh as a plain table instead of the interactive dashboard
        #[arg(long)]
        plain: bool,

        /// Seconds between refreshes (default: 15)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration and where each value came from
    Show,

    /// Set a value in config.kdl
    Set {
        /// Config key (server-url, poll-interval-secs, request-timeout-secs,
        /// notifications, output-format, prune-after-misses)
        key: String,
        /// Value to store
        value: String,
    },

    /// Print the path of config.kdl
    Path,
}
