//! Status-change notifications behind a tri-state permission gate.
//!
//! A [`Notifier`] knows the current [`Permission`], can ask the user for it,
//! and can deliver a message. [`notify_transition`] applies the gate:
//!
//! - `Granted`: deliver
//! - `Denied`: drop silently, never ask again
//! - `Undecided`: ask for this transition; deliver it if the answer is
//!   `Granted`. A dismissed prompt leaves the permission undecided, so the
//!   next transition asks again.

mod terminal;

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::StatusTransition;

pub use terminal::TerminalNotifier;

/// Whether the user allows notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// Not yet asked (or the last prompt was dismissed)
    #[default]
    #[serde(rename = "ask")]
    Undecided,
}

impl Permission {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "granted" | "allow" | "yes" => Some(Permission::Granted),
            "denied" | "deny" | "no" => Some(Permission::Denied),
            "ask" | "default" | "undecided" => Some(Permission::Undecided),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Granted => "granted",
            Permission::Denied => "denied",
            Permission::Undecided => "ask",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Permission::Undecided => 0,
            Permission::Granted => 1,
            Permission::Denied => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Permission::Granted,
            2 => Permission::Denied,
            _ => Permission::Undecided,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::parse(s)
            .ok_or_else(|| format!("invalid notification setting '{}': expected ask, granted or denied", s))
    }
}

/// Shared, lock-free permission state for notifier implementations.
#[derive(Debug, Default)]
pub struct PermissionCell(AtomicU8);

impl PermissionCell {
    pub fn new(permission: Permission) -> Self {
        Self(AtomicU8::new(permission.to_u8()))
    }

    pub fn get(&self) -> Permission {
        Permission::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, permission: Permission) {
        self.0.store(permission.to_u8(), Ordering::Release);
    }
}

/// A sink for user-facing notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Current permission.
    fn permission(&self) -> Permission;

    /// Ask the user for permission and return the answer.
    async fn request_permission(&self) -> Permission;

    /// Show a notification. Only called while permission is granted.
    fn deliver(&self, message: &str);
}

/// What happened to one transition's notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Permission denied
    Blocked,
    /// Prompt dismissed without an answer
    Dismissed,
}

/// Deliver the notification for `transition`, subject to the permission gate.
pub async fn notify_transition(
    notifier: &dyn Notifier,
    transition: &StatusTransition,
) -> Delivery {
    let permission = match notifier.permission() {
        Permission::Undecided => notifier.request_permission().await,
        decided => decided,
    };

    match permission {
        Permission::Granted => {
            notifier.deliver(&transition.message());
            Delivery::Delivered
        }
        Permission::Denied => Delivery::Blocked,
        Permission::Undecided => Delivery::Dismissed,
    }
}
