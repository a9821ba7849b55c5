//! TUI Views module
//!
//! Contains the view implementations for the TUI.

mod complaints;
mod feedback;

pub use complaints::ComplaintTableView;
pub use feedback::{FeedbackForm, FormAction, centered_rect};
