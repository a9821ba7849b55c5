//! Plain-text tables for non-interactive terminals.

use chrono::Local;

use super::{CitizenAction, Layout, View, relative_age, truncate};
use crate::api::ApiError;
use crate::models::Complaint;

/// Widest description shown in a text table
const DESCRIPTION_WIDTH: usize = 40;

fn headers(layout: Layout) -> &'static [&'static str] {
    match layout {
        Layout::Dashboard => &[
            "ID",
            "STATUS",
            "PRIORITY",
            "AUTO",
            "CATEGORY",
            "NAME",
            "CREATED",
            "DESCRIPTION",
        ],
        Layout::Citizen => &["ID", "STATUS", "CATEGORY", "CREATED", "ACTION", "DESCRIPTION"],
    }
}

fn cells(layout: Layout, c: &Complaint) -> Vec<String> {
    let description = truncate(c.description.as_deref().unwrap_or(""), DESCRIPTION_WIDTH);
    let created = c.created_at.clone().unwrap_or_default();
    match layout {
        Layout::Dashboard => vec![
            c.id.to_string(),
            c.status.to_string(),
            c.priority.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            c.display_auto_priority().to_string(),
            c.display_category().to_string(),
            c.display_name().to_string(),
            created,
            description,
        ],
        Layout::Citizen => vec![
            c.id.to_string(),
            c.status.to_string(),
            c.display_category().to_string(),
            created,
            CitizenAction::for_complaint(c).label(),
            description,
        ],
    }
}

/// Render `records` as an aligned text table, or the empty placeholder.
pub fn render_table(layout: Layout, records: &[Complaint]) -> String {
    if records.is_empty() {
        return layout.empty_message().to_string();
    }

    let headers = headers(layout);
    let rows: Vec<Vec<String>> = records.iter().map(|c| cells(layout, c)).collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |row: &[String]| -> String {
        let last = row.len().saturating_sub(1);
        row.iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                if i == last {
                    cell.clone()
                } else {
                    let pad = width.saturating_sub(cell.chars().count());
                    format!("{}{}", cell, " ".repeat(pad))
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    };

    let header_row: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let mut lines = vec![format_row(&header_row)];
    lines.extend(rows.iter().map(|row| format_row(row)));
    lines.join("\n")
}

/// Summary line with the age of the newest complaint.
fn summary_line(records: &[Complaint]) -> String {
    let now = Local::now().naive_local();
    let newest = records.iter().filter_map(|c| c.created_at_parsed()).max();
    match newest {
        Some(ts) => format!(
            "{} complaint(s), newest {}",
            records.len(),
            relative_age(ts, now)
        ),
        None => format!("{} complaint(s)", records.len()),
    }
}

/// Prints each refresh to stdout.
#[derive(Debug, Clone, Copy)]
pub struct TerminalView {
    layout: Layout,
}

impl TerminalView {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }
}

impl View for TerminalView {
    fn show_records(&self, records: &[Complaint]) {
        let stamp = Local::now().format("%H:%M:%S");
        println!("\n[{}] {}", stamp, summary_line(records));
        println!("{}", render_table(self.layout, records));
    }

    fn show_error(&self, error: &ApiError) {
        let stamp = Local::now().format("%H:%M:%S");
        println!("\n[{}] {}", stamp, self.layout.error_message());
        println!("  {}", error.user_message());
    }
}
