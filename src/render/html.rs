//! HTML table-body rendering for the dashboard and citizen pages.
//!
//! Output is the `<tbody>` content only; the surrounding page and styling
//! belong to the web front end. All text is escaped.

use std::fmt::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{CitizenAction, Layout, View, address_text, coordinates_text};
use crate::api::ApiError;
use crate::models::{Complaint, Priority, Status};

/// Escape text for use in HTML content and attribute values.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// A single full-width row carrying `message`.
pub fn placeholder_row(layout: Layout, message: &str) -> String {
    format!(
        "<tr><td colspan=\"{}\">{}</td></tr>",
        layout.columns(),
        escape(message)
    )
}

/// Render the table body for `records`, or the empty placeholder.
pub fn render_rows(layout: Layout, records: &[Complaint]) -> String {
    if records.is_empty() {
        return placeholder_row(layout, layout.empty_message());
    }

    let mut out = String::new();
    for complaint in records {
        match layout {
            Layout::Dashboard => dashboard_row(&mut out, complaint),
            Layout::Citizen => citizen_row(&mut out, complaint),
        }
        out.push('\n');
    }
    out
}

fn photo_cell(complaint: &Complaint) -> String {
    match complaint.photo.as_deref() {
        Some(url) if !url.is_empty() => {
            let url = escape(url);
            format!(
                "<a href=\"{url}\" target=\"_blank\"><img src=\"{url}\" width=\"60\" alt=\"Complaint Photo\"></a>"
            )
        }
        _ => "No photo".to_string(),
    }
}

fn voice_cell(complaint: &Complaint) -> String {
    match complaint.voice.as_deref() {
        Some(url) if !url.is_empty() => format!(
            "<audio controls><source src=\"{}\" type=\"audio/webm\"></audio>",
            escape(url)
        ),
        _ => "No voice note".to_string(),
    }
}

fn location_cell(complaint: &Complaint) -> String {
    match coordinates_text(complaint) {
        Some(coords) => format!(
            "{}<br>📍 {}",
            escape(&coords),
            escape(address_text(complaint))
        ),
        None => "Location not available".to_string(),
    }
}

fn status_badge(status: Status, id_attr: Option<String>) -> String {
    let id_attr = id_attr
        .map(|id| format!(" id=\"{}\"", id))
        .unwrap_or_default();
    format!(
        "<span class=\"status {}\"{}>{}</span>",
        status.css_class(),
        id_attr,
        status
    )
}

fn status_select(complaint: &Complaint) -> String {
    let mut out = format!(
        "<select class=\"status-update\" name=\"status\" data-id=\"{}\">",
        complaint.id
    );
    for status in Status::ALL {
        let selected = if status == complaint.status {
            " selected"
        } else {
            ""
        };
        let _ = write!(out, "<option value=\"{0}\"{1}>{0}</option>", status, selected);
    }
    out.push_str("</select>");
    out
}

fn priority_select(complaint: &Complaint) -> String {
    let mut out = format!(
        "<select class=\"priority-update\" name=\"priority\" data-id=\"{}\">",
        complaint.id
    );
    for priority in Priority::ALL {
        let selected = if Some(priority) == complaint.priority {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            out,
            "<option value=\"{0}\"{1}>{0}</option>",
            priority, selected
        );
    }
    out.push_str("</select>");
    out
}

fn dashboard_row(out: &mut String, c: &Complaint) {
    let auto = c.display_auto_priority();
    let _ = write!(
        out,
        "<tr data-id=\"{id}\">\
         <td>{id}</td>\
         <td>{name}</td>\
         <td>{desc}</td>\
         <td>{category}</td>\
         <td>{photo}</td>\
         <td>{voice}</td>\
         <td>{location}</td>\
         <td>{badge}</td>\
         <td><span class=\"priority {auto_class}\">{auto}</span> {priority_select}</td>\
         <td>{created}</td>\
         <td>{status_select}</td>\
         </tr>",
        id = c.id,
        name = escape(c.display_name()),
        desc = escape(c.description.as_deref().unwrap_or("")),
        category = escape(c.display_category()),
        photo = photo_cell(c),
        voice = voice_cell(c),
        location = location_cell(c),
        badge = status_badge(c.status, None),
        auto_class = auto.css_class(),
        auto = auto,
        priority_select = priority_select(c),
        created = escape(c.created_at.as_deref().unwrap_or("")),
        status_select = status_select(c),
    );
}

fn citizen_row(out: &mut String, c: &Complaint) {
    let action = match CitizenAction::for_complaint(c) {
        CitizenAction::RateAndFeedback => format!(
            "<button class=\"btn-small\" data-id=\"{}\">{}</button>",
            c.id,
            escape(&CitizenAction::RateAndFeedback.label())
        ),
        rated @ CitizenAction::Rated(_) => format!(
            "<span class=\"rating-display\">{}</span>",
            escape(&rated.label())
        ),
        waiting => format!(
            "<span class=\"status-text\">{}</span>",
            escape(&waiting.label())
        ),
    };

    let _ = write!(
        out,
        "<tr>\
         <td>{id}</td>\
         <td>{desc}</td>\
         <td>{category}</td>\
         <td>{photo}</td>\
         <td>{badge}</td>\
         <td>{created}</td>\
         <td>{action}</td>\
         </tr>",
        id = c.id,
        desc = escape(c.description.as_deref().unwrap_or("")),
        category = escape(c.display_category()),
        photo = photo_cell(c),
        badge = status_badge(c.status, Some(format!("track-status-{}", c.id))),
        created = escape(c.created_at.as_deref().unwrap_or("")),
        action = action,
    );
}

/// In-memory HTML table kept current by the synchronizer.
#[derive(Debug)]
pub struct HtmlTableView {
    layout: Layout,
    body: Mutex<String>,
    loading: AtomicBool,
}

impl HtmlTableView {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            body: Mutex::new(String::new()),
            loading: AtomicBool::new(false),
        }
    }

    /// Current table body markup.
    pub fn body(&self) -> String {
        self.body
            .lock()
            .map(|body| body.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    fn replace(&self, markup: String) {
        match self.body.lock() {
            Ok(mut body) => *body = markup,
            Err(poisoned) => *poisoned.into_inner() = markup,
        }
    }
}

impl View for HtmlTableView {
    fn show_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::Release);
    }

    fn show_records(&self, records: &[Complaint]) {
        self.replace(render_rows(self.layout, records));
    }

    fn show_error(&self, _error: &ApiError) {
        self.replace(placeholder_row(self.layout, self.layout.error_message()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_empty_placeholders() {
        assert_eq!(
            render_rows(Layout::Dashboard, &[]),
            "<tr><td colspan=\"11\">No complaints found.</td></tr>"
        );
        assert_eq!(
            render_rows(Layout::Citizen, &[]),
            "<tr><td colspan=\"7\">No complaints found for your name.</td></tr>"
        );
    }

    #[test]
    fn test_dashboard_row_controls() {
        let mut c = Complaint::new(3, Status::InProgress);
        c.priority = Some(Priority::High);
        c.description = Some("Overflowing <drain>".to_string());
        let html = render_rows(Layout::Dashboard, &[c]);

        assert!(html.starts_with("<tr data-id=\"3\">"));
        assert!(html.contains("<span class=\"status inprogress\">In Progress</span>"));
        assert!(html.contains("<option value=\"In Progress\" selected>In Progress</option>"));
        assert!(html.contains("<option value=\"High\" selected>High</option>"));
        assert!(html.contains("<span class=\"priority medium\">Medium</span>"));
        assert!(html.contains("Overflowing &lt;drain&gt;"));
        assert!(html.contains("No photo"));
        assert!(html.contains("No voice note"));
        assert!(html.contains("Location not available"));
        assert_eq!(html.matches("<td>").count() + html.matches("<td ").count(), 11);
    }

    #[test]
    fn test_citizen_row_actions() {
        let mut resolved = Complaint::new(9, Status::Resolved);
        resolved.photo = Some("/uploads/photo/p.jpg".to_string());
        let mut rated = Complaint::new(10, Status::Resolved);
        rated.rating = Some(5);
        let pending = Complaint::new(11, Status::Pending);

        let html = render_rows(Layout::Citizen, &[resolved, rated, pending]);
        assert!(html.contains("<button class=\"btn-small\" data-id=\"9\">Rate &amp; Feedback</button>"));
        assert!(html.contains("<span class=\"rating-display\">⭐ 5/5</span>"));
        assert!(html.contains("<span class=\"status-text\">Awaiting resolution</span>"));
        assert!(html.contains("id=\"track-status-11\""));
        assert!(html.contains("<img src=\"/uploads/photo/p.jpg\""));
    }

    #[test]
    fn test_view_replaces_previous_render_on_error() {
        let view = HtmlTableView::new(Layout::Dashboard);
        view.show_records(&[Complaint::new(1, Status::Pending)]);
        assert!(view.body().contains("data-id=\"1\""));

        view.show_error(&ApiError::Status { status: 500 });
        assert_eq!(
            view.body(),
            "<tr><td colspan=\"11\">Error loading complaints. Check server connection.</td></tr>"
        );
    }
}
