//! Complaint table - the main dashboard view
//!
//! Displays the latest fetched complaints with keyboard navigation. Columns
//! depend on the layout: staff see name and priorities, citizens see the
//! action available to them.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
};

use crate::models::{Complaint, Priority, Status};
use crate::render::{CitizenAction, Layout as TableLayout, location_text, truncate};

/// Colour for a status badge.
pub fn status_color(status: Status) -> Color {
    match status {
        Status::Pending => Color::Red,
        Status::InProgress => Color::Yellow,
        Status::Resolved => Color::Green,
    }
}

/// Colour for a priority badge.
pub fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Low => Color::Green,
        Priority::Medium => Color::Yellow,
        Priority::High => Color::Red,
    }
}

/// What the table body currently shows.
#[derive(Debug, Clone, PartialEq)]
enum Body {
    /// Nothing fetched yet
    Waiting,
    Records,
    /// Last fetch failed
    Failed,
}

/// State for the complaint table
pub struct ComplaintTableView {
    layout: TableLayout,
    pub items: Vec<Complaint>,
    pub selected: usize,
    pub table_state: TableState,
    pub loading: bool,
    body: Body,
}

impl ComplaintTableView {
    pub fn new(layout: TableLayout) -> Self {
        let mut table_state = TableState::default();
        table_state.select(Some(0));
        Self {
            layout,
            items: Vec::new(),
            selected: 0,
            table_state,
            loading: false,
            body: Body::Waiting,
        }
    }

    pub fn layout(&self) -> TableLayout {
        self.layout
    }

    /// Replace the rows, keeping the selection on the same complaint if it is
    /// still present.
    pub fn update_items(&mut self, items: Vec<Complaint>) {
        let selected_id = self.selected_complaint().map(|c| c.id);
        self.items = items;
        self.body = Body::Records;

        if let Some(index) = selected_id.and_then(|id| self.items.iter().position(|c| c.id == id)) {
            self.selected = index;
        }
        // Keep selection valid
        if self.selected >= self.items.len() {
            self.selected = self.items.len().saturating_sub(1);
        }
        self.table_state.select(Some(self.selected));
    }

    /// Replace the rows with the error placeholder.
    pub fn show_failure(&mut self) {
        self.items.clear();
        self.selected = 0;
        self.table_state.select(Some(0));
        self.body = Body::Failed;
    }

    pub fn selected_complaint(&self) -> Option<&Complaint> {
        self.items.get(self.selected)
    }

    /// Apply a local edit to the selected complaint.
    pub fn update_selected(&mut self, edit: impl FnOnce(&mut Complaint)) {
        if let Some(complaint) = self.items.get_mut(self.selected) {
            edit(complaint);
        }
    }

    pub fn select_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = (self.selected + 1).min(self.items.len() - 1);
        self.table_state.select(Some(self.selected));
    }

    pub fn select_previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = self.selected.saturating_sub(1);
        self.table_state.select(Some(self.selected));
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.table_state.select(Some(0));
    }

    pub fn select_last(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = self.items.len() - 1;
        self.table_state.select(Some(self.selected));
    }

    /// Placeholder text when there are no rows to show.
    fn placeholder(&self) -> Option<&'static str> {
        match self.body {
            Body::Waiting => Some("Loading complaints..."),
            Body::Failed => Some(self.layout.error_message()),
            Body::Records if self.items.is_empty() => Some(self.layout.empty_message()),
            Body::Records => None,
        }
    }

    fn header(&self) -> Row<'static> {
        let names: &[&str] = match self.layout {
            TableLayout::Dashboard => &["ID", "Status", "Priority", "Auto", "Category", "Name", "Created"],
            TableLayout::Citizen => &["ID", "Status", "Category", "Created", "Action"],
        };
        Row::new(names.iter().map(|n| Cell::from(*n)))
            .style(Style::default().add_modifier(Modifier::BOLD))
    }

    fn row(&self, c: &Complaint) -> Row<'static> {
        let status = Cell::from(c.status.to_string()).style(Style::default().fg(status_color(c.status)));
        let created = c.created_at.clone().unwrap_or_default();
        match self.layout {
            TableLayout::Dashboard => {
                let priority = match c.priority {
                    Some(p) => Cell::from(p.to_string()).style(Style::default().fg(priority_color(p))),
                    None => Cell::from("-"),
                };
                let auto = c.display_auto_priority();
                Row::new(vec![
                    Cell::from(c.id.to_string()),
                    status,
                    priority,
                    Cell::from(auto.to_string()).style(Style::default().fg(priority_color(auto))),
                    Cell::from(c.display_category().to_string()),
                    Cell::from(truncate(c.display_name(), 20)),
                    Cell::from(created),
                ])
            }
            TableLayout::Citizen => Row::new(vec![
                Cell::from(c.id.to_string()),
                status,
                Cell::from(c.display_category().to_string()),
                Cell::from(created),
                Cell::from(CitizenAction::for_complaint(c).label()),
            ]),
        }
    }

    fn widths(&self) -> Vec<Constraint> {
        match self.layout {
            TableLayout::Dashboard => vec![
                Constraint::Length(6),
                Constraint::Length(12),
                Constraint::Length(9),
                Constraint::Length(7),
                Constraint::Length(14),
                Constraint::Min(10),
                Constraint::Length(20),
            ],
            TableLayout::Citizen => vec![
                Constraint::Length(6),
                Constraint::Length(12),
                Constraint::Length(14),
                Constraint::Length(20),
                Constraint::Min(18),
            ],
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(6)])
            .split(area);

        let title = match (self.layout, self.loading) {
            (TableLayout::Dashboard, false) => " Complaints ".to_string(),
            (TableLayout::Citizen, false) => " My Complaints ".to_string(),
            (TableLayout::Dashboard, true) => " Complaints (refreshing...) ".to_string(),
            (TableLayout::Citizen, true) => " My Complaints (refreshing...) ".to_string(),
        };
        let block = Block::default().borders(Borders::ALL).title(title);

        if let Some(message) = self.placeholder() {
            let style = match self.body {
                Body::Failed => Style::default().fg(Color::Red),
                _ => Style::default().fg(Color::DarkGray),
            };
            let paragraph = Paragraph::new(message).style(style).block(block);
            frame.render_widget(paragraph, chunks[0]);
        } else {
            let rows: Vec<Row> = self.items.iter().map(|c| self.row(c)).collect();
            let table = Table::new(rows, self.widths())
                .header(self.header())
                .block(block)
                .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));
            frame.render_stateful_widget(table, chunks[0], &mut self.table_state);
        }

        self.render_detail(frame, chunks[1]);
    }

    /// Details of the selected complaint.
    fn render_detail(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title(" Details ");
        let Some(c) = self.selected_complaint() else {
            frame.render_widget(block, area);
            return;
        };

        let mut lines = vec![
            Line::from(c.description.clone().unwrap_or_default()),
            Line::from(Span::styled(
                location_text(c),
                Style::default().fg(Color::DarkGray),
            )),
        ];
        if let Some(feedback) = c.feedback.as_deref().filter(|f| !f.is_empty()) {
            lines.push(Line::from(format!("Feedback: {}", feedback)));
        }

        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(paragraph, area);
    }
}
