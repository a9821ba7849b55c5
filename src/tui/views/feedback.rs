//! Feedback form - rate a resolved complaint

use crossterm::event::KeyCode;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::models::{ComplaintId, FeedbackRequest};

/// Longest comment accepted by the form
const MAX_COMMENT_CHARS: usize = 500;

/// What a key press did to the form.
#[derive(Debug, PartialEq)]
pub enum FormAction {
    /// Still editing
    Editing,
    Cancel,
    Submit(FeedbackRequest),
}

/// State for the feedback popup
#[derive(Debug, Clone)]
pub struct FeedbackForm {
    pub complaint_id: ComplaintId,
    /// 1-5, or 0 while unset
    pub rating: u8,
    pub comment: String,
    /// Validation message shown under the form
    pub hint: Option<String>,
}

impl FeedbackForm {
    pub fn new(complaint_id: ComplaintId) -> Self {
        Self {
            complaint_id,
            rating: 0,
            comment: String::new(),
            hint: None,
        }
    }

    /// Digits 1-5 set the rating; everything else edits the comment.
    pub fn handle_key(&mut self, key: KeyCode) -> FormAction {
        match key {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Enter => match FeedbackRequest::new(self.rating, self.comment.trim()) {
                Ok(request) => return FormAction::Submit(request),
                Err(_) => self.hint = Some("Please select a rating (1-5).".to_string()),
            },
            KeyCode::Char(c @ '1'..='5') if self.comment.is_empty() || self.rating == 0 => {
                self.rating = c as u8 - b'0';
                self.hint = None;
            }
            KeyCode::Left => self.rating = self.rating.saturating_sub(1).max(1),
            KeyCode::Right => self.rating = (self.rating + 1).min(5),
            KeyCode::Backspace => {
                self.comment.pop();
            }
            KeyCode::Char(c) => {
                if self.comment.chars().count() < MAX_COMMENT_CHARS {
                    self.comment.push(c);
                }
            }
            _ => {}
        }
        FormAction::Editing
    }

    fn stars(&self) -> String {
        let filled = usize::from(self.rating);
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup);

        let mut lines = vec![
            Line::from(vec![
                Span::raw("Rating: "),
                Span::styled(self.stars(), Style::default().fg(Color::Yellow)),
                Span::styled("  (1-5 or ←/→)", Style::default().fg(Color::DarkGray)),
            ]),
            Line::from(""),
            Line::from("Comments:"),
            Line::from(format!("{}▏", self.comment)),
        ];
        if let Some(hint) = &self.hint {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                hint.clone(),
                Style::default().fg(Color::Red),
            )));
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" Rate complaint #{} ", self.complaint_id))
            .title_bottom(" Enter:Submit  Esc:Cancel ");
        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(block);
        frame.render_widget(paragraph, popup);
    }
}

/// A rectangle of `percent_x` by `percent_y` centered in `area`.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
