//! TUI Application - main event loop and terminal management
//!
//! This module contains the core TUI application logic including:
//! - Terminal setup and restoration
//! - Wiring the synchronizer to the table through [`UiEvent`]s
//! - Keyboard, focus and permission-prompt handling

use std::io::{self, Write, stdout};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use crossterm::{
    ExecutableCommand,
    event::{self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use tokio::sync::{mpsc, oneshot};

use super::bridge::{ChannelNotifier, ChannelView, UiEvent};
use super::connection::ConnectionState;
use super::notifications::NotificationManager;
use super::views::{ComplaintTableView, FeedbackForm, FormAction, centered_rect};
use crate::api::{ApiClient, Feed};
use crate::commands::watch::remember_permission;
use crate::commands::{FEEDBACK_THANKS, WatchOptions, feedback_error_message};
use crate::models::FeedbackRequest;
use crate::notify::{Notifier, Permission};
use crate::render::Layout as TableLayout;
use crate::sync::{Synchronizer, Visibility};
use crate::Result;

/// What the event loop should do with the synchronizer after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppCommand {
    None,
    Refresh,
    Visibility(Visibility),
}

/// TUI Application state
struct TuiApp {
    connection_state: ConnectionState,
    should_quit: bool,
    table: ComplaintTableView,
    notifications: NotificationManager,
    history_state: ListState,
    /// Open feedback popup
    form: Option<FeedbackForm>,
    /// Unanswered notification permission prompt
    prompt: Option<oneshot::Sender<Permission>>,
    /// Last key pressed (for gg detection)
    last_key: Option<KeyCode>,
    client: ApiClient,
    /// Title shown in the header
    heading: String,
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl TuiApp {
    fn new(options: &WatchOptions, tx: mpsc::UnboundedSender<UiEvent>) -> Self {
        let heading = match &options.feed {
            Feed::Dashboard(_) => "Complaints Dashboard".to_string(),
            Feed::Citizen(query) => format!("My Complaints - {}", query.name()),
        };
        Self {
            connection_state: ConnectionState::Connecting,
            should_quit: false,
            table: ComplaintTableView::new(options.layout()),
            notifications: NotificationManager::new(),
            history_state: ListState::default(),
            form: None,
            prompt: None,
            last_key: None,
            client: options.client.clone(),
            heading,
            tx,
        }
    }

    fn is_staff(&self) -> bool {
        self.table.layout() == TableLayout::Dashboard
    }

    /// Apply an event from the synchronizer or a finished action.
    fn handle_ui_event(&mut self, event: UiEvent) -> AppCommand {
        match event {
            UiEvent::Loading(loading) => self.table.loading = loading,
            UiEvent::Records(records) => {
                self.table.update_items(records);
                self.connection_state.record_success(Local::now());
            }
            UiEvent::FetchFailed(message) => {
                self.table.show_failure();
                self.connection_state.record_failure(message);
            }
            UiEvent::Notify(message) => self.notifications.status_change(message),
            UiEvent::PermissionRequest(reply) => {
                // Prompts are sequential; an older one left open is dismissed
                if let Some(stale) = self.prompt.replace(reply) {
                    let _ = stale.send(Permission::Undecided);
                }
            }
            UiEvent::ActionFinished { result, refresh } => {
                match result {
                    Ok(message) => self.notifications.success(message),
                    Err(message) => self.notifications.error(message),
                }
                if refresh {
                    return AppCommand::Refresh;
                }
            }
        }
        AppCommand::None
    }

    /// Handle keyboard events
    fn handle_key(&mut self, key: KeyCode) -> AppCommand {
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return AppCommand::None;
        }

        if let Some(form) = self.form.as_mut() {
            match form.handle_key(key) {
                FormAction::Editing => {}
                FormAction::Cancel => self.form = None,
                FormAction::Submit(request) => {
                    let id = form.complaint_id;
                    self.form = None;
                    self.submit_feedback(id, request);
                }
            }
            return AppCommand::None;
        }

        if self.notifications.history_visible {
            match key {
                KeyCode::Char('h') | KeyCode::Esc => self.notifications.close_history(),
                KeyCode::Char('j') | KeyCode::Down => self.notifications.history_next(),
                KeyCode::Char('k') | KeyCode::Up => self.notifications.history_previous(),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return AppCommand::None;
        }

        let mut command = AppCommand::None;
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            // Navigation
            KeyCode::Char('j') | KeyCode::Down => self.table.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.table.select_previous(),
            KeyCode::Char('g') => {
                // Check for gg sequence
                if self.last_key == Some(KeyCode::Char('g')) {
                    self.table.select_first();
                    self.last_key = None;
                    return command;
                }
            }
            KeyCode::Char('G') | KeyCode::End => self.table.select_last(),
            KeyCode::Home => self.table.select_first(),
            KeyCode::Char('r') => command = AppCommand::Refresh,
            KeyCode::Char('h') => self.notifications.toggle_history(),
            KeyCode::Char('d') => self.notifications.dismiss_all(),
            KeyCode::Char('s') if self.is_staff() => self.cycle_status(),
            KeyCode::Char('p') if self.is_staff() => self.cycle_priority(),
            KeyCode::Char('f') if !self.is_staff() => self.open_feedback(),
            _ => {}
        }
        self.last_key = Some(key);
        command
    }

    fn handle_prompt_key(&mut self, key: KeyCode) {
        let answer = match key {
            KeyCode::Char('y') | KeyCode::Char('Y') => Permission::Granted,
            KeyCode::Char('n') | KeyCode::Char('N') => Permission::Denied,
            KeyCode::Esc => Permission::Undecided,
            _ => return,
        };
        if let Some(reply) = self.prompt.take() {
            let _ = reply.send(answer);
        }
    }

    /// Run an API action off the event loop and report back as a toast.
    fn spawn_action<F>(&self, action: F)
    where
        F: std::future::Future<Output = std::result::Result<String, String>> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = action.await;
            let refresh = result.is_ok();
            let _ = tx.send(UiEvent::ActionFinished { result, refresh });
        });
    }

    fn cycle_status(&mut self) {
        let Some(complaint) = self.table.selected_complaint() else {
            return;
        };
        let (id, status) = (complaint.id, complaint.status.next());
        let client = self.client.clone();
        self.spawn_action(async move {
            client
                .update_status(id, status)
                .await
                .map(|()| format!("Complaint #{} status set to {}", id, status))
                .map_err(|e| format!("Failed to update status: {}", e.user_message()))
        });
    }

    fn cycle_priority(&mut self) {
        let Some(complaint) = self.table.selected_complaint() else {
            return;
        };
        let id = complaint.id;
        let priority = complaint.priority.unwrap_or_default().next();
        let client = self.client.clone();
        // Priority changes are not polled for; show them right away
        self.table.update_selected(|c| c.priority = Some(priority));
        self.spawn_action(async move {
            client
                .update_priority(id, priority)
                .await
                .map(|()| format!("Complaint #{} priority set to {}", id, priority))
                .map_err(|e| format!("Failed to update priority: {}", e.user_message()))
        });
    }

    fn open_feedback(&mut self) {
        match self.table.selected_complaint() {
            Some(c) if c.is_feedback_eligible() => self.form = Some(FeedbackForm::new(c.id)),
            Some(c) if c.rating.is_some() => {
                self.notifications
                    .info(format!("Complaint #{} has already been rated", c.id));
            }
            Some(_) => self
                .notifications
                .info("Feedback can be given once a complaint is resolved"),
            None => {}
        }
    }

    fn submit_feedback(&mut self, id: i64, request: FeedbackRequest) {
        let client = self.client.clone();
        self.spawn_action(async move {
            client
                .submit_feedback(id, &request)
                .await
                .map(|()| FEEDBACK_THANKS.to_string())
                .map_err(|e| feedback_error_message(&e))
        });
    }

    /// Render the UI
    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title bar
                Constraint::Min(8),    // Main content
                Constraint::Length(3), // Status bar
            ])
            .split(area);

        self.render_title_bar(frame, chunks[0]);
        self.table.render(frame, chunks[1]);
        self.render_status_bar(frame, chunks[2]);
        self.render_toasts(frame, chunks[1]);

        if self.notifications.history_visible {
            self.render_history(frame, area);
        }
        if let Some(form) = &self.form {
            form.render(frame, area);
        }
        if self.prompt.is_some() {
            render_prompt(frame, area);
        }
    }

    /// Render the title bar with connection status
    fn render_title_bar(&self, frame: &mut Frame, area: Rect) {
        let status_display = format!(
            "[{}] {}",
            self.connection_state.indicator(),
            self.connection_state.label()
        );
        let padding = area.width.saturating_sub(
            self.heading.chars().count() as u16 + status_display.chars().count() as u16 + 4,
        );

        let title = Paragraph::new(Line::from(vec![
            Span::styled(
                format!(" {}", self.heading),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(" ".repeat(padding as usize)),
            Span::styled(
                status_display,
                Style::default().fg(self.connection_state.color()),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL));

        frame.render_widget(title, area);
    }

    /// Render the status bar with keybindings
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let keys = if self.is_staff() {
            " j/k:Navigate  gg/G:Top/Bottom  s:Status  p:Priority  r:Refresh  h:History  q:Quit"
        } else {
            " j/k:Navigate  gg/G:Top/Bottom  f:Feedback  r:Refresh  h:History  q:Quit"
        };
        let status = Paragraph::new(keys)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(status, area);
    }

    /// Stack toasts in the top-right corner of `area`.
    fn render_toasts(&self, frame: &mut Frame, area: Rect) {
        let width = area.width.min(56);
        let mut y = area.y + 1;
        for toast in self.notifications.visible_toasts() {
            if y + 3 > area.y + area.height {
                break;
            }
            let rect = Rect::new(area.x + area.width - width, y, width, 3);
            let paragraph = Paragraph::new(format!("{} {}", toast.level.icon(), toast.message))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(toast.level.color())),
                );
            frame.render_widget(Clear, rect);
            frame.render_widget(paragraph, rect);
            y += 3;
        }
        if self.notifications.overflow_count > 0 && y < area.y + area.height {
            let rect = Rect::new(area.x + area.width - width, y, width, 1);
            let more = Paragraph::new(format!(
                "+{} more (h for history)",
                self.notifications.overflow_count
            ))
            .alignment(Alignment::Right)
            .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(more, rect);
        }
    }

    fn render_history(&mut self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(70, 70, area);
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Notification History ")
            .title_bottom(" j/k:Navigate  h/Esc:Close ");

        if self.notifications.history_is_empty() {
            let empty = Paragraph::new("No notifications yet.")
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            frame.render_widget(empty, popup);
            return;
        }

        let items: Vec<ListItem> = self
            .notifications
            .history()
            .map(|entry| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{} ", entry.level.icon()),
                        Style::default().fg(entry.level.color()),
                    ),
                    Span::raw(entry.message.clone()),
                    Span::styled(
                        format!("  {}", entry.relative_time()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();
        self.history_state
            .select(Some(self.notifications.history_selected));
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        frame.render_stateful_widget(list, popup, &mut self.history_state);
    }
}

fn render_prompt(frame: &mut Frame, area: Rect) {
    let popup = centered_rect(50, 25, area);
    frame.render_widget(Clear, popup);
    let text = vec![
        Line::from("Show notifications when a complaint's status changes?"),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(":Allow  "),
            Span::styled("n", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(":Block  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(":Not now"),
        ]),
    ];
    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Notifications "),
        );
    frame.render_widget(paragraph, popup);
}

/// Setup the terminal for TUI mode
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

/// Restore the terminal to normal mode
fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    stdout().execute(DisableFocusChange)?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

/// Apply an [`AppCommand`] to the synchronizer.
fn apply(command: AppCommand, sync: &mut Synchronizer, visible: &mut bool) {
    match command {
        AppCommand::None => {}
        AppCommand::Refresh => {
            sync.spawn_poll();
        }
        AppCommand::Visibility(visibility) => {
            let now_visible = visibility == Visibility::Visible;
            if now_visible != *visible {
                tracing::debug!(?visibility, "terminal focus changed");
                sync.set_visibility(visibility);
                *visible = now_visible;
            }
        }
    }
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut TuiApp,
    sync: &mut Synchronizer,
    rx: &mut mpsc::UnboundedReceiver<UiEvent>,
) -> Result<()> {
    let mut visible = true;

    loop {
        app.notifications.cleanup();
        terminal.draw(|f| app.render(f))?;
        if app.notifications.take_bell() {
            let mut out = stdout();
            out.write_all(b"\x07")?;
            out.flush()?;
        }

        tokio::select! {
            // Check for keyboard and focus events
            _ = tokio::time::sleep(Duration::from_millis(100)) => {
                while event::poll(Duration::from_millis(0))? {
                    let command = match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key.code),
                        Event::FocusLost => AppCommand::Visibility(Visibility::Hidden),
                        Event::FocusGained => AppCommand::Visibility(Visibility::Visible),
                        _ => AppCommand::None,
                    };
                    apply(command, sync, &mut visible);
                }
            }
            // Synchronizer and action updates
            Some(event) = rx.recv() => {
                let command = app.handle_ui_event(event);
                apply(command, sync, &mut visible);
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Run the interactive dashboard until the user quits.
pub async fn run_tui(options: WatchOptions) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let notifier = Arc::new(ChannelNotifier::new(options.notifications, tx.clone()));
    let view = Arc::new(ChannelView::new(tx.clone()));
    let mut sync = options.synchronizer(notifier.clone(), view);
    let mut app = TuiApp::new(&options, tx);

    tracing::info!(
        server = options.client.base_url(),
        interval_secs = options.interval.as_secs(),
        "starting dashboard"
    );

    let mut terminal = setup_terminal()?;

    sync.spawn_poll();
    sync.start();

    let result = event_loop(&mut terminal, &mut app, &mut sync, &mut rx).await;

    // Quitting is page unload: stop the timer and release any open prompt
    sync.stop();
    if let Some(reply) = app.prompt.take() {
        let _ = reply.send(Permission::Undecided);
    }
    restore_terminal()?;
    remember_permission(options.notifications, notifier.permission());

    result
}
