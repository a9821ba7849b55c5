//! Channel-backed `View` and `Notifier` for the TUI.
//!
//! The synchronizer runs on tokio tasks; the TUI owns all drawing state on
//! its event loop. These adapters turn synchronizer callbacks into
//! [`UiEvent`]s the loop applies between frames.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::api::ApiError;
use crate::models::Complaint;
use crate::notify::{Notifier, Permission, PermissionCell};
use crate::render::View;

/// Something the event loop must apply.
#[derive(Debug)]
pub enum UiEvent {
    Loading(bool),
    Records(Vec<Complaint>),
    /// Fetch failed; carries the user-facing detail
    FetchFailed(String),
    /// A status-change notification to show
    Notify(String),
    /// Ask the user for notification permission and reply on the sender
    PermissionRequest(oneshot::Sender<Permission>),
    /// A user action (status change, feedback) finished
    ActionFinished {
        result: Result<String, String>,
        /// Refresh the table now
        refresh: bool,
    },
}

/// Forwards view updates to the event loop.
#[derive(Debug, Clone)]
pub struct ChannelView {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelView {
    pub fn new(tx: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self { tx }
    }
}

impl View for ChannelView {
    fn show_loading(&self, loading: bool) {
        let _ = self.tx.send(UiEvent::Loading(loading));
    }

    fn show_records(&self, records: &[Complaint]) {
        let _ = self.tx.send(UiEvent::Records(records.to_vec()));
    }

    fn show_error(&self, error: &ApiError) {
        let _ = self.tx.send(UiEvent::FetchFailed(error.user_message()));
    }
}

/// Delivers notifications as toasts and asks for permission with a modal.
#[derive(Debug)]
pub struct ChannelNotifier {
    permission: PermissionCell,
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelNotifier {
    pub fn new(permission: Permission, tx: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self {
            permission: PermissionCell::new(permission),
            tx,
        }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    fn permission(&self) -> Permission {
        self.permission.get()
    }

    async fn request_permission(&self) -> Permission {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(UiEvent::PermissionRequest(reply_tx)).is_err() {
            return self.permission.get();
        }
        // A dropped reply (UI closed) counts as a dismissal
        let answer = reply_rx.await.unwrap_or(Permission::Undecided);
        if answer != Permission::Undecided {
            self.permission.set(answer);
        }
        answer
    }

    fn deliver(&self, message: &str) {
        let _ = self.tx.send(UiEvent::Notify(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Status, StatusTransition};
    use crate::notify::{Delivery, notify_transition};

    fn transition() -> StatusTransition {
        StatusTransition {
            id: 12,
            from: Status::Pending,
            to: Status::Resolved,
        }
    }

    #[tokio::test]
    async fn test_granted_answer_is_remembered_and_delivered() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = ChannelNotifier::new(Permission::Undecided, tx);

        let ui = tokio::spawn(async move {
            let mut delivered = Vec::new();
            while let Some(event) = rx.recv().await {
                match event {
                    UiEvent::PermissionRequest(reply) => {
                        let _ = reply.send(Permission::Granted);
                    }
                    UiEvent::Notify(message) => delivered.push(message),
                    _ => {}
                }
            }
            delivered
        });

        let delivery = notify_transition(&notifier, &transition()).await;
        assert_eq!(delivery, Delivery::Delivered);
        assert_eq!(notifier.permission(), Permission::Granted);

        drop(notifier);
        let delivered = ui.await.unwrap();
        assert_eq!(delivered, vec!["Complaint #12 status updated: Resolved".to_string()]);
    }

    #[tokio::test]
    async fn test_dropped_prompt_is_a_dismissal() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = ChannelNotifier::new(Permission::Undecided, tx);

        let ui = tokio::spawn(async move {
            if let Some(UiEvent::PermissionRequest(reply)) = rx.recv().await {
                drop(reply);
            }
        });

        let delivery = notify_transition(&notifier, &transition()).await;
        assert_eq!(delivery, Delivery::Dismissed);
        assert_eq!(notifier.permission(), Permission::Undecided);
        ui.await.unwrap();
    }

    #[tokio::test]
    async fn test_open_permission_modal_does_not_hold_back_refresh() {
        use std::sync::Arc;

        use crate::sync::Synchronizer;
        use crate::sync::testing::{Scripted, ScriptedSource, record};

        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = Arc::new(ScriptedSource::new(vec![
            Scripted::Records(vec![record(4, Status::Pending)]),
            Scripted::Records(vec![record(4, Status::Resolved)]),
            Scripted::Records(vec![record(4, Status::Resolved), record(6, Status::Pending)]),
        ]));
        let notifier = Arc::new(ChannelNotifier::new(Permission::Undecided, tx.clone()));
        let view = Arc::new(ChannelView::new(tx));
        let sync = Synchronizer::builder(source, notifier, view).build();

        sync.poll().await;
        sync.poll().await;

        // Hold the modal open without answering
        let _reply = loop {
            match rx.recv().await {
                Some(UiEvent::PermissionRequest(reply)) => break reply,
                Some(_) => {}
                None => panic!("event channel closed"),
            }
        };

        assert!(!sync.poll().await.is_skipped());
        let mut latest = None;
        while let Ok(event) = rx.try_recv() {
            if let UiEvent::Records(records) = event {
                latest = Some(records.iter().map(|c| c.id).collect::<Vec<_>>());
            }
        }
        assert_eq!(latest, Some(vec![4, 6]));
    }

    #[test]
    fn test_view_forwards_errors_as_messages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let view = ChannelView::new(tx);
        view.show_error(&ApiError::Status { status: 502 });
        match rx.try_recv().unwrap() {
            UiEvent::FetchFailed(message) => assert_eq!(message, "The server returned HTTP 502"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
