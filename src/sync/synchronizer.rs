//! Polling lifecycle: refresh timer, in-flight guard, view and notifications.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{ObservedStatusTable, synchronize};
use crate::api::{ApiError, ComplaintSource};
use crate::models::{ComplaintId, Status, StatusTransition};
use crate::notify::{Notifier, notify_transition};
use crate::render::View;

/// Default refresh period
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Whether the watcher is currently being looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Result of one poll cycle.
#[derive(Debug)]
pub enum PollOutcome {
    /// Another cycle was still in flight; nothing was fetched
    Skipped,
    /// The fetch failed; the view shows the error and nothing was observed
    Failed(ApiError),
    /// The fetch succeeded; these transitions were detected and queued for
    /// notification
    Synced(Vec<StatusTransition>),
}

impl PollOutcome {
    pub fn transitions(&self) -> &[StatusTransition] {
        match self {
            PollOutcome::Synced(transitions) => transitions,
            _ => &[],
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PollOutcome::Skipped)
    }
}

/// Work for the notification task.
enum Notice {
    Transition(StatusTransition),
    /// Answered once every earlier notice has been handled
    Flush(oneshot::Sender<()>),
}

/// Delivers notifications one at a time, in emission order, off the poll
/// path. A permission prompt nobody answers only holds up later
/// notifications, never later polls.
struct NotificationQueue {
    tx: mpsc::UnboundedSender<Notice>,
    /// Taken when the delivery task is spawned
    pending: std::sync::Mutex<Option<(mpsc::UnboundedReceiver<Notice>, Arc<dyn Notifier>)>>,
}

impl NotificationQueue {
    fn new(notifier: Arc<dyn Notifier>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            pending: std::sync::Mutex::new(Some((rx, notifier))),
        }
    }

    /// Spawn the delivery task on first use. Needs a running runtime.
    fn ensure_running(&self) {
        let taken = match self.pending.lock() {
            Ok(mut pending) => pending.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some((mut rx, notifier)) = taken else {
            return;
        };
        tokio::spawn(async move {
            while let Some(notice) = rx.recv().await {
                match notice {
                    Notice::Transition(transition) => {
                        let delivery = notify_transition(notifier.as_ref(), &transition).await;
                        tracing::debug!(id = transition.id, ?delivery, "notification handled");
                    }
                    Notice::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });
    }

    fn push(&self, transition: StatusTransition) {
        self.ensure_running();
        if self.tx.send(Notice::Transition(transition)).is_err() {
            tracing::warn!(id = transition.id, "notification task gone, dropping notification");
        }
    }

    async fn flush(&self) {
        self.ensure_running();
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Notice::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

/// State shared between the synchronizer, its timer and poll tasks.
struct Shared {
    source: Arc<dyn ComplaintSource>,
    view: Arc<dyn View>,
    observed: Mutex<ObservedStatusTable>,
    in_flight: AtomicBool,
    notifications: NotificationQueue,
}

/// Clears the in-flight flag when a cycle ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Shared {
    async fn poll(&self) -> PollOutcome {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!(source = %self.source.describe(), "poll still in flight, skipping cycle");
            return PollOutcome::Skipped;
        }
        let in_flight = InFlight(&self.in_flight);

        self.view.show_loading(true);
        let fetched = self.source.fetch().await;
        self.view.show_loading(false);

        let records = match fetched {
            Ok(records) => records,
            Err(error) => {
                tracing::warn!(source = %self.source.describe(), error = %error, "failed to fetch complaints");
                self.view.show_error(&error);
                return PollOutcome::Failed(error);
            }
        };

        self.view.show_records(&records);

        let transitions = {
            let mut observed = self.observed.lock().await;
            synchronize(&records, &mut observed)
        };
        drop(in_flight);

        tracing::debug!(
            records = records.len(),
            transitions = transitions.len(),
            "poll complete"
        );

        for transition in &transitions {
            tracing::info!(
                id = transition.id,
                from = %transition.from,
                to = %transition.to,
                "complaint status changed"
            );
            self.notifications.push(*transition);
        }

        PollOutcome::Synced(transitions)
    }
}

/// The single repeating timer. Aborted on drop.
struct RefreshTimer {
    handle: JoinHandle<()>,
}

impl RefreshTimer {
    /// First tick fires one `period` after spawning. Each tick spawns its own
    /// poll task, so a slow fetch never delays the timer.
    fn spawn(shared: Arc<Shared>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    shared.poll().await;
                });
            }
        });
        Self { handle }
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Builder for [`Synchronizer`].
pub struct SynchronizerBuilder {
    source: Arc<dyn ComplaintSource>,
    notifier: Arc<dyn Notifier>,
    view: Arc<dyn View>,
    interval: Duration,
    prune_after: Option<u32>,
}

impl SynchronizerBuilder {
    /// Refresh period (default 15 seconds). Zero is raised to one second.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_secs(1));
        self
    }

    /// Forget ids missing from this many consecutive fetches.
    pub fn prune_after(mut self, misses: Option<u32>) -> Self {
        self.prune_after = misses;
        self
    }

    pub fn build(self) -> Synchronizer {
        let observed = match self.prune_after {
            Some(misses) => ObservedStatusTable::with_pruning(misses),
            None => ObservedStatusTable::new(),
        };
        Synchronizer {
            shared: Arc::new(Shared {
                source: self.source,
                view: self.view,
                observed: Mutex::new(observed),
                in_flight: AtomicBool::new(false),
                notifications: NotificationQueue::new(self.notifier),
            }),
            interval: self.interval,
            timer: None,
        }
    }
}

/// Keeps a [`View`] in sync with a [`ComplaintSource`] and notifies on
/// status changes.
///
/// Owns the observed-status table and at most one refresh timer. Timer
/// operations need a running tokio runtime.
pub struct Synchronizer {
    shared: Arc<Shared>,
    interval: Duration,
    timer: Option<RefreshTimer>,
}

impl Synchronizer {
    pub fn builder(
        source: Arc<dyn ComplaintSource>,
        notifier: Arc<dyn Notifier>,
        view: Arc<dyn View>,
    ) -> SynchronizerBuilder {
        SynchronizerBuilder {
            source,
            notifier,
            view,
            interval: DEFAULT_POLL_INTERVAL,
            prune_after: None,
        }
    }

    /// Run one fetch-render-diff cycle now and queue its notifications.
    ///
    /// Returns [`PollOutcome::Skipped`] without fetching if another cycle is
    /// still in flight. Does not wait for notifications to be delivered.
    pub async fn poll(&self) -> PollOutcome {
        self.shared.poll().await
    }

    /// Run one cycle in the background.
    pub fn spawn_poll(&self) -> JoinHandle<PollOutcome> {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.poll().await })
    }

    /// Start the refresh timer, replacing any timer already running.
    pub fn start(&mut self) {
        self.stop();
        tracing::debug!(interval_secs = self.interval.as_secs(), "starting refresh timer");
        self.timer = Some(RefreshTimer::spawn(Arc::clone(&self.shared), self.interval));
    }

    /// Stop the refresh timer. A cycle already in flight runs to completion.
    pub fn stop(&mut self) {
        if self.timer.take().is_some() {
            tracing::debug!("stopped refresh timer");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer
            .as_ref()
            .is_some_and(|timer| !timer.handle.is_finished())
    }

    /// Hidden stops the timer; visible restarts it.
    pub fn set_visibility(&mut self, visibility: Visibility) {
        match visibility {
            Visibility::Hidden => self.stop(),
            Visibility::Visible => self.start(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Last observed status for `id`.
    pub async fn observed_status(&self, id: ComplaintId) -> Option<Status> {
        self.shared.observed.lock().await.get(id)
    }

    /// Number of ids in the observed-status table.
    pub async fn observed_len(&self) -> usize {
        self.shared.observed.lock().await.len()
    }

    /// Wait until every notification queued so far has been handled.
    pub async fn flush_notifications(&self) {
        self.shared.notifications.flush().await;
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Permission;
    use crate::notify::testing::RecordingNotifier;
    use crate::sync::testing::{RecordingView, Scripted, ScriptedSource, Shown, record};

    struct Fixture {
        source: Arc<ScriptedSource>,
        notifier: Arc<RecordingNotifier>,
        view: Arc<RecordingView>,
        sync: Synchronizer,
    }

    fn fixture(source: ScriptedSource, permission: Permission) -> Fixture {
        let source = Arc::new(source);
        let notifier = Arc::new(RecordingNotifier::new(permission, Permission::Undecided));
        let view = Arc::new(RecordingView::new());
        let sync = Synchronizer::builder(source.clone(), notifier.clone(), view.clone()).build();
        Fixture {
            source,
            notifier,
            view,
            sync,
        }
    }

    #[tokio::test]
    async fn test_poll_renders_then_notifies_changes() {
        let f = fixture(
            ScriptedSource::new(vec![
                Scripted::Records(vec![record(1, Status::Pending), record(2, Status::Pending)]),
                Scripted::Records(vec![record(1, Status::Resolved), record(2, Status::Pending)]),
            ]),
            Permission::Granted,
        );

        let first = f.sync.poll().await;
        assert!(first.transitions().is_empty());
        assert_eq!(f.view.shown(), Shown::Records(vec![1, 2]));

        let second = f.sync.poll().await;
        assert_eq!(second.transitions().len(), 1);
        f.sync.flush_notifications().await;
        assert_eq!(
            f.notifier.delivered(),
            vec!["Complaint #1 status updated: Resolved".to_string()]
        );
        assert_eq!(f.sync.observed_status(1).await, Some(Status::Resolved));
        assert_eq!(*f.view.loading_events.lock().unwrap(), vec![true, false, true, false]);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_table_untouched() {
        let f = fixture(
            ScriptedSource::new(vec![
                Scripted::Records(vec![record(1, Status::Pending)]),
                Scripted::Fail,
            ]),
            Permission::Granted,
        );

        f.sync.poll().await;
        let outcome = f.sync.poll().await;

        assert!(matches!(outcome, PollOutcome::Failed(ApiError::Status { status: 503 })));
        assert_eq!(f.view.shown(), Shown::Error("HTTP error! status: 503".to_string()));
        assert_eq!(f.sync.observed_status(1).await, Some(Status::Pending));
        assert_eq!(f.sync.observed_len().await, 1);
        assert!(f.notifier.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_poll_is_skipped() {
        let f = fixture(
            ScriptedSource::gated(vec![Scripted::Records(vec![record(1, Status::Pending)])]),
            Permission::Granted,
        );

        let first = f.sync.spawn_poll();
        // Let the first cycle reach the gated fetch
        while f.source.fetches() == 0 {
            tokio::task::yield_now().await;
        }

        let second = f.sync.poll().await;
        assert!(second.is_skipped());
        assert_eq!(f.source.fetches(), 1);

        f.source.release(1);
        let first = first.await.unwrap();
        assert!(matches!(first, PollOutcome::Synced(_)));

        // The slot is free again
        f.source.release(1);
        assert!(!f.sync.poll().await.is_skipped());
        assert_eq!(f.source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_denied_permission_still_updates_view() {
        let f = fixture(
            ScriptedSource::new(vec![
                Scripted::Records(vec![record(5, Status::Pending)]),
                Scripted::Records(vec![record(5, Status::InProgress)]),
            ]),
            Permission::Denied,
        );

        f.sync.poll().await;
        let outcome = f.sync.poll().await;
        assert_eq!(outcome.transitions().len(), 1);
        f.sync.flush_notifications().await;
        assert!(f.notifier.delivered().is_empty());
        assert_eq!(f.notifier.requests(), 0);
        assert_eq!(f.view.shown(), Shown::Records(vec![5]));
    }

    /// Prompts that are never answered.
    struct UnansweredPrompt {
        prompts: std::sync::Mutex<usize>,
    }

    #[async_trait::async_trait]
    impl Notifier for UnansweredPrompt {
        fn permission(&self) -> Permission {
            Permission::Undecided
        }

        async fn request_permission(&self) -> Permission {
            *self.prompts.lock().unwrap() += 1;
            std::future::pending().await
        }

        fn deliver(&self, _message: &str) {}
    }

    #[tokio::test]
    async fn test_unanswered_prompt_does_not_stall_polling() {
        let source = Arc::new(ScriptedSource::new(vec![
            Scripted::Records(vec![record(1, Status::Pending)]),
            Scripted::Records(vec![record(1, Status::Resolved)]),
            Scripted::Records(vec![record(1, Status::Resolved), record(2, Status::Pending)]),
        ]));
        let notifier = Arc::new(UnansweredPrompt {
            prompts: std::sync::Mutex::new(0),
        });
        let view = Arc::new(RecordingView::new());
        let sync = Synchronizer::builder(source.clone(), notifier.clone(), view.clone()).build();

        sync.poll().await;
        let changed = sync.poll().await;
        assert_eq!(changed.transitions().len(), 1);

        // Let the delivery task reach the prompt
        while *notifier.prompts.lock().unwrap() == 0 {
            tokio::task::yield_now().await;
        }

        let third = sync.poll().await;
        assert!(!third.is_skipped());
        assert_eq!(source.fetches(), 3);
        assert_eq!(view.shown(), Shown::Records(vec![1, 2]));
        assert_eq!(sync.observed_status(2).await, Some(Status::Pending));
    }

    #[tokio::test]
    async fn test_notifications_keep_emission_order() {
        let f = fixture(
            ScriptedSource::new(vec![
                Scripted::Records(vec![record(3, Status::Pending), record(8, Status::Pending)]),
                Scripted::Records(vec![record(3, Status::Resolved), record(8, Status::InProgress)]),
                Scripted::Records(vec![record(3, Status::Resolved), record(8, Status::Resolved)]),
            ]),
            Permission::Granted,
        );

        f.sync.poll().await;
        f.sync.poll().await;
        f.sync.poll().await;
        f.sync.flush_notifications().await;

        assert_eq!(
            f.notifier.delivered(),
            vec![
                "Complaint #3 status updated: Resolved".to_string(),
                "Complaint #8 status updated: In Progress".to_string(),
                "Complaint #8 status updated: Resolved".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_polls_every_interval() {
        let mut f = fixture(
            ScriptedSource::new(vec![Scripted::Records(vec![record(1, Status::Pending)])]),
            Permission::Granted,
        );

        f.sync.start();
        assert!(f.sync.is_running());

        tokio::time::sleep(Duration::from_secs(14)).await;
        assert_eq!(f.source.fetches(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(f.source.fetches(), 1);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(f.source.fetches(), 2);

        f.sync.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_keeps_one_timer() {
        let mut f = fixture(
            ScriptedSource::new(vec![Scripted::Records(vec![record(1, Status::Pending)])]),
            Permission::Granted,
        );

        f.sync.start();
        f.sync.start();
        tokio::time::sleep(Duration::from_secs(46)).await;
        assert_eq!(f.source.fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visibility_suspends_and_resumes() {
        let mut f = fixture(
            ScriptedSource::new(vec![Scripted::Records(vec![record(1, Status::Pending)])]),
            Permission::Granted,
        );

        f.sync.set_visibility(Visibility::Visible);
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(f.source.fetches(), 1);

        f.sync.set_visibility(Visibility::Hidden);
        assert!(!f.sync.is_running());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(f.source.fetches(), 1);

        f.sync.set_visibility(Visibility::Visible);
        assert!(f.sync.is_running());
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(f.source.fetches(), 2);
    }

    #[test]
    fn test_builder_clamps_interval() {
        let source = Arc::new(ScriptedSource::new(Vec::new()));
        let notifier = Arc::new(RecordingNotifier::new(Permission::Denied, Permission::Denied));
        let view = Arc::new(RecordingView::new());
        let sync = Synchronizer::builder(source, notifier, view)
            .interval(Duration::ZERO)
            .build();
        assert_eq!(sync.interval(), Duration::from_secs(1));
    }
}
