//! `shk watch` in plain mode: print each refresh until interrupted.

use std::sync::Arc;
use std::time::Duration;

use crate::api::{ApiClient, ApiFeed, Feed};
use crate::config;
use crate::notify::{Notifier, Permission, TerminalNotifier};
use crate::render::{Layout, TerminalView, View};
use crate::sync::Synchronizer;
use crate::{Error, Result};

/// Everything a watcher needs, resolved from flags and config.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub client: ApiClient,
    pub feed: Feed,
    pub interval: Duration,
    pub prune_after: Option<u32>,
    /// Notification permission at startup
    pub notifications: Permission,
}

impl WatchOptions {
    pub fn layout(&self) -> Layout {
        Layout::for_feed(&self.feed)
    }

    /// Build a synchronizer polling this feed.
    pub fn synchronizer(
        &self,
        notifier: Arc<dyn Notifier>,
        view: Arc<dyn View>,
    ) -> Synchronizer {
        let source = Arc::new(ApiFeed::new(self.client.clone(), self.feed.clone()));
        Synchronizer::builder(source, notifier, view)
            .interval(self.interval)
            .prune_after(self.prune_after)
            .build()
    }
}

/// Persist a permission answer given during the session.
///
/// Failures are logged; a watcher never fails because its answer could not
/// be saved.
pub fn remember_permission(initial: Permission, current: Permission) {
    if current == initial || current == Permission::Undecided {
        return;
    }
    let result = config::read_config().and_then(|mut file| {
        file.notifications = Some(current);
        config::write_config(&file)
    });
    match result {
        Ok(path) => tracing::debug!(permission = %current, path = %path.display(), "saved notification permission"),
        Err(e) => tracing::warn!(error = %e, "could not save notification permission"),
    }
}

/// Poll and print until Ctrl-C.
pub async fn watch_plain(options: WatchOptions) -> Result<()> {
    let layout = options.layout();
    let notifier = Arc::new(TerminalNotifier::new(options.notifications));
    let view = Arc::new(TerminalView::new(layout));
    let mut sync = options.synchronizer(notifier.clone(), view);

    eprintln!(
        "Watching {} every {}s. Press Ctrl-C to stop.",
        options.client.base_url(),
        options.interval.as_secs()
    );

    sync.poll().await;
    sync.start();

    let interrupted = tokio::signal::ctrl_c().await;
    sync.stop();
    remember_permission(options.notifications, notifier.permission());

    interrupted.map_err(|e| Error::Other(format!("Failed to wait for Ctrl-C: {}", e)))
}
