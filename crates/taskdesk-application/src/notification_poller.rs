//! Background notification polling tied to the session lifecycle.
//!
//! While a user is signed in the poller keeps a [`NotificationSnapshot`]
//! current: the first page and the unread count are fetched as soon as the
//! session authenticates, then the unread count is re-polled on a fixed
//! interval. When the session ends the snapshot resets to empty and polling
//! pauses until the next sign-in.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use taskdesk_core::notification::{NotificationFeed, NotificationSnapshot};
use taskdesk_core::session::{Session, SessionState};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Shortest accepted poll interval; shorter ones are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Spawns and owns the polling task.
pub struct NotificationPoller {
    snapshot: watch::Receiver<NotificationSnapshot>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl NotificationPoller {
    /// Starts polling `feed` whenever `session` is authenticated.
    ///
    /// Must be called from within a tokio runtime. Intervals below
    /// [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn spawn(
        session: watch::Receiver<Session>,
        feed: Arc<dyn NotificationFeed>,
        interval: Duration,
    ) -> Self {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(?interval, "Poll interval too short, using the minimum");
        }
        let interval = interval.max(MIN_POLL_INTERVAL);
        let (tx, snapshot) = watch::channel(NotificationSnapshot::default());
        let cancel = CancellationToken::new();
        let worker = PollWorker {
            session,
            feed,
            interval,
            snapshot: tx,
        };
        let task = tokio::spawn(worker.run(cancel.clone()));

        Self {
            snapshot,
            cancel,
            task: Some(task),
        }
    }

    /// Subscribes to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<NotificationSnapshot> {
        self.snapshot.clone()
    }

    pub fn snapshot(&self) -> NotificationSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Stops polling and waits for the task to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Notification poller ended abnormally");
            }
        }
    }
}

impl Drop for NotificationPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct PollWorker {
    session: watch::Receiver<Session>,
    feed: Arc<dyn NotificationFeed>,
    interval: Duration,
    snapshot: watch::Sender<NotificationSnapshot>,
}

impl PollWorker {
    async fn run(mut self, cancel: CancellationToken) {
        tracing::debug!(interval_secs = self.interval.as_secs(), "Notification poller started");
        loop {
            let user_id = tokio::select! {
                _ = cancel.cancelled() => break,
                user = self.wait_for_sign_in() => match user {
                    Some(id) => id,
                    None => break,
                },
            };

            let keep_going = tokio::select! {
                _ = cancel.cancelled() => false,
                alive = self.poll_while_signed_in(user_id) => alive,
            };

            self.reset();
            if !keep_going {
                break;
            }
        }
        tracing::debug!("Notification poller stopped");
    }

    /// Resolves with the user id once the session is authenticated, or
    /// `None` when the session channel closes.
    async fn wait_for_sign_in(&mut self) -> Option<i64> {
        let session = self
            .session
            .wait_for(|s| s.is_authenticated())
            .await
            .ok()?;
        session.user_id()
    }

    /// Polls until the session ends or switches user. Returns `false` when
    /// the session channel closed.
    async fn poll_while_signed_in(&mut self, user_id: i64) -> bool {
        tracing::debug!(user_id, "Fetching notifications");
        self.refresh_all().await;

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = self.session.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                    let (state, current_user) = {
                        let session = self.session.borrow_and_update();
                        (session.state, session.user_id())
                    };
                    if state == SessionState::Unauthenticated {
                        tracing::debug!("Session ended, pausing notification polling");
                        return true;
                    }
                    if state == SessionState::Authenticated && current_user != Some(user_id) {
                        tracing::debug!("Signed-in user changed, refetching notifications");
                        return true;
                    }
                }
                _ = ticker.tick() => self.refresh_unread().await,
            }
        }
    }

    async fn refresh_all(&self) {
        let page = self.feed.page(1).await;
        let count = self.feed.unread_count().await;
        self.snapshot.send_modify(|snapshot| {
            match page {
                Ok(page) => snapshot.notifications = page.items,
                Err(e) => tracing::warn!(error = %e, "Failed to fetch notifications"),
            }
            match count {
                Ok(count) => snapshot.unread_count = count,
                Err(e) => tracing::warn!(error = %e, "Failed to fetch unread count"),
            }
            snapshot.last_updated = Some(Utc::now());
        });
    }

    async fn refresh_unread(&self) {
        match self.feed.unread_count().await {
            Ok(count) => self.snapshot.send_modify(|snapshot| {
                snapshot.unread_count = count;
                snapshot.last_updated = Some(Utc::now());
            }),
            Err(e) => tracing::warn!(error = %e, "Failed to poll unread count"),
        }
    }

    fn reset(&self) {
        self.snapshot.send_replace(NotificationSnapshot::default());
    }
}
