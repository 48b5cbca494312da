use anyhow::{Context, Result};
use clap::Subcommand;
use taskdesk_core::notification::{Notification, NotificationSnapshot};
use taskdesk_core::session::SessionState;
use taskdesk_infrastructure::ConfigService;

use super::utils::open_signed_in;

#[derive(Subcommand)]
pub enum NotificationAction {
    /// Show one page of notifications
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Print the unread count
    Unread,
    /// Mark one notification as read
    Read { id: i64 },
    /// Mark every notification as read
    ReadAll,
    /// Keep polling and print changes until interrupted
    Watch,
}

pub async fn run(config_service: &ConfigService, action: NotificationAction) -> Result<()> {
    let app = open_signed_in(config_service).await?;

    match action {
        NotificationAction::List { page, per_page } => {
            let service = match per_page {
                Some(per_page) => app.notifications().clone().with_page_size(per_page),
                None => app.notifications().clone(),
            };
            let page = service.list(page).await.context("Failed to list notifications")?;
            if page.items.is_empty() {
                println!("No notifications.");
            }
            for notification in &page.items {
                print_notification(notification);
            }
            if page.has_more() {
                println!("(more on page {})", page.page + 1);
            }
        }
        NotificationAction::Unread => {
            let count = app
                .notifications()
                .unread_count()
                .await
                .context("Failed to count unread notifications")?;
            println!("{count}");
        }
        NotificationAction::Read { id } => {
            app.notifications()
                .mark_read(id)
                .await
                .context("Failed to mark notification read")?;
            println!("✅ Marked #{id} as read");
        }
        NotificationAction::ReadAll => {
            app.notifications()
                .mark_all_read()
                .await
                .context("Failed to mark notifications read")?;
            println!("✅ Marked all notifications as read");
        }
        NotificationAction::Watch => {
            let poller = app.spawn_notification_poller();
            let mut updates = poller.subscribe();
            let mut session = app.session().subscribe();
            println!(
                "🔔 Watching notifications every {}s, Ctrl-C to stop",
                app.config().notification_poll_interval_secs
            );

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = updates.borrow_and_update().clone();
                        print_snapshot(&snapshot);
                    }
                    changed = session.changed() => {
                        let state = session.borrow_and_update().state;
                        if changed.is_err() || state == SessionState::Unauthenticated {
                            println!("Session ended.");
                            break;
                        }
                    }
                }
            }
            poller.stop().await;
        }
    }

    Ok(())
}

fn print_notification(notification: &Notification) {
    let marker = if notification.read { " " } else { "•" };
    let title = if notification.title.is_empty() {
        &notification.message
    } else {
        &notification.title
    };
    println!("{marker} #{:<5} {title}", notification.id);
}

fn print_snapshot(snapshot: &NotificationSnapshot) {
    if snapshot.is_empty() {
        return;
    }
    let at = snapshot
        .last_updated
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    println!("[{at}] {} unread", snapshot.unread_count);
    for notification in snapshot.notifications.iter().filter(|n| !n.read).take(5) {
        print_notification(notification);
    }
}
