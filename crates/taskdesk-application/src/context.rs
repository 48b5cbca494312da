//! Wiring of the whole client from a [`ClientConfig`].

use crate::notification_poller::NotificationPoller;
use crate::notification_service::NotificationService;
use crate::session::SessionManager;
use crate::task_service::TaskService;
use crate::user_service::UserService;
use std::sync::Arc;
use taskdesk_core::Result;
use taskdesk_core::config::ClientConfig;
use taskdesk_core::session::CredentialStore;
use taskdesk_infrastructure::{ConfigService, FileCredentialStore};
use taskdesk_interaction::{HttpAuthGateway, HttpClient};

/// One signed-in (or signed-out) client: the session plus every service
/// bound to it. Cloning shares the same session.
#[derive(Clone)]
pub struct Taskdesk {
    config: ClientConfig,
    session: SessionManager,
    tasks: TaskService,
    notifications: NotificationService,
    users: UserService,
}

impl Taskdesk {
    /// Builds the client from the loaded configuration, persisting
    /// credentials in the configured credentials file.
    pub fn open(config_service: &ConfigService) -> Result<Self> {
        let config = config_service.get_config()?;
        let path = config_service.credentials_path(&config);
        tracing::debug!(credentials = %path.display(), "Opening credential store");
        let store = Arc::new(FileCredentialStore::open(path, &config.storage_namespace));
        Self::with_store(config, store)
    }

    /// Builds the client on top of an arbitrary credential store.
    pub fn with_store(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let http = Arc::new(HttpClient::new(&config, store.clone())?);
        let gateway = Arc::new(HttpAuthGateway::new(http.clone()));
        let session = SessionManager::new(store, gateway);

        Ok(Self {
            tasks: TaskService::new(http.clone(), session.clone()),
            notifications: NotificationService::new(http.clone(), session.clone()),
            users: UserService::new(http, session.clone()),
            session,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn tasks(&self) -> &TaskService {
        &self.tasks
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    /// Starts notification polling at the configured interval.
    pub fn spawn_notification_poller(&self) -> NotificationPoller {
        NotificationPoller::spawn(
            self.session.subscribe(),
            Arc::new(self.notifications.clone()),
            self.config.poll_interval(),
        )
    }
}
