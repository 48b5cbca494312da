use super::single_flight::SingleFlight;
use std::future::Future;
use std::sync::Arc;
use taskdesk_core::session::{
    AuthGateway, CredentialStore, LoginRequest, LoginResponse, Session, SessionState,
    StoredCredentials, UserProfile,
};
use taskdesk_core::{Result, TaskdeskError};
use tokio::sync::{Mutex, watch};

/// Transitions that concurrent callers share instead of repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Start,
    Logout,
    Recover,
}

/// Owns the client session and every transition of it.
///
/// `SessionManager` is responsible for:
/// - Restoring a persisted session on startup (validate, refresh, re-validate)
/// - Adopting login responses and persisting them in one write
/// - Logging out (best-effort server notification, unconditional local clear)
/// - Recovering from a rejected access token on behalf of the domain services
///
/// The session is published through a [`watch`] channel. Transitions never
/// overlap: all of them run under one async lock, and concurrent calls of
/// `start`, `logout` or `recover_from_unauthorized` share the run already in
/// flight.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn CredentialStore>,
    gateway: Arc<dyn AuthGateway>,
    session: watch::Sender<Session>,
    transition_lock: Mutex<()>,
    flights: Arc<SingleFlight<Transition, Session>>,
}

impl SessionManager {
    /// Creates a manager in the `Unauthenticated` state. Call
    /// [`SessionManager::start`] to restore persisted credentials.
    pub fn new(store: Arc<dyn CredentialStore>, gateway: Arc<dyn AuthGateway>) -> Self {
        let (session, _) = watch::channel(Session::unauthenticated());
        Self {
            inner: Arc::new(Inner {
                store,
                gateway,
                session,
                transition_lock: Mutex::new(()),
                flights: SingleFlight::new(),
            }),
        }
    }

    /// Subscribes to session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.session.subscribe()
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.inner.session.borrow().clone()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.inner.session.borrow().current_user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.session.borrow().is_authenticated()
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    /// Restores the persisted session.
    ///
    /// Always settles in `Authenticated` or `Unauthenticated`; backend
    /// failures are absorbed. Only storage failures are returned.
    pub async fn start(&self) -> Result<Session> {
        let inner = self.inner.clone();
        self.inner
            .flights
            .run(Transition::Start, move || async move {
                inner.locked(Transition::Start).await
            })
            .await
    }

    /// Adopts a login response.
    ///
    /// Both tokens and the user must be present. A rejected response leaves
    /// the session and the store untouched.
    pub async fn login(&self, response: LoginResponse) -> Result<Session> {
        self.exclusive(move |inner| async move { inner.adopt_login(response).await })
            .await
    }

    /// Signs in with email and password, then adopts the response.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response = self.inner.gateway.login(&request).await.map_err(|e| {
            tracing::warn!(error = %e, "Sign-in request failed");
            e
        })?;
        self.login(response).await
    }

    /// Ends the session. The server is told on a best-effort basis; local
    /// credentials are always cleared.
    pub async fn logout(&self) -> Result<()> {
        let inner = self.inner.clone();
        self.inner
            .flights
            .run(Transition::Logout, move || async move {
                inner.locked(Transition::Logout).await
            })
            .await
            .map(|_| ())
    }

    /// Runs one refresh cycle after a request was rejected with 401.
    ///
    /// Returns whether the session is authenticated afterwards. Concurrent
    /// callers share a single refresh.
    pub async fn recover_from_unauthorized(&self) -> Result<bool> {
        let inner = self.inner.clone();
        self.inner
            .flights
            .run(Transition::Recover, move || async move {
                inner.locked(Transition::Recover).await
            })
            .await
            .map(|session| session.is_authenticated())
    }

    /// Clears the first-time-login flag in the store and on the current user.
    pub async fn mark_first_login_complete(&self) -> Result<()> {
        self.exclusive(|inner| async move { inner.clear_first_login().await })
            .await
    }

    /// Runs `operation`, and when it fails with `Unauthorized` recovers the
    /// session and runs it exactly once more.
    pub async fn with_reauth<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match operation().await {
            Err(e) if e.is_unauthorized() => {
                tracing::debug!("Request unauthorized, attempting session recovery");
                if self.recover_from_unauthorized().await? {
                    operation().await
                } else {
                    Err(e)
                }
            }
            other => other,
        }
    }

    /// Runs `work` on its own task under the transition lock, so it
    /// completes even if the caller stops awaiting it.
    async fn exclusive<T, F, Fut>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Inner>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let inner = self.inner.clone();
        let operation = work(inner.clone());
        tokio::spawn(async move {
            let _guard = inner.transition_lock.lock().await;
            operation.await
        })
        .await
        .unwrap_or_else(|e| Err(TaskdeskError::internal(format!("session task aborted: {e}"))))
    }
}

impl Inner {
    async fn adopt_login(&self, response: LoginResponse) -> Result<Session> {
        let credentials = match response.into_credentials() {
            Ok(credentials) => credentials,
            Err(e) => {
                tracing::error!(error = %e, "Rejected login response");
                return Err(e);
            }
        };

        self.store.save(&credentials).await?;
        let session = self.adopt_credentials(credentials)?;
        tracing::info!(user_id = ?session.user_id(), "Logged in");
        Ok(session)
    }

    async fn clear_first_login(&self) -> Result<()> {
        let mut credentials = self.store.load().await?;
        if !credentials.is_empty() {
            credentials.first_time_login = false;
            if let Some(user) = credentials.user_profile.as_mut() {
                user.first_time_login = false;
            }
            self.store.save(&credentials).await?;
        }

        self.session.send_modify(|session| {
            if let Some(user) = session.current_user.as_mut() {
                user.first_time_login = false;
            }
        });
        Ok(())
    }

    async fn locked(&self, transition: Transition) -> Result<Session> {
        let _guard = self.transition_lock.lock().await;

        let outcome = match transition {
            Transition::Start => self.restore().await,
            Transition::Logout => self.end_session().await,
            Transition::Recover => self.recover().await,
        };

        match outcome {
            Ok(session) => Ok(session),
            Err(e) => {
                // A transition that cannot finish leaves no half-adopted session.
                tracing::error!(error = %e, ?transition, "Session transition failed");
                if let Err(clear_err) = self.store.clear().await {
                    tracing::warn!(error = %clear_err, "Failed to clear credentials");
                }
                self.publish(Session::unauthenticated());
                Err(e)
            }
        }
    }

    async fn restore(&self) -> Result<Session> {
        let stored = self.store.load().await?;
        let Some(access_token) = stored.access_token.clone() else {
            tracing::debug!("No stored access token");
            return self.clear_locally().await;
        };

        self.publish(Session {
            state: SessionState::Validating,
            access_token: Some(access_token.clone()),
            refresh_token: stored.refresh_token.clone(),
            current_user: stored.user_profile.clone(),
        });

        match self.gateway.current_user().await {
            Ok(user) => {
                self.adopt_user(access_token, stored.refresh_token, user, stored.first_time_login)
                    .await
            }
            Err(e) if e.is_unauthorized() => {
                tracing::info!("Stored access token rejected");
                self.refresh_cycle(stored).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not validate stored session");
                self.clear_locally().await
            }
        }
    }

    async fn recover(&self) -> Result<Session> {
        let current = self.snapshot();
        if current.state != SessionState::Authenticated {
            tracing::debug!(state = %current.state, "Nothing to recover");
            return Ok(current);
        }

        let mut stored = self.store.load().await?;
        if stored.refresh_token.is_none() {
            stored.refresh_token = current.refresh_token;
        }
        self.refresh_cycle(stored).await
    }

    /// One refresh attempt followed by one re-validation.
    async fn refresh_cycle(&self, stored: StoredCredentials) -> Result<Session> {
        let Some(refresh_token) = stored.refresh_token.clone() else {
            tracing::info!("No refresh token, ending session");
            return self.end_session().await;
        };

        self.publish(self.snapshot().in_state(SessionState::Refreshing));

        let pair = match self.gateway.refresh(&refresh_token).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                return self.end_session().await;
            }
        };

        let refresh_token = pair
            .refresh_token
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(refresh_token);
        self.store.save_tokens(&pair.token, &refresh_token).await?;

        match self.gateway.current_user().await {
            Ok(user) => {
                tracing::info!("Session refreshed");
                self.adopt_user(pair.token, Some(refresh_token), user, stored.first_time_login)
                    .await
            }
            Err(e) => {
                tracing::warn!(error = %e, "Refreshed token failed validation");
                self.end_session().await
            }
        }
    }

    /// Best-effort server logout, then local clear. A session that is
    /// already signed out with nothing stored is left alone.
    async fn end_session(&self) -> Result<Session> {
        let current = self.snapshot();
        let stored = self.store.load().await?;
        if current.state == SessionState::Unauthenticated && stored.is_empty() {
            return Ok(current);
        }

        if current.access_token.is_some() || stored.access_token.is_some() {
            if let Err(e) = self.gateway.logout().await {
                tracing::debug!(error = %e, "Server logout failed, clearing locally");
            }
        }
        self.clear_locally().await
    }

    async fn clear_locally(&self) -> Result<Session> {
        self.store.clear().await?;
        Ok(self.publish(Session::unauthenticated()))
    }

    async fn adopt_user(
        &self,
        access_token: String,
        refresh_token: Option<String>,
        mut user: UserProfile,
        first_time_login: bool,
    ) -> Result<Session> {
        user.first_time_login |= first_time_login;
        self.store.set_user_profile(&user).await?;
        Ok(self.publish(Session::authenticated(access_token, refresh_token, user)))
    }

    fn adopt_credentials(&self, credentials: StoredCredentials) -> Result<Session> {
        match credentials {
            StoredCredentials {
                access_token: Some(access_token),
                refresh_token,
                user_profile: Some(user),
                ..
            } => Ok(self.publish(Session::authenticated(access_token, refresh_token, user))),
            _ => Err(TaskdeskError::internal("credentials incomplete after login")),
        }
    }

    fn snapshot(&self) -> Session {
        self.session.borrow().clone()
    }

    fn publish(&self, session: Session) -> Session {
        let previous = self.session.send_replace(session.clone());
        if previous.state != session.state {
            tracing::debug!(from = %previous.state, to = %session.state, "Session state changed");
        }
        session
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
