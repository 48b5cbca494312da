use super::*;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use taskdesk_core::session::TokenPair;
use taskdesk_infrastructure::MemoryCredentialStore;

// Mock backend that validates whatever token is currently stored, the way
// the real gateway does.
struct MockGateway {
    store: Arc<MemoryCredentialStore>,
    user: UserProfile,
    valid_access: StdMutex<HashSet<String>>,
    valid_refresh: StdMutex<HashSet<String>>,
    issued: StdMutex<VecDeque<TokenPair>>,
    me_script: StdMutex<VecDeque<Result<UserProfile>>>,
    login_response: StdMutex<Option<LoginResponse>>,
    delay: Duration,
    me_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    login_calls: AtomicUsize,
}

impl MockGateway {
    fn new(store: Arc<MemoryCredentialStore>) -> Self {
        Self {
            store,
            user: profile(),
            valid_access: StdMutex::new(HashSet::new()),
            valid_refresh: StdMutex::new(HashSet::new()),
            issued: StdMutex::new(VecDeque::new()),
            me_script: StdMutex::new(VecDeque::new()),
            login_response: StdMutex::new(None),
            delay: Duration::ZERO,
            me_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn accept_access(&self, token: &str) {
        self.valid_access.lock().unwrap().insert(token.to_string());
    }

    fn accept_refresh(&self, token: &str) {
        self.valid_refresh.lock().unwrap().insert(token.to_string());
    }

    fn issue(&self, token: &str, refresh_token: Option<&str>) {
        self.issued.lock().unwrap().push_back(TokenPair {
            token: token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
        });
    }

    fn script_me(&self, outcome: Result<UserProfile>) {
        self.me_script.lock().unwrap().push_back(outcome);
    }

    fn calls(&self) -> (usize, usize, usize) {
        (
            self.me_calls.load(Ordering::SeqCst),
            self.refresh_calls.load(Ordering::SeqCst),
            self.logout_calls.load(Ordering::SeqCst),
        )
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl AuthGateway for MockGateway {
    async fn login(&self, _request: &LoginRequest) -> Result<LoginResponse> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.login_response
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| TaskdeskError::unauthorized("Invalid credentials"))
    }

    async fn current_user(&self) -> Result<UserProfile> {
        self.me_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if let Some(outcome) = self.me_script.lock().unwrap().pop_front() {
            return outcome;
        }
        let token = self.store.access_token().await?;
        match token {
            Some(t) if self.valid_access.lock().unwrap().contains(&t) => Ok(self.user.clone()),
            _ => Err(TaskdeskError::unauthorized("Token expired")),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if !self.valid_refresh.lock().unwrap().contains(refresh_token) {
            return Err(TaskdeskError::unauthorized("Refresh token revoked"));
        }
        let pair = self.issued.lock().unwrap().pop_front().unwrap_or(TokenPair {
            token: "A2".to_string(),
            refresh_token: Some("B2".to_string()),
        });
        self.accept_access(&pair.token);
        Ok(pair)
    }

    async fn logout(&self) -> Result<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn profile() -> UserProfile {
    UserProfile {
        id: 1,
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        organisation_id: Some(4),
        first_time_login: false,
    }
}

fn login_response(token: &str, refresh_token: &str) -> LoginResponse {
    LoginResponse {
        token: Some(token.to_string()),
        refresh_token: Some(refresh_token.to_string()),
        user: Some(profile()),
        first_time_login: false,
    }
}

type Fixture = (SessionManager, Arc<MockGateway>, Arc<MemoryCredentialStore>);

fn setup(gateway: impl FnOnce(Arc<MemoryCredentialStore>) -> MockGateway) -> Fixture {
    let store = Arc::new(MemoryCredentialStore::new("taskdesk"));
    let gateway = Arc::new(gateway(store.clone()));
    let manager = SessionManager::new(store.clone(), gateway.clone());
    (manager, gateway, store)
}

async fn store_credentials(store: &MemoryCredentialStore, access: &str, refresh: Option<&str>) {
    store
        .save(&StoredCredentials {
            access_token: Some(access.to_string()),
            refresh_token: refresh.map(str::to_string),
            first_time_login: false,
            user_profile: Some(profile()),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_start_without_token_stays_unauthenticated() {
    let (manager, gateway, store) = setup(MockGateway::new);

    let session = manager.start().await.unwrap();

    assert_eq!(session.state, SessionState::Unauthenticated);
    assert_eq!(gateway.calls(), (0, 0, 0));
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_login_then_logout_clears_everything() {
    let (manager, gateway, store) = setup(MockGateway::new);

    let session = manager.login(login_response("A", "B")).await.unwrap();
    assert!(session.is_authenticated());
    assert_eq!(store.access_token().await.unwrap().as_deref(), Some("A"));
    assert_eq!(store.refresh_token().await.unwrap().as_deref(), Some("B"));
    assert_eq!(store.user_profile().await.unwrap(), Some(profile()));

    manager.logout().await.unwrap();

    assert_eq!(manager.session(), Session::unauthenticated());
    assert!(store.access_token().await.unwrap().is_none());
    assert!(store.refresh_token().await.unwrap().is_none());
    assert!(!store.first_time_login().await.unwrap());
    assert!(store.user_profile().await.unwrap().is_none());
    assert_eq!(gateway.calls(), (0, 0, 1));
}

#[tokio::test]
async fn test_valid_token_startup_keeps_original_token() {
    let (manager, gateway, store) = setup(MockGateway::new);
    store_credentials(&store, "A", Some("B")).await;
    gateway.accept_access("A");

    let session = manager.start().await.unwrap();

    assert_eq!(session.state, SessionState::Authenticated);
    assert_eq!(session.access_token.as_deref(), Some("A"));
    assert_eq!(session.refresh_token.as_deref(), Some("B"));
    assert_eq!(session.current_user, Some(profile()));
    assert_eq!(gateway.calls(), (1, 0, 0));
    assert_eq!(store.access_token().await.unwrap().as_deref(), Some("A"));
}

#[tokio::test]
async fn test_startup_writes_fresh_profile_back() {
    let (manager, gateway, store) = setup(|store| {
        let mut gateway = MockGateway::new(store);
        gateway.user.name = "Ada Lovelace".to_string();
        gateway
    });
    store_credentials(&store, "A", Some("B")).await;
    gateway.accept_access("A");

    manager.start().await.unwrap();

    let stored = store.user_profile().await.unwrap().unwrap();
    assert_eq!(stored.name, "Ada Lovelace");
}

#[tokio::test]
async fn test_invalid_token_refreshes_and_revalidates() {
    let (manager, gateway, store) = setup(MockGateway::new);
    store_credentials(&store, "A", Some("B")).await;
    gateway.accept_refresh("B");

    let session = manager.start().await.unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.access_token.as_deref(), Some("A2"));
    assert_eq!(session.refresh_token.as_deref(), Some("B2"));
    assert_eq!(gateway.calls(), (2, 1, 0));
    assert_eq!(store.access_token().await.unwrap().as_deref(), Some("A2"));
    assert_eq!(store.refresh_token().await.unwrap().as_deref(), Some("B2"));
}

#[tokio::test]
async fn test_refresh_without_rotation_keeps_refresh_token() {
    let (manager, gateway, store) = setup(MockGateway::new);
    store_credentials(&store, "A", Some("B")).await;
    gateway.accept_refresh("B");
    gateway.issue("A2", None);

    let session = manager.start().await.unwrap();

    assert_eq!(session.refresh_token.as_deref(), Some("B"));
    assert_eq!(store.refresh_token().await.unwrap().as_deref(), Some("B"));
}

#[tokio::test]
async fn test_invalid_token_without_refresh_token_ends_session() {
    let (manager, gateway, store) = setup(MockGateway::new);
    store_credentials(&store, "A", None).await;

    let session = manager.start().await.unwrap();

    assert_eq!(session.state, SessionState::Unauthenticated);
    // One validation, no refresh, one best-effort logout notification.
    assert_eq!(gateway.calls(), (1, 0, 1));
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_refresh_clears_both_tokens() {
    let (manager, gateway, store) = setup(MockGateway::new);
    store_credentials(&store, "A", Some("B")).await;

    let session = manager.start().await.unwrap();

    assert_eq!(session.state, SessionState::Unauthenticated);
    assert_eq!(gateway.calls(), (1, 1, 1));
    assert!(store.access_token().await.unwrap().is_none());
    assert!(store.refresh_token().await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_revalidation_after_refresh_ends_session() {
    let (manager, gateway, store) = setup(MockGateway::new);
    store_credentials(&store, "A", Some("B")).await;
    gateway.accept_refresh("B");
    gateway.script_me(Err(TaskdeskError::unauthorized("Token expired")));
    gateway.script_me(Err(TaskdeskError::http(500, "Server error")));

    let session = manager.start().await.unwrap();

    assert_eq!(session.state, SessionState::Unauthenticated);
    assert_eq!(gateway.calls(), (2, 1, 1));
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_network_error_on_startup_clears_locally_only() {
    let (manager, gateway, store) = setup(MockGateway::new);
    store_credentials(&store, "A", Some("B")).await;
    gateway.script_me(Err(TaskdeskError::Network("connection refused".into())));

    let session = manager.start().await.unwrap();

    assert_eq!(session.state, SessionState::Unauthenticated);
    assert_eq!(gateway.calls(), (1, 0, 0));
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_logout_when_unauthenticated_is_noop() {
    let (manager, gateway, _store) = setup(MockGateway::new);

    manager.logout().await.unwrap();
    manager.logout().await.unwrap();

    assert_eq!(manager.session().state, SessionState::Unauthenticated);
    assert_eq!(gateway.calls(), (0, 0, 0));
}

#[tokio::test]
async fn test_logout_without_restore_notifies_server_and_clears() {
    let (manager, gateway, store) = setup(MockGateway::new);
    store_credentials(&store, "A", Some("B")).await;

    manager.logout().await.unwrap();

    assert_eq!(gateway.calls(), (0, 0, 1));
    assert!(store.load().await.unwrap().is_empty());
    assert_eq!(manager.session(), Session::unauthenticated());
}

#[tokio::test]
async fn test_login_without_refresh_token_is_rejected() {
    let (manager, _gateway, store) = setup(MockGateway::new);
    let mut response = login_response("A", "B");
    response.refresh_token = None;

    let err = manager.login(response).await.unwrap_err();

    assert!(matches!(err, TaskdeskError::InvalidLogin(_)));
    assert_eq!(manager.session(), Session::unauthenticated());
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_first_time_login_flag_round_trip() {
    let (manager, _gateway, store) = setup(MockGateway::new);
    let response: LoginResponse = serde_json::from_value(serde_json::json!({
        "token": "A",
        "refreshToken": "B",
        "user": {"id": 1, "name": "Ada", "first_time_login": 1}
    }))
    .unwrap();

    let session = manager.login(response).await.unwrap();

    assert!(session.current_user.as_ref().unwrap().first_time_login);
    assert!(store.first_time_login().await.unwrap());

    manager.mark_first_login_complete().await.unwrap();

    assert!(!manager.current_user().unwrap().first_time_login);
    assert!(!store.first_time_login().await.unwrap());
    assert!(!store.user_profile().await.unwrap().unwrap().first_time_login);
    assert_eq!(store.access_token().await.unwrap().as_deref(), Some("A"));
}

#[tokio::test]
async fn test_concurrent_start_validates_once() {
    let (manager, gateway, store) =
        setup(|store| MockGateway::new(store).with_delay(Duration::from_millis(20)));
    store_credentials(&store, "A", Some("B")).await;
    gateway.accept_access("A");

    let (a, b) = tokio::join!(manager.start(), manager.start());

    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(gateway.calls(), (1, 0, 0));
}

#[tokio::test]
async fn test_concurrent_recovery_refreshes_once() {
    let (manager, gateway, _store) =
        setup(|store| MockGateway::new(store).with_delay(Duration::from_millis(20)));
    manager.login(login_response("A", "B")).await.unwrap();
    gateway.accept_refresh("B");

    let (a, b) = tokio::join!(
        manager.recover_from_unauthorized(),
        manager.recover_from_unauthorized()
    );

    assert!(a.unwrap());
    assert!(b.unwrap());
    assert_eq!(gateway.calls(), (1, 1, 0));
    assert_eq!(manager.session().access_token.as_deref(), Some("A2"));
}

#[tokio::test]
async fn test_recovery_finishes_after_its_caller_is_dropped() {
    let (manager, gateway, store) =
        setup(|store| MockGateway::new(store).with_delay(Duration::from_millis(50)));
    manager.login(login_response("A", "B")).await.unwrap();
    gateway.accept_refresh("B");

    let abandoned =
        tokio::time::timeout(Duration::from_millis(10), manager.recover_from_unauthorized()).await;
    assert!(abandoned.is_err());
    assert_eq!(manager.session().state, SessionState::Refreshing);

    tokio::time::sleep(Duration::from_millis(300)).await;

    let session = manager.session();
    assert_eq!(session.state, SessionState::Authenticated);
    assert!(!session.is_loading());
    assert_eq!(session.access_token.as_deref(), Some("A2"));
    assert_eq!(store.access_token().await.unwrap().as_deref(), Some("A2"));
    assert_eq!(gateway.calls(), (1, 1, 0));
}

#[tokio::test]
async fn test_login_after_dropped_recovery_does_not_hang() {
    let (manager, gateway, store) =
        setup(|store| MockGateway::new(store).with_delay(Duration::from_millis(50)));
    manager.login(login_response("A", "B")).await.unwrap();
    gateway.accept_refresh("B");

    let abandoned =
        tokio::time::timeout(Duration::from_millis(10), manager.recover_from_unauthorized()).await;
    assert!(abandoned.is_err());

    let session = tokio::time::timeout(
        Duration::from_secs(2),
        manager.login(login_response("C", "D")),
    )
    .await
    .expect("login waits for the recovery, then proceeds")
    .unwrap();

    assert_eq!(session.access_token.as_deref(), Some("C"));
    assert_eq!(manager.session().access_token.as_deref(), Some("C"));
    assert_eq!(store.refresh_token().await.unwrap().as_deref(), Some("D"));
}

#[tokio::test]
async fn test_mark_first_login_after_dropped_start_does_not_hang() {
    let (manager, gateway, store) =
        setup(|store| MockGateway::new(store).with_delay(Duration::from_millis(50)));
    store_credentials(&store, "A", Some("B")).await;
    store.set_first_time_login(true).await.unwrap();
    gateway.accept_access("A");

    let abandoned = tokio::time::timeout(Duration::from_millis(10), manager.start()).await;
    assert!(abandoned.is_err());

    tokio::time::timeout(Duration::from_secs(2), manager.mark_first_login_complete())
        .await
        .expect("flag update waits for the restore, then proceeds")
        .unwrap();

    assert!(manager.is_authenticated());
    assert!(!manager.current_user().unwrap().first_time_login);
    assert!(!store.first_time_login().await.unwrap());
}

#[tokio::test]
async fn test_recover_when_signed_out_makes_no_calls() {
    let (manager, gateway, _store) = setup(MockGateway::new);

    assert!(!manager.recover_from_unauthorized().await.unwrap());
    assert_eq!(gateway.calls(), (0, 0, 0));
}

#[tokio::test]
async fn test_with_reauth_retries_once_after_recovery() {
    let (manager, gateway, _store) = setup(MockGateway::new);
    manager.login(login_response("A", "B")).await.unwrap();
    gateway.accept_refresh("B");
    let attempts = AtomicUsize::new(0);
    let counter = &attempts;

    let result = manager
        .with_reauth(|| async move {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Err(TaskdeskError::unauthorized("Token expired")),
                _ => Ok("tasks"),
            }
        })
        .await;

    assert_eq!(result.unwrap(), "tasks");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(gateway.calls(), (1, 1, 0));
}

#[tokio::test]
async fn test_with_reauth_gives_up_when_recovery_fails() {
    let (manager, gateway, store) = setup(MockGateway::new);
    manager.login(login_response("A", "B")).await.unwrap();
    let attempts = AtomicUsize::new(0);
    let counter = &attempts;

    let err = manager
        .with_reauth(|| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(TaskdeskError::unauthorized("Token expired"))
        })
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.calls(), (0, 1, 1));
    assert_eq!(manager.session().state, SessionState::Unauthenticated);
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_with_reauth_passes_other_errors_through() {
    let (manager, gateway, _store) = setup(MockGateway::new);
    manager.login(login_response("A", "B")).await.unwrap();

    let err = manager
        .with_reauth(|| async { Err::<(), _>(TaskdeskError::api("boom")) })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "boom");
    assert_eq!(gateway.calls(), (0, 0, 0));
}

#[tokio::test]
async fn test_sign_in_adopts_gateway_response() {
    let (manager, gateway, store) = setup(MockGateway::new);
    *gateway.login_response.lock().unwrap() = Some(login_response("A", "B"));

    let session = manager.sign_in(" ada@example.com ", "pw").await.unwrap();

    assert!(session.is_authenticated());
    assert_eq!(gateway.login_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.access_token().await.unwrap().as_deref(), Some("A"));

    let err = manager.sign_in("ada@example.com", "wrong").await.unwrap_err();
    assert!(err.is_unauthorized());
    // A failed sign-in leaves the existing session alone.
    assert!(manager.is_authenticated());
}

#[tokio::test]
async fn test_subscribers_see_settled_state() {
    let (manager, gateway, store) = setup(MockGateway::new);
    store_credentials(&store, "A", Some("B")).await;
    gateway.accept_access("A");
    let mut rx = manager.subscribe();

    manager.start().await.unwrap();

    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().is_authenticated());
}
