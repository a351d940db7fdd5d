//! The single state machine for authentication.
//!
//! Owns the session exclusively: the store only mirrors what the
//! coordinator tells it to hold, and the remote service is reached through
//! the injected `AuthApi` seam. Every operation resolves to a `bool` plus a
//! stored error string; no failure path escapes as an `Err` or a panic.
//!
//! Operations take `&mut self`, so overlapping invocations cannot be
//! expressed; the single-threaded caller drives one operation at a time.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::AuthApi;
use crate::models::user::{NewUser, Session, User};
use crate::session::policy;
use crate::session::store::{SessionStore, TOKEN_KEY, USER_KEY};

/// Authentication lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    /// A login or signup call is in flight.
    Authenticating,
    Authenticated,
    /// Startup check of a persisted token is in flight.
    Revalidating,
}

pub struct AuthCoordinator {
    api: Arc<dyn AuthApi>,
    store: Box<dyn SessionStore>,
    state: AuthState,
    session: Option<Session>,
    error: Option<String>,
    revalidated: bool,
}

impl AuthCoordinator {
    /// Builds the coordinator and hydrates from the store. A persisted
    /// token with a readable user record restores the authenticated state;
    /// a half-written pair (one key without the other, or an unparseable
    /// user) is wiped so the token/user invariant holds from the start.
    pub fn new(api: Arc<dyn AuthApi>, store: Box<dyn SessionStore>) -> Self {
        let mut coordinator = Self {
            api,
            store,
            state: AuthState::Anonymous,
            session: None,
            error: None,
            revalidated: false,
        };
        coordinator.hydrate();
        coordinator
    }

    fn hydrate(&mut self) {
        let token = self.store.get(TOKEN_KEY);
        let user = self
            .store
            .get(USER_KEY)
            .and_then(|raw| serde_json::from_str::<User>(&raw).ok());
        match (token, user) {
            (Some(token), Some(user)) => {
                self.session = Some(Session { token, user });
                self.state = AuthState::Authenticated;
            }
            (None, None) => {}
            _ => {
                warn!("persisted session is incomplete, clearing it");
                self.clear_session();
            }
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    /// The user record, present exactly when authenticated.
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    /// The bearer token, present exactly when authenticated.
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    /// The last recorded failure, for the caller to display.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Attempts a credential login. Returns true and installs the session
    /// on success; on any failure records an error, leaves the session as
    /// it was before the attempt, and touches neither storage key.
    pub async fn login(&mut self, email: &str, password: &str) -> bool {
        self.error = None;
        if email.trim().is_empty() || password.is_empty() {
            return self.fail("Please enter both email and password".to_string());
        }

        self.state = AuthState::Authenticating;
        match self.api.login(email, password).await {
            Ok(session) => {
                info!(email, "login succeeded");
                self.install_session(session);
                true
            }
            Err(e) => {
                warn!(email, "login failed: {e}");
                self.fail(e.to_string())
            }
        }
    }

    /// Registers a new account. Validation runs before any network call.
    /// The register endpoint is not trusted to issue a token; when it does
    /// not, one implicit follow-up login is performed. Failing to obtain a
    /// token either way fails the whole attempt with nothing persisted.
    pub async fn signup(&mut self, new_user: &NewUser) -> bool {
        self.error = None;
        if let Err(message) = policy::validate_signup(new_user) {
            return self.fail(message);
        }

        self.state = AuthState::Authenticating;
        let registered = match self.api.register(new_user).await {
            Ok(registered) => registered,
            Err(e) => {
                warn!(email = %new_user.email, "registration failed: {e}");
                return self.fail(e.to_string());
            }
        };

        let session = match registered {
            Some(session) => Ok(session),
            None => {
                info!(email = %new_user.email, "register issued no token, logging in");
                self.api.login(&new_user.email, &new_user.password).await
            }
        };

        match session {
            Ok(session) => {
                info!(email = %new_user.email, "signup succeeded");
                self.install_session(session);
                true
            }
            Err(e) => {
                warn!(email = %new_user.email, "post-registration login failed: {e}");
                self.fail(e.to_string())
            }
        }
    }

    /// Logs out. The remote invalidation call is best-effort; local state
    /// and storage are always cleared, and calling this twice is harmless.
    pub async fn logout(&mut self) -> bool {
        self.error = None;
        if let Some(session) = &self.session {
            if let Err(e) = self.api.logout(&session.token).await {
                warn!("logout API call failed, clearing locally anyway: {e}");
            }
        }
        self.clear_session();
        true
    }

    /// Startup revalidation of a persisted token. Runs at most once per
    /// process; later calls just report the current state. This is the only
    /// path that silently demotes an authenticated state back to anonymous.
    pub async fn startup_revalidate(&mut self) -> bool {
        if self.revalidated {
            return self.is_authenticated();
        }
        self.revalidated = true;

        let Some(token) = self.store.get(TOKEN_KEY) else {
            return false;
        };

        self.state = AuthState::Revalidating;
        match self.api.profile(&token).await {
            Ok(user) => {
                info!(email = %user.email, "persisted token revalidated");
                self.install_session(Session { token, user });
                true
            }
            Err(e) => {
                warn!("token revalidation failed, clearing session: {e}");
                self.clear_session();
                false
            }
        }
    }

    /// Forced local teardown after a downstream call answered 401: the
    /// token is dead, so the session is destroyed without a remote call.
    pub fn session_rejected(&mut self) {
        warn!("downstream call rejected the token, clearing session");
        self.error = Some("Your session has expired".to_string());
        self.clear_session();
    }

    /// Records a failure and settles the state to match the session still
    /// held, so a failed attempt started from an authenticated state does
    /// not break the token/user invariant.
    fn fail(&mut self, message: String) -> bool {
        self.error = Some(message);
        self.state = if self.session.is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        };
        false
    }

    fn install_session(&mut self, session: Session) {
        self.store.set(TOKEN_KEY, &session.token);
        match serde_json::to_string(&session.user) {
            Ok(raw) => self.store.set(USER_KEY, &raw),
            Err(e) => warn!("failed to serialize user record: {e}"),
        }
        self.session = Some(session);
        self.state = AuthState::Authenticated;
    }

    fn clear_session(&mut self) {
        self.store.remove(TOKEN_KEY);
        self.store.remove(USER_KEY);
        self.session = None;
        self.state = AuthState::Anonymous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiError;
    use crate::models::user::Role;
    use crate::session::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn admin_user() -> User {
        User {
            id: "1".to_string(),
            name: "Admin User".to_string(),
            email: "admin@example.com".to_string(),
            role: Role::Admin,
            avatar: None,
        }
    }

    fn rejected(message: &str) -> ApiError {
        ApiError::Rejected {
            status: 401,
            message: message.to_string(),
        }
    }

    /// Scripted fake for the remote collaborator. Each operation pops the
    /// next scripted result and counts how often it was invoked.
    #[derive(Default)]
    struct ScriptedApi {
        login_results: Mutex<Vec<Result<Session, ApiError>>>,
        register_results: Mutex<Vec<Result<Option<Session>, ApiError>>>,
        profile_results: Mutex<Vec<Result<User, ApiError>>>,
        logout_results: Mutex<Vec<Result<(), ApiError>>>,
        login_calls: AtomicU32,
        register_calls: AtomicU32,
        profile_calls: AtomicU32,
        logout_calls: AtomicU32,
    }

    impl ScriptedApi {
        fn with_login(self, result: Result<Session, ApiError>) -> Self {
            self.login_results.lock().unwrap().push(result);
            self
        }

        fn with_register(self, result: Result<Option<Session>, ApiError>) -> Self {
            self.register_results.lock().unwrap().push(result);
            self
        }

        fn with_profile(self, result: Result<User, ApiError>) -> Self {
            self.profile_results.lock().unwrap().push(result);
            self
        }
    }

    /// Takes scripted results in the order they were queued.
    fn pop<T>(results: &Mutex<Vec<T>>, missing: &str) -> T {
        let mut results = results.lock().unwrap();
        if results.is_empty() {
            panic!("unscripted call: {missing}");
        }
        results.remove(0)
    }

    #[async_trait]
    impl AuthApi for ScriptedApi {
        async fn login(&self, _email: &str, _password: &str) -> Result<Session, ApiError> {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            pop(&self.login_results, "login")
        }

        async fn register(&self, _new_user: &NewUser) -> Result<Option<Session>, ApiError> {
            self.register_calls.fetch_add(1, Ordering::SeqCst);
            pop(&self.register_results, "register")
        }

        async fn profile(&self, _token: &str) -> Result<User, ApiError> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            pop(&self.profile_results, "profile")
        }

        async fn logout(&self, _token: &str) -> Result<(), ApiError> {
            self.logout_calls.fetch_add(1, Ordering::SeqCst);
            self.logout_results.lock().unwrap().pop().unwrap_or(Ok(()))
        }
    }

    fn coordinator(api: ScriptedApi) -> (AuthCoordinator, Arc<ScriptedApi>) {
        let api = Arc::new(api);
        let coordinator = AuthCoordinator::new(api.clone(), Box::new(MemoryStore::new()));
        (coordinator, api)
    }

    /// token present ⟺ user present, checked after every interesting step.
    fn assert_invariant(c: &AuthCoordinator) {
        assert_eq!(c.token().is_some(), c.user().is_some());
        assert_eq!(c.token().is_some(), c.is_authenticated());
    }

    fn signup_form() -> NewUser {
        NewUser {
            name: "Casey".to_string(),
            email: "casey@example.com".to_string(),
            password: "secret1A!".to_string(),
            avatar: None,
        }
    }

    // Scenario A: successful admin login persists token and user.
    #[tokio::test]
    async fn test_login_success_persists_session() {
        let (mut c, _) = coordinator(ScriptedApi::default().with_login(Ok(Session {
            token: "t1".to_string(),
            user: admin_user(),
        })));

        assert!(c.login("admin@example.com", "admin123").await);
        assert_eq!(c.state(), AuthState::Authenticated);
        assert_eq!(c.token(), Some("t1"));
        assert_eq!(c.user().unwrap().role, Role::Admin);
        assert_eq!(c.error(), None);
        assert_invariant(&c);

        assert_eq!(c.store.get(TOKEN_KEY), Some("t1".to_string()));
        let stored: User = serde_json::from_str(&c.store.get(USER_KEY).unwrap()).unwrap();
        assert_eq!(stored, admin_user());
    }

    // Scenario B: rejection records the server message, leaves everything untouched.
    #[tokio::test]
    async fn test_login_rejection_leaves_state_and_storage_untouched() {
        let (mut c, _) =
            coordinator(ScriptedApi::default().with_login(Err(rejected("Invalid credentials"))));

        assert!(!c.login("a@b.com", "wrong").await);
        assert_eq!(c.state(), AuthState::Anonymous);
        assert_eq!(c.error(), Some("Invalid credentials"));
        assert_eq!(c.store.get(TOKEN_KEY), None);
        assert_eq!(c.store.get(USER_KEY), None);
        assert_invariant(&c);
    }

    #[tokio::test]
    async fn test_login_empty_fields_never_reach_the_network() {
        let (mut c, api) = coordinator(ScriptedApi::default());

        assert!(!c.login("", "password").await);
        assert!(!c.login("a@b.com", "").await);
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            c.error(),
            Some("Please enter both email and password")
        );
    }

    // Round-trip: revalidation against a mocked profile fetch reproduces the user.
    #[tokio::test]
    async fn test_login_then_revalidate_round_trip() {
        let (mut c, _) = coordinator(
            ScriptedApi::default()
                .with_login(Ok(Session {
                    token: "t1".to_string(),
                    user: admin_user(),
                }))
                .with_profile(Ok(admin_user())),
        );

        assert!(c.login("a@b.com", "secret1A!").await);
        assert!(c.startup_revalidate().await);
        assert_eq!(c.user(), Some(&admin_user()));
        assert_eq!(c.token(), Some("t1"));
        assert_invariant(&c);
    }

    // Scenario C: revalidation failure wipes both storage keys.
    #[tokio::test]
    async fn test_revalidate_failure_clears_persisted_session() {
        let store = MemoryStore::new();
        store.set(TOKEN_KEY, "stale");
        store.set(USER_KEY, &serde_json::to_string(&admin_user()).unwrap());

        let api = Arc::new(ScriptedApi::default().with_profile(Err(ApiError::Unauthorized)));
        let mut c = AuthCoordinator::new(api, Box::new(store));
        assert!(c.is_authenticated()); // hydrated from storage

        assert!(!c.startup_revalidate().await);
        assert_eq!(c.state(), AuthState::Anonymous);
        assert_eq!(c.store.get(TOKEN_KEY), None);
        assert_eq!(c.store.get(USER_KEY), None);
        assert_invariant(&c);
    }

    #[tokio::test]
    async fn test_revalidate_runs_at_most_once() {
        let store = MemoryStore::new();
        store.set(TOKEN_KEY, "t1");
        store.set(USER_KEY, &serde_json::to_string(&admin_user()).unwrap());

        let api = Arc::new(ScriptedApi::default().with_profile(Ok(admin_user())));
        let mut c = AuthCoordinator::new(api.clone(), Box::new(store));

        assert!(c.startup_revalidate().await);
        assert!(c.startup_revalidate().await); // reports state, no second fetch
        assert_eq!(api.profile_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_revalidate_without_persisted_token_is_a_no_op() {
        let (mut c, api) = coordinator(ScriptedApi::default());
        assert!(!c.startup_revalidate().await);
        assert_eq!(api.profile_calls.load(Ordering::SeqCst), 0);
    }

    // Boundary: weak password fails before any network call.
    #[tokio::test]
    async fn test_signup_weak_password_never_reaches_the_network() {
        let (mut c, api) = coordinator(ScriptedApi::default());
        let form = NewUser {
            password: "abc".to_string(),
            ..signup_form()
        };

        assert!(!c.signup(&form).await);
        assert_eq!(api.register_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 0);
        assert_eq!(c.error(), Some("Password must be at least 8 characters"));
        assert_invariant(&c);
    }

    #[tokio::test]
    async fn test_signup_with_direct_token_skips_implicit_login() {
        let (mut c, api) = coordinator(ScriptedApi::default().with_register(Ok(Some(Session {
            token: "t9".to_string(),
            user: admin_user(),
        }))));

        assert!(c.signup(&signup_form()).await);
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 0);
        assert_eq!(c.token(), Some("t9"));
        assert_invariant(&c);
    }

    #[tokio::test]
    async fn test_signup_without_token_performs_implicit_login() {
        let (mut c, api) = coordinator(
            ScriptedApi::default()
                .with_register(Ok(None))
                .with_login(Ok(Session {
                    token: "t2".to_string(),
                    user: admin_user(),
                })),
        );

        assert!(c.signup(&signup_form()).await);
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.token(), Some("t2"));
    }

    // Scenario D: registered, but no token obtainable from either call.
    #[tokio::test]
    async fn test_signup_with_no_token_anywhere_is_a_clean_failure() {
        let (mut c, _) = coordinator(
            ScriptedApi::default()
                .with_register(Ok(None))
                .with_login(Err(ApiError::MissingToken)),
        );

        assert!(!c.signup(&signup_form()).await);
        assert_eq!(c.error(), Some("no authentication token received"));
        assert_eq!(c.state(), AuthState::Anonymous);
        assert_eq!(c.store.get(TOKEN_KEY), None);
        assert_eq!(c.store.get(USER_KEY), None);
        assert_invariant(&c);
    }

    // Idempotence: two logouts end in the same state as one.
    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (mut c, api) = coordinator(ScriptedApi::default().with_login(Ok(Session {
            token: "t1".to_string(),
            user: admin_user(),
        })));
        assert!(c.login("a@b.com", "secret1A!").await);

        assert!(c.logout().await);
        assert!(c.logout().await);
        assert_eq!(c.state(), AuthState::Anonymous);
        assert_eq!(c.store.get(TOKEN_KEY), None);
        assert_eq!(c.store.get(USER_KEY), None);
        // The remote call happens only while a session is held.
        assert_eq!(api.logout_calls.load(Ordering::SeqCst), 1);
        assert_invariant(&c);
    }

    #[tokio::test]
    async fn test_logout_clears_locally_even_when_remote_call_fails() {
        let api = ScriptedApi::default().with_login(Ok(Session {
            token: "t1".to_string(),
            user: admin_user(),
        }));
        api.logout_results
            .lock()
            .unwrap()
            .push(Err(rejected("Server error occurred")));
        let (mut c, _) = coordinator(api);

        assert!(c.login("a@b.com", "secret1A!").await);
        assert!(c.logout().await);
        assert_eq!(c.state(), AuthState::Anonymous);
        assert_eq!(c.store.get(TOKEN_KEY), None);
        assert_invariant(&c);
    }

    #[tokio::test]
    async fn test_failed_login_attempt_keeps_an_existing_session() {
        let (mut c, _) = coordinator(
            ScriptedApi::default()
                .with_login(Ok(Session {
                    token: "t1".to_string(),
                    user: admin_user(),
                }))
                .with_login(Err(rejected("Invalid credentials"))),
        );

        assert!(c.login("a@b.com", "secret1A!").await);
        assert!(!c.login("a@b.com", "typo").await);
        // The earlier session survives a failed re-login attempt.
        assert_eq!(c.state(), AuthState::Authenticated);
        assert_eq!(c.token(), Some("t1"));
        assert_eq!(c.error(), Some("Invalid credentials"));
        assert_invariant(&c);
    }

    #[tokio::test]
    async fn test_downstream_rejection_destroys_the_session() {
        let (mut c, api) = coordinator(ScriptedApi::default().with_login(Ok(Session {
            token: "t1".to_string(),
            user: admin_user(),
        })));
        assert!(c.login("a@b.com", "secret1A!").await);

        c.session_rejected();
        assert_eq!(c.state(), AuthState::Anonymous);
        assert_eq!(c.store.get(TOKEN_KEY), None);
        assert_eq!(c.store.get(USER_KEY), None);
        assert_eq!(c.error(), Some("Your session has expired"));
        // Teardown is local only; no remote logout is attempted.
        assert_eq!(api.logout_calls.load(Ordering::SeqCst), 0);
        assert_invariant(&c);
    }

    #[tokio::test]
    async fn test_hydration_wipes_half_written_session() {
        let store = MemoryStore::new();
        store.set(TOKEN_KEY, "orphan");
        // no user key

        let c = AuthCoordinator::new(Arc::new(ScriptedApi::default()), Box::new(store));
        assert_eq!(c.state(), AuthState::Anonymous);
        assert_eq!(c.store.get(TOKEN_KEY), None);
        assert_invariant(&c);
    }

    #[tokio::test]
    async fn test_hydration_wipes_unparseable_user_record() {
        let store = MemoryStore::new();
        store.set(TOKEN_KEY, "t1");
        store.set(USER_KEY, "{broken");

        let c = AuthCoordinator::new(Arc::new(ScriptedApi::default()), Box::new(store));
        assert_eq!(c.state(), AuthState::Anonymous);
        assert_eq!(c.store.get(USER_KEY), None);
        assert_invariant(&c);
    }
}
