//! The session store: login, register, logout, restore, and
//! privileged administrative mutations.

use crate::classify::{classify, messages, Operation};
use crate::machine::{SessionMachine, SessionMachineInput, SessionState};
use crate::{SessionError, SessionResult};
use quill_api::{ApiRequest, HttpClient};
use quill_storage::{SessionVault, UserRecord};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// API endpoints used by the store.
pub(crate) mod endpoints {
    pub const LOGIN: &str = "/auth/login";
    pub const REGISTER: &str = "/auth/register";

    pub fn admin_user(user_id: i64) -> String {
        format!("/admin/users/{user_id}")
    }

    pub fn article(article_id: i64) -> String {
        format!("/articles/{article_id}")
    }
}

/// Substring of the register response `message` that signals success.
///
/// Documented heuristic: the server signals manual-approval
/// registration through message text alone, without issuing a token.
/// Kept until the server contract grows a structured status field.
const SUCCESS_MARKER: &str = "success";

/// The in-memory session: current authenticated identity, if any.
///
/// The logged-in flag is derived from the token/user pair, so no
/// reachable value can report logged-in while holding only one of the
/// two.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserRecord>,
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|user| user.is_admin())
    }
}

/// Result of a login or register attempt. These operations never
/// fail with an error; callers branch on `success` plus `message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub success: bool,
    pub message: Option<String>,
}

impl AuthOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Navigation collaborator the store notifies after logout.
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

/// Owns the session state and its persistence.
///
/// All mutation happens after I/O completes, so a concurrent read
/// (e.g. a route-guard evaluation during an in-flight login) observes
/// the pre-call state.
pub struct SessionStore {
    http: Arc<dyn HttpClient>,
    vault: SessionVault,
    machine: Mutex<SessionMachine>,
    session: Mutex<Session>,
    navigator: Mutex<Option<Arc<dyn Navigator>>>,
}

/// Login response shape. Parsed at this one boundary; everything
/// past it works with typed data.
#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    user_id: Option<i64>,
    #[serde(default)]
    username: Option<String>,
}

/// Register response shape. The server may signal success through
/// the message text, the token, or both.
#[derive(Deserialize)]
struct RegisterResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user_id: Option<i64>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

impl SessionStore {
    /// Create a store in the Anonymous state. Call [`restore`] before
    /// first use to pick up a persisted session.
    ///
    /// [`restore`]: SessionStore::restore
    pub fn new(http: Arc<dyn HttpClient>, vault: SessionVault) -> Self {
        Self {
            http,
            vault,
            machine: Mutex::new(SessionMachine::new()),
            session: Mutex::new(Session::default()),
            navigator: Mutex::new(None),
        }
    }

    /// Set the navigation collaborator used for the post-logout
    /// redirect.
    pub fn set_navigator(&self, navigator: Arc<dyn Navigator>) {
        *self.navigator.lock().unwrap() = Some(navigator);
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        let machine = self.machine.lock().unwrap();
        SessionState::from(machine.state())
    }

    /// Clone of the current session for guard evaluation and display.
    pub fn snapshot(&self) -> Session {
        self.session.lock().unwrap().clone()
    }

    /// Current bearer token, if authenticated.
    pub fn token(&self) -> Option<String> {
        self.session.lock().unwrap().token.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.lock().unwrap().is_logged_in()
    }

    /// Authenticate with the platform.
    ///
    /// Always resolves to an outcome; request failures are classified
    /// into user-facing messages, never propagated.
    pub async fn login(&self, username: &str, password: &str) -> AuthOutcome {
        debug!(username, "Sending login request");

        let request = ApiRequest::post(endpoints::LOGIN).json(serde_json::json!({
            "username": username,
            "password": password,
        }));

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(error = %error, "Login request failed");
                return AuthOutcome::failure(classify(Operation::Login, &error));
            }
        };

        let payload: LoginResponse = match serde_json::from_str(&response.body) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(error = %error, "Login response did not parse");
                return AuthOutcome::failure(messages::MALFORMED_RESPONSE);
            }
        };

        let Some(token) = payload.token.filter(|token| !token.is_empty()) else {
            warn!("Login response carried no token");
            return AuthOutcome::failure(messages::MISSING_TOKEN);
        };

        let user = UserRecord {
            id: payload.user_id.unwrap_or(1),
            username: payload.username.unwrap_or_else(|| username.to_string()),
            email: None,
            role: payload.role.unwrap_or_else(|| "user".to_string()),
        };

        info!(user_id = user.id, role = %user.role, "Login successful");
        self.install_session(token, user, &SessionMachineInput::LoginSucceeded);
        AuthOutcome::ok()
    }

    /// Register a new account.
    ///
    /// Two independent success signals: a message containing the
    /// success marker (registration accepted, no session), or an
    /// issued token (auto-login, full login side effects regardless of
    /// the message text).
    pub async fn register(&self, username: &str, email: &str, password: &str) -> AuthOutcome {
        debug!(username, email, "Sending register request");

        let request = ApiRequest::post(endpoints::REGISTER).json(serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
        }));

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(error = %error, "Register request failed");
                return AuthOutcome::failure(classify(Operation::Register, &error));
            }
        };

        let payload: RegisterResponse = match serde_json::from_str(&response.body) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(error = %error, "Register response did not parse");
                return AuthOutcome::failure(messages::MALFORMED_RESPONSE);
            }
        };

        if let Some(token) = payload.token.filter(|token| !token.is_empty()) {
            let user = UserRecord {
                id: payload.user_id.unwrap_or(1),
                username: payload.username.unwrap_or_else(|| username.to_string()),
                email: Some(email.to_string()),
                role: payload.role.unwrap_or_else(|| "user".to_string()),
            };
            info!(user_id = user.id, "Registration issued a token, logging in");
            self.install_session(token, user, &SessionMachineInput::TokenIssued);
            return AuthOutcome::ok();
        }

        match payload.message {
            Some(message) if message.contains(SUCCESS_MARKER) => {
                info!("Registration accepted without auto-login");
                AuthOutcome::ok()
            }
            Some(message) => AuthOutcome::failure(message),
            None => AuthOutcome::ok(),
        }
    }

    /// Clear the session everywhere and redirect to the login route.
    /// Idempotent: from Anonymous this is a no-op except the redirect.
    pub fn logout(&self) {
        self.reset_memory();
        if let Err(error) = self.vault.clear() {
            warn!(error = %error, "Clearing persisted session failed");
        }
        self.apply(&SessionMachineInput::LoggedOut);
        info!("Logged out");

        let navigator = self.navigator.lock().unwrap().clone();
        if let Some(navigator) = navigator {
            navigator.redirect_to_login();
        }
    }

    /// Restore the session from durable storage.
    ///
    /// Never fails: a missing token forces Anonymous without touching
    /// the user entry, and any invalid persisted data clears both the
    /// in-memory and persisted session.
    pub fn restore(&self) {
        let token = match self.vault.token() {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => {
                debug!("No persisted token");
                self.reset_memory();
                self.apply(&SessionMachineInput::RestoreFailed);
                return;
            }
            Err(error) => {
                warn!(error = %error, "Persisted token unreadable");
                self.reset_memory();
                self.apply(&SessionMachineInput::RestoreFailed);
                return;
            }
        };

        let mut user = match self.vault.user_record() {
            Ok(Some(user)) if user.id != 0 && !user.username.is_empty() => user,
            Ok(Some(_)) => {
                info!("Persisted user record incomplete, clearing session");
                self.invalidate();
                return;
            }
            Ok(None) => {
                info!("Token present without a user record, clearing session");
                self.invalidate();
                return;
            }
            Err(error) => {
                info!(error = %error, "Persisted user record unparsable, clearing session");
                self.invalidate();
                return;
            }
        };

        if user.role.is_empty() {
            user.role = "user".to_string();
        }

        info!(user_id = user.id, role = %user.role, "Session restored");
        *self.session.lock().unwrap() = Session {
            token: Some(token),
            user: Some(user),
        };
        self.apply(&SessionMachineInput::RestoreSucceeded);
    }

    /// Change a user's role. Admin-only; failures propagate.
    pub async fn update_user_role(&self, user_id: i64, role: &str) -> SessionResult<()> {
        let token = self.token().ok_or(SessionError::NotAuthenticated)?;
        let request = ApiRequest::put(endpoints::admin_user(user_id))
            .json(serde_json::json!({ "role": role }))
            .bearer(token);
        self.http.execute(request).await?;
        info!(user_id, role, "User role updated");
        Ok(())
    }

    /// Delete a user account. Admin-only; failures propagate.
    pub async fn delete_user(&self, user_id: i64) -> SessionResult<()> {
        let token = self.token().ok_or(SessionError::NotAuthenticated)?;
        let request = ApiRequest::delete(endpoints::admin_user(user_id)).bearer(token);
        self.http.execute(request).await?;
        info!(user_id, "User deleted");
        Ok(())
    }

    /// Delete an article. Failures propagate.
    pub async fn delete_article(&self, article_id: i64) -> SessionResult<()> {
        let token = self.token().ok_or(SessionError::NotAuthenticated)?;
        let request = ApiRequest::delete(endpoints::article(article_id)).bearer(token);
        self.http.execute(request).await?;
        info!(article_id, "Article deleted");
        Ok(())
    }

    /// Persist and install a fresh session. A persistence failure is
    /// logged and the in-memory session still installs; the vault has
    /// already rolled the pair back, so durable state stays consistent.
    fn install_session(&self, token: String, user: UserRecord, input: &SessionMachineInput) {
        if let Err(error) = self.vault.store_session(&token, &user) {
            warn!(error = %error, "Persisting session failed, continuing in-memory only");
        }
        *self.session.lock().unwrap() = Session {
            token: Some(token),
            user: Some(user),
        };
        self.apply(input);
    }

    fn reset_memory(&self) {
        *self.session.lock().unwrap() = Session::default();
    }

    /// Full self-healing invalidation: persisted and in-memory state
    /// are both cleared.
    fn invalidate(&self) {
        let _ = self.vault.clear();
        self.reset_memory();
        self.apply(&SessionMachineInput::RestoreFailed);
    }

    /// Drive the state machine, ignoring impossible transitions
    /// (e.g. logout while already Anonymous).
    fn apply(&self, input: &SessionMachineInput) {
        let mut machine = self.machine.lock().unwrap();
        let before = SessionState::from(machine.state());
        match machine.consume(input) {
            Ok(_) => {
                let after = SessionState::from(machine.state());
                if before != after {
                    debug!(?before, ?after, "Session state transition");
                }
            }
            Err(_) => {
                debug!(?input, state = ?machine.state(), "Ignoring impossible transition");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quill_api::{ApiError, ApiResponse, ApiResult};
    use quill_storage::{DurableStorage, MemoryStorage, StorageKeys};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted HTTP client: pops a queued result per request and
    /// records what was sent.
    struct FakeHttp {
        responses: Mutex<VecDeque<ApiResult<ApiResponse>>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl FakeHttp {
        fn new(responses: Vec<ApiResult<ApiResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for FakeHttp {
        async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request")
        }
    }

    fn ok_body(body: &str) -> ApiResult<ApiResponse> {
        Ok(ApiResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn status_err(status: u16, body: &str) -> ApiResult<ApiResponse> {
        Err(ApiError::Status {
            status,
            body: body.to_string(),
        })
    }

    fn store_with(
        responses: Vec<ApiResult<ApiResponse>>,
    ) -> (SessionStore, Arc<MemoryStorage>, Arc<FakeHttp>) {
        let storage = Arc::new(MemoryStorage::new());
        let http = FakeHttp::new(responses);
        let store = SessionStore::new(http.clone(), SessionVault::new(storage.clone()));
        (store, storage, http)
    }

    #[tokio::test]
    async fn test_login_success_installs_and_persists_session() {
        let (store, storage, _) = store_with(vec![ok_body(
            r#"{"token":"t1","role":"admin","user_id":7,"username":"alice"}"#,
        )]);

        let outcome = store.login("alice", "correct").await;
        assert!(outcome.success);
        assert_eq!(outcome.message, None);

        assert_eq!(store.state(), SessionState::Authenticated);
        let session = store.snapshot();
        assert!(session.is_logged_in());
        let user = session.user.unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, "admin");

        assert_eq!(
            storage.get(StorageKeys::TOKEN).unwrap(),
            Some("t1".to_string())
        );
        assert!(storage.has(StorageKeys::USER).unwrap());
    }

    #[tokio::test]
    async fn test_login_fills_missing_fields_with_defaults() {
        let (store, _, _) = store_with(vec![ok_body(r#"{"token":"t1"}"#)]);

        assert!(store.login("alice", "pw").await.success);
        let user = store.snapshot().user.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, "user");
        assert_eq!(user.email, None);
    }

    #[tokio::test]
    async fn test_login_unauthorized_stays_anonymous() {
        let (store, storage, _) = store_with(vec![status_err(401, "")]);

        let outcome = store.login("alice", "wrong").await;
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some(messages::INVALID_CREDENTIALS));

        assert_eq!(store.state(), SessionState::Anonymous);
        assert!(!storage.has(StorageKeys::TOKEN).unwrap());
    }

    #[tokio::test]
    async fn test_login_structured_message_surfaces_verbatim() {
        let (store, _, _) =
            store_with(vec![status_err(403, r#"{"message":"account suspended"}"#)]);

        let outcome = store.login("alice", "pw").await;
        assert_eq!(outcome.message.as_deref(), Some("account suspended"));
    }

    #[tokio::test]
    async fn test_login_missing_token_is_failure() {
        let (store, _, _) = store_with(vec![ok_body(r#"{"role":"user"}"#)]);

        let outcome = store.login("alice", "pw").await;
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some(messages::MISSING_TOKEN));
        assert_eq!(store.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_login_malformed_body_is_failure() {
        let (store, _, _) = store_with(vec![ok_body("not json")]);

        let outcome = store.login("alice", "pw").await;
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some(messages::MALFORMED_RESPONSE));
    }

    #[tokio::test]
    async fn test_login_transport_failure_classified() {
        let (store, _, _) = store_with(vec![Err(ApiError::Transport("refused".into()))]);

        let outcome = store.login("alice", "pw").await;
        assert_eq!(outcome.message.as_deref(), Some(messages::UNREACHABLE));
        assert_eq!(store.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_register_message_success_stays_anonymous() {
        let (store, storage, _) =
            store_with(vec![ok_body(r#"{"message":"registration success"}"#)]);

        let outcome = store.register("bob", "bob@x.com", "pw").await;
        assert!(outcome.success);
        assert_eq!(store.state(), SessionState::Anonymous);
        assert!(!storage.has(StorageKeys::TOKEN).unwrap());
    }

    #[tokio::test]
    async fn test_register_token_authenticates_regardless_of_message() {
        let (store, storage, _) =
            store_with(vec![ok_body(r#"{"message":"ok","token":"t2","user_id":3}"#)]);

        let outcome = store.register("bob", "bob@x.com", "pw").await;
        assert!(outcome.success);
        assert_eq!(store.state(), SessionState::Authenticated);

        let user = store.snapshot().user.unwrap();
        assert_eq!(user.id, 3);
        assert_eq!(user.username, "bob");
        assert_eq!(user.email.as_deref(), Some("bob@x.com"));

        assert_eq!(
            storage.get(StorageKeys::TOKEN).unwrap(),
            Some("t2".to_string())
        );
    }

    #[tokio::test]
    async fn test_register_failure_message_verbatim() {
        let (store, _, _) = store_with(vec![ok_body(r#"{"message":"username reserved"}"#)]);

        let outcome = store.register("admin", "a@x.com", "pw").await;
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("username reserved"));
    }

    #[tokio::test]
    async fn test_register_empty_body_is_success() {
        let (store, _, _) = store_with(vec![ok_body("{}")]);
        assert!(store.register("bob", "b@x.com", "pw").await.success);
        assert_eq!(store.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_register_conflict_classified() {
        let (store, _, _) = store_with(vec![status_err(409, "")]);

        let outcome = store.register("bob", "b@x.com", "pw").await;
        assert_eq!(outcome.message.as_deref(), Some(messages::DUPLICATE_IDENTITY));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (store, storage, _) = store_with(vec![ok_body(
            r#"{"token":"t1","role":"user","user_id":2,"username":"carol"}"#,
        )]);

        assert!(store.login("carol", "pw").await.success);
        store.logout();
        store.logout();

        assert_eq!(store.state(), SessionState::Anonymous);
        assert!(!store.is_logged_in());
        assert!(!storage.has(StorageKeys::TOKEN).unwrap());
        assert!(!storage.has(StorageKeys::USER).unwrap());
    }

    #[tokio::test]
    async fn test_logout_redirects_via_navigator() {
        struct CountingNavigator(AtomicUsize);

        impl Navigator for CountingNavigator {
            fn redirect_to_login(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let (store, _, _) = store_with(vec![]);
        let navigator = Arc::new(CountingNavigator(AtomicUsize::new(0)));
        store.set_navigator(navigator.clone());

        store.logout();
        store.logout();
        assert_eq!(navigator.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_restore_without_token_short_circuits() {
        let (store, storage, _) = store_with(vec![]);
        // Orphaned user entry; restore must not read or remove it
        storage
            .set(StorageKeys::USER, r#"{"id":1,"username":"x"}"#)
            .unwrap();

        store.restore();

        assert_eq!(store.state(), SessionState::Anonymous);
        assert!(storage.has(StorageKeys::USER).unwrap());
    }

    #[test]
    fn test_restore_unparsable_user_clears_everything() {
        let (store, storage, _) = store_with(vec![]);
        storage.set(StorageKeys::TOKEN, "t1").unwrap();
        storage.set(StorageKeys::USER, "not json").unwrap();

        store.restore();

        assert_eq!(store.state(), SessionState::Anonymous);
        assert!(!storage.has(StorageKeys::TOKEN).unwrap());
        assert!(!storage.has(StorageKeys::USER).unwrap());
    }

    #[test]
    fn test_restore_incomplete_user_clears_everything() {
        let (store, storage, _) = store_with(vec![]);
        storage.set(StorageKeys::TOKEN, "t1").unwrap();
        storage
            .set(StorageKeys::USER, r#"{"id":0,"username":""}"#)
            .unwrap();

        store.restore();

        assert_eq!(store.state(), SessionState::Anonymous);
        assert!(!storage.has(StorageKeys::TOKEN).unwrap());
    }

    #[test]
    fn test_restore_valid_session_defaults_role() {
        let (store, storage, _) = store_with(vec![]);
        storage.set(StorageKeys::TOKEN, "t1").unwrap();
        storage
            .set(StorageKeys::USER, r#"{"id":5,"username":"dave"}"#)
            .unwrap();

        store.restore();

        assert_eq!(store.state(), SessionState::Authenticated);
        let user = store.snapshot().user.unwrap();
        assert_eq!(user.role, "user");
    }

    #[tokio::test]
    async fn test_privileged_mutation_attaches_bearer() {
        let (store, _, http) = store_with(vec![
            ok_body(r#"{"token":"t1","role":"admin","user_id":1,"username":"root"}"#),
            ok_body("{}"),
        ]);

        assert!(store.login("root", "pw").await.success);
        store.update_user_role(9, "admin").await.unwrap();

        let sent = http.sent();
        let request = &sent[1];
        assert_eq!(request.path, "/admin/users/9");
        assert_eq!(request.bearer.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_privileged_mutation_propagates_failure() {
        let (store, _, _) = store_with(vec![
            ok_body(r#"{"token":"t1","role":"admin","user_id":1,"username":"root"}"#),
            status_err(403, r#"{"message":"forbidden"}"#),
        ]);

        assert!(store.login("root", "pw").await.success);
        let result = store.delete_user(9).await;
        assert!(matches!(result, Err(SessionError::Api(_))));
    }

    #[tokio::test]
    async fn test_privileged_mutation_requires_session() {
        let (store, _, http) = store_with(vec![]);

        let result = store.delete_article(3).await;
        assert!(matches!(result, Err(SessionError::NotAuthenticated)));
        assert!(http.sent().is_empty());
    }

    #[tokio::test]
    async fn test_session_invariant_holds_across_operations() {
        let (store, _, _) = store_with(vec![
            status_err(401, ""),
            ok_body(r#"{"token":"t1","role":"user","user_id":2,"username":"eve"}"#),
        ]);

        let check = |session: Session| {
            assert_eq!(
                session.is_logged_in(),
                session.token.is_some() && session.user.is_some()
            );
        };

        check(store.snapshot());
        store.login("eve", "wrong").await;
        check(store.snapshot());
        store.login("eve", "right").await;
        check(store.snapshot());
        store.logout();
        check(store.snapshot());
    }
}
