//! The session store: single source of truth for who is signed in
//!
//! State lives in a `watch` channel. Every mutation of the state (and of the
//! persisted token that goes with it) happens inside one `send_if_modified`
//! closure, so each operation is an atomic read-modify-write and every
//! subscriber sees a consistent `Session`.
//!
//! Ordering: every operation that establishes or discards a session bumps a
//! generation number. `fetch_user` remembers the generation it started under
//! and only applies its result if nothing newer happened in the meantime, so
//! a `logout` issued while a fetch is in flight always wins.

use crate::api::{ApiClient, BearerSource};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::session::models::{AuthResponse, Credentials, Registration, Role, User, WireUser};
use crate::session::storage::TokenStore;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const REGISTER_ENDPOINT: &str = "/auth/register";
pub const CURRENT_USER_ENDPOINT: &str = "/students/me";

/// Snapshot of the authentication state
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
    /// A fetch of the current user is in flight
    pub is_loading: bool,
    pub(crate) generation: u64,
}

impl Session {
    fn restored(token: Option<String>) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }

    /// A failed user resolution clears the token, so holding one means
    /// resolution has not failed.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn reset(&mut self) {
        self.token = None;
        self.user = None;
        self.is_loading = false;
    }

    fn is_anonymous(&self) -> bool {
        self.token.is_none() && self.user.is_none() && !self.is_loading
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .field("is_loading", &self.is_loading)
            .field("generation", &self.generation)
            .finish()
    }
}

struct SessionBearer(watch::Receiver<Session>);

impl BearerSource for SessionBearer {
    fn bearer(&self) -> Option<String> {
        self.0.borrow().token.clone()
    }
}

struct Inner {
    state: watch::Sender<Session>,
    storage: Arc<dyn TokenStore>,
    api: ApiClient,
}

/// Cheaply cloneable handle to the process session
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    /// Create the store, restoring any persisted token. The restored token is
    /// unverified until [`SessionStore::fetch_user`] settles.
    pub fn new(config: &ApiConfig, storage: Arc<dyn TokenStore>) -> Result<Self> {
        let token = match storage.load() {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not read persisted token, starting signed out: {}", e);
                None
            }
        };

        let (state, observer) = watch::channel(Session::restored(token));
        let api = ApiClient::new(config)?.with_bearer(Arc::new(SessionBearer(observer)));

        Ok(Self {
            inner: Arc::new(Inner {
                state,
                storage,
                api,
            }),
        })
    }

    /// Client that attaches this session's token to every request
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    /// Sign in. On rejection the session is left exactly as it was.
    pub async fn login(&self, credentials: &Credentials) -> Result<User> {
        let response: AuthResponse = self
            .inner
            .api
            .post(LOGIN_ENDPOINT, credentials)
            .await
            .map_err(Error::into_credential_error)?;

        let user = self.establish(response)?;
        info!("Logged in as {} ({})", user.email, user.role);
        Ok(user)
    }

    /// Create an account and sign in with it.
    pub async fn register(&self, registration: &Registration) -> Result<User> {
        let response: AuthResponse = self
            .inner
            .api
            .post(REGISTER_ENDPOINT, registration)
            .await
            .map_err(Error::into_credential_error)?;

        let user = self.establish(response)?;
        info!("Registered and logged in as {} ({})", user.email, user.role);
        Ok(user)
    }

    /// Forget the token and return to the anonymous state. Never fails and
    /// makes no network call.
    pub fn logout(&self) {
        let storage = &self.inner.storage;
        self.inner.state.send_if_modified(|session| {
            if let Err(e) = storage.clear() {
                warn!("Failed to clear persisted token: {}", e);
            }
            if session.is_anonymous() {
                return false;
            }
            session.generation += 1;
            session.reset();
            true
        });
        info!("Logged out");
    }

    /// Resolve the held token to a user.
    ///
    /// `is_loading` is raised before this returns, not when the future is
    /// first polled, so nothing observes the unverified token as settled.
    /// Without a token this is a no-op. Failures are not returned: any error
    /// (expired token, network) signs the session out. Dropping the future
    /// before it completes counts as a failure.
    pub fn fetch_user(&self) -> impl Future<Output = ()> + Send + 'static {
        let pending = self.begin_fetch().map(|(generation, token)| {
            (
                PendingFetch {
                    store: self.clone(),
                    generation,
                    settled: false,
                },
                token,
            )
        });

        async move {
            let Some((pending, token)) = pending else {
                return;
            };

            let result = pending
                .store
                .inner
                .api
                .get_with_token::<WireUser>(CURRENT_USER_ENDPOINT, &token)
                .await
                .and_then(User::try_from);

            pending.finish(result);
        }
    }

    fn establish(&self, response: AuthResponse) -> Result<User> {
        let (token, user) = response.into_parts()?;
        let storage = &self.inner.storage;
        let established = user.clone();
        let mut outcome = Ok(());

        self.inner.state.send_if_modified(|session| {
            if let Err(e) = storage.save(&token) {
                outcome = Err(e);
                return false;
            }
            session.generation += 1;
            session.token = Some(token);
            session.user = Some(user);
            session.is_loading = false;
            true
        });

        outcome.map(|_| established)
    }

    fn begin_fetch(&self) -> Option<(u64, String)> {
        let mut started = None;
        self.inner.state.send_if_modified(|session| {
            let Some(token) = session.token.clone() else {
                return false;
            };
            session.generation += 1;
            session.is_loading = true;
            started = Some((session.generation, token));
            true
        });

        if started.is_none() {
            debug!("No token held, skipping current user fetch");
        }
        started
    }

    fn finish_fetch(&self, generation: u64, result: Result<User>) {
        let storage = &self.inner.storage;
        self.inner.state.send_if_modified(|session| {
            if session.generation != generation {
                debug!(
                    "Discarding stale current user result (generation {} < {})",
                    generation, session.generation
                );
                return false;
            }

            match result {
                Ok(user) => {
                    debug!("Resolved current user {}", user.email);
                    session.user = Some(user);
                    session.is_loading = false;
                }
                Err(e) => {
                    if e.is_session_invalid() {
                        info!("Stored session is no longer valid, signing out");
                    } else {
                        warn!("Could not resolve current user, signing out: {}", e);
                    }
                    if let Err(e) = storage.clear() {
                        warn!("Failed to clear persisted token: {}", e);
                    }
                    session.reset();
                }
            }
            true
        });
    }
}

/// An in-flight `fetch_user`. Whatever happens to the future, the fetch it
/// started gets settled exactly once.
struct PendingFetch {
    store: SessionStore,
    generation: u64,
    settled: bool,
}

impl PendingFetch {
    fn finish(mut self, result: Result<User>) {
        self.settled = true;
        self.store.finish_fetch(self.generation, result);
    }
}

impl Drop for PendingFetch {
    fn drop(&mut self) {
        if !self.settled {
            self.store.finish_fetch(
                self.generation,
                Err(Error::Other("current user fetch was cancelled".to_string())),
            );
        }
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.inner.state.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemoryTokenStore;

    fn unreachable_api() -> ApiConfig {
        ApiConfig {
            // Port 9 (discard) on loopback: connections fail fast
            base_url: "http://127.0.0.1:9/api".to_string(),
            timeout_secs: 2,
        }
    }

    fn user(role: Role) -> User {
        User {
            id: "u1".into(),
            email: "a@x.com".into(),
            name: "Ann".into(),
            role,
        }
    }

    #[test]
    fn test_restores_persisted_token() {
        let storage = MemoryTokenStore::with_token("persisted");
        let store = SessionStore::new(&unreachable_api(), Arc::new(storage)).unwrap();

        let session = store.snapshot();
        assert_eq!(session.token.as_deref(), Some("persisted"));
        assert!(session.user.is_none());
        assert!(!session.is_loading);
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_bearer_source_tracks_session() {
        let storage = MemoryTokenStore::new();
        let store = SessionStore::new(&unreachable_api(), Arc::new(storage)).unwrap();
        let bearer = SessionBearer(store.subscribe());
        assert_eq!(bearer.bearer(), None);

        let response = AuthResponse::Flat {
            token: "fresh".into(),
            user: WireUser {
                id: "u1".into(),
                name: "Ann".into(),
                email: "a@x.com".into(),
                role: "faculty".into(),
            },
        };
        let established = store.establish(response).unwrap();
        assert_eq!(established, user(Role::Faculty));
        assert_eq!(bearer.bearer().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_logout_is_idempotent() {
        let storage = MemoryTokenStore::with_token("t");
        let store = SessionStore::new(&unreachable_api(), Arc::new(storage.clone())).unwrap();

        store.logout();
        let once = store.snapshot();
        store.logout();
        let twice = store.snapshot();

        assert_eq!(once, twice);
        assert!(!twice.is_authenticated());
        assert_eq!(storage.load().unwrap(), None);
    }

    #[test]
    fn test_stale_fetch_result_is_discarded() {
        let storage = MemoryTokenStore::with_token("t");
        let store = SessionStore::new(&unreachable_api(), Arc::new(storage)).unwrap();

        let (generation, _) = store.begin_fetch().expect("token is held");
        assert!(store.is_loading());

        store.logout();
        store.finish_fetch(generation, Ok(user(Role::Admin)));

        let session = store.snapshot();
        assert!(!session.is_authenticated());
        assert!(session.user.is_none());
        assert!(!session.is_loading);
    }

    #[test]
    fn test_failed_fetch_clears_token_and_storage() {
        let storage = MemoryTokenStore::with_token("t");
        let store = SessionStore::new(&unreachable_api(), Arc::new(storage.clone())).unwrap();

        let (generation, _) = store.begin_fetch().unwrap();
        store.finish_fetch(generation, Err(Error::Unauthorized("expired".into())));

        let session = store.snapshot();
        assert_eq!(session.token, None);
        assert_eq!(session.user, None);
        assert!(!session.is_loading);
        assert_eq!(storage.load().unwrap(), None);
    }

    #[test]
    fn test_begin_fetch_without_token_is_noop() {
        let store = SessionStore::new(&unreachable_api(), Arc::new(MemoryTokenStore::new())).unwrap();
        let before = store.snapshot();
        assert!(store.begin_fetch().is_none());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_dropped_fetch_settles_session() {
        let storage = MemoryTokenStore::with_token("t");
        let store = SessionStore::new(&unreachable_api(), Arc::new(storage.clone())).unwrap();

        let fetch = store.fetch_user();
        assert!(store.is_loading());
        drop(fetch);

        let session = store.snapshot();
        assert!(!session.is_loading);
        assert!(!session.is_authenticated());
        assert_eq!(storage.load().unwrap(), None);
    }

    #[test]
    fn test_dropped_stale_fetch_leaves_newer_session_alone() {
        let storage = MemoryTokenStore::with_token("t");
        let store = SessionStore::new(&unreachable_api(), Arc::new(storage.clone())).unwrap();

        let fetch = store.fetch_user();
        store.logout();
        let after_logout = store.snapshot();
        drop(fetch);

        assert_eq!(store.snapshot(), after_logout);
    }

    #[test]
    fn test_debug_redacts_token() {
        let store = SessionStore::new(
            &unreachable_api(),
            Arc::new(MemoryTokenStore::with_token("super-secret")),
        )
        .unwrap();
        let rendered = format!("{:?}", store);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_network_failure_fails_closed() {
        let storage = MemoryTokenStore::with_token("t");
        let store = SessionStore::new(&unreachable_api(), Arc::new(storage.clone())).unwrap();

        store.fetch_user().await;

        assert!(!store.is_authenticated());
        assert!(!store.is_loading());
        assert_eq!(storage.load().unwrap(), None);
    }
}
