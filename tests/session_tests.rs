//! Session store tests against the in-memory dev server

use campus_portal::config::{ApiConfig, SeedAccount, ServerConfig};
use campus_portal::guard::{GuardState, RouteGuard};
use campus_portal::server::serve;
use campus_portal::session::{
    Credentials, FileTokenStore, MemoryTokenStore, Registration, Role, SessionStore, TokenStore,
};
use campus_portal::Error;
use std::sync::Arc;
use tokio::net::TcpListener;

const ADMIN_EMAIL: &str = "admin@college.edu";
const ADMIN_PASSWORD: &str = "admin-pass";

/// Start a dev server on an ephemeral port and return its API base URL
async fn start_dev_server() -> String {
    let config = ServerConfig {
        seed_admin: Some(SeedAccount {
            name: "Administrator".to_string(),
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        }),
        ..ServerConfig::default()
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = serve(listener, &config).await;
    });
    format!("http://{}/api", addr)
}

fn api_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
    }
}

fn store_with(base_url: &str, storage: Arc<dyn TokenStore>) -> SessionStore {
    SessionStore::new(&api_config(base_url), storage).unwrap()
}

fn registration(email: &str, role: Role) -> Registration {
    Registration {
        email: email.to_string(),
        password: "pw-123".to_string(),
        name: "Ann".to_string(),
        role,
    }
}

#[tokio::test]
async fn test_login_authenticates_and_persists_token() {
    let base = start_dev_server().await;
    let storage = MemoryTokenStore::new();
    let store = store_with(&base, Arc::new(storage.clone()));

    let user = store
        .login(&Credentials::new(ADMIN_EMAIL, ADMIN_PASSWORD))
        .await
        .expect("login should succeed");

    assert_eq!(user.role, Role::Admin);
    assert!(store.is_authenticated());
    assert_eq!(store.user(), Some(user));

    let persisted = storage.load().unwrap();
    assert!(persisted.is_some());
    assert_eq!(persisted, store.snapshot().token);
}

#[tokio::test]
async fn test_rejected_login_leaves_session_unchanged() {
    let base = start_dev_server().await;
    let storage = MemoryTokenStore::new();
    let store = store_with(&base, Arc::new(storage.clone()));
    let before = store.snapshot();

    let err = store
        .login(&Credentials::new(ADMIN_EMAIL, "wrong"))
        .await
        .unwrap_err();

    match err {
        Error::Credential(message) => assert_eq!(message, "Invalid email or password"),
        other => panic!("expected credential error, got {other:?}"),
    }
    assert_eq!(store.snapshot(), before);
    assert_eq!(storage.load().unwrap(), None);
}

#[tokio::test]
async fn test_rejected_login_keeps_existing_session() {
    let base = start_dev_server().await;
    let store = store_with(&base, Arc::new(MemoryTokenStore::new()));
    store
        .login(&Credentials::new(ADMIN_EMAIL, ADMIN_PASSWORD))
        .await
        .unwrap();
    let before = store.snapshot();

    assert!(store
        .login(&Credentials::new("nobody@college.edu", "x"))
        .await
        .is_err());
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_register_auto_logs_in() {
    let base = start_dev_server().await;
    let store = store_with(&base, Arc::new(MemoryTokenStore::new()));

    let user = store
        .register(&registration("fay@college.edu", Role::Faculty))
        .await
        .unwrap();

    assert_eq!(user.role, Role::Faculty);
    assert_eq!(user.email, "fay@college.edu");
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn test_duplicate_registration_is_credential_error() {
    let base = start_dev_server().await;
    let store = store_with(&base, Arc::new(MemoryTokenStore::new()));
    store
        .register(&registration("dup@college.edu", Role::Student))
        .await
        .unwrap();
    store.logout();

    let err = store
        .register(&registration("dup@college.edu", Role::Student))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Credential(ref m) if m == "User already exists"));
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn test_logout_clears_state_and_storage() {
    let base = start_dev_server().await;
    let storage = MemoryTokenStore::new();
    let store = store_with(&base, Arc::new(storage.clone()));
    store
        .login(&Credentials::new(ADMIN_EMAIL, ADMIN_PASSWORD))
        .await
        .unwrap();

    store.logout();

    let session = store.snapshot();
    assert!(!session.is_authenticated());
    assert_eq!(session.token, None);
    assert_eq!(session.user, None);
    assert_eq!(storage.load().unwrap(), None);

    store.logout();
    assert_eq!(store.snapshot(), session);
}

#[tokio::test]
async fn test_token_survives_restart() {
    let base = start_dev_server().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let first = store_with(&base, Arc::new(FileTokenStore::new(&path)));
    first
        .register(&registration("ravi@college.edu", Role::Student))
        .await
        .unwrap();
    drop(first);

    let second = store_with(&base, Arc::new(FileTokenStore::new(&path)));
    assert!(second.snapshot().user.is_none());

    second.fetch_user().await;

    let user = second.user().expect("user should be resolved from stored token");
    assert_eq!(user.email, "ravi@college.edu");
    assert_eq!(user.role, Role::Student);
    assert!(!second.is_loading());
}

#[tokio::test]
async fn test_invalid_stored_token_is_cleared() {
    let base = start_dev_server().await;
    let storage = MemoryTokenStore::with_token("not-a-real-token");
    let store = store_with(&base, Arc::new(storage.clone()));

    store.fetch_user().await;

    let session = store.snapshot();
    assert_eq!(session.token, None);
    assert_eq!(session.user, None);
    assert!(!session.is_authenticated());
    assert_eq!(storage.load().unwrap(), None);
}

#[tokio::test]
async fn test_no_token_means_unauthorized_without_fetch() {
    let base = start_dev_server().await;
    let store = store_with(&base, Arc::new(MemoryTokenStore::new()));
    let guard = RouteGuard::new(&store);

    assert_eq!(guard.state(), GuardState::Unauthorized);

    let before = store.snapshot();
    store.fetch_user().await;
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_requests_carry_session_token() {
    let base = start_dev_server().await;
    let store = store_with(&base, Arc::new(MemoryTokenStore::new()));

    let anonymous: Result<Vec<serde_json::Value>, _> = store.api().get("/subjects").await;
    assert!(matches!(anonymous, Err(Error::Unauthorized(_))));

    store
        .login(&Credentials::new(ADMIN_EMAIL, ADMIN_PASSWORD))
        .await
        .unwrap();
    let subjects: Vec<serde_json::Value> = store.api().get("/subjects").await.unwrap();
    assert!(subjects.is_empty());
}

#[tokio::test]
async fn test_login_over_corrupt_token_file() {
    let base = start_dev_server().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{\"tok").unwrap();

    let storage = FileTokenStore::new(&path);
    let store = store_with(&base, Arc::new(storage.clone()));
    assert!(!store.is_authenticated());

    store
        .login(&Credentials::new(ADMIN_EMAIL, ADMIN_PASSWORD))
        .await
        .expect("a damaged token file must not block login");
    assert_eq!(storage.load().unwrap(), store.snapshot().token);

    store.logout();
    assert_eq!(storage.load().unwrap(), None);
}

#[tokio::test]
async fn test_network_failure_on_login_leaves_session_unchanged() {
    // Port 9 (discard) on loopback: connections are refused
    let storage = MemoryTokenStore::with_token("kept");
    let store = store_with("http://127.0.0.1:9/api", Arc::new(storage.clone()));
    let before = store.snapshot();

    let err = store
        .login(&Credentials::new(ADMIN_EMAIL, ADMIN_PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network(_)));
    assert!(err.to_string().contains("please try again"));

    let err = store
        .register(&registration("new@college.edu", Role::Student))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network(_)));

    assert_eq!(store.snapshot(), before);
    assert_eq!(storage.load().unwrap().as_deref(), Some("kept"));
}
