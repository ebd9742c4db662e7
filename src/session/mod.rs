//! Client-side authentication state

pub mod models;
pub mod storage;
pub mod store;

pub use models::{AuthResponse, Credentials, Registration, Role, User};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
pub use store::{Session, SessionStore};
