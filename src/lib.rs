//! Campus portal client
//!
//! Session-aware access to the campus portal REST API: a session store that
//! owns the bearer token and the signed-in user, a route guard that gates
//! protected views on it, typed resource calls, and an in-memory dev server
//! implementing the same API.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod guard;
pub mod portal;
pub mod server;
pub mod session;

pub use config::Config;
pub use error::Error;
pub use guard::{Decision, GuardState, RouteGuard};
pub use portal::Portal;
pub use session::{Role, Session, SessionStore, User};
