//! In-memory development server for the portal REST API
//!
//! Implements the auth endpoints and the CRUD resources the client consumes,
//! so the client can be exercised end to end without the production backend.

pub mod db;
pub mod jwt;
pub mod middleware;
pub mod routes;
pub mod server;

pub use server::{build_state, create_router, run_server, serve, AppState, SharedState};
