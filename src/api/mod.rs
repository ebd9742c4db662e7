//! REST client for the portal API and typed wrappers for its resources

pub mod client;
pub mod resources;

pub use client::{ApiClient, BearerSource};
