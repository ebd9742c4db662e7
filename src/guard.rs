//! Route guard for protected views
//!
//! The guard is a pure function of the current [`Session`]: it never caches
//! a verdict, so it tracks every login, logout and token rejection.

use crate::session::{Role, Session, SessionStore};
use serde::Serialize;
use std::fmt;
use tokio::sync::watch;

/// Public view unauthenticated visitors are sent to
pub const LOGIN_ROUTE: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardState {
    /// Identity is being confirmed; show a loading indicator
    Loading,
    Authorized,
    Unauthorized,
}

impl GuardState {
    /// Loading wins over everything else so protected content never flashes
    /// before the token has been confirmed.
    pub fn evaluate(session: &Session) -> Self {
        if session.is_loading {
            GuardState::Loading
        } else if session.is_authenticated() {
            GuardState::Authorized
        } else {
            GuardState::Unauthorized
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, GuardState::Loading)
    }
}

impl fmt::Display for GuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardState::Loading => write!(f, "loading"),
            GuardState::Authorized => write!(f, "authorized"),
            GuardState::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

/// What a protected view should do right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    ShowLoading,
    Render,
    Redirect(String),
}

/// Subscription-backed guard handed to protected views
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: watch::Receiver<Session>,
    login_route: String,
}

impl RouteGuard {
    pub fn new(store: &SessionStore) -> Self {
        Self::from_receiver(store.subscribe())
    }

    pub fn from_receiver(session: watch::Receiver<Session>) -> Self {
        Self {
            session,
            login_route: LOGIN_ROUTE.to_string(),
        }
    }

    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn state(&self) -> GuardState {
        GuardState::evaluate(&self.session.borrow())
    }

    pub fn decision(&self) -> Decision {
        match self.state() {
            GuardState::Loading => Decision::ShowLoading,
            GuardState::Authorized => Decision::Render,
            GuardState::Unauthorized => Decision::Redirect(self.login_route.clone()),
        }
    }

    /// Role of the signed-in user once it has been confirmed
    pub fn role(&self) -> Option<Role> {
        let session = self.session.borrow();
        if session.is_loading {
            None
        } else {
            session.role()
        }
    }

    /// Wait for the next session change and re-evaluate. Returns `None` once
    /// the store has been dropped.
    pub async fn changed(&mut self) -> Option<GuardState> {
        self.session.changed().await.ok()?;
        Some(self.state())
    }

    /// Wait until the guard leaves `Loading`. If the store goes away while
    /// loading, the guard fails closed.
    pub async fn settled(&mut self) -> GuardState {
        match self.session.wait_for(|s| !s.is_loading).await {
            Ok(session) => GuardState::evaluate(&session),
            Err(_) => GuardState::Unauthorized,
        }
    }
}
