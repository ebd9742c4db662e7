//! Application shell: wires configuration, token storage, the session store
//! and route guards together and runs the startup flow.

use crate::api::resources::Resources;
use crate::config::Config;
use crate::error::Result;
use crate::guard::{GuardState, RouteGuard};
use crate::session::{FileTokenStore, SessionStore, TokenStore};
use std::sync::Arc;

pub struct Portal {
    config: Config,
    session: SessionStore,
}

impl Portal {
    /// Start with the token file named in the configuration.
    ///
    /// Must be called inside a tokio runtime: a persisted token triggers a
    /// background fetch of the current user.
    pub fn bootstrap(config: Config) -> Result<Self> {
        let storage = Arc::new(FileTokenStore::new(config.storage.token_path.clone()));
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Arc<dyn TokenStore>) -> Result<Self> {
        let portal = Self::without_startup_fetch(config, storage)?;

        if portal.session.snapshot().token.is_some() {
            tracing::debug!("Found persisted token, resolving current user");
            // fetch_user raises is_loading before returning, so guards handed
            // out from here on start in Loading
            tokio::spawn(portal.session.fetch_user());
        }

        Ok(portal)
    }

    /// Open the token file without resolving the stored token. For flows
    /// that replace or discard the session (login, register, logout) and
    /// have no use for the current user.
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(FileTokenStore::new(config.storage.token_path.clone()));
        Self::without_startup_fetch(config, storage)
    }

    /// The restored token stays unverified until `session().fetch_user()`
    pub fn without_startup_fetch(config: Config, storage: Arc<dyn TokenStore>) -> Result<Self> {
        let session = SessionStore::new(&config.api, storage)?;
        Ok(Self { config, session })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(&self.session)
    }

    pub fn resources(&self) -> Resources<'_> {
        Resources::new(self.session.api())
    }

    /// Wait for startup resolution to finish
    pub async fn ready(&self) -> GuardState {
        self.guard().settled().await
    }
}
