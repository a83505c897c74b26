//! Session store: the only writer of the console's [`Session`].
//!
//! The store owns the session, the remote session service and the durable
//! token slot. Callers read through [`SessionStore::session`]; every mutation
//! goes through `login`, `fetch_user_info`, `fetch_menus`, `logout` or
//! `hydrate`.

use std::sync::Arc;

use chrono::Utc;

use octoops_auth::{GuardState, Session, has_permission, has_role};

use crate::envelope::Credentials;
use crate::error::AuthError;
use crate::service::SessionService;
use crate::token_store::TokenStore;
use crate::transport::BearerToken;

pub struct SessionStore {
    session: Session,
    service: Arc<dyn SessionService>,
    tokens: Arc<dyn TokenStore>,
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.session.guard_state())
            .field("user", &self.session.user().map(|u| u.username.as_str()))
            .finish()
    }
}

impl SessionStore {
    /// Store with an empty session. Call [`SessionStore::hydrate`] before the
    /// first navigation to pick up a persisted token.
    pub fn new(service: Arc<dyn SessionService>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            session: Session::empty(),
            service,
            tokens,
        }
    }

    /// Convenience: `new` followed by `hydrate`.
    pub fn hydrated(service: Arc<dyn SessionService>, tokens: Arc<dyn TokenStore>) -> Self {
        let mut store = Self::new(service, tokens);
        store.hydrate();
        store
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn guard_state(&self) -> GuardState {
        self.session.guard_state()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        has_permission(&self.session, permission)
    }

    pub fn has_role(&self, role: &str) -> bool {
        has_role(&self.session, role)
    }

    /// Credential for the next authenticated request.
    pub fn bearer(&self) -> Option<BearerToken> {
        BearerToken::new(self.session.token())
    }

    /// `Authorization` header value matching the current token, `None` when
    /// logged out.
    pub fn authorization_header(&self) -> Option<String> {
        self.bearer().map(|t| t.header_value())
    }

    /// Restore the token (only) from durable storage.
    ///
    /// A read failure leaves the session unauthenticated. Does nothing when a
    /// token is already held.
    pub fn hydrate(&mut self) {
        if self.session.is_authenticated() {
            return;
        }

        match self.tokens.load() {
            Ok(Some(token)) => {
                tracing::info!("restored persisted session token; profile will be re-validated");
                self.session = Session::from_token(token);
            }
            Ok(None) => tracing::debug!("no persisted session token"),
            Err(err) => tracing::warn!("failed to read persisted session token: {err:#}"),
        }
    }

    /// Authenticate against the backend.
    ///
    /// On success token, user, roles and permissions are replaced together,
    /// the token is persisted, and the menu list is refreshed. On failure the
    /// session is left exactly as it was.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<(), AuthError> {
        tracing::info!(username = %credentials.username, "login attempt");

        let data = match self.service.login(credentials).await {
            Ok(data) => data,
            Err(err) => {
                let auth_err = AuthError::from_service(&err);
                tracing::warn!(username = %credentials.username, "login failed: {err}");
                return Err(auth_err);
            }
        };

        if data.token.is_empty() {
            tracing::warn!("login response carried no token");
            return Err(AuthError::TransientServiceFailure(
                "login response carried no token".to_string(),
            ));
        }

        let next = Session::authenticated(data.token, data.user, data.roles, data.permissions, Utc::now());

        self.tokens
            .save(next.token())
            .map_err(|e| AuthError::Storage(format!("{e:#}")))?;
        self.session = next;

        tracing::info!(
            username = %credentials.username,
            roles = self.session.roles().len(),
            permissions = self.session.permissions().len(),
            "login succeeded"
        );

        self.fetch_menus().await;
        Ok(())
    }

    /// Re-fetch the profile for the current token and refresh menus.
    pub async fn fetch_user_info(&mut self) -> Result<(), AuthError> {
        let Some(token) = self.bearer() else {
            return Err(AuthError::NotAuthenticated);
        };

        let profile = self.service.profile(&token).await.map_err(|err| {
            tracing::warn!("profile fetch failed: {err}");
            AuthError::from_service(&err)
        })?;

        // The token may not change while `&mut self` is held, so the profile
        // belongs to the current session.
        self.session
            .apply_profile(profile.user, profile.roles, profile.permissions, Utc::now());

        tracing::debug!(
            roles = self.session.roles().len(),
            permissions = self.session.permissions().len(),
            "profile refreshed"
        );

        self.fetch_menus().await;
        Ok(())
    }

    /// Best-effort menu refresh. Failures keep the previous list.
    pub async fn fetch_menus(&mut self) {
        let Some(token) = self.bearer() else {
            return;
        };

        match self.service.menus(&token).await {
            Ok(menus) => {
                tracing::debug!(count = menus.len(), "menus refreshed");
                self.session.set_menus(menus);
            }
            Err(err) => tracing::warn!("menu refresh failed, keeping previous menus: {err}"),
        }
    }

    /// Clear the session and erase the persisted token. Idempotent.
    ///
    /// Erasing the token slot is best effort: a failure is logged and the
    /// in-memory session is cleared regardless. A token left on disk is
    /// restored by the next `hydrate` and must pass profile re-validation
    /// before it authorizes anything.
    pub fn logout(&mut self) {
        if self.session.is_authenticated() {
            tracing::info!(
                username = ?self.session.user().map(|u| u.username.as_str()),
                "logging out"
            );
        }

        self.session.clear();

        if let Err(err) = self.tokens.clear() {
            tracing::warn!("failed to erase persisted session token: {err:#}");
        }
    }
}
