//! Scripted session service and fixtures for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use octoops_auth::{MenuNode, Permission, Role, UserId, UserInfo};

use crate::envelope::{Credentials, LoginData, ProfileData};
use crate::error::ServiceError;
use crate::service::SessionService;
use crate::transport::BearerToken;

/// Session service returning canned responses and counting calls.
///
/// Unscripted endpoints fail with a network error.
#[derive(Debug, Default)]
pub struct ScriptedSessionService {
    login: Mutex<Option<Result<LoginData, ServiceError>>>,
    profile: Mutex<Option<Result<ProfileData, ServiceError>>>,
    menus: Mutex<Option<Result<Vec<MenuNode>, ServiceError>>>,
    profile_delay: Option<Duration>,
    login_calls: AtomicUsize,
    profile_calls: AtomicUsize,
    menu_calls: AtomicUsize,
    seen_tokens: Mutex<Vec<String>>,
}

impl ScriptedSessionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_login(self, response: Result<LoginData, ServiceError>) -> Self {
        self.script_login(response);
        self
    }

    pub fn with_profile(self, response: Result<ProfileData, ServiceError>) -> Self {
        self.script_profile(response);
        self
    }

    pub fn with_menus(self, response: Result<Vec<MenuNode>, ServiceError>) -> Self {
        self.script_menus(response);
        self
    }

    /// Hold every profile call for `delay` before answering.
    pub fn with_profile_delay(mut self, delay: Duration) -> Self {
        self.profile_delay = Some(delay);
        self
    }

    pub fn script_login(&self, response: Result<LoginData, ServiceError>) {
        if let Ok(mut slot) = self.login.lock() {
            *slot = Some(response);
        }
    }

    pub fn script_profile(&self, response: Result<ProfileData, ServiceError>) {
        if let Ok(mut slot) = self.profile.lock() {
            *slot = Some(response);
        }
    }

    pub fn script_menus(&self, response: Result<Vec<MenuNode>, ServiceError>) {
        if let Ok(mut slot) = self.menus.lock() {
            *slot = Some(response);
        }
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn menu_calls(&self) -> usize {
        self.menu_calls.load(Ordering::SeqCst)
    }

    /// Tokens presented on authenticated calls, in call order.
    pub fn seen_tokens(&self) -> Vec<String> {
        self.seen_tokens.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn record(&self, token: &BearerToken) {
        if let Ok(mut seen) = self.seen_tokens.lock() {
            seen.push(token.as_str().to_string());
        }
    }
}

fn scripted<T: Clone>(slot: &Mutex<Option<Result<T, ServiceError>>>) -> Result<T, ServiceError> {
    slot.lock()
        .ok()
        .and_then(|s| s.clone())
        .unwrap_or_else(|| Err(ServiceError::Network("no scripted response".to_string())))
}

#[async_trait]
impl SessionService for ScriptedSessionService {
    async fn login(&self, _credentials: &Credentials) -> Result<LoginData, ServiceError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        scripted(&self.login)
    }

    async fn profile(&self, token: &BearerToken) -> Result<ProfileData, ServiceError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.record(token);
        if let Some(delay) = self.profile_delay {
            tokio::time::sleep(delay).await;
        }
        scripted(&self.profile)
    }

    async fn menus(&self, token: &BearerToken) -> Result<Vec<MenuNode>, ServiceError> {
        self.menu_calls.fetch_add(1, Ordering::SeqCst);
        self.record(token);
        scripted(&self.menus)
    }
}

pub fn user(username: &str) -> UserInfo {
    UserInfo {
        id: UserId::new(1),
        username: username.to_string(),
        ..UserInfo::default()
    }
}

pub fn login_data(token: &str, roles: &[&str], permissions: &[&str]) -> LoginData {
    LoginData {
        token: token.to_string(),
        user: user("alice"),
        roles: roles.iter().map(|r| Role::new(r.to_string())).collect(),
        permissions: permissions.iter().map(|p| Permission::new(p.to_string())).collect(),
    }
}

pub fn profile_data(roles: &[&str], permissions: &[&str]) -> ProfileData {
    ProfileData {
        user: user("alice"),
        roles: roles.iter().map(|r| Role::new(r.to_string())).collect(),
        permissions: permissions.iter().map(|p| Permission::new(p.to_string())).collect(),
    }
}

pub fn menu(code: &str, path: &str) -> MenuNode {
    MenuNode {
        name: code.to_string(),
        code: code.to_string(),
        path: Some(path.to_string()),
        icon: None,
        permission: Some(Permission::new(code.to_string())),
        children: Vec::new(),
    }
}

pub fn unauthorized() -> ServiceError {
    ServiceError::Status {
        status: 401,
        code: Some(401),
        message: "invalid username or password".to_string(),
    }
}

pub fn server_error() -> ServiceError {
    ServiceError::Status {
        status: 500,
        code: Some(500),
        message: "internal error".to_string(),
    }
}
