//! Client-held session record.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::{MenuNode, Permission, Role, UserInfo};

/// Where a session stands from the navigation guard's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// No token.
    Unauthenticated,
    /// A token is held but its roles/permissions have not been fetched yet.
    Authenticating,
    /// Token plus a profile confirmed by the backend.
    Authorized,
}

impl core::fmt::Display for GuardState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GuardState::Unauthenticated => write!(f, "unauthenticated"),
            GuardState::Authenticating => write!(f, "authenticating"),
            GuardState::Authorized => write!(f, "authorized"),
        }
    }
}

/// Authentication and authorization data of the active console user.
///
/// # Invariants
/// - `roles` and `permissions` are non-empty only when `token` is non-empty
///   and a profile was confirmed (`validated_at` is set) since the token was set.
/// - Replacing the token always drops the previous profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: String,
    user: Option<UserInfo>,
    roles: HashSet<Role>,
    permissions: HashSet<Permission>,
    menus: Vec<MenuNode>,
    validated_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Session restored from a persisted token only. Roles and permissions stay
    /// empty until the profile is re-fetched.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    /// Fully populated session, as produced by a successful login.
    pub fn authenticated(
        token: impl Into<String>,
        user: UserInfo,
        roles: impl IntoIterator<Item = Role>,
        permissions: impl IntoIterator<Item = Permission>,
        at: DateTime<Utc>,
    ) -> Self {
        let token = token.into();
        if token.is_empty() {
            return Self::empty();
        }

        Self {
            token,
            user: Some(user),
            roles: roles.into_iter().collect(),
            permissions: permissions.into_iter().collect(),
            menus: Vec::new(),
            validated_at: Some(at),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn user(&self) -> Option<&UserInfo> {
        self.user.as_ref()
    }

    pub fn roles(&self) -> &HashSet<Role> {
        &self.roles
    }

    pub fn permissions(&self) -> &HashSet<Permission> {
        &self.permissions
    }

    pub fn menus(&self) -> &[MenuNode] {
        &self.menus
    }

    pub fn validated_at(&self) -> Option<DateTime<Utc>> {
        self.validated_at
    }

    /// A token is held but the backend has not confirmed it since it was set.
    pub fn needs_validation(&self) -> bool {
        self.is_authenticated() && self.validated_at.is_none()
    }

    pub fn guard_state(&self) -> GuardState {
        if !self.is_authenticated() {
            GuardState::Unauthenticated
        } else if self.needs_validation() {
            GuardState::Authenticating
        } else {
            GuardState::Authorized
        }
    }

    /// Replace identity, roles and permissions with a freshly fetched profile.
    ///
    /// Ignored when no token is held, so the sets can never become non-empty
    /// on an unauthenticated session.
    pub fn apply_profile(
        &mut self,
        user: UserInfo,
        roles: impl IntoIterator<Item = Role>,
        permissions: impl IntoIterator<Item = Permission>,
        at: DateTime<Utc>,
    ) {
        if !self.is_authenticated() {
            return;
        }
        self.user = Some(user);
        self.roles = roles.into_iter().collect();
        self.permissions = permissions.into_iter().collect();
        self.validated_at = Some(at);
    }

    pub fn set_menus(&mut self, menus: Vec<MenuNode>) {
        self.menus = menus;
    }

    /// Drop everything; the session becomes indistinguishable from `empty()`.
    pub fn clear(&mut self) {
        *self = Self::empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserId;

    fn alice() -> UserInfo {
        UserInfo {
            id: UserId::new(1),
            username: "alice".to_string(),
            ..UserInfo::default()
        }
    }

    #[test]
    fn hydrated_session_needs_validation() {
        let session = Session::from_token("tok");
        assert!(session.is_authenticated());
        assert!(session.roles().is_empty());
        assert!(session.permissions().is_empty());
        assert_eq!(session.guard_state(), GuardState::Authenticating);
    }

    #[test]
    fn applying_profile_authorizes() {
        let mut session = Session::from_token("tok");
        session.apply_profile(alice(), [Role::from("ops")], [Permission::from("alert:read")], Utc::now());
        assert_eq!(session.guard_state(), GuardState::Authorized);
        assert!(session.permissions().contains("alert:read"));
    }

    #[test]
    fn profile_is_ignored_without_token() {
        let mut session = Session::empty();
        session.apply_profile(alice(), [Role::from("ops")], [Permission::from("alert:read")], Utc::now());
        assert_eq!(session, Session::empty());
    }

    #[test]
    fn authenticated_with_empty_token_is_empty() {
        let session = Session::authenticated("", alice(), [Role::from("ops")], [], Utc::now());
        assert_eq!(session, Session::empty());
        assert_eq!(session.guard_state(), GuardState::Unauthenticated);
    }

    #[test]
    fn clear_resets_everything() {
        let mut session =
            Session::authenticated("tok", alice(), [Role::from("ops")], [Permission::from("x")], Utc::now());
        session.set_menus(vec![MenuNode {
            name: "Overview".into(),
            code: "overview".into(),
            path: Some("/overview".into()),
            icon: None,
            permission: None,
            children: Vec::new(),
        }]);
        session.clear();
        assert_eq!(session, Session::empty());
    }
}
