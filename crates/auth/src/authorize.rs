use serde::Serialize;
use thiserror::Error;

use crate::{Permission, Session};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Does the session hold `permission`? Exact match, no I/O.
pub fn has_permission(session: &Session, permission: &str) -> bool {
    session.permissions().contains(permission)
}

/// Does the session hold `role`? Exact match, no I/O.
pub fn has_role(session: &Session, role: &str) -> bool {
    session.roles().contains(role)
}

/// Typed variant of [`has_permission`].
///
/// - No IO
/// - No panics
pub fn authorize(session: &Session, required: &Permission) -> Result<(), AuthzError> {
    if !session.is_authenticated() {
        return Err(AuthzError::Unauthenticated);
    }

    if has_permission(session, required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision, for display in the
/// console's diagnostics output.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: String,
    pub granted: bool,
    pub reason: String,
    pub username: Option<String>,
    pub roles: Vec<String>,
    pub effective_permissions: Vec<String>,
}

/// Explain why `required` would be granted or denied for `session`.
pub fn explain_authorization(session: &Session, required: &Permission) -> AuthorizationExplanation {
    let mut roles: Vec<String> = session.roles().iter().map(|r| r.as_str().to_string()).collect();
    roles.sort();

    let mut effective_permissions: Vec<String> = session
        .permissions()
        .iter()
        .map(|p| p.as_str().to_string())
        .collect();
    effective_permissions.sort();

    let (granted, reason) = match authorize(session, required) {
        Ok(()) => (true, format!("session holds permission '{}'", required)),
        Err(AuthzError::Unauthenticated) => (false, "no active session".to_string()),
        Err(AuthzError::Forbidden(_)) if session.needs_validation() => (
            false,
            "session has not been validated yet; permissions are unknown".to_string(),
        ),
        Err(AuthzError::Forbidden(p)) => (
            false,
            format!("missing permission '{}'; current permissions: {:?}", p, effective_permissions),
        ),
    };

    AuthorizationExplanation {
        required_permission: required.as_str().to_string(),
        granted,
        reason,
        username: session.user().map(|u| u.username.clone()),
        roles,
        effective_permissions,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use proptest::prelude::*;

    use super::*;
    use crate::{Role, UserInfo};

    fn session_with(permissions: &[&'static str]) -> Session {
        Session::authenticated(
            "tok",
            UserInfo::default(),
            [Role::from("ops")],
            permissions.iter().map(|p| Permission::from(*p)),
            Utc::now(),
        )
    }

    #[test]
    fn membership_is_exact() {
        let session = session_with(&["rbac:user:read"]);
        assert!(has_permission(&session, "rbac:user:read"));
        assert!(!has_permission(&session, "rbac:user"));
        assert!(!has_permission(&session, "rbac:user:read:extra"));
        assert!(!has_permission(&session, "*"));
        assert!(has_role(&session, "ops"));
        assert!(!has_role(&session, "admin"));
    }

    #[test]
    fn star_is_not_a_wildcard() {
        let session = session_with(&["*"]);
        assert!(!has_permission(&session, "alert:read"));
    }

    #[test]
    fn authorize_reports_missing_permission() {
        let session = session_with(&["alert:read"]);
        let err = authorize(&session, &Permission::from("rbac:user:read")).unwrap_err();
        assert_eq!(err, AuthzError::Forbidden("rbac:user:read".to_string()));
    }

    #[test]
    fn authorize_requires_token() {
        let err = authorize(&Session::empty(), &Permission::from("alert:read")).unwrap_err();
        assert_eq!(err, AuthzError::Unauthenticated);
    }

    #[test]
    fn explanation_for_hydrated_session_mentions_validation() {
        let explanation = explain_authorization(&Session::from_token("tok"), &Permission::from("alert:read"));
        assert!(!explanation.granted);
        assert!(explanation.reason.contains("not been validated"));
    }

    #[test]
    fn explanation_lists_sorted_permissions() {
        let explanation = explain_authorization(
            &session_with(&["tasklog", "alert:read"]),
            &Permission::from("alert:read"),
        );
        assert!(explanation.granted);
        assert_eq!(explanation.effective_permissions, vec!["alert:read", "tasklog"]);
    }

    #[test]
    fn explanation_names_missing_permission() {
        let explanation = explain_authorization(&session_with(&["tasklog"]), &Permission::new("rbac:role:read"));
        assert!(!explanation.granted);
        assert_eq!(explanation.required_permission, "rbac:role:read");
        assert!(explanation.reason.contains("missing permission 'rbac:role:read'"));

        let anonymous = explain_authorization(&Session::empty(), &Permission::new("rbac:role:read"));
        assert!(!anonymous.granted);
        assert_eq!(anonymous.reason, "no active session");
        assert_eq!(anonymous.username, None);
    }

    proptest! {
        #[test]
        fn granted_iff_present(held in proptest::collection::hash_set("[a-z:]{1,12}", 0..8), asked in "[a-z:]{1,12}") {
            let session = Session::authenticated(
                "tok",
                UserInfo::default(),
                [],
                held.iter().cloned().map(Permission::from),
                Utc::now(),
            );
            prop_assert_eq!(has_permission(&session, &asked), held.contains(&asked));
        }
    }
}
