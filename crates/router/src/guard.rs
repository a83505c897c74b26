//! Navigation guard: decides every route transition before a view is shown.
//!
//! Evaluation order:
//! 1. The login route is open to anonymous users only; signed-in users are
//!    sent to the landing route.
//! 2. Without a token, every other destination redirects to login.
//! 3. A token whose profile has not been confirmed yet (restored from disk) is
//!    re-validated once. Any failure, including an unreachable backend, logs
//!    the user out and redirects to login.
//! 4. A route's required permission must be held, else redirect to `/403`.
//! 5. Otherwise the navigation proceeds.
//!
//! The guard never returns an error: each failure is a navigation decision.

use serde::Serialize;

use octoops_client::SessionStore;

use crate::routes::{FORBIDDEN_PATH, LANDING_PATH, LOGIN_PATH, RouteDescriptor, RouteTable, normalize};

/// Why the guard redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// No session; sign in first.
    Unauthenticated,
    /// Already signed in; the login page is not shown again.
    AlreadyAuthenticated,
    /// A restored token could not be re-validated and was discarded.
    SessionInvalid,
    /// The destination requires a permission the session lacks.
    Forbidden,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum NavigationDecision {
    Allow {
        /// Concrete path after following route redirects.
        path: String,
        name: &'static str,
        view: Option<&'static str>,
    },
    Redirect {
        to: String,
        reason: RedirectReason,
    },
    /// Signed-in navigation to a path no route matches.
    NotFound { path: String },
}

impl NavigationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, NavigationDecision::Allow { .. })
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            NavigationDecision::Redirect { to, .. } => Some(to),
            _ => None,
        }
    }

    fn redirect(to: &str, reason: RedirectReason) -> Self {
        NavigationDecision::Redirect {
            to: to.to_string(),
            reason,
        }
    }

    fn allow(path: String, route: &RouteDescriptor) -> Self {
        NavigationDecision::Allow {
            path,
            name: route.name,
            view: route.view,
        }
    }
}

/// Well-known paths the guard redirects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPaths {
    pub login: String,
    pub landing: String,
    pub forbidden: String,
}

impl Default for GuardPaths {
    fn default() -> Self {
        Self {
            login: LOGIN_PATH.to_string(),
            landing: LANDING_PATH.to_string(),
            forbidden: FORBIDDEN_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavigationGuard {
    routes: RouteTable,
    paths: GuardPaths,
}

impl NavigationGuard {
    pub fn new(routes: RouteTable) -> Self {
        Self {
            routes,
            paths: GuardPaths::default(),
        }
    }

    pub fn with_paths(mut self, paths: GuardPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn paths(&self) -> &GuardPaths {
        &self.paths
    }

    /// The login route and anything mounted below it.
    fn is_login_route(&self, route: &RouteDescriptor) -> bool {
        let login = self.paths.login.trim_end_matches('/');
        route.path == login
            || route
                .path
                .strip_prefix(login)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Decide the transition `from` → `to`.
    ///
    /// May suspend on a profile fetch (step 3); the caller holds `store`
    /// exclusively for the whole evaluation.
    pub async fn evaluate(&self, to: &str, from: Option<&str>, store: &mut SessionStore) -> NavigationDecision {
        let decision = self.decide(to, store).await;
        tracing::debug!(to, from = from.unwrap_or(""), ?decision, "navigation decided");
        decision
    }

    async fn decide(&self, to: &str, store: &mut SessionStore) -> NavigationDecision {
        let resolved = self.routes.resolve(to);

        if let Some(m) = resolved.as_ref().filter(|m| self.is_login_route(m.route)) {
            if store.session().is_authenticated() {
                return NavigationDecision::redirect(&self.paths.landing, RedirectReason::AlreadyAuthenticated);
            }
            return NavigationDecision::allow(m.path.clone(), m.route);
        }

        if !store.session().is_authenticated() {
            return NavigationDecision::redirect(&self.paths.login, RedirectReason::Unauthenticated);
        }

        if store.session().needs_validation() {
            tracing::debug!(to, "validating restored session before navigation");
            if let Err(err) = store.fetch_user_info().await {
                tracing::warn!(to, "restored session rejected, signing out: {err}");
                store.logout();
                return NavigationDecision::redirect(&self.paths.login, RedirectReason::SessionInvalid);
            }
        }

        let Some(m) = resolved else {
            return NavigationDecision::NotFound { path: normalize(to) };
        };

        if let Some(required) = &m.route.permission {
            if !store.has_permission(required.as_str()) {
                tracing::info!(to, permission = %required, "navigation forbidden");
                return NavigationDecision::redirect(&self.paths.forbidden, RedirectReason::Forbidden);
            }
        }

        NavigationDecision::allow(m.path, m.route)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use octoops_auth::{GuardState, Session};
    use octoops_client::testing::{
        ScriptedSessionService, login_data, menu, profile_data, server_error, unauthorized,
    };
    use octoops_client::{Credentials, InMemoryTokenStore, ServiceError};

    use super::*;

    fn guard() -> NavigationGuard {
        NavigationGuard::new(RouteTable::octoops())
    }

    fn store_with(service: &Arc<ScriptedSessionService>, tokens: &Arc<InMemoryTokenStore>) -> SessionStore {
        SessionStore::hydrated(service.clone(), tokens.clone())
    }

    async fn signed_in(permissions: &[&str]) -> (Arc<ScriptedSessionService>, SessionStore) {
        let service = Arc::new(
            ScriptedSessionService::new()
                .with_login(Ok(login_data("tok", &["ops"], permissions)))
                .with_menus(Ok(vec![menu("overview", "/overview")])),
        );
        let mut store = store_with(&service, &Arc::new(InMemoryTokenStore::new()));
        store.login(&Credentials::new("alice", "secret")).await.unwrap();
        (service, store)
    }

    #[tokio::test]
    async fn anonymous_user_may_open_login() {
        let service = Arc::new(ScriptedSessionService::new());
        let mut store = store_with(&service, &Arc::new(InMemoryTokenStore::new()));

        let decision = guard().evaluate("/login", None, &mut store).await;
        assert!(decision.is_allowed());
        assert_eq!(
            decision,
            NavigationDecision::Allow {
                path: "/login".to_string(),
                name: "Login",
                view: Some("Login"),
            }
        );
    }

    #[tokio::test]
    async fn anonymous_user_is_sent_to_login() {
        let service = Arc::new(ScriptedSessionService::new());
        let mut store = store_with(&service, &Arc::new(InMemoryTokenStore::new()));

        for to in ["/", "/overview", "/rbac/user", "/403", "/does-not-exist"] {
            let decision = guard().evaluate(to, Some("/login"), &mut store).await;
            assert_eq!(
                decision,
                NavigationDecision::Redirect {
                    to: "/login".to_string(),
                    reason: RedirectReason::Unauthenticated,
                },
                "{to}"
            );
        }
        assert_eq!(service.profile_calls(), 0);
    }

    #[tokio::test]
    async fn signed_in_user_is_kept_off_login() {
        let (_, mut store) = signed_in(&["alert:read"]).await;

        let decision = guard().evaluate("/login", Some("/overview"), &mut store).await;
        assert_eq!(decision.redirect_target(), Some("/"));
    }

    #[tokio::test]
    async fn missing_permission_redirects_to_forbidden() {
        let (_, mut store) = signed_in(&["alert:read"]).await;

        let decision = guard().evaluate("/rbac/user", Some("/overview"), &mut store).await;
        assert_eq!(
            decision,
            NavigationDecision::Redirect {
                to: "/403".to_string(),
                reason: RedirectReason::Forbidden,
            }
        );

        let decision = guard().evaluate("/alert-email", Some("/overview"), &mut store).await;
        assert!(decision.is_allowed());
    }

    #[tokio::test]
    async fn landing_resolves_through_redirect() {
        let (_, mut store) = signed_in(&[]).await;

        let decision = guard().evaluate("/", None, &mut store).await;
        assert_eq!(
            decision,
            NavigationDecision::Allow {
                path: "/overview".to_string(),
                name: "Overview",
                view: Some("Overview"),
            }
        );
    }

    #[tokio::test]
    async fn parameterized_route_checks_its_permission() {
        let (_, mut store) = signed_in(&["etl:batch"]).await;

        let decision = guard().evaluate("/batchtask/edit/7?tab=sql", None, &mut store).await;
        assert!(matches!(decision, NavigationDecision::Allow { name: "BatchTaskEdit", .. }));

        let decision = guard().evaluate("/streamtask/edit/7", None, &mut store).await;
        assert_eq!(decision.redirect_target(), Some("/403"));
    }

    #[tokio::test]
    async fn unknown_path_is_not_found_when_signed_in() {
        let (_, mut store) = signed_in(&["alert:read"]).await;

        let decision = guard().evaluate("/nowhere/", None, &mut store).await;
        assert_eq!(
            decision,
            NavigationDecision::NotFound {
                path: "/nowhere".to_string()
            }
        );
    }

    #[tokio::test]
    async fn restored_session_is_validated_exactly_once() {
        let service = Arc::new(
            ScriptedSessionService::new()
                .with_profile(Ok(profile_data(&["ops"], &["rbac:user:read"])))
                .with_menus(Ok(vec![menu("rbac:user:read", "/rbac/user")])),
        );
        let tokens = Arc::new(InMemoryTokenStore::with_token("persisted"));
        let mut store = store_with(&service, &tokens);
        assert_eq!(store.guard_state(), GuardState::Authenticating);

        let guard = guard();
        let decision = guard.evaluate("/rbac/user", None, &mut store).await;
        assert!(decision.is_allowed());
        assert_eq!(service.profile_calls(), 1);
        assert_eq!(store.guard_state(), GuardState::Authorized);

        for to in ["/overview", "/rbac/user", "/alert-email"] {
            guard.evaluate(to, Some("/rbac/user"), &mut store).await;
        }
        assert_eq!(service.profile_calls(), 1);
    }

    #[tokio::test]
    async fn validation_happens_before_permission_check() {
        // Permissions are unknown until the profile arrives; the fetched set decides.
        let service = Arc::new(
            ScriptedSessionService::new()
                .with_profile(Ok(profile_data(&["viewer"], &["alert:read"])))
                .with_menus(Ok(Vec::new())),
        );
        let mut store = store_with(&service, &Arc::new(InMemoryTokenStore::with_token("persisted")));

        let decision = guard().evaluate("/rbac/user", None, &mut store).await;
        assert_eq!(decision.redirect_target(), Some("/403"));
        assert_eq!(service.profile_calls(), 1);
    }

    #[tokio::test]
    async fn rejected_token_logs_out_and_redirects() {
        for failure in [
            unauthorized(),
            server_error(),
            ServiceError::Network("connection refused".to_string()),
        ] {
            let service = Arc::new(ScriptedSessionService::new().with_profile(Err(failure)));
            let tokens = Arc::new(InMemoryTokenStore::with_token("stale"));
            let mut store = store_with(&service, &tokens);

            let decision = guard().evaluate("/overview", None, &mut store).await;

            assert_eq!(
                decision,
                NavigationDecision::Redirect {
                    to: "/login".to_string(),
                    reason: RedirectReason::SessionInvalid,
                }
            );
            assert_eq!(store.session(), &Session::empty());
            assert_eq!(store.authorization_header(), None);
            assert_eq!(tokens.peek(), None);
        }
    }

    #[tokio::test]
    async fn custom_paths_are_honored() {
        let routes = RouteTable::octoops()
            .route(RouteDescriptor::view("/signin", "SignIn", "Login"))
            .route(RouteDescriptor::view("/denied", "Denied", "403"));
        let guard = NavigationGuard::new(routes).with_paths(GuardPaths {
            login: "/signin".to_string(),
            landing: "/overview".to_string(),
            forbidden: "/denied".to_string(),
        });

        let service = Arc::new(ScriptedSessionService::new());
        let mut store = store_with(&service, &Arc::new(InMemoryTokenStore::new()));
        assert_eq!(guard.evaluate("/tasklog", None, &mut store).await.redirect_target(), Some("/signin"));
        assert!(guard.evaluate("/signin", None, &mut store).await.is_allowed());
    }
}
