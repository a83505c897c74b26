use std::sync::Arc;

use proptest::prelude::*;

use octoops_client::testing::{ScriptedSessionService, login_data};
use octoops_client::{Credentials, InMemoryTokenStore, SessionStore};
use octoops_router::{NavigationDecision, NavigationGuard, RedirectReason, RouteTable};

const TAGS: &[&str] = &[
    "etl:batch",
    "etl:stream",
    "task:scheduler",
    "tasklog",
    "aliyun:ecs_sg",
    "alert:read",
    "task:schedule",
    "notify:group",
    "notify:template",
    "notify:channel",
    "rbac:user:read",
    "rbac:role:read",
    "rbac:permission:read",
];

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn routable_paths() -> Vec<String> {
    RouteTable::octoops()
        .routes()
        .iter()
        .map(|r| r.path.replace(":id", "42"))
        .collect()
}

fn any_path() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::sample::select(routable_paths()),
        "(/[a-z0-9-]{1,8}){1,3}/?",
    ]
}

proptest! {
    #[test]
    fn anonymous_users_only_reach_login(to in any_path()) {
        let rt = runtime();
        let guard = NavigationGuard::new(RouteTable::octoops());
        let service = Arc::new(ScriptedSessionService::new());
        let mut store = SessionStore::hydrated(service.clone(), Arc::new(InMemoryTokenStore::new()));

        let decision = rt.block_on(guard.evaluate(&to, None, &mut store));
        match decision {
            NavigationDecision::Allow { path, .. } => prop_assert_eq!(path, "/login"),
            NavigationDecision::Redirect { to, reason } => {
                prop_assert_eq!(to, "/login");
                prop_assert_eq!(reason, RedirectReason::Unauthenticated);
            }
            NavigationDecision::NotFound { .. } => prop_assert!(false, "anonymous not-found for {}", to),
        }
        prop_assert_eq!(service.profile_calls(), 0);
    }

    #[test]
    fn allowed_routes_never_exceed_granted_permissions(
        to in proptest::sample::select(routable_paths()),
        granted in proptest::sample::subsequence(TAGS.to_vec(), 0..TAGS.len()),
    ) {
        let rt = runtime();
        let routes = RouteTable::octoops();
        let guard = NavigationGuard::new(routes.clone());
        let service = Arc::new(
            ScriptedSessionService::new()
                .with_login(Ok(login_data("tok", &["ops"], &granted)))
                .with_menus(Ok(Vec::new())),
        );
        let mut store = SessionStore::new(service.clone(), Arc::new(InMemoryTokenStore::new()));
        rt.block_on(store.login(&Credentials::new("alice", "pw"))).unwrap();

        let required = routes
            .resolve(&to)
            .and_then(|m| m.route.permission.clone());
        let decision = rt.block_on(guard.evaluate(&to, None, &mut store));

        match (&required, &decision) {
            (_, NavigationDecision::NotFound { .. }) => prop_assert!(false, "declared path {} not found", to),
            (Some(tag), NavigationDecision::Allow { .. }) => {
                prop_assert!(granted.contains(&tag.as_str()))
            }
            (Some(tag), NavigationDecision::Redirect { to: target, reason }) => {
                prop_assert!(!granted.contains(&tag.as_str()));
                prop_assert_eq!(target, "/403");
                prop_assert_eq!(reason, &RedirectReason::Forbidden);
            }
            (None, NavigationDecision::Allow { .. }) => {}
            (None, NavigationDecision::Redirect { to: target, .. }) => {
                prop_assert_eq!(to.as_str(), "/login");
                prop_assert_eq!(target, "/");
            }
        }
        prop_assert_eq!(service.profile_calls(), 0);
    }
}
