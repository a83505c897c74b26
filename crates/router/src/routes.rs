//! Static route table of the console.
//!
//! Routes are declared once at startup and never change. Paths are matched
//! segment by segment; a `:name` segment matches any single non-empty segment.

use std::collections::BTreeMap;

use serde::Serialize;

use octoops_auth::Permission;

pub const LOGIN_PATH: &str = "/login";
pub const LANDING_PATH: &str = "/";
pub const FORBIDDEN_PATH: &str = "/403";

/// Redirect chains longer than this are treated as unresolvable.
const MAX_REDIRECTS: usize = 8;

/// Page shell a view is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Navigation chrome (side menu, header).
    Main,
    /// Bare page (login).
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDescriptor {
    pub path: String,
    pub name: &'static str,
    /// View identifier; `None` for pure redirects.
    pub view: Option<&'static str>,
    pub layout: Layout,
    pub permission: Option<Permission>,
    pub redirect: Option<String>,
}

impl RouteDescriptor {
    pub fn view(path: &str, name: &'static str, view: &'static str) -> Self {
        Self {
            path: path.to_string(),
            name,
            view: Some(view),
            layout: Layout::Main,
            permission: None,
            redirect: None,
        }
    }

    pub fn redirect(path: &str, name: &'static str, to: &str) -> Self {
        Self {
            path: path.to_string(),
            name,
            view: None,
            layout: Layout::Main,
            permission: None,
            redirect: Some(to.to_string()),
        }
    }

    pub fn requires(mut self, permission: &'static str) -> Self {
        self.permission = Some(Permission::from_static(permission));
        self
    }

    pub fn in_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    fn matches(&self, segments: &[&str]) -> Option<BTreeMap<String, String>> {
        let pattern = split(&self.path);
        if pattern.len() != segments.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (pat, seg) in pattern.iter().zip(segments) {
            if let Some(name) = pat.strip_prefix(':') {
                params.insert(name.to_string(), (*seg).to_string());
            } else if pat != seg {
                return None;
            }
        }
        Some(params)
    }
}

/// A concrete path matched against a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a RouteDescriptor,
    /// Normalized concrete path (no query, no trailing slash).
    pub path: String,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, descriptor: RouteDescriptor) -> Self {
        self.routes.push(descriptor);
        self
    }

    /// Mount every route of `table` under `prefix`, redirects included.
    pub fn nest(mut self, prefix: &str, table: RouteTable) -> Self {
        for mut route in table.routes {
            route.path = join(prefix, &route.path);
            route.redirect = route.redirect.map(|to| {
                if to.starts_with('/') { to } else { join(prefix, &to) }
            });
            self.routes.push(route);
        }
        self
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// First descriptor (in declaration order) matching `path`.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        let normalized = normalize(path);
        let segments = split(&normalized);
        self.routes.iter().find_map(|route| {
            route.matches(&segments).map(|params| RouteMatch {
                route,
                path: normalized.clone(),
                params,
            })
        })
    }

    /// Match `path` and follow redirect descriptors to a routable target.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        let mut current = self.match_path(path)?;
        for _ in 0..MAX_REDIRECTS {
            match current.route.redirect.as_deref() {
                Some(to) => current = self.match_path(to)?,
                None => return Some(current),
            }
        }
        tracing::warn!(path, "redirect chain too long");
        None
    }

    /// The OctoOps console routes.
    pub fn octoops() -> Self {
        RouteTable::new()
            .nest("/", main_routes())
            .nest(LOGIN_PATH, login_routes())
    }
}

fn main_routes() -> RouteTable {
    RouteTable::new()
        .route(RouteDescriptor::redirect("", "Home", "overview"))
        .route(RouteDescriptor::view("overview", "Overview", "Overview"))
        .route(RouteDescriptor::view("batchtask", "BatchTask", "seatunnel/batch/BatchTask").requires("etl:batch"))
        .route(RouteDescriptor::view("batchtask/new", "BatchTaskNew", "seatunnel/batch/BatchTaskEdit").requires("etl:batch"))
        .route(RouteDescriptor::view("batchtask/edit/:id", "BatchTaskEdit", "seatunnel/batch/BatchTaskEdit").requires("etl:batch"))
        .route(RouteDescriptor::view("streamtask", "StreamTask", "seatunnel/stream/StreamTask").requires("etl:stream"))
        .route(RouteDescriptor::view("streamtask/new", "StreamTaskNew", "seatunnel/stream/StreamTaskEdit").requires("etl:stream"))
        .route(RouteDescriptor::view("streamtask/edit/:id", "StreamTaskEdit", "seatunnel/stream/StreamTaskEdit").requires("etl:stream"))
        .route(RouteDescriptor::view("scheduler", "Scheduler", "Scheduler").requires("task:scheduler"))
        .route(RouteDescriptor::view("tasklog", "TaskLog", "TaskLog").requires("tasklog"))
        .route(RouteDescriptor::view("ecs-security-group", "EcsSecurityGroup", "EcsSecurityGroup").requires("aliyun:ecs_sg"))
        .route(RouteDescriptor::view("alert-email", "AlertEmail", "alert/AlertEmail").requires("alert:read"))
        .route(RouteDescriptor::view("alert-robot", "AlertRobot", "alert/AlertRobot").requires("alert:read"))
        .route(RouteDescriptor::view("task/timer", "CustomTask", "CustomTask").requires("task:schedule"))
        .route(RouteDescriptor::view("alert-group", "AlertGroup", "alert/AlertGroup").requires("notify:group"))
        .route(RouteDescriptor::view("alert-template", "AlertTemplate", "alert/AlertTemplate").requires("notify:template"))
        .route(RouteDescriptor::view("alert-channel", "AlertChannel", "alert/AlertChannel").requires("notify:channel"))
        .route(RouteDescriptor::view("rbac/user", "UserManage", "rbac/UserManage").requires("rbac:user:read"))
        .route(RouteDescriptor::view("rbac/role", "RoleManage", "rbac/RoleManage").requires("rbac:role:read"))
        .route(RouteDescriptor::view("rbac/permission", "PermissionManage", "rbac/PermissionManage").requires("rbac:permission:read"))
        .route(RouteDescriptor::view("403", "Forbidden", "403"))
}

fn login_routes() -> RouteTable {
    RouteTable::new().route(RouteDescriptor::view("", "Login", "Login").in_layout(Layout::Blank))
}

/// Strip query/fragment and trailing slashes; always starts with `/`.
pub fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let joined = split(path).join("/");
    format!("/{joined}")
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn join(prefix: &str, path: &str) -> String {
    let mut segments = split(prefix);
    segments.extend(split(path));
    format!("/{}", segments.join("/"))
}
