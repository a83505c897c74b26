//! Client-side routing for the OctoOps console: the static route table and the
//! navigation guard that gates it by session and permission.

pub mod guard;
pub mod navigator;
pub mod routes;

pub use guard::{GuardPaths, NavigationDecision, NavigationGuard, RedirectReason};
pub use navigator::{Navigation, SharedNavigator};
pub use routes::{Layout, RouteDescriptor, RouteMatch, RouteTable};
