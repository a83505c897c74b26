//! `octoops-auth`: client-side authorization boundary of the OctoOps console.
//!
//! No HTTP and no storage here: the crate holds the
//! session record and answers membership questions against it.

pub mod authorize;
pub mod menu;
pub mod permissions;
pub mod roles;
pub mod session;
pub mod user;

pub use authorize::{
    AuthorizationExplanation, AuthzError, authorize, explain_authorization, has_permission, has_role,
};
pub use menu::{MenuNode, find_menu, menu_paths};
pub use permissions::Permission;
pub use roles::Role;
pub use session::{GuardState, Session};
pub use user::{UserId, UserInfo, UserStatus};
