//! `octoops-client`
//!
//! **Responsibility:** the console's side of the session.
//!
//! This crate provides:
//! - The remote session service (`/auth/login`, `/auth/profile`, `/menus`)
//! - Durable token persistence
//! - [`SessionStore`], the single writer of the console session
//! - RBAC administration endpoints sharing the same credential
//!
//! The backend stays the authority; the client only caches what it was told.

pub mod config;
pub mod envelope;
pub mod error;
pub mod rbac;
pub mod service;
pub mod store;
pub mod token_store;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::{ClientConfig, ConfigError};
pub use envelope::{ApiEnvelope, Credentials, LoginData, ProfileData};
pub use error::{AuthError, ServiceError};
pub use rbac::RbacClient;
pub use service::{HttpSessionService, SessionService};
pub use store::SessionStore;
pub use token_store::{FileTokenStore, InMemoryTokenStore, TokenStore};
pub use transport::{ApiTransport, BearerToken};
