//! RBAC administration endpoints (users, roles, permissions, passwords).
//!
//! Every authenticated call takes the caller's [`BearerToken`], normally
//! obtained from [`crate::SessionStore::bearer`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use octoops_auth::UserStatus;

use crate::config::ClientConfig;
use crate::envelope::null_as_empty;
use crate::error::ServiceError;
use crate::transport::{ApiTransport, BearerToken};

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub roles: Vec<RoleRecord>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "active")]
    pub status: i32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub permissions: Vec<PermissionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub id: u64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    /// `menu` or `api`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub method: String,
    #[serde(default = "active")]
    pub status: i32,
    #[serde(default)]
    pub parent_id: u64,
    #[serde(default)]
    pub order_num: i32,
}

/// Node of `/permissions/tree`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionTreeNode {
    pub id: u64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub method: String,
    #[serde(default = "active")]
    pub status: i32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub children: Vec<PermissionTreeNode>,
}

fn active() -> i32 {
    1
}

/// One page of a list endpoint. The item key differs per endpoint
/// (`users`, `roles`, `permissions`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Page<T> {
    #[serde(alias = "users", alias = "roles", alias = "permissions", deserialize_with = "null_as_empty")]
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    #[serde(default)]
    pub total_page: u32,
}

/// Pagination plus free-form filters (`username`, `email`, `name`, `status`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    pub filters: BTreeMap<String, String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            filters: BTreeMap::new(),
        }
    }
}

impl ListQuery {
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            ..Self::default()
        }
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("page_size".to_string(), self.page_size.to_string()),
        ];
        pairs.extend(self.filters.iter().map(|(k, v)| (k.clone(), v.clone())));
        pairs
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub role_ids: Vec<u64>,
}

impl core::fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .field("nickname", &self.nickname)
            .field("role_ids", &self.role_ids)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_ids: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permission_ids: Vec<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_ids: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePermissionRequest {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub method: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePermissionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

impl core::fmt::Debug for ChangePasswordRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("ChangePasswordRequest { .. }")
    }
}

/// Reset a forgotten password with the code mailed by `send_reset_code`.
#[derive(Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

impl core::fmt::Debug for ForgotPasswordRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ForgotPasswordRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RbacClient {
    transport: ApiTransport,
}

impl RbacClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            transport: ApiTransport::new(config)?,
        })
    }

    pub fn from_transport(transport: ApiTransport) -> Self {
        Self { transport }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &BearerToken,
        query: &[(String, String)],
    ) -> Result<T, ServiceError> {
        let req = self.transport.request(Method::GET, path, Some(token)).query(query);
        self.transport.execute::<T>(req).await?.into_data()
    }

    async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        token: Option<&BearerToken>,
        body: &B,
    ) -> Result<T, ServiceError> {
        let req = self.transport.request(method, path, token).json(body);
        self.transport.execute::<T>(req).await?.into_data()
    }

    async fn send_unit<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        token: Option<&BearerToken>,
        body: Option<&B>,
    ) -> Result<(), ServiceError> {
        let mut req = self.transport.request(method, path, token);
        if let Some(body) = body {
            req = req.json(body);
        }
        self.transport
            .execute::<serde_json::Value>(req)
            .await?
            .into_unit()
    }

    // Users

    pub async fn list_users(&self, token: &BearerToken, query: &ListQuery) -> Result<Page<UserRecord>, ServiceError> {
        self.get("/users", token, &query.pairs()).await
    }

    pub async fn get_user(&self, token: &BearerToken, id: u64) -> Result<UserRecord, ServiceError> {
        self.get(&format!("/users/{id}"), token, &[]).await
    }

    pub async fn create_user(&self, token: &BearerToken, req: &CreateUserRequest) -> Result<UserRecord, ServiceError> {
        tracing::info!(username = %req.username, "creating user");
        self.send(Method::POST, "/users", Some(token), req).await
    }

    pub async fn update_user(
        &self,
        token: &BearerToken,
        id: u64,
        req: &UpdateUserRequest,
    ) -> Result<UserRecord, ServiceError> {
        self.send(Method::PUT, &format!("/users/{id}"), Some(token), req).await
    }

    pub async fn delete_user(&self, token: &BearerToken, id: u64) -> Result<(), ServiceError> {
        tracing::info!(user_id = id, "deleting user");
        self.send_unit::<()>(Method::DELETE, &format!("/users/{id}"), Some(token), None)
            .await
    }

    // Roles

    pub async fn list_roles(&self, token: &BearerToken, query: &ListQuery) -> Result<Page<RoleRecord>, ServiceError> {
        self.get("/roles", token, &query.pairs()).await
    }

    pub async fn create_role(&self, token: &BearerToken, req: &CreateRoleRequest) -> Result<RoleRecord, ServiceError> {
        tracing::info!(role = %req.name, "creating role");
        self.send(Method::POST, "/roles", Some(token), req).await
    }

    pub async fn update_role(
        &self,
        token: &BearerToken,
        id: u64,
        req: &UpdateRoleRequest,
    ) -> Result<RoleRecord, ServiceError> {
        self.send(Method::PUT, &format!("/roles/{id}"), Some(token), req).await
    }

    pub async fn delete_role(&self, token: &BearerToken, id: u64) -> Result<(), ServiceError> {
        tracing::info!(role_id = id, "deleting role");
        self.send_unit::<()>(Method::DELETE, &format!("/roles/{id}"), Some(token), None)
            .await
    }

    // Permissions

    pub async fn list_permissions(
        &self,
        token: &BearerToken,
        query: &ListQuery,
    ) -> Result<Page<PermissionRecord>, ServiceError> {
        self.get("/permissions", token, &query.pairs()).await
    }

    pub async fn create_permission(
        &self,
        token: &BearerToken,
        req: &CreatePermissionRequest,
    ) -> Result<PermissionRecord, ServiceError> {
        tracing::info!(code = %req.code, "creating permission");
        self.send(Method::POST, "/permissions", Some(token), req).await
    }

    pub async fn update_permission(
        &self,
        token: &BearerToken,
        id: u64,
        req: &UpdatePermissionRequest,
    ) -> Result<PermissionRecord, ServiceError> {
        self.send(Method::PUT, &format!("/permissions/{id}"), Some(token), req).await
    }

    pub async fn delete_permission(&self, token: &BearerToken, id: u64) -> Result<(), ServiceError> {
        tracing::info!(permission_id = id, "deleting permission");
        self.send_unit::<()>(Method::DELETE, &format!("/permissions/{id}"), Some(token), None)
            .await
    }

    pub async fn permission_tree(&self, token: &BearerToken) -> Result<Vec<PermissionTreeNode>, ServiceError> {
        self.get("/permissions/tree", token, &[]).await
    }

    // Passwords

    pub async fn change_password(&self, token: &BearerToken, req: &ChangePasswordRequest) -> Result<(), ServiceError> {
        self.send_unit(Method::POST, "/users/change-password", Some(token), Some(req))
            .await
    }

    /// Unauthenticated.
    pub async fn send_reset_code(&self, email: &str) -> Result<(), ServiceError> {
        let body = serde_json::json!({ "email": email });
        self.send_unit(Method::POST, "/users/send-reset-code", None, Some(&body))
            .await
    }

    /// Unauthenticated.
    pub async fn forgot_password(&self, req: &ForgotPasswordRequest) -> Result<(), ServiceError> {
        self.send_unit(Method::POST, "/users/forgot-password", None, Some(req))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::ApiEnvelope;

    #[test]
    fn user_page_decodes_with_endpoint_specific_key() {
        let env: ApiEnvelope<Page<UserRecord>> = serde_json::from_str(
            r#"{"code":200,"message":"ok","data":{
                "users":[{"id":1,"username":"alice","email":"a@x","nickname":"","avatar":"","status":1,
                          "created_at":"2025-01-02T03:04:05Z","updated_at":"2025-01-02T03:04:05Z",
                          "roles":[{"id":2,"name":"ops","description":"","status":1,"permissions":null}]}],
                "total":1,"page":1,"page_size":10,"total_page":1}}"#,
        )
        .unwrap();
        let page = env.into_data().unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].roles[0].name, "ops");
        assert!(page.items[0].roles[0].permissions.is_empty());
    }

    #[test]
    fn permission_tree_decodes_type_field() {
        let nodes: Vec<PermissionTreeNode> = serde_json::from_str(
            r#"[{"id":1,"name":"RBAC","code":"rbac","type":"menu","path":"/rbac","method":"","status":1,
                "children":[{"id":2,"name":"Users","code":"rbac:user:read","type":"menu","path":"/rbac/user",
                             "method":"","status":1,"children":null}]}]"#,
        )
        .unwrap();
        assert_eq!(nodes[0].kind, "menu");
        assert_eq!(nodes[0].children[0].code, "rbac:user:read");
        assert!(nodes[0].children[0].children.is_empty());
    }

    #[test]
    fn list_query_carries_paging_and_filters() {
        let pairs = ListQuery::page(2, 20).filter("username", "ali").pairs();
        assert_eq!(
            pairs,
            vec![
                ("page".to_string(), "2".to_string()),
                ("page_size".to_string(), "20".to_string()),
                ("username".to_string(), "ali".to_string()),
            ]
        );
    }

    #[test]
    fn update_requests_skip_unset_fields() {
        let body = serde_json::to_value(UpdateUserRequest {
            status: Some(UserStatus::Disabled),
            ..UpdateUserRequest::default()
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "status": 0 }));
    }

    #[test]
    fn password_requests_are_redacted_in_debug() {
        let rendered = format!(
            "{:?}",
            ForgotPasswordRequest {
                email: "a@x".to_string(),
                code: "123456".to_string(),
                new_password: "pw".to_string(),
            }
        );
        assert!(rendered.contains("a@x"));
        assert!(!rendered.contains("123456"));
        assert!(!rendered.contains("new_password"));
    }
}
