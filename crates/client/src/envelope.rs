//! Wire types of the OctoOps backend (`{code, message, data}` envelopes).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use octoops_auth::{Permission, Role, UserInfo};

use crate::error::ServiceError;

/// Envelope `code` that signals success.
pub const CODE_OK: i64 = 200;

/// Response envelope used by every backend endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }

    /// Unwrap `data` of a successful envelope.
    pub fn into_data(self) -> Result<T, ServiceError> {
        if !self.is_ok() {
            return Err(ServiceError::Rejected {
                code: self.code,
                message: self.message,
            });
        }
        self.data
            .ok_or_else(|| ServiceError::Decode("envelope has no data".to_string()))
    }

    /// Check the code of an envelope whose `data` is irrelevant.
    pub fn into_unit(self) -> Result<(), ServiceError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(ServiceError::Rejected {
                code: self.code,
                message: self.message,
            })
        }
    }
}

/// Minimal envelope view used to pull `code`/`message` out of error bodies.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

/// Username/password pair posted to `/auth/login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `data` of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginData {
    pub token: String,
    pub user: UserInfo,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub roles: Vec<Role>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub permissions: Vec<Permission>,
}

/// `data` of `/auth/profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileData {
    pub user: UserInfo,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub roles: Vec<Role>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub permissions: Vec<Permission>,
}

/// The backend serializes empty lists as `null`.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
