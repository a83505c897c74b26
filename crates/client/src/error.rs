//! Error model of the console client.

use thiserror::Error;

/// Failure at the HTTP boundary, before any session semantics are applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Request never produced a response (connect, DNS, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx HTTP status.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// 2xx response whose envelope `code` is not 200.
    #[error("request rejected (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("client configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// True when the backend refused the credential (HTTP 401 or envelope code 401).
    pub fn is_unauthorized(&self) -> bool {
        match self {
            ServiceError::Status { status, code, .. } => *status == 401 || *code == Some(401),
            ServiceError::Rejected { code, .. } => *code == 401,
            _ => false,
        }
    }

    /// Message suitable for logs; prefers the backend's own wording.
    pub fn message(&self) -> String {
        match self {
            ServiceError::Status { message, .. } | ServiceError::Rejected { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Body parse failures are decode errors; everything else never got a usable
/// response.
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else {
            ServiceError::Network(err.to_string())
        }
    }
}

/// Failure of a session operation (login, profile re-fetch).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The backend rejected the username/password pair.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Network failure, 5xx, timeout, or any other non-401 rejection.
    #[error("session service unavailable: {0}")]
    TransientServiceFailure(String),

    /// Operation needs a token but the session holds none.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The token could not be written to durable storage.
    #[error("token storage failed: {0}")]
    Storage(String),
}

impl AuthError {
    /// Classify a service failure: 401 means bad credentials, anything else is transient.
    pub fn from_service(err: &ServiceError) -> Self {
        if err.is_unauthorized() {
            AuthError::InvalidCredentials(err.message())
        } else {
            AuthError::TransientServiceFailure(err.message())
        }
    }

    /// Text to show the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials(_) => "invalid username or password",
            AuthError::TransientServiceFailure(_) | AuthError::Storage(_) => {
                "login failed, please try again later"
            }
            AuthError::NotAuthenticated => "please sign in first",
        }
    }
}
