//! Remote session service: login, profile and menu endpoints.

use async_trait::async_trait;
use reqwest::Method;

use octoops_auth::MenuNode;

use crate::config::ClientConfig;
use crate::envelope::{Credentials, LoginData, ProfileData};
use crate::error::ServiceError;
use crate::transport::{ApiTransport, BearerToken};

/// Backend endpoints the session store depends on.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// `POST /auth/login`.
    async fn login(&self, credentials: &Credentials) -> Result<LoginData, ServiceError>;

    /// `GET /auth/profile`.
    async fn profile(&self, token: &BearerToken) -> Result<ProfileData, ServiceError>;

    /// `GET /menus`.
    async fn menus(&self, token: &BearerToken) -> Result<Vec<MenuNode>, ServiceError>;
}

/// reqwest-backed implementation talking to the OctoOps API.
#[derive(Debug, Clone)]
pub struct HttpSessionService {
    transport: ApiTransport,
}

impl HttpSessionService {
    pub fn new(config: &ClientConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            transport: ApiTransport::new(config)?,
        })
    }

    pub fn from_transport(transport: ApiTransport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &ApiTransport {
        &self.transport
    }
}

#[async_trait]
impl SessionService for HttpSessionService {
    async fn login(&self, credentials: &Credentials) -> Result<LoginData, ServiceError> {
        let req = self
            .transport
            .request(Method::POST, "/auth/login", None)
            .json(credentials);
        self.transport.execute::<LoginData>(req).await?.into_data()
    }

    async fn profile(&self, token: &BearerToken) -> Result<ProfileData, ServiceError> {
        let req = self.transport.request(Method::GET, "/auth/profile", Some(token));
        self.transport.execute::<ProfileData>(req).await?.into_data()
    }

    async fn menus(&self, token: &BearerToken) -> Result<Vec<MenuNode>, ServiceError> {
        let req = self.transport.request(Method::GET, "/menus", Some(token));
        let envelope = self.transport.execute::<Vec<MenuNode>>(req).await?;
        if envelope.is_ok() && envelope.data.is_none() {
            // The backend encodes an empty tree as `null`.
            return Ok(Vec::new());
        }
        envelope.into_data()
    }
}
