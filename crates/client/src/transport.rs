//! Shared HTTP plumbing: one `reqwest::Client` per process, credentials
//! injected per request.

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::envelope::{ApiEnvelope, ErrorBody};
use crate::error::ServiceError;

/// Bearer credential attached to a single request.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// `None` for an empty token: an unauthenticated session sends no header.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() { None } else { Some(Self(token)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl core::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct ApiTransport {
    client: Client,
    base_url: String,
}

impl ApiTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("octoops-console/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServiceError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a request, attaching `credential` when present.
    pub fn request(&self, method: Method, path: &str, credential: Option<&BearerToken>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let req = self.client.request(method, url);
        match credential {
            Some(token) => req.bearer_auth(token.as_str()),
            None => req,
        }
    }

    /// Send a request and decode its envelope.
    ///
    /// Non-2xx statuses become [`ServiceError::Status`], carrying the envelope
    /// `code`/`message` when the body has one. The envelope `code` of a 2xx
    /// response is left for the caller to check.
    pub async fn execute<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<ApiEnvelope<T>, ServiceError> {
        let resp = req.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let parsed = serde_json::from_str::<ErrorBody>(&body).ok();
            let (code, message) = match parsed {
                Some(b) if !b.message.is_empty() => (b.code, b.message),
                Some(b) => (b.code, status.to_string()),
                None => (None, status.to_string()),
            };
            tracing::debug!(status = status.as_u16(), ?code, "backend returned error status");
            return Err(ServiceError::Status {
                status: status.as_u16(),
                code,
                message,
            });
        }

        Ok(resp.json::<ApiEnvelope<T>>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_yields_no_credential() {
        assert!(BearerToken::new("").is_none());
        let token = BearerToken::new("abc").unwrap();
        assert_eq!(token.header_value(), "Bearer abc");
        assert_eq!(format!("{token:?}"), "BearerToken(<redacted>)");
    }

    #[test]
    fn base_url_is_normalized() {
        let config = ClientConfig::new("http://localhost:8080/api/", "/tmp/t");
        let transport = ApiTransport::new(&config).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8080/api");
    }
}
