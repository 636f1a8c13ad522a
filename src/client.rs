//! Upstream request client
//!
//! [`RequestClient`] is the only way views reach the analytics service. Every
//! failure comes back as a [`RequestError`] so callers never see transport
//! specific error types.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::ClientConfig;
use crate::error::{FailureKind, RequestError};

pub use reqwest::Method;

/// Query parameters of a request
pub type Params = Vec<(&'static str, String)>;

/// Trait for issuing requests to the analytics service (for mocking)
#[async_trait]
pub trait RequestClient: Send + Sync + 'static {
    /// Issue a request and decode the response body
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<Value, RequestError>;

    /// Issue a `GET` request
    async fn get(&self, path: &str, params: &[(&'static str, String)]) -> Result<Value, RequestError> {
        self.request(Method::GET, path, params).await
    }
}

/// HTTP client for the analytics service using reqwest
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, RequestError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RequestError::transport(FailureKind::Other, e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn transport_error(&self, e: &reqwest::Error) -> RequestError {
        if e.is_timeout() {
            RequestError::transport(
                FailureKind::Timeout,
                format!("timeout of {}ms exceeded", self.config.timeout.as_millis()),
            )
        } else if e.is_connect() {
            RequestError::transport(FailureKind::Connect, format!("Network Error: {e}"))
        } else if e.is_decode() {
            RequestError::transport(FailureKind::Decode, e.to_string())
        } else {
            RequestError::transport(FailureKind::Other, e.to_string())
        }
    }
}

#[async_trait]
impl RequestClient for ApiClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<Value, RequestError> {
        let mut request = self.http.request(method.clone(), self.url(path)).query(params);
        if let Some(key) = &self.config.api_key {
            request = request.header(self.config.api_key_header.as_str(), key.as_str());
        }

        debug!("{} {}", method, path);
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(&e).with_request(method.as_str(), path))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&e).with_request(method.as_str(), path))?;

        if !status.is_success() {
            let data = serde_json::from_slice::<Value>(&body).ok();
            return Err(RequestError::http(
                status.as_u16(),
                data,
                format!("Request failed with status code {}", status.as_u16()),
            )
            .with_request(method.as_str(), path));
        }

        Ok(decode_body(&body))
    }
}

/// JSON bodies are decoded; anything else (HTML fragments, plain text) is kept as a string.
fn decode_body(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}
