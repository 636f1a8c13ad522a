//! Cache and request error types

use serde_json::Value;

/// Storage-level cache errors.
///
/// These never reach a view: [`CacheStore::set`](crate::CacheStore::set)
/// logs and swallows them, and unreadable entries are reported as misses.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage quota exceeded while writing {key}")]
    QuotaExceeded { key: String },
}

/// How a request failed before or after reaching the upstream service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The service answered with a non-success HTTP status
    Http,
    /// The request exceeded the client timeout
    Timeout,
    /// The service could not be reached
    Connect,
    /// The response body could not be decoded
    Decode,
    /// Anything else reported by the transport
    Other,
}

/// Normalized rejection of the request client.
///
/// Every failure of [`RequestClient::request`](crate::RequestClient::request)
/// is reported in this shape so [`classify`](crate::classify) can tell
/// connectivity failures from application errors.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct RequestError {
    pub message: String,
    pub status: Option<u16>,
    pub code: Option<String>,
    pub data: Option<Value>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub kind: FailureKind,
}

impl RequestError {
    /// Failure with no HTTP response
    pub fn transport(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: None,
            data: None,
            url: None,
            method: None,
            kind,
        }
    }

    /// Failure carrying an HTTP status and the (possibly absent) error body.
    ///
    /// The message is taken from `data.message`, then `data.error`, then
    /// `fallback`; the code from `data.code`, then `data.statusCode`.
    pub fn http(status: u16, data: Option<Value>, fallback: impl Into<String>) -> Self {
        let field = |name: &str| data.as_ref().and_then(|d| d.get(name)).and_then(scalar_text);

        let message = field("message")
            .or_else(|| field("error"))
            .unwrap_or_else(|| fallback.into());
        let code = field("code").or_else(|| field("statusCode"));

        Self {
            message,
            status: Some(status),
            code,
            data,
            url: None,
            method: None,
            kind: FailureKind::Http,
        }
    }

    /// Attach the request that produced this error
    pub fn with_request(mut self, method: impl Into<String>, url: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self.url = Some(url.into());
        self
    }
}

/// Render a JSON scalar as text; empty strings, objects and arrays yield `None`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
