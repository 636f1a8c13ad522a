//! Error classification
//!
//! Turns a [`RequestError`] into the small shape views act on: a message,
//! the HTTP status and code if there were any, and whether the failure was a
//! connectivity or timeout problem rather than an answer from the service.

use serde::Serialize;

use crate::error::{FailureKind, RequestError};

/// Message shown for connectivity and timeout failures
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";

/// A request failure as seen by a view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedError {
    pub message: String,
    pub status: Option<u16>,
    pub code: Option<String>,
    pub is_network_error: bool,
}

impl ClassifiedError {
    /// Message to display: a fixed notice for network errors, the normalized message otherwise
    pub fn user_message(&self) -> &str {
        if self.is_network_error {
            NETWORK_ERROR_MESSAGE
        } else {
            &self.message
        }
    }

    /// Like [`user_message`](Self::user_message), with `fallback` for an empty message
    pub fn user_message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.user_message() {
            "" => fallback,
            message => message,
        }
    }
}

/// Classify a request failure.
///
/// A failure is a network error when it carries no HTTP status and either the
/// transport reported a timeout or connection failure, or the message says so.
pub fn classify(err: &RequestError) -> ClassifiedError {
    let looks_like_network = matches!(err.kind, FailureKind::Timeout | FailureKind::Connect)
        || err.message.contains("Network Error")
        || err.message.contains("timeout");

    ClassifiedError {
        message: error_message(err),
        status: err.status,
        code: err.code.clone(),
        is_network_error: err.status.is_none() && looks_like_network,
    }
}

/// Best available message: the error message, then `data.message`, then `data.error`
fn error_message(err: &RequestError) -> String {
    if !err.message.is_empty() {
        return err.message.clone();
    }
    ["message", "error"]
        .iter()
        .filter_map(|field| err.data.as_ref()?.get(*field)?.as_str())
        .find(|message| !message.is_empty())
        .unwrap_or_default()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify() {
        // Timeouts and connection failures
        let timeout = classify(&RequestError::transport(
            FailureKind::Timeout,
            "timeout of 20000ms exceeded",
        ));
        assert!(timeout.is_network_error);
        assert_eq!(timeout.status, None);
        assert_eq!(timeout.user_message(), NETWORK_ERROR_MESSAGE);

        let connect = classify(&RequestError::transport(FailureKind::Connect, "dns error"));
        assert!(connect.is_network_error);

        // Message-based detection for other transports
        let other = classify(&RequestError::transport(FailureKind::Other, "Network Error"));
        assert!(other.is_network_error);

        // Transport failures that are not connectivity problems
        let decode = classify(&RequestError::transport(FailureKind::Decode, "expected value"));
        assert!(!decode.is_network_error);
        assert_eq!(decode.user_message(), "expected value");

        // HTTP failures are never network errors, even with a timeout-like message
        let gateway = classify(&RequestError::http(
            504,
            Some(json!({"message": "upstream timeout", "code": "GW"})),
            "Request failed with status code 504",
        ));
        assert!(!gateway.is_network_error);
        assert_eq!(gateway.status, Some(504));
        assert_eq!(gateway.code.as_deref(), Some("GW"));
        assert_eq!(gateway.user_message(), "upstream timeout");
    }

    #[test]
    fn test_message_fallbacks() {
        let mut err = RequestError::http(500, Some(json!({"error": "boom"})), "");
        err.message.clear();
        assert_eq!(classify(&err).message, "boom");

        let mut err = RequestError::http(500, None, "");
        err.message.clear();
        let classified = classify(&err);
        assert_eq!(classified.message, "");
        assert_eq!(
            classified.user_message_or("Failed to load dashboard"),
            "Failed to load dashboard"
        );
    }
}
