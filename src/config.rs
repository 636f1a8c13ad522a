//! Cache and request client configuration

use std::collections::HashMap;
use std::time::Duration;

/// Default time-to-live shared by every namespace (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Configuration for the view cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live applied when a namespace has no override
    pub default_ttl: Duration,
    /// Per-namespace time-to-live overrides, keyed by namespace tag
    pub namespace_ttls: HashMap<String, Duration>,
    /// Maximum number of entries held by the in-memory storage area
    pub storage_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            namespace_ttls: HashMap::new(),
            storage_capacity: 10_000,
        }
    }
}

impl CacheConfig {
    /// Sets the fallback TTL
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Overrides the TTL of a single namespace
    pub fn with_namespace_ttl(mut self, namespace: impl Into<String>, ttl: Duration) -> Self {
        self.namespace_ttls.insert(namespace.into(), ttl);
        self
    }

    /// Sets the in-memory storage capacity
    pub fn with_storage_capacity(mut self, capacity: u64) -> Self {
        self.storage_capacity = capacity;
        self
    }

    /// TTL in effect for `namespace`
    pub fn ttl_for(&self, namespace: &str) -> Duration {
        self.namespace_ttls
            .get(namespace)
            .copied()
            .unwrap_or(self.default_ttl)
    }
}

/// Configuration for [`ApiClient`](crate::ApiClient)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is appended to
    pub base_url: String,
    /// API key sent on every request, if any
    pub api_key: Option<String>,
    /// Header carrying the API key
    pub api_key_header: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://demoapi.callmetrik.com".to_owned(),
            api_key: None,
            api_key_header: "x-api-key".to_owned(),
            timeout: Duration::from_secs(20),
        }
    }
}

impl ClientConfig {
    /// Build a configuration from `API_BASE_URL`, `API_KEY`, `API_KEY_HEADER`
    /// and `API_TIMEOUT_MS`, falling back to defaults for unset or invalid values.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            base_url: non_empty("API_BASE_URL").unwrap_or(defaults.base_url),
            api_key: non_empty("API_KEY"),
            api_key_header: non_empty("API_KEY_HEADER").unwrap_or(defaults.api_key_header),
            timeout: non_empty("API_TIMEOUT_MS")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Sets the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_for_namespace() {
        let config = CacheConfig::default().with_namespace_ttl("reports", Duration::from_secs(60));

        assert_eq!(config.ttl_for("reports"), Duration::from_secs(60));
        assert_eq!(config.ttl_for("dashboard"), DEFAULT_TTL);
        assert_eq!(config.ttl_for(""), DEFAULT_TTL);
    }

    #[test]
    fn test_client_config_from_lookup() {
        let config = ClientConfig::from_lookup(|name| match name {
            "API_BASE_URL" => Some("http://localhost:9000".to_owned()),
            "API_KEY" => Some("secret".to_owned()),
            "API_KEY_HEADER" => Some("   ".to_owned()),
            "API_TIMEOUT_MS" => Some("1500".to_owned()),
            _ => None,
        });

        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        // Blank values fall back to defaults
        assert_eq!(config.api_key_header, "x-api-key");
        assert_eq!(config.timeout, Duration::from_millis(1500));

        let config = ClientConfig::from_lookup(|name| match name {
            "API_TIMEOUT_MS" => Some("soon".to_owned()),
            _ => None,
        });
        assert_eq!(config.base_url, "https://demoapi.callmetrik.com");
        assert_eq!(config.api_key, None);
        assert_eq!(config.timeout, Duration::from_secs(20));
    }
}
