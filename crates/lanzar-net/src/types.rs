use std::{collections::HashMap, time::Duration};

#[derive(Clone, Debug, PartialEq)]
pub struct Headers {
    inner: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    /// Headers carrying a single `Authorization: Bearer <token>` entry.
    pub fn bearer(token: &str) -> Self {
        let mut headers = Self::new();
        headers.insert("Authorization", format!("Bearer {token}"));
        headers
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for Headers {
    fn default() -> Self {
        Self::new()
    }
}

impl From<HashMap<String, String>> for Headers {
    fn from(map: HashMap<String, String>) -> Self {
        Self { inner: map }
    }
}

#[derive(Clone, Debug)]
pub struct NetOptions {
    /// Applied to metadata fetches (`get_bytes`, `post_bytes`). Streaming
    /// requests are never bounded by it.
    pub request_timeout: Duration,
    /// Max idle connections per host. Set to 0 to disable pooling and reduce memory.
    pub pool_max_idle_per_host: usize,
}

impl Default for NetOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 0,
        }
    }
}

impl NetOptions {
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_headers_format() {
        let headers = Headers::bearer("tok-123");
        assert_eq!(headers.get("Authorization"), Some("Bearer tok-123"));
    }

    #[test]
    fn headers_from_map() {
        let mut map = HashMap::new();
        map.insert("X-One".to_string(), "1".to_string());
        let headers = Headers::from(map);
        assert_eq!(headers.get("X-One"), Some("1"));
        assert!(!headers.is_empty());
    }

    #[test]
    fn default_options_bound_metadata_requests() {
        let options = NetOptions::default();
        assert_eq!(options.request_timeout, Duration::from_secs(30));
        assert_eq!(options.pool_max_idle_per_host, 0);
    }
}
