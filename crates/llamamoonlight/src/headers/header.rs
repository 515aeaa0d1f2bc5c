//! A generated set of request headers

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::fmt;

use super::user_agent::UserAgent;
use crate::error::{Error, Result};

/// A complete, ordered set of HTTP headers and the User-Agent they were built around
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub user_agent: UserAgent,
    pub headers: BTreeMap<String, String>,
}

impl Header {
    /// Header set generated for `user_agent`
    pub fn new(user_agent: UserAgent, headers: BTreeMap<String, String>) -> Self {
        Self { user_agent, headers }
    }

    /// Case-insensitive lookup
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any existing one with the same name in any case
    pub fn insert(&mut self, key: &str, value: &str) {
        self.remove(key);
        self.headers.insert(key.to_string(), value.to_string());
    }

    /// Remove a header by name, case-insensitively, returning its value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let existing = self
            .headers
            .keys()
            .find(|k| k.eq_ignore_ascii_case(key))
            .cloned()?;
        self.headers.remove(&existing)
    }

    /// Builder form of [`insert`](Self::insert)
    ///
    /// # Arguments
    /// * `key` - Header name; an existing header differing only in case is replaced
    /// * `value` - Header value
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder form of [`remove`](Self::remove)
    pub fn without_header(mut self, key: &str) -> Self {
        self.remove(key);
        self
    }

    /// Name and value pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Whether the set has no headers
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Convert into a reqwest header map
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (key, value) in &self.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| Error::Config(format!("invalid header name '{}': {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("invalid value for header '{}': {}", key, e)))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.headers {
            writeln!(f, "{}: {}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        let ua = UserAgent::chrome(true).unwrap();
        let mut headers = BTreeMap::new();
        headers.insert("Host".to_string(), "example.com".to_string());
        headers.insert("User-Agent".to_string(), ua.to_string());
        Header::new(ua, headers)
    }

    #[test]
    fn test_header_lookup() {
        let header = sample();
        assert_eq!(header.get("Host"), Some("example.com"));
        assert_eq!(header.get("host"), Some("example.com"));
        assert_eq!(header.get("User-Agent"), Some(header.user_agent.string.as_str()));
        assert_eq!(header.get("Cookie"), None);
    }

    #[test]
    fn test_header_modification() {
        let header = sample()
            .with_header("Custom-Header", "Value")
            .with_header("HOST", "other.example.com")
            .without_header("user-agent");

        assert_eq!(header.get("Custom-Header"), Some("Value"));
        assert_eq!(header.get("Host"), Some("other.example.com"));
        assert_eq!(header.get("User-Agent"), None);
        assert_eq!(header.len(), 2);
    }

    #[test]
    fn test_display_is_ordered() {
        let header = sample().with_header("Accept", "*/*");
        let text = header.to_string();
        let keys: Vec<&str> = text.lines().map(|l| l.split(':').next().unwrap()).collect();
        assert_eq!(keys, vec!["Accept", "Host", "User-Agent"]);
    }

    #[test]
    fn test_to_header_map() {
        let map = sample().to_header_map().unwrap();
        assert_eq!(map.get("host").unwrap(), "example.com");

        let bad = sample().with_header("Bad Header", "x");
        assert!(matches!(bad.to_header_map(), Err(Error::Config(_))));
    }
}
