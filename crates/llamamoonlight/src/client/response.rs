use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::Result;

/// A fully read response
#[derive(Debug, Clone)]
pub struct Response {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    /// Lower-cased header names; repeated headers keep every value in arrival order
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Vec<u8>,
    /// Time spent on the successful attempt
    pub elapsed: Duration,
    pub attempts: u32,
    /// Proxy the response came through, with credentials masked
    pub proxy: Option<String>,
    pub fetched_at: DateTime<Local>,
}

impl Response {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// First value of a header, looked up case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_all(name).first().map(String::as_str)
    }

    /// Every value of a header, e.g. one entry per `Set-Cookie` line
    pub fn header_all(&self, name: &str) -> &[String] {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Append a header value, keeping earlier values of the same name
    pub fn append_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Media type without parameters, e.g. `text/html`
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
    }
}

#[cfg(test)]
pub(crate) fn sample(content_type: &str, body: &str) -> Response {
    let mut response = Response {
        url: "https://example.com/".to_string(),
        status: 200,
        headers: BTreeMap::new(),
        body: body.as_bytes().to_vec(),
        elapsed: Duration::from_millis(12),
        attempts: 1,
        proxy: None,
        fetched_at: Local::now(),
    };
    response.append_header("Content-Type", content_type);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Item {
        id: u32,
    }

    #[test]
    fn test_response_accessors() {
        let response = sample("application/json; charset=utf-8", r#"{"id": 7}"#);

        assert!(response.is_success());
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.header("Content-Type"), Some("application/json; charset=utf-8"));
        assert_eq!(response.json::<Item>().unwrap().id, 7);
        assert_eq!(response.text(), r#"{"id": 7}"#);
    }

    #[test]
    fn test_repeated_headers_keep_each_value() {
        let mut response = sample("text/html", "");
        response.append_header("Set-Cookie", "a=1; Expires=Wed, 21 Oct 2026 07:28:00 GMT");
        response.append_header("set-cookie", "b=2; Path=/");

        assert_eq!(
            response.header_all("SET-COOKIE"),
            [
                "a=1; Expires=Wed, 21 Oct 2026 07:28:00 GMT".to_string(),
                "b=2; Path=/".to_string()
            ]
        );
        assert_eq!(
            response.header("set-cookie"),
            Some("a=1; Expires=Wed, 21 Oct 2026 07:28:00 GMT")
        );
        assert!(response.header_all("x-missing").is_empty());
        assert_eq!(response.header("x-missing"), None);
    }

    #[test]
    fn test_invalid_json() {
        let mut response = sample("text/html", "<html></html>");
        response.status = 302;
        assert!(!response.is_success());
        assert!(response.json::<Item>().is_err());
    }
}
