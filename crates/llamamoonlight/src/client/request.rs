use reqwest::Method;
use serde::Serialize;

/// An outgoing request before header generation
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Absolute URL, or a path resolved against the configured base URL
    pub url: String,
    /// Merged over the generated browser headers
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub query: Vec<(String, String)>,
}

impl Request {
    /// Request with no extra headers, query or body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            query: Vec::new(),
        }
    }

    /// GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set a header, replacing a previous one of the same name in any case
    ///
    /// Applied after the generated browser headers, so it overrides them.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&key));
        self.headers.push((key, value.into()));
        self
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Raw request body
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the body and set `Content-Type: application/json`
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> crate::Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(self
            .header("Content-Type", "application/json")
            .body(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = Request::get("/search")
            .header("X-Trace", "1")
            .header("x-trace", "2")
            .query("q", "rust");

        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url, "/search");
        assert_eq!(request.headers, vec![("x-trace".to_string(), "2".to_string())]);
        assert_eq!(request.query, vec![("q".to_string(), "rust".to_string())]);
        assert!(request.body.is_none());
    }

    #[test]
    fn test_json_body() {
        let request = Request::post("https://api.example.com/items")
            .json(&json!({"name": "moon"}))
            .unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body.as_deref(), Some(br#"{"name":"moon"}"#.as_slice()));
        assert!(request
            .headers
            .iter()
            .any(|(k, v)| k == "Content-Type" && v == "application/json"));
    }
}
