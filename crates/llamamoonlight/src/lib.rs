//! llamamoonlight: HTTP data access that looks like a browser
//!
//! This library provides:
//! - Realistic browser header generation (User-Agent, Accept-Language,
//!   Referer, Sec-CH-UA and Sec-Fetch-* headers)
//! - Proxy pools with health tracking and rotation strategies
//! - Human-like request pacing, per-domain throttling and retry backoff
//! - A [`Client`] tying these together over reqwest
//!
//! # Example
//!
//! ```no_run
//! use llamamoonlight::{Client, Config, DelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> llamamoonlight::Result<()> {
//!     let config = Config::default()
//!         .with_language("en-GB")
//!         .with_delay(DelayConfig::uniform(200, 800))
//!         .with_max_retries(2);
//!
//!     let client = Client::new(config)?;
//!     let response = client.get("https://example.com/").await?;
//!     println!("{} ({} bytes)", response.status, response.body.len());
//!     Ok(())
//! }
//! ```

pub mod error;

pub mod config;

pub mod headers;
pub mod proxy;

pub mod client;
pub mod logging;

pub use error::{Error, Result};

pub use client::{Client, Request, Response, ResponseSaver};
pub use config::{
    ActionType, Config, DelayConfig, Distribution, HeaderConfig, HttpConfig, ProxySettings,
    RetryConfig, TimingConfig,
};
pub use headers::{get_header, get_headers, BrowserKind, Header, UserAgent};
pub use logging::init_logging;
pub use proxy::{
    ProxyCheck, ProxyConfig, ProxyManager, ProxyProtocol, RotationStrategy, DEFAULT_CHECK_URL,
};

/// Package version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of this library
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_exports() {
        let config = Config::new();
        let client = Client::new(config.clone()).unwrap();
        assert_eq!(client.config(), &config);
    }

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.0");
        assert_eq!(version(), "0.1.0");
    }
}
