//! Configuration for the llamamoonlight client
//!
//! This module contains:
//! - `language`: locale tables for Accept-Language and Referer generation
//! - `timing`: request pacing and retry backoff
//!
//! A [`Config`] can be built in code, loaded from a TOML file, or seeded
//! from `LLAMAMOONLIGHT_*` environment variables.

mod language;
mod timing;

pub use language::{
    accept_language, language_from_domain, random_referer, DEFAULT_LANGUAGE, REFERERS,
    TLD_LANGUAGES,
};
pub use timing::{ActionType, DelayConfig, Distribution, RetryConfig, TimingConfig};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::headers::BrowserKind;
use crate::proxy::{ProxyConfig, RotationStrategy};
use timing::env_parse;

/// Longest accepted per-domain interval, one day
pub const MAX_DOMAIN_INTERVAL_MS: u64 = 24 * 60 * 60 * 1000;

/// Header generation settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Preferred locale; derived from the target's TLD when unset
    pub language: Option<String>,
    /// Fixed User-Agent; a random one is picked per request when unset
    pub user_agent: Option<String>,
    /// Browser family to draw random User-Agents from; ignored when `user_agent` is set
    pub browser: Option<BrowserKind>,
    pub mobile: bool,
    /// Fixed Referer; a search engine for the locale is picked when unset
    pub referer: Option<String>,
    pub accept: Option<String>,
    pub accept_encoding: Option<String>,
    pub connection: Option<String>,
    /// Applied last, overriding generated headers of the same name
    pub custom_headers: Vec<(String, String)>,
}

/// Transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub follow_redirects: bool,
    pub max_redirects: usize,
    pub cookie_store: bool,
    /// Relative request URLs are resolved against this
    pub base_url: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            follow_redirects: true,
            max_redirects: 10,
            cookie_store: true,
            base_url: None,
        }
    }
}

impl HttpConfig {
    /// Whole-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Timeout for establishing the connection
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Proxy pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub urls: Vec<String>,
    pub strategy: RotationStrategy,
    pub max_failures: u32,
    pub min_success_rate: f64,
    pub rotate_on_failure: bool,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            strategy: RotationStrategy::RoundRobin,
            max_failures: 5,
            min_success_rate: 0.7,
            rotate_on_failure: true,
        }
    }
}

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub headers: HeaderConfig,
    pub http: HttpConfig,
    pub timing: TimingConfig,
    pub proxy: ProxySettings,
}

impl Config {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Config(format!(
                "Configuration file '{}' not found",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration as TOML, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = self.to_toml()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Render as pretty-printed TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Defaults overridden by `LLAMAMOONLIGHT_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay environment overrides on top of this configuration
    pub fn apply_env(&mut self) {
        if let Some(v) = env_parse::<String>("LLAMAMOONLIGHT_LANGUAGE").filter(|v| !v.is_empty()) {
            self.headers.language = Some(v);
        }
        if let Some(v) = env_parse::<String>("LLAMAMOONLIGHT_USER_AGENT").filter(|v| !v.is_empty()) {
            self.headers.user_agent = Some(v);
        }
        if let Some(v) = env_parse::<String>("LLAMAMOONLIGHT_BROWSER")
            .as_deref()
            .and_then(BrowserKind::from_str)
        {
            self.headers.browser = Some(v);
        }
        if let Some(v) = env_parse("LLAMAMOONLIGHT_MOBILE") {
            self.headers.mobile = v;
        }
        if let Some(v) = env_parse("LLAMAMOONLIGHT_TIMEOUT") {
            self.http.timeout_secs = v;
        }
        if let Some(v) = env_parse::<String>("LLAMAMOONLIGHT_BASE_URL").filter(|v| !v.is_empty()) {
            self.http.base_url = Some(v);
        }
        if let Some(v) = env_parse::<String>("LLAMAMOONLIGHT_PROXIES") {
            self.proxy.urls = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        self.timing.apply_env();
    }

    /// Platform configuration file location, e.g. `~/.config/llamamoonlight/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("llamamoonlight").join("config.toml"))
    }

    /// Check the configuration for values the client cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            return Err(Error::Config("timeout must be greater than zero".to_string()));
        }
        let delay = &self.timing.delay;
        if delay.min_delay_ms > delay.max_delay_ms {
            return Err(Error::Config(format!(
                "min_delay_ms ({}) exceeds max_delay_ms ({})",
                delay.min_delay_ms, delay.max_delay_ms
            )));
        }
        if self.timing.per_domain_interval_ms > MAX_DOMAIN_INTERVAL_MS {
            return Err(Error::Config(format!(
                "per_domain_interval_ms must be at most {}, got {}",
                MAX_DOMAIN_INTERVAL_MS, self.timing.per_domain_interval_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.proxy.min_success_rate) {
            return Err(Error::Config(format!(
                "min_success_rate must be within [0, 1], got {}",
                self.proxy.min_success_rate
            )));
        }
        for url in &self.proxy.urls {
            ProxyConfig::from_url(url)?;
        }
        if let Some(base) = &self.http.base_url {
            url::Url::parse(base)
                .map_err(|e| Error::Config(format!("invalid base_url '{}': {}", base, e)))?;
        }
        Ok(())
    }

    /// Locale for Accept-Language and referers, e.g. `de-DE`
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.headers.language = Some(language.into());
        self
    }

    /// Send the same User-Agent on every request
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.headers.user_agent = Some(user_agent.into());
        self
    }

    /// Draw random User-Agents from one browser family
    pub fn with_browser(mut self, browser: BrowserKind) -> Self {
        self.headers.browser = Some(browser);
        self
    }

    /// Impersonate phone and tablet browsers
    pub fn with_mobile(mut self, mobile: bool) -> Self {
        self.headers.mobile = mobile;
        self
    }

    /// Fixed Referer header
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.headers.referer = Some(referer.into());
        self
    }

    /// Extra header applied after the generated ones
    ///
    /// # Arguments
    /// * `key` - Header name; replaces a generated header of the same name
    /// * `value` - Header value
    pub fn with_custom_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.custom_headers.push((key.into(), value.into()));
        self
    }

    /// Whole-request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.http.timeout_secs = timeout_secs;
        self
    }

    /// Base URL relative request URLs are joined onto
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.base_url = Some(base_url.into());
        self
    }

    /// Add a proxy URL to the pool, e.g. `socks5h://127.0.0.1:9050`
    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy.urls.push(proxy_url.into());
        self
    }

    /// How the pool moves between proxies
    pub fn with_rotation(mut self, strategy: RotationStrategy) -> Self {
        self.proxy.strategy = strategy;
        self
    }

    /// Retries after the first attempt, keeping the other retry settings
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.timing.retry.max_retries = max_retries;
        self
    }

    /// Replace the whole retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.timing.retry = retry;
        self
    }

    /// Random pause before every attempt
    pub fn with_delay(mut self, delay: DelayConfig) -> Self {
        self.timing.delay = delay;
        self
    }

    /// Minimum spacing between requests to the same domain, in milliseconds
    pub fn with_domain_interval(mut self, interval_ms: u64) -> Self {
        self.timing.per_domain_interval_ms = interval_ms;
        self
    }
}
