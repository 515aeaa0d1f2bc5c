//! HTTP client with generated browser headers, proxy rotation and retries
//!
//! This module contains:
//! - `request` / `response`: the values passed in and out of [`Client`]
//! - `throttle`: per-domain request spacing
//! - `saver`: writing fetched pages to disk

mod request;
mod response;
mod saver;
mod throttle;

pub use request::Request;
pub use response::Response;
pub use saver::{extension_for, ResponseSaver};
pub use throttle::DomainThrottle;

use chrono::Local;
use reqwest::redirect::Policy;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::headers::{get_domain, get_header, Header};
use crate::proxy::{ProxyCheck, ProxyConfig, ProxyManager};

/// Data-access client
///
/// Cheap to clone; clones share the proxy pool, visit counts and throttle.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: Config,
    base_url: Option<Url>,
    direct: reqwest::Client,
    /// One transport per proxy URL, built on first use
    transports: Mutex<HashMap<String, reqwest::Client>>,
    /// Set when proxies were configured; requests never fall back to a direct connection
    proxy_only: bool,
    proxies: Mutex<ProxyManager>,
    visits: Mutex<HashMap<String, u32>>,
    throttle: DomainThrottle,
}

impl Client {
    /// Create a client from a validated configuration
    ///
    /// # Arguments
    /// * `config` - Header, HTTP, proxy and timing settings
    ///
    /// # Errors
    /// [`Error::Config`] for out-of-range settings or a bad `base_url`,
    /// [`Error::Proxy`] for an unparseable proxy URL.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let proxies = ProxyManager::from_settings(&config.proxy)?;
        let base_url = config
            .http
            .base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| Error::Config(format!("invalid base_url: {}", e)))?;
        let direct = build_transport(&config, None)?;
        let throttle = DomainThrottle::new(Duration::from_millis(
            config.timing.per_domain_interval_ms,
        ));

        info!(
            "Client ready: {} proxies ({:?}), {} retries, timeout {}s",
            proxies.len(),
            proxies.strategy(),
            config.timing.retry.max_retries,
            config.http.timeout_secs
        );

        let proxy_only = !proxies.is_empty();
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                base_url,
                direct,
                transports: Mutex::new(HashMap::new()),
                proxy_only,
                proxies: Mutex::new(proxies),
                visits: Mutex::new(HashMap::new()),
                throttle,
            }),
        })
    }

    /// Client configured from `LLAMAMOONLIGHT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env())
    }

    /// Client with default settings: no proxies, three retries, no pacing
    pub fn default_client() -> Result<Self> {
        Self::new(Config::default())
    }

    /// Configuration the client was built with
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// GET `url` with generated browser headers
    ///
    /// # Arguments
    /// * `url` - Absolute URL, or a reference resolved against `base_url`
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.execute(Request::get(url)).await
    }

    /// POST `body` serialized as JSON
    ///
    /// # Arguments
    /// * `url` - Absolute URL, or a reference resolved against `base_url`
    /// * `body` - Value sent with `Content-Type: application/json`
    pub async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Response> {
        self.execute(Request::post(url).json(body)?).await
    }

    /// Send a request, retrying transient failures
    ///
    /// Statuses of 400 and above become [`Error::Status`]; retryable ones are
    /// sent again until `max_retries` is used up, after which the call fails
    /// with [`Error::RetriesExhausted`].
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let url = self.resolve_url(&request.url)?;
        let span = info_span!(
            "request",
            id = %Uuid::new_v4(),
            method = %request.method,
            url = %url
        );
        self.execute_with_retries(&request, url).instrument(span).await
    }

    async fn execute_with_retries(&self, request: &Request, url: Url) -> Result<Response> {
        let domain = get_domain(url.as_str())?;
        let timing = &self.inner.config.timing;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            self.inner.throttle.wait(&domain).await;
            let delay = timing.delay.random_delay();
            if !delay.is_zero() {
                debug!("Pausing {:?} before attempt {}", delay, attempt);
                tokio::time::sleep(delay).await;
            }

            let proxy = self.active_proxy().await;
            if proxy.is_none() && self.inner.proxy_only {
                warn!("No healthy proxies left for {}", url);
                return Err(Error::Proxy("no healthy proxies left".to_string()));
            }
            let started = Instant::now();
            let outcome = self.send_once(request, &url, proxy.as_ref()).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let (error, retry_after) = match outcome {
                Ok(response) if response.status < 400 => {
                    if let Some(proxy) = &proxy {
                        self.inner
                            .proxies
                            .lock()
                            .await
                            .record_success_for(&proxy.to_url(), Some(elapsed_ms));
                    }
                    *self.inner.visits.lock().await.entry(domain).or_insert(0) += 1;
                    info!(
                        "{} {} in {:?} (attempt {})",
                        response.status, response.url, response.elapsed, attempt
                    );
                    return Ok(Response {
                        attempts: attempt,
                        ..response
                    });
                }
                Ok(response) => (
                    Error::Status {
                        status: response.status,
                        url: response.url.clone(),
                    },
                    retry_after(&response),
                ),
                Err(e) => (e, None),
            };

            let retryable = error.is_retryable();
            if let Some(proxy) = &proxy {
                let mut proxies = self.inner.proxies.lock().await;
                if retryable {
                    proxies.record_failure_for(&proxy.to_url());
                    if self.inner.config.proxy.rotate_on_failure {
                        proxies.rotate();
                    }
                } else if matches!(error, Error::Status { .. }) {
                    // the proxy delivered a definitive answer
                    proxies.record_success_for(&proxy.to_url(), Some(elapsed_ms));
                }
            }

            if !retryable {
                debug!("Not retrying {}: {}", url, error);
                return Err(error);
            }

            if attempt > timing.retry.max_retries {
                warn!("Giving up on {} after {} attempt(s): {}", url, attempt, error);
                return Err(Error::RetriesExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            }

            let mut wait = timing.retry.backoff(attempt - 1);
            if let Some(after) = retry_after {
                let cap = Duration::from_millis(timing.retry.max_backoff_ms);
                wait = wait.max(after.min(cap));
            }
            warn!(
                "Attempt {} for {} failed: {}; retrying in {:?}",
                attempt, url, error, wait
            );
            tokio::time::sleep(wait).await;
        }
    }

    async fn send_once(
        &self,
        request: &Request,
        url: &Url,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Response> {
        let transport = self.transport_for(proxy).await?;

        let mut header = get_header(url.as_str(), &self.inner.config.headers)?;
        // the transport derives Host from the URL, which stays correct across redirects
        header.remove("Host");
        for (key, value) in &request.headers {
            header.insert(key, value);
        }

        let mut builder = transport
            .request(request.method.clone(), url.clone())
            .headers(header.to_header_map()?);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let started = Instant::now();
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in response.headers() {
            let Ok(value) = value.to_str() else { continue };
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(value.to_string());
        }
        let body = response.bytes().await?.to_vec();

        Ok(Response {
            url: final_url,
            status,
            headers,
            body,
            elapsed: started.elapsed(),
            attempts: 0,
            proxy: proxy.map(ToString::to_string),
            fetched_at: Local::now(),
        })
    }

    async fn transport_for(&self, proxy: Option<&ProxyConfig>) -> Result<reqwest::Client> {
        let Some(proxy) = proxy else {
            return Ok(self.inner.direct.clone());
        };

        let key = proxy.to_url();
        let mut cache = self.inner.transports.lock().await;
        if let Some(transport) = cache.get(&key) {
            return Ok(transport.clone());
        }
        debug!("Building transport for proxy {}", proxy);
        let transport = build_transport(&self.inner.config, Some(proxy))?;
        cache.insert(key, transport.clone());
        Ok(transport)
    }

    /// Parse `raw`, joining relative references onto the configured base URL
    fn resolve_url(&self, raw: &str) -> Result<Url> {
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.inner.base_url {
                Some(base) => base
                    .join(raw)
                    .map_err(|_| Error::InvalidUrl(raw.to_string()))?,
                None => return Err(Error::InvalidUrl(raw.to_string())),
            },
            Err(_) => return Err(Error::InvalidUrl(raw.to_string())),
        };

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(raw.to_string()));
        }
        Ok(url)
    }

    /// Browser headers as they would be sent to `url`
    pub fn generate_headers(&self, url: &str) -> Result<Header> {
        let url = self.resolve_url(url)?;
        get_header(url.as_str(), &self.inner.config.headers)
    }

    /// Number of successful requests made to the domain of `url`
    pub async fn visit_count(&self, url: &str) -> u32 {
        let Some(domain) = self
            .resolve_url(url)
            .ok()
            .and_then(|u| get_domain(u.as_str()).ok())
        else {
            return 0;
        };
        self.inner
            .visits
            .lock()
            .await
            .get(&domain)
            .copied()
            .unwrap_or(0)
    }

    /// Proxy the next request goes through, if any are left
    pub async fn active_proxy(&self) -> Option<ProxyConfig> {
        self.inner.proxies.lock().await.active_proxy().cloned()
    }

    /// Snapshot of the proxy pool with its statistics
    pub async fn proxies(&self) -> Vec<ProxyConfig> {
        self.inner.proxies.lock().await.proxies().to_vec()
    }

    /// Force a rotation, returning the newly active proxy
    pub async fn rotate_proxy(&self) -> Option<ProxyConfig> {
        self.inner.proxies.lock().await.rotate().cloned()
    }

    /// Check every configured proxy against `test_url` using the request timeout
    ///
    /// Outcomes are recorded in the pool, so proxies that fail here are
    /// dropped on the next rotation once they cross the failure limits.
    ///
    /// # Arguments
    /// * `test_url` - URL fetched through each proxy, e.g. [`DEFAULT_CHECK_URL`](crate::proxy::DEFAULT_CHECK_URL)
    pub async fn validate_proxies(&self, test_url: &str) -> Vec<ProxyCheck> {
        let timeout = self.inner.config.http.timeout();
        self.inner
            .proxies
            .lock()
            .await
            .validate_all(test_url, timeout)
            .await
    }
}

fn build_transport(config: &Config, proxy: Option<&ProxyConfig>) -> Result<reqwest::Client> {
    let http = &config.http;
    let redirect = if http.follow_redirects {
        Policy::limited(http.max_redirects)
    } else {
        Policy::none()
    };

    let builder = reqwest::Client::builder()
        .timeout(http.timeout())
        .connect_timeout(http.connect_timeout())
        .redirect(redirect)
        .cookie_store(http.cookie_store);

    // only configured proxies are used, never the environment's
    let builder = match proxy {
        Some(proxy) => builder.proxy(proxy.to_reqwest()?),
        None => builder.no_proxy(),
    };

    Ok(builder.build()?)
}

/// `Retry-After` in seconds, honored on 429 and 503
fn retry_after(response: &Response) -> Option<Duration> {
    if !matches!(response.status, 429 | 503) {
        return None;
    }
    response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
