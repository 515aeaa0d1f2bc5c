//! Browser-like header generation for a target URL

use rand::seq::SliceRandom;
use rand::thread_rng;
use std::collections::BTreeMap;
use url::Url;

use super::header::Header;
use super::user_agent::UserAgent;
use crate::config::{accept_language, language_from_domain, random_referer, HeaderConfig};
use crate::error::{Error, Result};

pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
pub const DEFAULT_ACCEPT_ENCODING: &str = "gzip, deflate, br";
pub const DEFAULT_CONNECTION: &str = "keep-alive";

/// Extract `host[:port]` from an http(s) URL
pub fn get_domain(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|_| Error::InvalidUrl(url.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(url.to_string()));
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| Error::InvalidUrl(url.to_string()))?;
    Ok(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// `Sec-CH-UA` value for Chromium-based browsers
pub fn sec_ch_ua(ua: &UserAgent) -> Option<String> {
    let brand = match ua.browser.as_str() {
        "Chrome" => "Google Chrome",
        "Edge" => "Microsoft Edge",
        "Opera" => "Opera",
        _ => return None,
    };
    let major = ua.major_version();
    Some(format!(
        "\"Not A(Brand\";v=\"99\", \"{}\";v=\"{}\", \"Chromium\";v=\"{}\"",
        brand, major, major
    ))
}

/// Classify the referer relative to the target domain
pub fn sec_fetch_site(referer: &str, domain: &str) -> &'static str {
    if !domain.is_empty() && referer.contains(domain) {
        "same-origin"
    } else if referer.starts_with("https://") || referer.starts_with("http://") {
        "cross-site"
    } else {
        "none"
    }
}

/// A common desktop viewport such as `1920x1080`
pub fn random_viewport() -> String {
    const VIEWPORTS: &[(u32, u32)] = &[
        (1366, 768),
        (1440, 900),
        (1536, 864),
        (1680, 1050),
        (1920, 1080),
        (2560, 1440),
    ];
    let (width, height) = VIEWPORTS
        .choose(&mut thread_rng())
        .copied()
        .unwrap_or((1920, 1080));
    format!("{}x{}", width, height)
}

/// Generate one header set for `url`
pub fn get_header(url: &str, config: &HeaderConfig) -> Result<Header> {
    let domain = get_domain(url)?;
    let language = config
        .language
        .clone()
        .unwrap_or_else(|| language_from_domain(&domain));

    let user_agent = match (&config.user_agent, config.browser) {
        (Some(ua), _) => UserAgent::parse(ua)?,
        (None, Some(kind)) => UserAgent::for_browser(kind, config.mobile)?,
        (None, None) => UserAgent::random(config.mobile)?,
    };

    let referer = match &config.referer {
        Some(referer) => referer.clone(),
        None => random_referer(&language)?,
    };

    let mut headers = BTreeMap::new();
    let mut set = |key: &str, value: String| {
        headers.insert(key.to_string(), value);
    };

    set("Host", domain.clone());
    set(
        "Connection",
        config.connection.clone().unwrap_or_else(|| DEFAULT_CONNECTION.to_string()),
    );
    set("Upgrade-Insecure-Requests", "1".to_string());
    set("User-Agent", user_agent.to_string());
    set(
        "Accept",
        config.accept.clone().unwrap_or_else(|| DEFAULT_ACCEPT.to_string()),
    );
    set(
        "Accept-Encoding",
        config
            .accept_encoding
            .clone()
            .unwrap_or_else(|| DEFAULT_ACCEPT_ENCODING.to_string()),
    );
    set("Accept-Language", accept_language(&language));
    set("Sec-Fetch-Site", sec_fetch_site(&referer, &domain).to_string());
    set("Sec-Fetch-Mode", "navigate".to_string());
    set("Sec-Fetch-User", "?1".to_string());
    set("Sec-Fetch-Dest", "document".to_string());
    set("Referer", referer);

    if let Some(value) = sec_ch_ua(&user_agent) {
        set("Sec-Ch-Ua", value);
        set(
            "Sec-Ch-Ua-Mobile",
            if user_agent.is_mobile() { "?1" } else { "?0" }.to_string(),
        );
        set(
            "Sec-Ch-Ua-Platform",
            format!("\"{}\"", user_agent.sec_ch_ua_platform()),
        );
    }

    let mut header = Header::new(user_agent, headers);
    for (key, value) in &config.custom_headers {
        header.insert(key, value);
    }
    Ok(header)
}

/// Generate `num` independent header sets for `url`
pub fn get_headers(url: &str, num: usize, config: &HeaderConfig) -> Result<Vec<Header>> {
    (0..num).map(|_| get_header(url, config)).collect()
}
