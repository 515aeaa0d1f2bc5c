//! User-Agent parsing and selection

use lazy_static::lazy_static;
use rand::seq::SliceRandom;
use rand::thread_rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

const DESKTOP_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.4; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.51",
];

const MOBILE_AGENTS: &[&str] = &[
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.6367.82 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 14; SM-S921B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.6312.118 Mobile Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/124.0.6367.88 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPad; CPU OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Android 14; Mobile; rv:125.0) Gecko/125.0 Firefox/125.0",
];

lazy_static! {
    static ref RE_MOBILE: Regex = Regex::new(r"\b(Mobile|Tablet)\b").unwrap();
    static ref RE_PLATFORM: Regex = Regex::new(r"\(([^)]*)\)").unwrap();

    // first match wins, so derived browsers come before the engines they embed
    static ref RE_BROWSERS: Vec<(&'static str, Regex)> = vec![
        ("Edge", Regex::new(r"Edg(?:e|A|iOS)?/(\d+(?:\.\d+)*)").unwrap()),
        ("Opera", Regex::new(r"OPR/(\d+(?:\.\d+)*)").unwrap()),
        ("Firefox", Regex::new(r"(?:Firefox|FxiOS)/(\d+(?:\.\d+)*)").unwrap()),
        ("Chrome", Regex::new(r"(?:Chrome|CriOS)/(\d+(?:\.\d+)*)").unwrap()),
        ("Safari", Regex::new(r"Version/(\d+(?:\.\d+)*).*Safari/").unwrap()),
    ];

    static ref RE_WINDOWS: Regex = Regex::new(r"Windows NT (\d+(?:\.\d+)?)").unwrap();
    static ref RE_IOS: Regex = Regex::new(r"OS (\d+(?:_\d+)*) like Mac OS X").unwrap();
    static ref RE_ANDROID: Regex = Regex::new(r"Android (\d+(?:\.\d+)*)").unwrap();
    static ref RE_MACOS: Regex = Regex::new(r"Mac OS X (\d+(?:[._]\d+)*)").unwrap();
}

/// Browser family to impersonate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Chrome,
    Firefox,
    Safari,
    Edge,
}

impl BrowserKind {
    /// Parse a browser name, case-insensitively
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "chrome" => Some(Self::Chrome),
            "firefox" => Some(Self::Firefox),
            "safari" => Some(Self::Safari),
            "edge" => Some(Self::Edge),
            _ => None,
        }
    }

    /// Name as reported in [`UserAgent::browser`]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome => "Chrome",
            Self::Firefox => "Firefox",
            Self::Safari => "Safari",
            Self::Edge => "Edge",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A User-Agent string and its parsed components
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAgent {
    pub string: String,
    pub browser: String,
    pub browser_version: String,
    pub os: String,
    pub os_version: String,
    mobile: bool,
}

impl UserAgent {
    /// Parse a User-Agent string
    pub fn parse(ua_string: &str) -> Result<Self> {
        let ua_string = ua_string.trim();
        if ua_string.is_empty() {
            return Err(Error::UserAgentParse("empty User-Agent".to_string()));
        }

        let (browser, browser_version) = RE_BROWSERS
            .iter()
            .find_map(|(name, re)| {
                re.captures(ua_string)
                    .and_then(|caps| caps.get(1))
                    .map(|v| (name.to_string(), v.as_str().to_string()))
            })
            .unwrap_or_else(|| ("Other".to_string(), "0".to_string()));

        let platform = RE_PLATFORM
            .captures(ua_string)
            .and_then(|caps| caps.get(1))
            .map_or("", |m| m.as_str());
        let (os, os_version) = parse_platform(platform);

        let mobile = RE_MOBILE.is_match(ua_string) || os == "iOS" || os == "Android";

        Ok(Self {
            string: ua_string.to_string(),
            browser,
            browser_version,
            os,
            os_version,
            mobile,
        })
    }

    /// Whether the agent is a phone or tablet browser
    pub fn is_mobile(&self) -> bool {
        self.mobile
    }

    /// Whether the browser sends `Sec-CH-UA` client hints
    pub fn is_chromium(&self) -> bool {
        matches!(self.browser.as_str(), "Chrome" | "Edge" | "Opera")
    }

    /// Major version number as a string, `"0"` when unknown
    pub fn major_version(&self) -> &str {
        self.browser_version
            .split('.')
            .next()
            .filter(|v| !v.is_empty())
            .unwrap_or("0")
    }

    /// Pick a random User-Agent from the built-in pools
    pub fn random(mobile: bool) -> Result<Self> {
        let pool = if mobile { MOBILE_AGENTS } else { DESKTOP_AGENTS };
        let ua_string = pool
            .choose(&mut thread_rng())
            .ok_or(Error::NoUserAgentAvailable)?;
        Self::parse(ua_string)
    }

    /// Random User-Agent of one browser family
    ///
    /// Falls back to the desktop pool when no mobile agent of that family
    /// exists, e.g. Edge with `mobile` set.
    ///
    /// # Arguments
    /// * `kind` - Browser family to pick from
    /// * `mobile` - Prefer phone and tablet agents
    pub fn for_browser(kind: BrowserKind, mobile: bool) -> Result<Self> {
        let of_kind = |pool: &[&'static str]| -> Vec<Self> {
            pool.iter()
                .filter_map(|ua| Self::parse(ua).ok())
                .filter(|ua| ua.browser == kind.as_str())
                .collect()
        };

        let mut candidates = if mobile { of_kind(MOBILE_AGENTS) } else { Vec::new() };
        if candidates.is_empty() {
            candidates = of_kind(DESKTOP_AGENTS);
        }
        candidates
            .choose(&mut thread_rng())
            .cloned()
            .ok_or(Error::NoUserAgentAvailable)
    }

    /// Chrome on Windows, or on macOS when `windows` is false
    pub fn chrome(windows: bool) -> Result<Self> {
        Self::parse(if windows { DESKTOP_AGENTS[0] } else { DESKTOP_AGENTS[4] })
    }

    /// Firefox on Windows, or on macOS when `windows` is false
    pub fn firefox(windows: bool) -> Result<Self> {
        Self::parse(if windows { DESKTOP_AGENTS[5] } else { DESKTOP_AGENTS[6] })
    }

    /// Safari on macOS
    pub fn safari() -> Result<Self> {
        Self::parse(DESKTOP_AGENTS[1])
    }

    /// Replace the browser version in both the parsed field and the raw string
    pub fn with_browser_version(mut self, version: &str) -> Self {
        if let Some(token) = self.version_token() {
            let old = format!("{}/{}", token, self.browser_version);
            let new = format!("{}/{}", token, version);
            self.string = self.string.replace(&old, &new);
        }
        self.browser_version = version.to_string();
        self
    }

    fn version_token(&self) -> Option<&'static str> {
        match self.browser.as_str() {
            "Edge" => Some("Edg"),
            "Opera" => Some("OPR"),
            "Firefox" => Some("Firefox"),
            "Chrome" => Some("Chrome"),
            "Safari" => Some("Version"),
            _ => None,
        }
    }

    /// Platform name for the `Sec-CH-UA-Platform` header
    pub fn sec_ch_ua_platform(&self) -> &'static str {
        match self.os.as_str() {
            "Windows" => "Windows",
            "macOS" => "macOS",
            "Linux" => "Linux",
            "Android" => "Android",
            "iOS" => "iOS",
            _ => "Unknown",
        }
    }
}

/// First capture group of `re` in `platform`, with `_` separators turned into dots
fn version_in(re: &Regex, platform: &str) -> String {
    re.captures(platform)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace('_', "."))
        .unwrap_or_default()
}

fn parse_platform(platform: &str) -> (String, String) {
    if platform.contains("Windows") {
        ("Windows".to_string(), version_in(&RE_WINDOWS, platform))
    } else if platform.contains("iPhone") || platform.contains("iPad") {
        ("iOS".to_string(), version_in(&RE_IOS, platform))
    } else if platform.contains("Android") {
        ("Android".to_string(), version_in(&RE_ANDROID, platform))
    } else if platform.contains("Macintosh") {
        ("macOS".to_string(), version_in(&RE_MACOS, platform))
    } else if platform.contains("Linux") || platform.contains("X11") {
        ("Linux".to_string(), String::new())
    } else {
        ("Other".to_string(), String::new())
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string)
    }
}
