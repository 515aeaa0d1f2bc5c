//! Realistic browser header generation
//!
//! This module provides:
//! - `user_agent`: User-Agent parsing and random selection
//! - `header`: the generated header set
//! - `generator`: building a header set for a target URL

mod generator;
mod header;
mod user_agent;

pub use generator::{
    get_domain, get_header, get_headers, random_viewport, sec_ch_ua, sec_fetch_site,
    DEFAULT_ACCEPT, DEFAULT_ACCEPT_ENCODING, DEFAULT_CONNECTION,
};
pub use header::Header;
pub use user_agent::{BrowserKind, UserAgent};
