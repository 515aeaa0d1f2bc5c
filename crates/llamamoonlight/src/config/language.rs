//! Locale tables used to make headers look native to the target site
use phf::phf_map;
use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::error::{Error, Result};

pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Country-code TLD to locale
pub static TLD_LANGUAGES: phf::Map<&'static str, &'static str> = phf_map! {
    "de" => "de-DE",
    "fr" => "fr-FR",
    "jp" => "ja-JP",
    "uk" => "en-GB",
    "gb" => "en-GB",
    "es" => "es-ES",
    "it" => "it-IT",
    "nl" => "nl-NL",
    "ru" => "ru-RU",
    "br" => "pt-BR",
    "cn" => "zh-CN",
    "tw" => "zh-TW",
    "kr" => "ko-KR",
};

const REFERERS_EN_US: &[&str] = &["https://www.google.com", "https://www.bing.com", "https://duckduckgo.com", "https://www.reddit.com"];
const REFERERS_EN_GB: &[&str] = &["https://www.google.co.uk", "https://www.bing.com", "https://duckduckgo.com", "https://www.bbc.co.uk"];
const REFERERS_DE_DE: &[&str] = &["https://www.google.de", "https://www.bing.de", "https://duckduckgo.com", "https://www.t-online.de"];
const REFERERS_FR_FR: &[&str] = &["https://www.google.fr", "https://www.bing.fr", "https://duckduckgo.com", "https://www.lemonde.fr"];
const REFERERS_ES_ES: &[&str] = &["https://www.google.es", "https://www.bing.es", "https://duckduckgo.com", "https://www.marca.com"];
const REFERERS_IT_IT: &[&str] = &["https://www.google.it", "https://www.bing.it", "https://duckduckgo.com", "https://www.repubblica.it"];

/// Plausible referers per locale
pub static REFERERS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "en-US" => REFERERS_EN_US,
    "en-GB" => REFERERS_EN_GB,
    "de-DE" => REFERERS_DE_DE,
    "fr-FR" => REFERERS_FR_FR,
    "es-ES" => REFERERS_ES_ES,
    "it-IT" => REFERERS_IT_IT,
};

/// Guess a locale from a domain's top-level domain
pub fn language_from_domain(domain: &str) -> String {
    let host = domain.split(':').next().unwrap_or(domain);
    host.rsplit('.')
        .next()
        .map(|tld| tld.to_ascii_lowercase())
        .and_then(|tld| TLD_LANGUAGES.get(tld.as_str()).copied())
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_string()
}

/// Pick a referer for the locale, falling back to the en-US list
pub fn random_referer(language: &str) -> Result<String> {
    let referers = REFERERS
        .get(language)
        .or_else(|| REFERERS.get(DEFAULT_LANGUAGE))
        .ok_or(Error::NoRefererAvailable)?;

    referers
        .choose(&mut thread_rng())
        .map(|r| r.to_string())
        .ok_or(Error::NoRefererAvailable)
}

/// Build an Accept-Language value such as `de-DE,de;q=0.9`
pub fn accept_language(language: &str) -> String {
    match language.split_once('-') {
        Some((primary, _)) if !primary.is_empty() => format!("{},{};q=0.9", language, primary),
        _ => language.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_domain() {
        assert_eq!(language_from_domain("example.de"), "de-DE");
        assert_eq!(language_from_domain("example.fr"), "fr-FR");
        assert_eq!(language_from_domain("example.co.uk"), "en-GB");
        assert_eq!(language_from_domain("shop.example.jp:8443"), "ja-JP");
        assert_eq!(language_from_domain("EXAMPLE.DE"), "de-DE");
        assert_eq!(language_from_domain("example.com"), "en-US");
        assert_eq!(language_from_domain("localhost"), "en-US");
    }

    #[test]
    fn test_random_referer() {
        let referer = random_referer("de-DE").unwrap();
        assert!(REFERERS["de-DE"].contains(&referer.as_str()));

        // no list for ja-JP, falls back to en-US
        let referer = random_referer("ja-JP").unwrap();
        assert!(REFERERS["en-US"].contains(&referer.as_str()));
    }

    #[test]
    fn test_accept_language() {
        assert_eq!(accept_language("de-DE"), "de-DE,de;q=0.9");
        assert_eq!(accept_language("en-US"), "en-US,en;q=0.9");
        assert_eq!(accept_language("en"), "en");
    }
}
