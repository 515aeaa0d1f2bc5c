//! Timing configuration for request pacing and retries

use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Read an environment variable and parse it, ignoring unset or malformed values
pub(crate) fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Shape of the random delay distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    Uniform,
    Normal { mean_ms: u64, std_dev_ms: u64 },
}

/// Random delay inserted before each request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub distribution: Distribution,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self::none()
    }
}

impl DelayConfig {
    /// No delay at all
    pub fn none() -> Self {
        Self::uniform(0, 0)
    }

    /// Delays drawn evenly from `[min_delay_ms, max_delay_ms]`
    pub fn uniform(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            min_delay_ms,
            max_delay_ms,
            distribution: Distribution::Uniform,
        }
    }

    /// Delays drawn from a normal distribution, clamped to `[min_delay_ms, max_delay_ms]`
    ///
    /// # Arguments
    /// * `mean_ms` - Center of the distribution
    /// * `std_dev_ms` - Spread around the center
    /// * `min_delay_ms` - Lower clamp
    /// * `max_delay_ms` - Upper clamp
    pub fn normal(mean_ms: u64, std_dev_ms: u64, min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            min_delay_ms,
            max_delay_ms,
            distribution: Distribution::Normal { mean_ms, std_dev_ms },
        }
    }

    /// Pauses in the range a person takes between page loads
    pub fn human() -> Self {
        Self::uniform(500, 3000)
    }

    /// Whether no pause is ever taken
    pub fn is_zero(&self) -> bool {
        self.max_delay_ms == 0
    }

    /// Sample a delay; the result always lies within `[min_delay_ms, max_delay_ms]`
    pub fn random_delay(&self) -> Duration {
        let lo = self.min_delay_ms.min(self.max_delay_ms);
        let hi = self.min_delay_ms.max(self.max_delay_ms);
        if lo == hi {
            return Duration::from_millis(lo);
        }

        let mut rng = thread_rng();
        let delay_ms = match self.distribution {
            Distribution::Uniform => rng.gen_range(lo..=hi),
            Distribution::Normal { mean_ms, std_dev_ms } => {
                match rand_distr::Normal::new(mean_ms as f64, std_dev_ms as f64) {
                    Ok(normal) => {
                        let sample: f64 = rng.sample(normal);
                        (sample.max(0.0) as u64).clamp(lo, hi)
                    }
                    Err(_) => rng.gen_range(lo..=hi),
                }
            }
        };

        Duration::from_millis(delay_ms)
    }
}

/// Exponential backoff between retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Disable retries entirely
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Backoff before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        let ms = (self.initial_backoff_ms as f64 * factor).min(self.max_backoff_ms as f64);
        Duration::from_millis(ms as u64)
    }
}

/// Master timing configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub delay: DelayConfig,
    pub retry: RetryConfig,
    /// Minimum spacing between two requests to the same domain
    pub per_domain_interval_ms: u64,
}

impl TimingConfig {
    /// Apply `LLAMAMOONLIGHT_*` timing overrides from the environment
    pub fn apply_env(&mut self) {
        if let Some(v) = env_parse("LLAMAMOONLIGHT_MIN_DELAY_MS") {
            self.delay.min_delay_ms = v;
        }
        if let Some(v) = env_parse("LLAMAMOONLIGHT_MAX_DELAY_MS") {
            self.delay.max_delay_ms = v;
        }
        if let Some(v) = env_parse("LLAMAMOONLIGHT_MAX_RETRIES") {
            self.retry.max_retries = v;
        }
        if let Some(v) = env_parse("LLAMAMOONLIGHT_DOMAIN_INTERVAL_MS") {
            self.per_domain_interval_ms = v;
        }
    }
}

/// Kind of action a pause is taken for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Navigation,
    Click,
    Type,
    Scroll,
    Read,
    Custom(u64),
}

impl ActionType {
    fn base_ms(self) -> u64 {
        match self {
            ActionType::Navigation => 2000,
            ActionType::Click => 300,
            ActionType::Type => 100,
            ActionType::Scroll => 500,
            ActionType::Read => 3000,
            ActionType::Custom(ms) => ms,
        }
    }

    /// A natural pause for this action with roughly a third of jitter either way
    pub fn natural_pause(self) -> Duration {
        let base = self.base_ms();
        let variation = base / 3;
        DelayConfig::uniform(base - variation, base + variation).random_delay()
    }
}
