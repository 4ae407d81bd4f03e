//! Configuration for the navigation loader.
//!
//! The two payload origins are configuration values, not hard-coded
//! contracts; anything the fetcher can reach (http, https, file) works.
//! Configuration can be loaded from environment variables or constructed
//! programmatically.

use anyhow::{Context as _, Error};
use core::time::Duration;
use std::env;
use url::Url;

/// Default primary-source budget before the additive fallback starts.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
/// Default insertion-target selector.
pub const DEFAULT_TARGET_SELECTOR: &str = "#nav";

/// Runtime configuration for the navigation loader.
#[derive(Clone, Debug)]
pub struct LoaderConfig {
    /// Primary payload origin.
    pub primary_url: Url,
    /// Secondary payload origin, tried on primary failure or timeout.
    pub secondary_url: Url,
    /// Primary-source budget in milliseconds before the fallback starts.
    pub timeout_ms: u64,
    /// Selector locating the insertion target (`#id` or a tag name).
    pub target_selector: String,
}

impl LoaderConfig {
    /// Build a configuration with default timeout and target selector.
    #[must_use]
    pub fn new(primary_url: Url, secondary_url: Url) -> Self {
        Self {
            primary_url,
            secondary_url,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            target_selector: String::from(DEFAULT_TARGET_SELECTOR),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `HELM_PRIMARY_URL`: primary payload origin (required)
    /// - `HELM_SECONDARY_URL`: secondary payload origin (required)
    /// - `HELM_TIMEOUT_MS`: primary budget in milliseconds (default: 5000)
    /// - `HELM_NAV_TARGET`: insertion-target selector (default: `#nav`)
    ///
    /// # Errors
    ///
    /// Returns an error if either origin variable is missing or not a
    /// parseable URL.
    pub fn from_env() -> Result<Self, Error> {
        let primary_url = env::var("HELM_PRIMARY_URL")
            .context("HELM_PRIMARY_URL is not set")?
            .parse::<Url>()
            .context("HELM_PRIMARY_URL is not a valid URL")?;
        let secondary_url = env::var("HELM_SECONDARY_URL")
            .context("HELM_SECONDARY_URL is not set")?
            .parse::<Url>()
            .context("HELM_SECONDARY_URL is not a valid URL")?;
        let timeout_ms = env::var("HELM_TIMEOUT_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS)
            .max(1);
        let target_selector = env::var("HELM_NAV_TARGET")
            .ok()
            .filter(|selector| !selector.is_empty())
            .unwrap_or_else(|| String::from(DEFAULT_TARGET_SELECTOR));
        Ok(Self {
            primary_url,
            secondary_url,
            timeout_ms,
            target_selector,
        })
    }

    /// Get the primary budget as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_TARGET_SELECTOR, DEFAULT_TIMEOUT_MS, LoaderConfig};
    use std::env;
    use url::Url;

    #[test]
    fn new_applies_defaults() {
        let primary = Url::parse("https://cdn.example/nav.json").expect("url");
        let secondary = Url::parse("https://mirror.example/nav.json").expect("url");
        let config = LoaderConfig::new(primary, secondary);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.target_selector, DEFAULT_TARGET_SELECTOR);
    }

    // Environment access is process-global, so every env-driven case lives
    // in this single test.
    #[test]
    fn from_env_reads_and_defaults() {
        assert!(LoaderConfig::from_env().is_err());

        // SAFETY: this test is the only writer of HELM_* variables in the
        // process and runs its cases sequentially.
        unsafe {
            env::set_var("HELM_PRIMARY_URL", "https://cdn.example/nav.json");
            env::set_var("HELM_SECONDARY_URL", "https://mirror.example/nav.json");
        }
        let config = LoaderConfig::from_env().expect("config");
        assert_eq!(config.primary_url.host_str(), Some("cdn.example"));
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.target_selector, DEFAULT_TARGET_SELECTOR);

        // SAFETY: same single-writer reasoning as above.
        unsafe {
            env::set_var("HELM_TIMEOUT_MS", "250");
            env::set_var("HELM_NAV_TARGET", "#chrome");
        }
        let tuned = LoaderConfig::from_env().expect("config");
        assert_eq!(tuned.timeout_ms, 250);
        assert_eq!(tuned.target_selector, "#chrome");
        assert_eq!(tuned.timeout(), core::time::Duration::from_millis(250));

        // Unparseable timeout falls back to the default.
        // SAFETY: same single-writer reasoning as above.
        unsafe {
            env::set_var("HELM_TIMEOUT_MS", "soon");
        }
        let fallback = LoaderConfig::from_env().expect("config");
        assert_eq!(fallback.timeout_ms, DEFAULT_TIMEOUT_MS);
    }
}
