//! Check configuration
//!
//! Policy parameters for the orchestrator and the probe heuristics. Every
//! field has a default, so callers can pass a partial object.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default per-probe timeout (milliseconds). Permission prompts are included.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 30_000;

/// Default clipboard action threshold.
pub const DEFAULT_CLIPBOARD_THRESHOLD: u64 = 5;

/// Default IP geolocation endpoint.
pub const DEFAULT_GEOLOCATION_URL: &str = "https://ipapi.co/json/";

/// What to do with a declared sub-key that a multi-verdict probe omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSubKeyPolicy {
    /// Resolve it as Flagged with an "incomplete" detail.
    FlagIncomplete,
    /// Leave it Pending.
    LeavePending,
}

impl Default for MissingSubKeyPolicy {
    fn default() -> Self {
        MissingSubKeyPolicy::FlagIncomplete
    }
}

/// Configuration for a check run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Per-probe timeout; `None` disables it.
    pub probe_timeout_ms: Option<u64>,
    pub missing_sub_keys: MissingSubKeyPolicy,

    // Passive signals
    pub focus_loss_threshold: u64,
    pub clipboard_threshold: u64,

    // Virtualization heuristics
    pub min_logical_cores: u32,
    pub min_device_memory_gb: f64,
    pub suspicious_renderer_keywords: Vec<String>,

    // Hardware heuristics
    pub min_screen_width: u32,
    pub min_screen_height: u32,
    pub min_color_depth: u32,
    pub suspicious_device_keywords: Vec<String>,

    // Developer tools timing
    pub devtools_delay_ms: u32,
    pub devtools_pause_threshold_ms: f64,

    // Network
    pub geolocation_url: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: Some(DEFAULT_PROBE_TIMEOUT_MS),
            missing_sub_keys: MissingSubKeyPolicy::default(),
            focus_loss_threshold: 0,
            clipboard_threshold: DEFAULT_CLIPBOARD_THRESHOLD,
            min_logical_cores: 2,
            min_device_memory_gb: 4.0,
            suspicious_renderer_keywords: strings(&[
                "vmware",
                "virtualbox",
                "swiftshader",
                "llvmpipe",
                "parallels",
                "mesa",
            ]),
            min_screen_width: 800,
            min_screen_height: 600,
            min_color_depth: 24,
            suspicious_device_keywords: strings(&[
                "virtual", "obs", "droidcam", "splitcam", "dummy", "vcam", "xsplit",
            ]),
            devtools_delay_ms: 500,
            devtools_pause_threshold_ms: 100.0,
            geolocation_url: DEFAULT_GEOLOCATION_URL.to_string(),
        }
    }
}

impl CheckConfig {
    pub fn probe_timeout(&self) -> Option<Duration> {
        self.probe_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.suspicious_renderer_keywords.is_empty() {
            return Err(ConfigError::EmptyKeywords("suspicious_renderer_keywords"));
        }
        if self.suspicious_device_keywords.is_empty() {
            return Err(ConfigError::EmptyKeywords("suspicious_device_keywords"));
        }
        if !(self.geolocation_url.starts_with("https://")
            || self.geolocation_url.starts_with("http://"))
        {
            return Err(ConfigError::InvalidUrl(self.geolocation_url.clone()));
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CheckConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.clipboard_threshold, 5);
        assert_eq!(config.probe_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.missing_sub_keys, MissingSubKeyPolicy::FlagIncomplete);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: CheckConfig = serde_json::from_str(
            r#"{
                "clipboard_threshold": 2,
                "missing_sub_keys": "leave_pending",
                "probe_timeout_ms": null
            }"#,
        )
        .unwrap();
        assert_eq!(config.clipboard_threshold, 2);
        assert_eq!(config.missing_sub_keys, MissingSubKeyPolicy::LeavePending);
        assert_eq!(config.probe_timeout(), None);
        assert_eq!(config.min_logical_cores, 2);
        assert_eq!(config.geolocation_url, DEFAULT_GEOLOCATION_URL);
    }

    #[test]
    fn test_validation_failures() {
        let config = CheckConfig {
            probe_timeout_ms: Some(0),
            ..CheckConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));

        let config = CheckConfig {
            suspicious_device_keywords: Vec::new(),
            ..CheckConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyKeywords("suspicious_device_keywords"))
        );

        let config = CheckConfig {
            geolocation_url: "ftp://example.com".into(),
            ..CheckConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));
    }
}
