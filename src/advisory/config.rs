// Advisory orchestration policy
//
// TTL, per-attempt timeout, retry budget, backoff and bounds of the cache
// and history. Custom prompt templates per request kind are optional and are
// validated against the placeholder set when the config is validated.

use crate::advisory::template::{validate_template, RequestKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default cache time-to-live (1 hour)
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default total number of provider calls per request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    /// Seconds a cached advisory stays fresh
    pub ttl_secs: u64,

    /// Deadline for a single provider call
    pub timeout_secs: u64,

    /// Total provider calls per request, first attempt included
    pub max_attempts: u32,

    /// Delay before the first retry; doubles for each further retry
    pub base_delay_ms: u64,

    /// Maximum cached advisories
    pub cache_capacity: usize,

    /// Maximum history records
    pub history_capacity: usize,

    /// Prompt overrides, keyed by request kind
    pub templates: BTreeMap<RequestKind, String>,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            cache_capacity: 100,
            history_capacity: 50,
            templates: BTreeMap::new(),
        }
    }
}

impl AdvisoryConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay after the `failed`-th failed attempt (1-based)
    ///
    /// ```
    /// use qorcompare::advisory::AdvisoryConfig;
    /// use std::time::Duration;
    ///
    /// let config = AdvisoryConfig::default();
    /// assert_eq!(config.retry_delay(1), Duration::from_millis(1000));
    /// assert_eq!(config.retry_delay(2), Duration::from_millis(2000));
    /// ```
    pub fn retry_delay(&self, failed: u32) -> Duration {
        let exponent = failed.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << exponent))
    }

    /// Prompt template for a request kind, override first
    pub fn template_for(&self, kind: RequestKind) -> &str {
        self.templates
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_template())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be >= 1".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be >= 1".to_string());
        }

        if self.cache_capacity == 0 || self.history_capacity == 0 {
            return Err(format!(
                "cache_capacity and history_capacity must be >= 1, got {} and {}",
                self.cache_capacity, self.history_capacity
            ));
        }

        for (kind, template) in &self.templates {
            validate_template(template)
                .map_err(|e| format!("template for '{}': {}", kind, e))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdvisoryConfig::default();
        assert_eq!(config.ttl(), Duration::from_secs(3600));
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.cache_capacity, 100);
        assert_eq!(config.history_capacity, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backoff_doubles() {
        let config = AdvisoryConfig {
            base_delay_ms: 250,
            ..Default::default()
        };
        assert_eq!(config.retry_delay(1), Duration::from_millis(250));
        assert_eq!(config.retry_delay(2), Duration::from_millis(500));
        assert_eq!(config.retry_delay(3), Duration::from_millis(1000));
        // Huge attempt counts saturate instead of overflowing
        assert!(config.retry_delay(u32::MAX) >= config.retry_delay(3));
    }

    #[test]
    fn test_template_override() {
        let mut templates = BTreeMap::new();
        templates.insert(RequestKind::Summary, "Summarize {{metric}}".to_string());
        let config = AdvisoryConfig {
            templates,
            ..Default::default()
        };

        assert_eq!(config.template_for(RequestKind::Summary), "Summarize {{metric}}");
        assert_eq!(
            config.template_for(RequestKind::Tradeoff),
            RequestKind::Tradeoff.default_template()
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_template_rejected() {
        let mut templates = BTreeMap::new();
        templates.insert(RequestKind::RootCause, "{{metrik}}".to_string());
        let config = AdvisoryConfig {
            templates,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("root_cause"));
        assert!(err.contains("metrik"));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = AdvisoryConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_templates_table() {
        let config: AdvisoryConfig = toml::from_str(
            r#"
            ttl_secs = 60

            [templates]
            tradeoff = "Weigh {{metric}} against {{other_metrics}}"
            "#,
        )
        .unwrap();
        assert_eq!(config.ttl_secs, 60);
        assert_eq!(config.max_attempts, 3);
        assert!(config.template_for(RequestKind::Tradeoff).starts_with("Weigh"));
    }
}
