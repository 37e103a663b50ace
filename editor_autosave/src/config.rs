//! Autosave tuning.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and capacity settings for the autosave pipeline.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use note_editor_autosave::AutosaveConfig;
///
/// let config = AutosaveConfig::from_json(r#"{ "debounce_ms": 250 }"#).unwrap();
/// assert_eq!(config.debounce_ms, 250);
/// assert_eq!(config.max_queue, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before a save is queued.
    pub debounce_ms: u64,
    /// Minimum time between the end of one successful save and the next
    /// dispatch.
    pub min_interval_ms: u64,
    /// Maximum number of queued save operations.
    pub max_queue: usize,
    /// Attempts per operation, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further one.
    pub retry_base_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            min_interval_ms: 2000,
            max_queue: 5,
            max_attempts: 3,
            retry_base_ms: 1000,
        }
    }
}

impl AutosaveConfig {
    /// Parses a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::normalized)
    }

    /// Clamps values that would stall the pipeline.
    pub fn normalized(self) -> Self {
        Self {
            max_queue: self.max_queue.max(1),
            max_attempts: self.max_attempts.max(1),
            ..self
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Delay before retrying an operation that has failed `attempts` times.
    pub fn retry_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(16);
        Duration::from_millis(self.retry_base_ms).saturating_mul(1 << exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles() {
        let config = AutosaveConfig::default();
        assert_eq!(config.retry_delay(1), Duration::from_millis(1000));
        assert_eq!(config.retry_delay(2), Duration::from_millis(2000));
        assert_eq!(config.retry_delay(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AutosaveConfig::from_json(r#"{ "min_interval_ms": 0, "max_queue": 0 }"#).unwrap();
        assert_eq!(config.min_interval_ms, 0);
        assert_eq!(config.max_queue, 1);
        assert_eq!(config.debounce_ms, 1000);
        assert!(AutosaveConfig::from_json("[]").is_err());
    }
}
