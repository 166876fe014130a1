//! Screening driver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_max_workers() -> usize {
    8
}

const fn default_oracle_timeout_secs() -> u64 {
    120
}

fn default_reviewer_tier() -> String {
    String::from("fast")
}

fn default_adjudicator_tier() -> String {
    String::from("deep")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScreeningConfig {
    /// Records evaluated concurrently.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Per-call timeout for the decision oracle.
    #[serde(default = "default_oracle_timeout_secs")]
    pub oracle_timeout_secs: u64,

    /// Rate-limit tier used by reviewers A and B.
    #[serde(default = "default_reviewer_tier")]
    pub reviewer_tier: String,

    /// Rate-limit tier used by the adjudicator.
    #[serde(default = "default_adjudicator_tier")]
    pub adjudicator_tier: String,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            oracle_timeout_secs: default_oracle_timeout_secs(),
            reviewer_tier: default_reviewer_tier(),
            adjudicator_tier: default_adjudicator_tier(),
        }
    }
}

impl ScreeningConfig {
    #[must_use]
    pub const fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for zero workers or a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::invalid("screening.max_workers", "must be at least 1"));
        }
        if self.oracle_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "screening.oracle_timeout_secs",
                "must be at least 1 second",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = ScreeningConfig::default();
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.oracle_timeout(), Duration::from_secs(120));
        assert_eq!(config.reviewer_tier, "fast");
        assert_eq!(config.adjudicator_tier, "deep");
    }

    #[test]
    fn zero_workers_rejected() {
        let config = ScreeningConfig {
            max_workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
