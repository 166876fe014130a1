//! Relevance prefilter configuration.

use serde::{Deserialize, Serialize};
use sift_core::enums::PrefilterPolicy;

use crate::ConfigError;

fn default_policy() -> String {
    String::from("hard_gate")
}

const fn default_top_n() -> usize {
    500
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrefilterConfig {
    /// `hard_gate`, `ranked`, or `disabled`.
    #[serde(default = "default_policy")]
    pub policy: String,

    /// Terms matched against title + abstract.
    #[serde(default)]
    pub terms: Vec<String>,

    /// Hard gate: minimum number of matching terms. 0 disables the gate.
    #[serde(default)]
    pub min_matches: usize,

    /// Ranked cutoff: number of top-scoring records forwarded.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            terms: Vec::new(),
            min_matches: 0,
            top_n: default_top_n(),
        }
    }
}

impl PrefilterConfig {
    /// Resolve the configured policy name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unrecognized policy.
    pub fn policy(&self) -> Result<PrefilterPolicy, ConfigError> {
        PrefilterPolicy::parse(&self.policy).ok_or_else(|| {
            ConfigError::invalid(
                "prefilter.policy",
                format!(
                    "unknown policy '{}' (expected hard_gate, ranked, or disabled)",
                    self.policy
                ),
            )
        })
    }

    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unknown policy or a ranked
    /// policy without terms.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.policy()? == PrefilterPolicy::Ranked && self.terms.is_empty() {
            return Err(ConfigError::invalid(
                "prefilter.terms",
                "the ranked policy needs at least one term",
            ));
        }
        Ok(())
    }
}
