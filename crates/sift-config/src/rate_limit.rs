//! Per-tier oracle rate budgets.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Rolling-window budget for one oracle tier.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct TierBudget {
    /// Calls allowed inside one window.
    pub max_calls: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl TierBudget {
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Default budgets: a cheap `fast` tier and an expensive `deep` tier.
#[must_use]
pub fn default_rate_limits() -> BTreeMap<String, TierBudget> {
    BTreeMap::from([
        (
            "fast".to_string(),
            TierBudget {
                max_calls: 60,
                window_secs: 60,
            },
        ),
        (
            "deep".to_string(),
            TierBudget {
                max_calls: 20,
                window_secs: 60,
            },
        ),
    ])
}

/// # Errors
///
/// Returns `ConfigError::InvalidValue` when a tier has a zero budget or window.
pub fn validate_rate_limits(limits: &BTreeMap<String, TierBudget>) -> Result<(), ConfigError> {
    for (tier, budget) in limits {
        if budget.max_calls == 0 {
            return Err(ConfigError::invalid(
                &format!("rate_limits.{tier}.max_calls"),
                "must be at least 1",
            ));
        }
        if budget.window_secs == 0 {
            return Err(ConfigError::invalid(
                &format!("rate_limits.{tier}.window_secs"),
                "must be at least 1",
            ));
        }
    }
    Ok(())
}
