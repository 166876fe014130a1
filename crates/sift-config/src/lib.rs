//! # sift-config
//!
//! Layered configuration loading for Sift using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`SIFT_*` prefix, `__` as separator)
//! 2. Project-level `.sift/config.toml`
//! 3. User-level `~/.config/sift/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `SIFT_DEDUP__SIMILARITY_CUTOFF` -> `dedup.similarity_cutoff`,
//! `SIFT_SCREENING__MAX_WORKERS` -> `screening.max_workers`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use sift_config::SiftConfig;
//!
//! let config = SiftConfig::load_with_dotenv().expect("config");
//! println!("workers: {}", config.screening.max_workers);
//! ```

mod dedup;
mod error;
mod prefilter;
mod rate_limit;
mod screening;
mod store;

pub use dedup::DedupConfig;
pub use error::ConfigError;
pub use prefilter::PrefilterConfig;
pub use rate_limit::{TierBudget, default_rate_limits, validate_rate_limits};
pub use screening::ScreeningConfig;
pub use store::StoreConfig;

use std::collections::BTreeMap;
use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiftConfig {
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub prefilter: PrefilterConfig,
    #[serde(default)]
    pub screening: ScreeningConfig,
    #[serde(default = "default_rate_limits")]
    pub rate_limits: BTreeMap<String, TierBudget>,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            dedup: DedupConfig::default(),
            prefilter: PrefilterConfig::default(),
            screening: ScreeningConfig::default(),
            rate_limits: default_rate_limits(),
            store: StoreConfig::default(),
        }
    }
}

impl SiftConfig {
    /// Load configuration from all sources (TOML files + environment variables)
    /// and validate it.
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction or validation fails.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".sift/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("SIFT_").split("__"))
    }

    /// Check every section. Invalid settings stop the run before any record
    /// is touched.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError::InvalidValue` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dedup.validate()?;
        self.prefilter.validate()?;
        self.screening.validate()?;
        validate_rate_limits(&self.rate_limits)?;
        for (field, tier) in [
            ("screening.reviewer_tier", &self.screening.reviewer_tier),
            ("screening.adjudicator_tier", &self.screening.adjudicator_tier),
        ] {
            if !self.rate_limits.contains_key(tier) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("tier '{tier}' has no entry in rate_limits"),
                });
            }
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sift").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SiftConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.path, ".sift/sift.db");
        assert!(config.store.trail_dir().is_none());
    }

    #[test]
    fn figment_builds_without_files() {
        let config: SiftConfig = SiftConfig::figment()
            .extract()
            .expect("should extract defaults");
        assert_eq!(config.dedup.pairwise_threshold, 500);
        assert_eq!(config.rate_limits.len(), 2);
    }

    #[test]
    fn unknown_reviewer_tier_rejected() {
        let mut config = SiftConfig::default();
        config.screening.reviewer_tier = "turbo".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("turbo"));
    }
}
