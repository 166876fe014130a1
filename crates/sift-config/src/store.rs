//! Persistent store location.

use serde::{Deserialize, Serialize};

fn default_path() -> String {
    String::from(".sift/sift.db")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// libSQL database file, or `:memory:`.
    #[serde(default = "default_path")]
    pub path: String,

    /// Directory for the JSONL decision trail. Empty disables the trail.
    #[serde(default)]
    pub trail_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            trail_dir: String::new(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn trail_dir(&self) -> Option<&str> {
        if self.trail_dir.is_empty() {
            None
        } else {
            Some(&self.trail_dir)
        }
    }
}
