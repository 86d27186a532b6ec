//! Configuration for an ELIZA session.
//!
//! Configuration is loaded from environment variables, from JSON, or built
//! explicitly.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::doctor_script::DOCTOR_SCRIPT;
use crate::error::Result;

/// Environment variable naming a script file
pub const ENV_SCRIPT: &str = "ELIZA_SCRIPT";

/// Environment variable holding the memory recall seed
pub const ENV_SEED: &str = "ELIZA_SEED";

/// Session configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElizaConfig {
    /// Script file to load; the bundled DOCTOR script when unset
    #[serde(default)]
    pub script_path: Option<PathBuf>,
    /// Seed for memory recall; entropy when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ElizaConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - ELIZA_SCRIPT: path of the script file
    /// - ELIZA_SEED: integer seed for memory recall
    ///
    /// An unparsable seed is ignored with a warning.
    pub fn from_env() -> Self {
        let script_path = std::env::var(ENV_SCRIPT)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let seed = std::env::var(ENV_SEED).ok().and_then(|s| match s.trim().parse() {
            Ok(seed) => Some(seed),
            Err(_) => {
                warn!(value = %s, "ignoring invalid {}", ENV_SEED);
                None
            }
        });

        Self { script_path, seed }
    }

    /// Parse configuration from JSON such as `{"scriptPath": "doctor.txt", "seed": 7}`.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Set the script file.
    pub fn with_script_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_path = Some(path.into());
        self
    }

    /// Set the memory recall seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Script text this configuration selects.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured file cannot be read.
    pub fn script_source(&self) -> Result<String> {
        match &self.script_path {
            Some(path) => Ok(std::fs::read_to_string(path)?),
            None => Ok(DOCTOR_SCRIPT.to_string()),
        }
    }
}
