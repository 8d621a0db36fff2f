use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Scheduler configuration shared by the engine and the CLI.
///
/// `interval_ms` is the delay between batches, `max` the number of tasks
/// executed concurrently within one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Milliseconds to wait between the settle of one batch and the next pull.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Concurrency cap: tasks per batch.
    #[serde(default = "default_max")]
    pub max: usize,
}

fn default_interval_ms() -> u64 { 0 }
fn default_max() -> usize { 1 }

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max: default_max(),
        }
    }
}

impl QueueConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TASKQ_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("TASKQ_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        Self::default().with_profile_env(profile)
    }

    /// Overlay environment variables for `profile` on top of `self`. Keys
    /// that are unset or unparseable keep their current value.
    pub fn with_profile_env(self, profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            interval_ms: profiled_env_u64(p, "TASKQ_INTERVAL_MS", self.interval_ms),
            max: profiled_env_usize(p, "TASKQ_MAX", self.max),
        }
    }

    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading queue config");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max == 0 {
            return Err(ConfigError::Invalid(
                "max must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply the construction rule of the scheduler: a concurrency cap below
    /// one is raised to one.
    pub fn normalized(&self) -> Self {
        Self {
            interval_ms: self.interval_ms,
            max: self.max.max(1),
        }
    }
}
