use crate::errors::{RippleError, Result};
use serde::{Deserialize, Serialize};

/// Lower bound for the poll interval; anything smaller hammers the remote
pub const MIN_POLL_INTERVAL_MS: u64 = 5_000;

/// Default poll interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;

/// Global settings, persisted as part of the stack file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Reuse-recorded-resolution settings
    pub rerere: RerereSettings,
    /// Default base branch for new stacks
    pub default_base_branch: String,
    /// How often the watch loop polls the remote review system
    pub poll_interval_ms: u64,
}

/// Settings for git's conflict-pattern store (rerere)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RerereSettings {
    /// Whether recorded resolutions are consulted at all
    pub enabled: bool,
    /// Whether resolved files are staged and the rebase continued
    /// automatically
    pub auto_apply: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rerere: RerereSettings::default(),
            default_base_branch: "main".to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Default for RerereSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_apply: true,
        }
    }
}

impl Settings {
    /// Poll interval clamped to the supported minimum
    pub fn effective_poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS)
    }

    /// Update a configuration value by key
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "rerere.enabled" => {
                self.rerere.enabled = parse_bool(key, value)?;
            }
            "rerere.auto_apply" => {
                self.rerere.auto_apply = parse_bool(key, value)?;
            }
            "default_base_branch" => {
                if value.is_empty() {
                    return Err(RippleError::config("default_base_branch cannot be empty"));
                }
                self.default_base_branch = value.to_string();
            }
            "poll_interval_ms" => {
                let ms: u64 = value.parse().map_err(|_| {
                    RippleError::config(format!("Invalid number for {key}: {value}"))
                })?;
                if ms < MIN_POLL_INTERVAL_MS {
                    return Err(RippleError::config(format!(
                        "poll_interval_ms must be at least {MIN_POLL_INTERVAL_MS}"
                    )));
                }
                self.poll_interval_ms = ms;
            }
            _ => return Err(RippleError::config(format!("Unknown config key: {key}"))),
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get_value(&self, key: &str) -> Result<String> {
        let value = match key {
            "rerere.enabled" => self.rerere.enabled.to_string(),
            "rerere.auto_apply" => self.rerere.auto_apply.to_string(),
            "default_base_branch" => self.default_base_branch.clone(),
            "poll_interval_ms" => self.poll_interval_ms.to_string(),
            _ => return Err(RippleError::config(format!("Unknown config key: {key}"))),
        };
        Ok(value)
    }

    /// All key/value pairs, for `config list`
    pub fn list_values(&self) -> Vec<(&'static str, String)> {
        vec![
            ("rerere.enabled", self.rerere.enabled.to_string()),
            ("rerere.auto_apply", self.rerere.auto_apply.to_string()),
            ("default_base_branch", self.default_base_branch.clone()),
            ("poll_interval_ms", self.poll_interval_ms.to_string()),
        ]
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.default_base_branch.is_empty() {
            return Err(RippleError::config("default_base_branch cannot be empty"));
        }
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(RippleError::config(format!(
                "poll_interval_ms must be at least {MIN_POLL_INTERVAL_MS}"
            )));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value
        .parse()
        .map_err(|_| RippleError::config(format!("Invalid boolean for {key}: {value}")))
}
