//! Machine configuration.
//!
//! Defaults suit most machines. Deployments can override them from the
//! environment or from a JSON document.

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Default bound on conditional re-check passes per `apply_event` call.
pub const DEFAULT_MAX_TRANSITIONS_PER_STEP: usize = 100;

/// Default number of journal records kept per machine.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 256;

pub const MAX_TRANSITIONS_ENV: &str = "STATECHART_MAX_TRANSITIONS_PER_STEP";
pub const JOURNAL_CAPACITY_ENV: &str = "STATECHART_JOURNAL_CAPACITY";

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("max_transitions_per_step must be at least 1")]
    ZeroTransitionBound,
}

/// Tunables of a single machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// How many run-to-completion re-check passes may follow one event
    /// before the step is reported as an unterminated loop.
    pub max_transitions_per_step: usize,

    /// Records kept in the transition journal; `None` keeps everything,
    /// `Some(0)` disables the journal.
    pub journal_capacity: Option<usize>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            max_transitions_per_step: DEFAULT_MAX_TRANSITIONS_PER_STEP,
            journal_capacity: Some(DEFAULT_JOURNAL_CAPACITY),
        }
    }
}

impl MachineConfig {
    /// Defaults overridden by `STATECHART_*` environment variables.
    ///
    /// Unparseable values are ignored. `STATECHART_JOURNAL_CAPACITY=unbounded`
    /// keeps every record.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(max) = env::var(MAX_TRANSITIONS_ENV)
            .ok()
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|max| *max > 0)
        {
            config.max_transitions_per_step = max;
        }
        if let Ok(value) = env::var(JOURNAL_CAPACITY_ENV) {
            let value = value.trim();
            if value.eq_ignore_ascii_case("unbounded") {
                config.journal_capacity = None;
            } else if let Ok(capacity) = value.parse::<usize>() {
                config.journal_capacity = Some(capacity);
            }
        }
        config
    }

    /// Parse a JSON document; missing fields take their defaults.
    ///
    /// ```rust
    /// use statechart::MachineConfig;
    ///
    /// let config = MachineConfig::from_json(r#"{ "max_transitions_per_step": 8 }"#).unwrap();
    /// assert_eq!(config.max_transitions_per_step, 8);
    /// assert_eq!(config.journal_capacity, MachineConfig::default().journal_capacity);
    /// ```
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: MachineConfig = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_transitions_per_step == 0 {
            return Err(ConfigError::ZeroTransitionBound);
        }
        Ok(())
    }

    pub fn with_max_transitions_per_step(mut self, max: usize) -> Self {
        self.max_transitions_per_step = max;
        self
    }

    pub fn with_journal_capacity(mut self, capacity: Option<usize>) -> Self {
        self.journal_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = MachineConfig::default();
        assert_eq!(
            config.max_transitions_per_step,
            DEFAULT_MAX_TRANSITIONS_PER_STEP
        );
        assert_eq!(config.journal_capacity, Some(DEFAULT_JOURNAL_CAPACITY));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_fills_missing_fields() {
        let config = MachineConfig::from_json(r#"{ "journal_capacity": null }"#).unwrap();
        assert_eq!(config.journal_capacity, None);
        assert_eq!(
            config.max_transitions_per_step,
            DEFAULT_MAX_TRANSITIONS_PER_STEP
        );
    }

    #[test]
    fn json_rejects_zero_bound() {
        let result = MachineConfig::from_json(r#"{ "max_transitions_per_step": 0 }"#);
        assert!(matches!(result, Err(ConfigError::ZeroTransitionBound)));
    }

    #[test]
    fn json_rejects_garbage() {
        let result = MachineConfig::from_json("not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn env_overrides_defaults() {
        env::set_var(MAX_TRANSITIONS_ENV, "12");
        env::set_var(JOURNAL_CAPACITY_ENV, "unbounded");

        let config = MachineConfig::from_env();

        env::remove_var(MAX_TRANSITIONS_ENV);
        env::remove_var(JOURNAL_CAPACITY_ENV);

        assert_eq!(config.max_transitions_per_step, 12);
        assert_eq!(config.journal_capacity, None);
    }

    #[test]
    fn builder_style_setters() {
        let config = MachineConfig::default()
            .with_max_transitions_per_step(3)
            .with_journal_capacity(Some(0));
        assert_eq!(config.max_transitions_per_step, 3);
        assert_eq!(config.journal_capacity, Some(0));
    }
}
