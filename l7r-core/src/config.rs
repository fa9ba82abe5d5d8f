//! Simulation settings.

use crate::engine::DEFAULT_MAX_ROUNDS;
use crate::error::ConfigError;
use crate::formation::FormationKind;
use crate::probability::{DEFAULT_SAMPLES, DEFAULT_TABLE_SEED};
use serde::{Deserialize, Serialize};

/// Trials run when nothing else is asked for.
pub const DEFAULT_TRIALS: u32 = 1000;

/// How a batch of trials is run.
///
/// Missing fields take their defaults when loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub trials: u32,
    /// Base seed. Trial `i` rolls its dice from `seed + i`.
    pub seed: u64,
    pub max_rounds: u32,
    /// Monte Carlo samples per probability table entry.
    pub table_samples: u32,
    pub table_seed: u64,
    pub formation: FormationKind,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            seed: 0,
            max_rounds: DEFAULT_MAX_ROUNDS,
            table_samples: DEFAULT_SAMPLES,
            table_seed: DEFAULT_TABLE_SEED,
            formation: FormationKind::Open,
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trials(mut self, trials: u32) -> Self {
        self.trials = trials;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_table_samples(mut self, samples: u32) -> Self {
        self.table_samples = samples;
        self
    }

    pub fn with_table_seed(mut self, seed: u64) -> Self {
        self.table_seed = seed;
        self
    }

    pub fn with_formation(mut self, formation: FormationKind) -> Self {
        self.formation = formation;
        self
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ConfigError::NoTrials);
        }
        Ok(())
    }

    /// Seed for trial `index`.
    pub fn trial_seed(&self, index: u32) -> u64 {
        self.seed.wrapping_add(u64::from(index))
    }

    /// Whether these settings ask for the process-wide default tables.
    pub fn uses_default_tables(&self) -> bool {
        self.table_samples == DEFAULT_SAMPLES && self.table_seed == DEFAULT_TABLE_SEED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::new();
        assert_eq!(config.max_rounds, 100);
        assert_eq!(config.table_samples, 20_000);
        assert!(config.uses_default_tables());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config =
            SimulationConfig::from_json(r#"{"trials": 50, "seed": 9, "formation": "surround"}"#).unwrap();
        assert_eq!(config.trials, 50);
        assert_eq!(config.formation, FormationKind::Surround);
        assert_eq!(config.trial_seed(3), 12);
        assert_eq!(config.max_rounds, DEFAULT_MAX_ROUNDS);
    }

    #[test]
    fn test_zero_trials_rejected() {
        assert_eq!(
            SimulationConfig::from_json(r#"{"trials": 0}"#),
            Err(ConfigError::NoTrials)
        );
        assert!(matches!(
            SimulationConfig::from_json("{not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_builder_and_json_agree() {
        let config = SimulationConfig::new()
            .with_trials(10)
            .with_seed(4)
            .with_max_rounds(20)
            .with_table_samples(500)
            .with_table_seed(1)
            .with_formation(FormationKind::Line);
        assert!(!config.uses_default_tables());
        let json = config.to_json().unwrap();
        assert_eq!(SimulationConfig::from_json(&json).unwrap(), config);
    }
}
