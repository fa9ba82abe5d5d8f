//! Probability tables for "roll N keep K" pools.
//!
//! Strategies ask two questions thousands of times per trial: how likely is a
//! pool to reach a target number, and what does it usually roll. Both are
//! answered from tables generated once per process (or loaded from JSON) and
//! shared read-only between trials.

use crate::dice::{self, normalize, POOL_CAP};
use crate::error::{ConfigError, EngineError};
use lazy_static::lazy_static;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Samples per table key for the shared default tables.
pub const DEFAULT_SAMPLES: u32 = 20_000;
/// Seed for the shared default tables.
pub const DEFAULT_TABLE_SEED: u64 = 0x4c37_52;

lazy_static! {
    static ref DEFAULT_TABLES: Arc<ProbabilityTables> =
        Arc::new(ProbabilityTables::generate(DEFAULT_SAMPLES, DEFAULT_TABLE_SEED));
}

/// Answers success-probability and mean-roll questions about dice pools.
pub trait ProbabilityProvider: Send + Sync {
    /// Probability of rolling at least `tn`. A pool the provider has no
    /// table for is an error.
    fn p(&self, tn: i32, rolled: i32, kept: i32, explode: bool) -> Result<f64, EngineError>;

    /// Typical (median-like) roll for the pool.
    fn mean_roll(&self, rolled: i32, kept: i32, explode: bool) -> i32;
}

/// Closed-form estimate used when no table row exists for a pool.
pub fn estimate_mean(rolled: i32, kept: i32, explode: bool) -> i32 {
    let per_kept = if explode { 6.1 } else { 5.5 };
    let unkept = (rolled - kept).max(0) as f64;
    (per_kept * kept.max(0) as f64 + 1.5 * unkept).floor() as i32
}

fn key(rolled: i32, kept: i32) -> String {
    format!("{rolled}k{kept}")
}

/// Tables of `P(roll >= x)` keyed by normalized `RkK`, one set for exploding
/// dice and one for plain dice. Index 0 is always 1.0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbabilityTables {
    exploding: BTreeMap<String, Vec<f64>>,
    plain: BTreeMap<String, Vec<f64>>,
    #[serde(skip)]
    means: BTreeMap<(bool, String), i32>,
}

impl ProbabilityTables {
    /// Monte Carlo tables for every normalized pool up to 10k10.
    pub fn generate(samples: u32, seed: u64) -> Self {
        let samples = samples.max(1);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut tables = Self::default();
        for explode in [true, false] {
            for rolled in 0..=POOL_CAP {
                for kept in 0..=rolled {
                    let mut counts: Vec<u32> = Vec::new();
                    for _ in 0..samples {
                        let result = dice::roll(&mut rng, rolled, kept, explode).max(0) as usize;
                        if counts.len() <= result {
                            counts.resize(result + 1, 0);
                        }
                        counts[result] += 1;
                    }
                    let row = Self::survival(&counts, samples);
                    tables.insert(explode, rolled, kept, row);
                }
            }
        }
        tracing::debug!(samples, seed, "generated probability tables");
        tables
    }

    /// Shared tables, generated on first use.
    pub fn shared() -> Arc<ProbabilityTables> {
        Arc::clone(&DEFAULT_TABLES)
    }

    /// Load tables previously written with [`ProbabilityTables::to_json`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut tables: ProbabilityTables = serde_json::from_str(json)?;
        tables.rebuild_means();
        Ok(tables)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    fn survival(counts: &[u32], samples: u32) -> Vec<f64> {
        let mut row = vec![0.0; counts.len()];
        let mut at_least = 0u32;
        for x in (0..counts.len()).rev() {
            at_least += counts[x];
            row[x] = at_least as f64 / samples as f64;
        }
        if let Some(first) = row.first_mut() {
            *first = 1.0;
        }
        row
    }

    fn insert(&mut self, explode: bool, rolled: i32, kept: i32, row: Vec<f64>) {
        let k = key(rolled, kept);
        let mean = Self::median_of(&row);
        self.means.insert((explode, k.clone()), mean);
        let table = if explode {
            &mut self.exploding
        } else {
            &mut self.plain
        };
        table.insert(k, row);
    }

    fn rebuild_means(&mut self) {
        self.means.clear();
        for (explode, table) in [(true, &self.exploding), (false, &self.plain)] {
            for (k, row) in table {
                self.means.insert((explode, k.clone()), Self::median_of(row));
            }
        }
    }

    /// Largest x reached with probability at least one half.
    fn median_of(row: &[f64]) -> i32 {
        row.iter()
            .rposition(|&p| p >= 0.5)
            .map(|x| x as i32)
            .unwrap_or(0)
    }

    fn row(&self, explode: bool, rolled: i32, kept: i32) -> Option<&Vec<f64>> {
        let table = if explode { &self.exploding } else { &self.plain };
        table.get(&key(rolled, kept))
    }

    pub fn len(&self) -> usize {
        self.exploding.len() + self.plain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProbabilityProvider for ProbabilityTables {
    fn p(&self, tn: i32, rolled: i32, kept: i32, explode: bool) -> Result<f64, EngineError> {
        let (rolled, kept, bonus) = normalize(rolled, kept, 0);
        let x = tn - bonus;
        if x <= 0 {
            return Ok(1.0);
        }
        if kept == 0 {
            return Ok(0.0);
        }
        let row = self
            .row(explode, rolled, kept)
            .ok_or(EngineError::MissingProbabilityTable {
                rolled,
                kept,
                explode,
            })?;
        Ok(row.get(x as usize).or(row.last()).copied().unwrap_or(0.0))
    }

    fn mean_roll(&self, rolled: i32, kept: i32, explode: bool) -> i32 {
        let (rolled, kept, bonus) = normalize(rolled, kept, 0);
        let base = self
            .means
            .get(&(explode, key(rolled, kept)))
            .copied()
            .unwrap_or_else(|| estimate_mean(rolled, kept, explode));
        base + bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_tables() -> ProbabilityTables {
        ProbabilityTables::generate(2_000, 42)
    }

    #[test]
    fn test_tables_cover_every_normalized_pool() {
        let tables = small_tables();
        // 66 (rolled, kept) pairs, exploding and plain
        assert_eq!(tables.len(), 132);
    }

    #[test]
    fn test_edge_policy() {
        let tables = small_tables();
        assert_eq!(tables.p(0, 5, 2, true), Ok(1.0));
        assert_eq!(tables.p(-10, 5, 2, true), Ok(1.0));
        let far = tables.p(10_000, 5, 2, true).unwrap();
        assert!(far > 0.0, "beyond the table uses the smallest recorded probability");
        assert_eq!(tables.p(5, 0, 0, true), Ok(0.0));
    }

    #[test]
    fn test_probability_is_monotonic() {
        let tables = small_tables();
        let mut prev = 1.0;
        for tn in 0..60 {
            let p = tables.p(tn, 7, 3, true).unwrap();
            assert!(p <= prev + f64::EPSILON);
            prev = p;
        }
    }

    #[test]
    fn test_mean_roll_is_sensible() {
        let tables = small_tables();
        let two_k_two = tables.mean_roll(2, 2, true);
        let seven_k_two = tables.mean_roll(7, 2, true);
        assert!((8..=14).contains(&two_k_two), "2k2 mean {two_k_two}");
        assert!(seven_k_two > two_k_two);
        assert!((14..=22).contains(&seven_k_two), "7k2 mean {seven_k_two}");
    }

    #[test]
    fn test_bonus_from_normalization_is_added() {
        let tables = small_tables();
        // 10k12 normalizes to 10k10+2
        assert_eq!(tables.mean_roll(10, 12, true), tables.mean_roll(10, 10, true) + 2);
        assert_eq!(tables.p(12, 10, 12, false), tables.p(10, 10, 10, false));
    }

    #[test]
    fn test_fallback_mean_without_tables() {
        let empty = ProbabilityTables::default();
        assert_eq!(empty.mean_roll(7, 2, true), estimate_mean(7, 2, true));
        assert_eq!(estimate_mean(7, 2, true), 19);
        assert_eq!(estimate_mean(0, 0, true), 0);
    }

    #[test]
    fn test_missing_table_row_is_an_error() {
        let empty = ProbabilityTables::default();
        assert_eq!(
            empty.p(20, 7, 2, true),
            Err(EngineError::MissingProbabilityTable {
                rolled: 7,
                kept: 2,
                explode: true
            })
        );
        // trivial targets need no table
        assert_eq!(empty.p(0, 7, 2, true), Ok(1.0));
        assert_eq!(empty.p(20, 3, 0, true), Ok(0.0));
    }

    #[test]
    fn test_json_round_trip_keeps_means() {
        let tables = ProbabilityTables::generate(200, 1);
        let json = tables.to_json().unwrap();
        let loaded = ProbabilityTables::from_json(&json).unwrap();
        assert_eq!(loaded.mean_roll(6, 3, true), tables.mean_roll(6, 3, true));
        assert_eq!(loaded.p(20, 6, 3, true), tables.p(20, 6, 3, true));
    }
}
