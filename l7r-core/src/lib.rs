//! Combat simulation engine for L7R.
//!
//! This crate provides:
//! - Exploding ten-sided dice with roll-and-keep pools
//! - An event-driven rules engine where listeners turn events into responses
//! - Pluggable strategies for spending actions, void points and adventure points
//! - Batch trials that pit a control group against a test group
//!
//! # Quick Start
//!
//! ```ignore
//! use l7r_core::{run_trials, SimulationConfig, testing};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let factory = || {
//!         Ok::<_, l7r_core::ConfigError>(vec![
//!             vec![testing::create_sample_bushi("Akodo")],
//!             vec![testing::create_sample_brute("Hida")],
//!         ])
//!     };
//!     let config = SimulationConfig::new().with_trials(500).with_seed(1);
//!     let summary = run_trials(Arc::new(factory), &config).await?;
//!     println!("test group wins {:.1}%", 100.0 * summary.test_win_rate());
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod character;
pub mod character_builder;
pub mod config;
pub mod context;
pub mod dice;
pub mod engine;
pub mod error;
pub mod events;
pub mod features;
pub mod formation;
pub mod groups;
pub mod knowledge;
pub mod listeners;
pub mod modifiers;
pub mod optimizers;
pub mod play;
pub mod probability;
pub mod roll_params;
pub mod roll_provider;
pub mod skills;
pub mod strategies;
pub mod target_finders;
pub mod testing;
pub mod trial;
pub mod weapons;

// Primary public API
pub use character::{Character, CharacterId};
pub use character_builder::{CharacterBuilder, CharacterRecord, GroupRecord};
pub use config::SimulationConfig;
pub use context::Context;
pub use engine::{CombatEngine, Outcome};
pub use error::{ConfigError, EngineError};
pub use events::{Event, EventKind};
pub use features::{SummaryFeatures, TrialFeatures};
pub use formation::FormationKind;
pub use skills::{Advantage, Disadvantage, Ring, Skill};
pub use strategies::{Strategy, StrategyKind};
pub use testing::TestHarness;
pub use trial::{run_trial, run_trials, run_trials_blocking, CharacterFactory, RecordFactory};
pub use weapons::WeaponKind;
