//! Error types for character configuration and the combat engine.

use crate::actions::ActionId;
use crate::character::CharacterId;
use thiserror::Error;

/// Errors raised while validating characters, groups, or simulation settings.
///
/// These are always reported before combat starts; nothing is clamped silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Unknown ring: {0}")]
    UnknownRing(String),

    #[error("Unknown skill: {0}")]
    UnknownSkill(String),

    #[error("Unknown advantage: {0}")]
    UnknownAdvantage(String),

    #[error("Unknown disadvantage: {0}")]
    UnknownDisadvantage(String),

    #[error("Unknown weapon: {0}")]
    UnknownWeapon(String),

    #[error("{name} may not be raised above {max} (requested {rank})")]
    RankTooHigh { name: String, rank: u8, max: u8 },

    #[error("{name} may not be lowered below {min} (requested {rank})")]
    RankTooLow { name: String, rank: u8, min: u8 },

    #[error("{0} is not a skill that can be purchased")]
    NotPurchasable(String),

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Unknown formation: {0}")]
    UnknownFormation(String),

    #[error("The {formation} formation needs exactly two groups, got {groups}")]
    FormationGroups {
        formation: &'static str,
        groups: usize,
    },

    #[error("Combat requires at least two groups, got {0}")]
    TooFewGroups(usize),

    #[error("Group {0} has no characters")]
    EmptyGroup(usize),

    #[error("Character {0} appears in more than one group")]
    DuplicateCharacter(String),

    #[error("Character name is required")]
    MissingName,

    #[error("Trial count must be at least 1")]
    NoTrials,

    #[error("Invalid configuration JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err.to_string())
    }
}

/// Illegal runtime transitions inside the engine.
///
/// Any of these means an engine bug or a corrupted trial, so the trial is
/// abandoned rather than retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Cannot advance past phase 10")]
    PhaseOverflow,

    #[error("Round {0} should begin in phase 0")]
    RoundStartedMidway(u32),

    #[error("Unknown character: {0}")]
    UnknownCharacter(CharacterId),

    #[error("Unknown action: {0:?}")]
    UnknownAction(ActionId),

    #[error("Action {0:?} is not an attack")]
    NotAnAttack(ActionId),

    #[error("Action {0:?} is not a parry")]
    NotAParry(ActionId),

    #[error("Action {0:?} is not a contest")]
    NotAContest(ActionId),

    #[error("Contest challenger {0} is neither the subject nor the target")]
    InvalidChallenger(CharacterId),

    #[error("{character} has no action die for phase {phase}")]
    NoSuchAction { character: String, phase: u8 },

    #[error("{character} cannot spend {amount} {resource} (has {available})")]
    NotEnoughResource {
        character: String,
        resource: &'static str,
        amount: u32,
        available: u32,
    },

    #[error("{character} does not hold the floating bonus being spent")]
    NoSuchFloatingBonus { character: String },

    #[error("{0} cannot act: not enough actions")]
    NotEnoughActions(String),

    #[error("No probability table for {rolled}k{kept} (exploding: {explode})")]
    MissingProbabilityTable { rolled: i32, kept: i32, explode: bool },

    #[error("Combat did not end within {0} rounds")]
    RoundLimitExceeded(u32),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Trial worker failed: {0}")]
    Worker(String),
}
