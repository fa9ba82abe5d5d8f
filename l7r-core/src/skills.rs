//! Rings, skills, advantages and disadvantages.
//!
//! "Skill" is slightly overloaded: besides purchasable skills it also names
//! the non-skill roll kinds (damage, initiative, tn to hit, wound check) so
//! that modifiers, floating bonuses and extra dice can be keyed uniformly.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest rank a purchasable skill may reach.
pub const MAX_SKILL_RANK: u8 = 5;
/// Highest rank a ring may reach.
pub const MAX_RING_RANK: u8 = 6;
/// Lowest rank a ring may have.
pub const MIN_RING_RANK: u8 = 1;

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(['_', '-'], " ")
}

/// One of the five elemental rings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ring {
    Air,
    Earth,
    Fire,
    Water,
    Void,
}

impl Ring {
    pub fn name(&self) -> &'static str {
        match self {
            Ring::Air => "air",
            Ring::Earth => "earth",
            Ring::Fire => "fire",
            Ring::Water => "water",
            Ring::Void => "void",
        }
    }

    pub fn all() -> &'static [Ring] {
        &[Ring::Air, Ring::Earth, Ring::Fire, Ring::Water, Ring::Void]
    }
}

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Ring {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "air" => Ok(Ring::Air),
            "earth" => Ok(Ring::Earth),
            "fire" => Ok(Ring::Fire),
            "water" => Ok(Ring::Water),
            "void" => Ok(Ring::Void),
            _ => Err(ConfigError::UnknownRing(s.to_string())),
        }
    }
}

/// A skill or roll kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Attack,
    Counterattack,
    DoubleAttack,
    Feint,
    Iaijutsu,
    Lunge,
    Parry,
    Worldliness,
    // Non-skills: roll kinds that take modifiers but cannot be purchased.
    Damage,
    Initiative,
    TnToHit,
    WoundCheck,
}

/// Skills that make an attack roll.
pub const ATTACK_SKILLS: &[Skill] = &[
    Skill::Attack,
    Skill::Counterattack,
    Skill::DoubleAttack,
    Skill::Feint,
    Skill::Iaijutsu,
    Skill::Lunge,
];

/// Skills that may be used out of turn by paying the interrupt cost.
pub const INTERRUPT_SKILLS: &[Skill] = &[Skill::Counterattack, Skill::Parry];

impl Skill {
    pub fn name(&self) -> &'static str {
        match self {
            Skill::Attack => "attack",
            Skill::Counterattack => "counterattack",
            Skill::DoubleAttack => "double attack",
            Skill::Feint => "feint",
            Skill::Iaijutsu => "iaijutsu",
            Skill::Lunge => "lunge",
            Skill::Parry => "parry",
            Skill::Worldliness => "worldliness",
            Skill::Damage => "damage",
            Skill::Initiative => "initiative",
            Skill::TnToHit => "tn to hit",
            Skill::WoundCheck => "wound check",
        }
    }

    /// The ring rolled alongside this skill.
    pub fn ring(&self) -> Ring {
        match self {
            Skill::Attack
            | Skill::Counterattack
            | Skill::Damage
            | Skill::DoubleAttack
            | Skill::Feint
            | Skill::Iaijutsu
            | Skill::Lunge => Ring::Fire,
            Skill::Parry | Skill::TnToHit => Ring::Air,
            Skill::WoundCheck => Ring::Water,
            Skill::Initiative | Skill::Worldliness => Ring::Void,
        }
    }

    pub fn is_attack(&self) -> bool {
        ATTACK_SKILLS.contains(self)
    }

    pub fn is_interrupt(&self) -> bool {
        INTERRUPT_SKILLS.contains(self)
    }

    /// Whether characters can buy ranks in this skill.
    pub fn is_purchasable(&self) -> bool {
        !matches!(
            self,
            Skill::Damage | Skill::Initiative | Skill::TnToHit | Skill::WoundCheck
        )
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Skill {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "attack" => Ok(Skill::Attack),
            "counterattack" => Ok(Skill::Counterattack),
            "double attack" => Ok(Skill::DoubleAttack),
            "feint" => Ok(Skill::Feint),
            "iaijutsu" => Ok(Skill::Iaijutsu),
            "lunge" => Ok(Skill::Lunge),
            "parry" => Ok(Skill::Parry),
            "worldliness" => Ok(Skill::Worldliness),
            "damage" => Ok(Skill::Damage),
            "initiative" => Ok(Skill::Initiative),
            "tn to hit" => Ok(Skill::TnToHit),
            "wound check" => Ok(Skill::WoundCheck),
            _ => Err(ConfigError::UnknownSkill(s.to_string())),
        }
    }
}

/// Character advantages. Only a few change combat math; the rest are
/// accepted so that complete character records round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Advantage {
    Charming,
    Discerning,
    Fierce,
    GreatDestiny,
    HigherPurpose,
    Lucky,
    QuickHealer,
    StrengthOfTheEarth,
    Tactician,
    Worldly,
}

impl Advantage {
    pub fn name(&self) -> &'static str {
        match self {
            Advantage::Charming => "charming",
            Advantage::Discerning => "discerning",
            Advantage::Fierce => "fierce",
            Advantage::GreatDestiny => "great destiny",
            Advantage::HigherPurpose => "higher purpose",
            Advantage::Lucky => "lucky",
            Advantage::QuickHealer => "quick healer",
            Advantage::StrengthOfTheEarth => "strength of the earth",
            Advantage::Tactician => "tactician",
            Advantage::Worldly => "worldly",
        }
    }
}

impl FromStr for Advantage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "charming" => Ok(Advantage::Charming),
            "discerning" => Ok(Advantage::Discerning),
            "fierce" => Ok(Advantage::Fierce),
            "great destiny" => Ok(Advantage::GreatDestiny),
            "higher purpose" => Ok(Advantage::HigherPurpose),
            "lucky" => Ok(Advantage::Lucky),
            "quick healer" => Ok(Advantage::QuickHealer),
            "strength of the earth" => Ok(Advantage::StrengthOfTheEarth),
            "tactician" => Ok(Advantage::Tactician),
            "worldly" => Ok(Advantage::Worldly),
            _ => Err(ConfigError::UnknownAdvantage(s.to_string())),
        }
    }
}

/// Character disadvantages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disadvantage {
    BadReputation,
    Contrary,
    Driven,
    Emotional,
    Humble,
    LongTemper,
    PermanentWound,
    Proud,
    ShortTemper,
    SlowHealer,
    Unlucky,
}

impl Disadvantage {
    pub fn name(&self) -> &'static str {
        match self {
            Disadvantage::BadReputation => "bad reputation",
            Disadvantage::Contrary => "contrary",
            Disadvantage::Driven => "driven",
            Disadvantage::Emotional => "emotional",
            Disadvantage::Humble => "humble",
            Disadvantage::LongTemper => "long temper",
            Disadvantage::PermanentWound => "permanent wound",
            Disadvantage::Proud => "proud",
            Disadvantage::ShortTemper => "short temper",
            Disadvantage::SlowHealer => "slow healer",
            Disadvantage::Unlucky => "unlucky",
        }
    }
}

impl FromStr for Disadvantage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "bad reputation" => Ok(Disadvantage::BadReputation),
            "contrary" => Ok(Disadvantage::Contrary),
            "driven" => Ok(Disadvantage::Driven),
            "emotional" => Ok(Disadvantage::Emotional),
            "humble" => Ok(Disadvantage::Humble),
            "long temper" => Ok(Disadvantage::LongTemper),
            "permanent wound" => Ok(Disadvantage::PermanentWound),
            "proud" => Ok(Disadvantage::Proud),
            "short temper" => Ok(Disadvantage::ShortTemper),
            "slow healer" => Ok(Disadvantage::SlowHealer),
            "unlucky" => Ok(Disadvantage::Unlucky),
            _ => Err(ConfigError::UnknownDisadvantage(s.to_string())),
        }
    }
}
