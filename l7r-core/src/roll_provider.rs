//! Where rolls come from.
//!
//! The context owns one `RollProvider` per trial. The default rolls real
//! dice from a seeded ChaCha8 stream so a trial is reproducible from its
//! seed; tests swap in a provider that returns rigged results.

use crate::character::CharacterId;
use crate::dice::{self, Mutator, RollParams};
use crate::skills::Skill;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// The kinds of roll a character makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollKind {
    Skill(Skill),
    Damage,
    WoundCheck,
}

/// Produces roll results for characters.
///
/// Results include the parameter bonus. Damage dice always explode.
pub trait RollProvider: Send {
    fn skill_roll(
        &mut self,
        subject: CharacterId,
        skill: Skill,
        params: RollParams,
        explode: bool,
        mutator: &dyn Mutator,
    ) -> i32;

    fn damage_roll(&mut self, subject: CharacterId, params: RollParams, mutator: &dyn Mutator) -> i32;

    fn wound_check_roll(&mut self, subject: CharacterId, params: RollParams, mutator: &dyn Mutator) -> i32;

    /// Action phases for the round, ascending.
    fn initiative_roll(&mut self, subject: CharacterId, params: RollParams) -> Vec<u8>;
}

/// Rolls dice from a seeded RNG.
pub struct DiceRollProvider {
    rng: ChaCha8Rng,
}

impl DiceRollProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn roll(&mut self, params: RollParams, explode: bool, mutator: &dyn Mutator) -> i32 {
        let rolled = dice::roll_with_mutator(&mut self.rng, params, explode, mutator);
        if rolled.bonus != 0 {
            tracing::debug!(
                mutator = mutator.name(),
                bonus = rolled.bonus,
                "mutator adjusted roll"
            );
        }
        rolled.result
    }
}

impl RollProvider for DiceRollProvider {
    fn skill_roll(
        &mut self,
        _subject: CharacterId,
        _skill: Skill,
        params: RollParams,
        explode: bool,
        mutator: &dyn Mutator,
    ) -> i32 {
        self.roll(params, explode, mutator)
    }

    fn damage_roll(&mut self, _subject: CharacterId, params: RollParams, mutator: &dyn Mutator) -> i32 {
        self.roll(params, true, mutator)
    }

    fn wound_check_roll(&mut self, _subject: CharacterId, params: RollParams, mutator: &dyn Mutator) -> i32 {
        self.roll(params, true, mutator)
    }

    fn initiative_roll(&mut self, _subject: CharacterId, params: RollParams) -> Vec<u8> {
        dice::roll_initiative(&mut self.rng, params)
    }
}
