//! What one character has observed about the others.
//!
//! Knowledge is never authoritative game state. Strategies consult it when
//! they reason about an opponent whose true numbers they should not see.

use crate::character::CharacterId;
use crate::modifiers::{Modifier, ModifierId};
use crate::skills::{Ring, Skill};
use std::collections::HashMap;

/// Assumed actions per round for a character never seen acting.
pub const DEFAULT_ACTIONS_PER_ROUND: u32 = 2;
/// Assumed attack roll for a character never seen attacking.
pub const DEFAULT_ATTACK_ROLL: i32 = 27;
/// Assumed damage roll for a character never seen dealing damage.
pub const DEFAULT_DAMAGE_ROLL: i32 = 18;
/// Assumed TN to hit for a character whose TN was never observed.
pub const DEFAULT_TN_TO_HIT: i32 = 20;
/// Ring rank assumed for every opponent.
pub const THEORETICAL_RING_RANK: i32 = 3;

/// Per-character observation log.
#[derive(Debug, Clone, Default)]
pub struct Knowledge {
    actions_per_round: HashMap<CharacterId, u32>,
    actions_this_round: HashMap<CharacterId, u32>,
    attack_rolls: HashMap<CharacterId, Vec<i32>>,
    damage_rolls: HashMap<CharacterId, Vec<i32>>,
    modifiers: HashMap<CharacterId, Vec<Modifier>>,
    tn_to_hit: HashMap<CharacterId, i32>,
    wounds: HashMap<CharacterId, i32>,
}

fn average(rolls: Option<&Vec<i32>>, default: i32) -> i32 {
    match rolls {
        Some(rolls) if !rolls.is_empty() => rolls.iter().sum::<i32>() / rolls.len() as i32,
        _ => default,
    }
}

impl Knowledge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything. Called between trials.
    pub fn clear(&mut self) {
        self.actions_per_round.clear();
        self.actions_this_round.clear();
        self.attack_rolls.clear();
        self.damage_rolls.clear();
        self.modifiers.clear();
        self.tn_to_hit.clear();
        self.wounds.clear();
    }

    pub fn actions_per_round(&self, character: CharacterId) -> u32 {
        self.actions_per_round
            .get(&character)
            .copied()
            .unwrap_or(DEFAULT_ACTIONS_PER_ROUND)
    }

    pub fn actions_taken(&self, character: CharacterId) -> u32 {
        self.actions_this_round.get(&character).copied().unwrap_or(0)
    }

    pub fn actions_remaining(&self, character: CharacterId) -> u32 {
        self.actions_per_round(character)
            .saturating_sub(self.actions_taken(character))
    }

    pub fn average_attack_roll(&self, character: CharacterId) -> i32 {
        average(self.attack_rolls.get(&character), DEFAULT_ATTACK_ROLL)
    }

    pub fn average_damage_roll(&self, character: CharacterId) -> i32 {
        average(self.damage_rolls.get(&character), DEFAULT_DAMAGE_ROLL)
    }

    /// Known modifiers on `character` for a roll of `skill` against `target`.
    pub fn modifier(&self, character: CharacterId, target: Option<CharacterId>, skill: Skill) -> i32 {
        self.modifiers
            .get(&character)
            .map(|mods| mods.iter().map(|m| m.apply(target, skill)).sum())
            .unwrap_or(0)
    }

    /// Best known TN to hit `target`, net of known modifiers.
    pub fn tn_to_hit(&self, target: CharacterId) -> i32 {
        self.tn_to_hit
            .get(&target)
            .copied()
            .unwrap_or(DEFAULT_TN_TO_HIT)
    }

    pub fn wounds(&self, character: CharacterId) -> i32 {
        self.wounds.get(&character).copied().unwrap_or(0)
    }

    /// Roll this round's action counts into the per-round maxima.
    pub fn end_of_round(&mut self) {
        for (character, taken) in self.actions_this_round.iter_mut() {
            let best = self.actions_per_round.entry(*character).or_insert(0);
            *best = (*best).max(*taken);
            *taken = 0;
        }
    }

    pub fn observe_action(&mut self, character: CharacterId) {
        let taken = self.actions_this_round.entry(character).or_insert(0);
        *taken += 1;
        let taken = *taken;
        let best = self.actions_per_round.entry(character).or_insert(taken);
        *best = (*best).max(taken);
    }

    pub fn observe_attack_roll(&mut self, character: CharacterId, roll: i32) {
        self.attack_rolls.entry(character).or_default().push(roll);
    }

    pub fn observe_damage_roll(&mut self, character: CharacterId, damage: i32) {
        self.damage_rolls.entry(character).or_default().push(damage);
    }

    pub fn observe_modifier_added(&mut self, character: CharacterId, modifier: Modifier) {
        self.modifiers.entry(character).or_default().push(modifier);
    }

    pub fn observe_modifier_removed(&mut self, character: CharacterId, modifier: ModifierId) {
        if let Some(mods) = self.modifiers.get_mut(&character) {
            mods.retain(|m| m.id != modifier);
        }
    }

    /// Record a TN to hit. The first observation wins.
    pub fn observe_tn_to_hit(&mut self, character: CharacterId, tn: i32) {
        let adjustment = self.modifier(character, None, Skill::TnToHit);
        self.tn_to_hit.entry(character).or_insert(tn - adjustment);
    }

    pub fn observe_wounds(&mut self, character: CharacterId, damage: i32) {
        *self.wounds.entry(character).or_insert(0) += damage;
    }
}

/// An opponent as the observer believes it to be.
pub struct TheoreticalCharacter<'a> {
    knowledge: &'a Knowledge,
    character: CharacterId,
}

impl<'a> TheoreticalCharacter<'a> {
    pub fn new(knowledge: &'a Knowledge, character: CharacterId) -> Self {
        Self {
            knowledge,
            character,
        }
    }

    pub fn ring(&self, _ring: Ring) -> i32 {
        THEORETICAL_RING_RANK
    }

    pub fn tn_to_hit(&self) -> i32 {
        self.knowledge.tn_to_hit(self.character)
            + self.knowledge.modifier(self.character, None, Skill::TnToHit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_unobserved_characters() {
        let knowledge = Knowledge::new();
        let stranger = CharacterId::new();
        assert_eq!(knowledge.actions_per_round(stranger), 2);
        assert_eq!(knowledge.average_attack_roll(stranger), 27);
        assert_eq!(knowledge.average_damage_roll(stranger), 18);
        assert_eq!(knowledge.tn_to_hit(stranger), 20);
        assert_eq!(knowledge.wounds(stranger), 0);
    }

    #[test]
    fn test_actions_roll_into_per_round_maximum() {
        let mut knowledge = Knowledge::new();
        let enemy = CharacterId::new();
        for _ in 0..3 {
            knowledge.observe_action(enemy);
        }
        assert_eq!(knowledge.actions_per_round(enemy), 3);
        assert_eq!(knowledge.actions_remaining(enemy), 0);
        knowledge.end_of_round();
        assert_eq!(knowledge.actions_taken(enemy), 0);
        knowledge.observe_action(enemy);
        knowledge.end_of_round();
        assert_eq!(knowledge.actions_per_round(enemy), 3);
    }

    #[test]
    fn test_averages() {
        let mut knowledge = Knowledge::new();
        let enemy = CharacterId::new();
        knowledge.observe_attack_roll(enemy, 20);
        knowledge.observe_attack_roll(enemy, 25);
        knowledge.observe_damage_roll(enemy, 10);
        knowledge.observe_damage_roll(enemy, 15);
        assert_eq!(knowledge.average_attack_roll(enemy), 22);
        assert_eq!(knowledge.average_damage_roll(enemy), 12);
    }

    #[test]
    fn test_first_tn_observation_wins_net_of_modifiers() {
        let mut knowledge = Knowledge::new();
        let enemy = CharacterId::new();
        let penalty = Modifier::new(enemy, vec![Skill::TnToHit], -5);
        let penalty_id = penalty.id;
        knowledge.observe_modifier_added(enemy, penalty);
        knowledge.observe_tn_to_hit(enemy, 10);
        knowledge.observe_tn_to_hit(enemy, 30);
        assert_eq!(knowledge.tn_to_hit(enemy), 15);

        let theoretical = TheoreticalCharacter::new(&knowledge, enemy);
        assert_eq!(theoretical.tn_to_hit(), 10);
        assert_eq!(theoretical.ring(Ring::Fire), 3);

        knowledge.observe_modifier_removed(enemy, penalty_id);
        assert_eq!(TheoreticalCharacter::new(&knowledge, enemy).tn_to_hit(), 15);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut knowledge = Knowledge::new();
        let enemy = CharacterId::new();
        knowledge.observe_wounds(enemy, 2);
        knowledge.observe_tn_to_hit(enemy, 25);
        knowledge.clear();
        assert_eq!(knowledge.wounds(enemy), 0);
        assert_eq!(knowledge.tn_to_hit(enemy), 20);
    }
}
