//! Trial-scoped combat state.
//!
//! The context owns everything one trial mutates: the characters, their
//! groups and formation, the actions in flight, the clock, and the dice.
//! It also carries the shared probability tables so strategies can reason
//! about odds without sampling.

use crate::actions::{ActionArena, ContestedAction};
use crate::character::{Character, CharacterId, LAST_PHASE};
use crate::engine::Outcome;
use crate::error::{ConfigError, EngineError};
use crate::events::Event;
use crate::formation::{Formation, FormationKind};
use crate::groups::Group;
use crate::probability::{ProbabilityProvider, ProbabilityTables};
use crate::roll_provider::{DiceRollProvider, RollProvider};
use crate::skills::Skill;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

pub struct Context {
    /// Kept in initiative order.
    characters: Vec<Character>,
    groups: Vec<Group>,
    formation: Formation,
    actions: ActionArena,
    round: u32,
    phase: u8,
    still_moving: Vec<CharacterId>,
    outcome: Option<Outcome>,
    probabilities: Arc<dyn ProbabilityProvider>,
    roll_provider: Box<dyn RollProvider + Send>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("characters", &self.characters)
            .field("groups", &self.groups)
            .field("formation", &self.formation.kind())
            .field("round", &self.round)
            .field("phase", &self.phase)
            .field("outcome", &self.outcome)
            .finish()
    }
}

impl Context {
    /// A context for `groups` fighting in the open, with seed 0 dice and
    /// the shared probability tables.
    pub fn new(groups: Vec<Vec<Character>>) -> Result<Self, ConfigError> {
        if groups.len() < 2 {
            return Err(ConfigError::TooFewGroups(groups.len()));
        }
        let mut seen = HashSet::new();
        let mut characters = Vec::new();
        let mut members = Vec::new();
        for (i, group) in groups.into_iter().enumerate() {
            if group.is_empty() {
                return Err(ConfigError::EmptyGroup(i));
            }
            let mut ids = Vec::new();
            for character in group {
                if !seen.insert(character.id()) {
                    return Err(ConfigError::DuplicateCharacter(character.name().to_string()));
                }
                ids.push(character.id());
                characters.push(character);
            }
            members.push(Group::new(ids));
        }
        let formation = Formation::new(FormationKind::Open, &members)?;
        let mut ctx = Self {
            characters,
            groups: members,
            formation,
            actions: ActionArena::new(),
            round: 0,
            phase: 0,
            still_moving: Vec::new(),
            outcome: None,
            probabilities: ProbabilityTables::shared(),
            roll_provider: Box::new(DiceRollProvider::new(0)),
        };
        ctx.observe_starting_tns();
        Ok(ctx)
    }

    pub fn with_seed(self, seed: u64) -> Self {
        self.with_roll_provider(Box::new(DiceRollProvider::new(seed)))
    }

    pub fn with_roll_provider(mut self, provider: Box<dyn RollProvider + Send>) -> Self {
        self.roll_provider = provider;
        self
    }

    pub fn with_probabilities(mut self, probabilities: Arc<dyn ProbabilityProvider>) -> Self {
        self.probabilities = probabilities;
        self
    }

    pub fn with_formation(mut self, kind: FormationKind) -> Result<Self, ConfigError> {
        self.formation = Formation::new(kind, &self.groups)?;
        Ok(self)
    }

    /// Everyone starts out knowing everyone else's TN to be hit.
    fn observe_starting_tns(&mut self) {
        let tns: Vec<(CharacterId, i32)> = self
            .characters
            .iter()
            .map(|c| (c.id(), c.tn_to_hit()))
            .collect();
        for character in &mut self.characters {
            let me = character.id();
            for (other, tn) in &tns {
                if *other != me {
                    character.knowledge_mut().observe_tn_to_hit(*other, *tn);
                }
            }
        }
    }

    // ---- characters ----

    pub fn character(&self, id: CharacterId) -> Result<&Character, EngineError> {
        self.characters
            .iter()
            .find(|c| c.id() == id)
            .ok_or(EngineError::UnknownCharacter(id))
    }

    pub fn character_mut(&mut self, id: CharacterId) -> Result<&mut Character, EngineError> {
        self.characters
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or(EngineError::UnknownCharacter(id))
    }

    /// Characters in initiative order.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.iter()
    }

    pub fn character_ids(&self) -> Vec<CharacterId> {
        self.characters.iter().map(|c| c.id()).collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name() == name)
    }

    // ---- sides ----

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group_of(&self, id: CharacterId) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(id))
    }

    pub fn are_allies(&self, a: CharacterId, b: CharacterId) -> bool {
        a == b || self.group_of(a).is_some_and(|g| Some(g) == self.group_of(b))
    }

    pub fn enemies_of(&self, id: CharacterId) -> Vec<CharacterId> {
        self.characters
            .iter()
            .map(|c| c.id())
            .filter(|other| !self.are_allies(id, *other))
            .collect()
    }

    pub fn formation(&self) -> &Formation {
        &self.formation
    }

    pub fn actions(&self) -> &ActionArena {
        &self.actions
    }

    pub fn actions_mut(&mut self) -> &mut ActionArena {
        &mut self.actions
    }

    // ---- time ----

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn phase(&self) -> u8 {
        self.phase
    }

    pub fn next_phase(&mut self) -> Result<(), EngineError> {
        if self.phase >= LAST_PHASE {
            return Err(EngineError::PhaseOverflow);
        }
        self.phase += 1;
        Ok(())
    }

    pub(crate) fn set_phase(&mut self, phase: u8) {
        self.phase = phase.min(LAST_PHASE);
    }

    pub fn next_round(&mut self) {
        self.round += 1;
        self.phase = 0;
    }

    // ---- odds ----

    pub fn probabilities(&self) -> &dyn ProbabilityProvider {
        self.probabilities.as_ref()
    }

    pub fn p(&self, tn: i32, rolled: i32, kept: i32, explode: bool) -> Result<f64, EngineError> {
        self.probabilities.p(tn, rolled, kept, explode)
    }

    pub fn mean_roll(&self, rolled: i32, kept: i32, explode: bool) -> i32 {
        self.probabilities.mean_roll(rolled, kept, explode)
    }

    // ---- scheduling ----

    /// Sort characters best first: more actions, earlier actions, then
    /// higher Void. Equal priorities keep their order.
    pub fn reevaluate_initiative(&mut self) {
        let max_actions = self
            .characters
            .iter()
            .filter(|c| c.is_fighting())
            .map(|c| c.actions().len())
            .max()
            .unwrap_or(0);
        self.characters
            .sort_by_key(|c| Reverse(c.initiative_priority(max_actions)));
    }

    /// Everyone still fighting may move again this phase.
    pub fn reset_still_moving(&mut self) {
        self.still_moving = self
            .characters
            .iter()
            .filter(|c| c.is_fighting())
            .map(|c| c.id())
            .collect();
    }

    pub fn is_anybody_still_moving(&self) -> bool {
        !self.still_moving.is_empty()
    }

    pub fn is_still_moving(&self, id: CharacterId) -> bool {
        self.still_moving.contains(&id)
    }

    pub fn stop_moving(&mut self, id: CharacterId) {
        self.still_moving.retain(|other| *other != id);
    }

    /// Apply a status event. Returns the outcome when it ends combat.
    pub fn update_status(&mut self, event: &Event) -> Option<Outcome> {
        let subject = event.subject()?;
        if event.is_not_moving() {
            self.stop_moving(subject);
            return None;
        }
        if !event.is_defeat() {
            return None;
        }
        self.stop_moving(subject);
        let fighting: Vec<usize> = self
            .groups
            .iter()
            .enumerate()
            .filter(|(_, g)| {
                g.members()
                    .iter()
                    .any(|id| self.character(*id).is_ok_and(|c| c.is_fighting()))
            })
            .map(|(i, _)| i)
            .collect();
        if fighting.len() > 1 {
            return None;
        }
        let outcome = match fighting.first() {
            Some(group) => Outcome::Victory { group: *group },
            None => Outcome::MutualDefeat,
        };
        self.outcome = Some(outcome);
        Some(outcome)
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Take everyone who is no longer fighting out of the formation.
    pub fn remove_defeated_from_formation(&mut self) {
        let defeated: Vec<CharacterId> = self
            .characters
            .iter()
            .filter(|c| !c.is_fighting() && self.formation.contains(c.id()))
            .map(|c| c.id())
            .collect();
        for id in defeated {
            self.formation.remove(id);
        }
    }

    // ---- rolls ----

    pub fn roll_skill(
        &mut self,
        subject: CharacterId,
        target: Option<CharacterId>,
        skill: Skill,
        vp: u32,
    ) -> Result<i32, EngineError> {
        let me = self.character(subject)?;
        let params = me.skill_roll_params(target, skill, vp);
        let explode = !me.crippled();
        let mutator = me.mutator();
        let roll = self
            .roll_provider
            .skill_roll(subject, skill, params, explode, mutator.as_ref());
        tracing::debug!(character = %subject, skill = %skill, params = %params, roll, "skill roll");
        Ok(roll)
    }

    pub fn roll_damage(
        &mut self,
        subject: CharacterId,
        target: CharacterId,
        skill: Skill,
        extra_rolled: i32,
    ) -> Result<i32, EngineError> {
        let me = self.character(subject)?;
        let params = me.damage_roll_params(Some(target), skill, extra_rolled);
        let mutator = me.mutator();
        let roll = self.roll_provider.damage_roll(subject, params, mutator.as_ref());
        tracing::debug!(character = %subject, params = %params, roll, "damage roll");
        Ok(roll)
    }

    pub fn roll_wound_check(&mut self, subject: CharacterId, vp: u32) -> Result<i32, EngineError> {
        let me = self.character(subject)?;
        let params = me.wound_check_roll_params(vp);
        let mutator = me.mutator();
        let roll = self
            .roll_provider
            .wound_check_roll(subject, params, mutator.as_ref());
        tracing::debug!(character = %subject, params = %params, roll, "wound check roll");
        Ok(roll)
    }

    pub fn roll_initiative(&mut self, subject: CharacterId) -> Result<Vec<u8>, EngineError> {
        let params = self.character(subject)?.initiative_roll_params();
        Ok(self.roll_provider.initiative_roll(subject, params))
    }

    /// Roll both sides of a contest and record them on `action`.
    pub fn roll_contested(&mut self, action: &mut ContestedAction) -> Result<(), EngineError> {
        let (challenger, defender) = (action.challenger(), action.defender());
        let (challenger_skill, defender_skill) = (action.challenger_skill(), action.defender_skill());
        // only the challenger spends Void on a contest
        let challenger_roll =
            self.roll_contest_side(challenger, defender, challenger_skill, defender_skill, action.vp)?;
        let defender_roll =
            self.roll_contest_side(defender, challenger, defender_skill, challenger_skill, 0)?;
        if challenger == action.subject {
            action.set_skill_roll(challenger_roll);
            action.set_opponent_roll(defender_roll);
        } else {
            action.set_skill_roll(defender_roll);
            action.set_opponent_roll(challenger_roll);
        }
        Ok(())
    }

    fn roll_contest_side(
        &mut self,
        roller: CharacterId,
        opponent: CharacterId,
        skill: Skill,
        contested_skill: Skill,
        vp: u32,
    ) -> Result<i32, EngineError> {
        let me = self.character(roller)?;
        let them = self.character(opponent)?;
        let params = me
            .roll_parameters()
            .contested(me, them, skill, contested_skill, vp);
        let explode = !me.crippled();
        let mutator = me.mutator();
        Ok(self
            .roll_provider
            .skill_roll(roller, skill, params, explode, mutator.as_ref()))
    }

    /// Restore the pre-combat state for another trial.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.round = 0;
        self.phase = 0;
        self.actions.clear();
        self.still_moving.clear();
        self.outcome = None;
        for character in &mut self.characters {
            character.reset();
        }
        self.formation = Formation::new(self.formation.kind(), &self.groups)?;
        self.observe_starting_tns();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roll_provider::RollKind;
    use crate::testing::TestHarness;

    #[test]
    fn test_group_validation() {
        assert!(matches!(
            Context::new(vec![vec![Character::new("Alone")]]),
            Err(ConfigError::TooFewGroups(1))
        ));
        assert!(matches!(
            Context::new(vec![vec![Character::new("A")], vec![]]),
            Err(ConfigError::EmptyGroup(1))
        ));
        let twin = Character::new("Twin");
        assert!(matches!(
            Context::new(vec![vec![twin.clone()], vec![twin]]),
            Err(ConfigError::DuplicateCharacter(_))
        ));
    }

    #[test]
    fn test_everyone_knows_starting_tns() {
        let mut guarded = Character::new("Guarded");
        guarded.set_skill(Skill::Parry, 3).unwrap();
        let open = Character::new("Open");
        let ctx = Context::new(vec![vec![guarded], vec![open]]).unwrap();
        let guarded = ctx.find_by_name("Guarded").unwrap().id();
        let open = ctx.find_by_name("Open").unwrap();
        assert_eq!(open.knowledge().tn_to_hit(guarded), 20);
    }

    #[test]
    fn test_phase_overflow() {
        let mut harness = TestHarness::duel();
        harness.set_phase(LAST_PHASE);
        assert_eq!(
            harness.context_mut().next_phase(),
            Err(EngineError::PhaseOverflow)
        );
        harness.context_mut().next_round();
        assert_eq!(harness.context().phase(), 0);
        assert_eq!(harness.context().round(), 1);
    }

    #[test]
    fn test_initiative_order_puts_best_first() {
        let mut harness = TestHarness::duel();
        let (test, control) = (harness.test_id(), harness.control_id());
        harness.set_actions(control, vec![6, 8]);
        harness.set_actions(test, vec![2, 9]);
        harness.context_mut().reevaluate_initiative();
        assert_eq!(harness.context().character_ids(), vec![test, control]);
        harness.set_actions(control, vec![1, 2, 3]);
        harness.context_mut().reevaluate_initiative();
        assert_eq!(harness.context().character_ids(), vec![control, test]);
    }

    #[test]
    fn test_still_moving_and_status() {
        let mut harness = TestHarness::duel();
        let (test, control) = (harness.test_id(), harness.control_id());
        let ctx = harness.context_mut();
        ctx.reset_still_moving();
        assert!(ctx.is_still_moving(test));
        assert_eq!(ctx.update_status(&Event::HoldAction { subject: test }), None);
        assert!(!ctx.is_still_moving(test));
        assert!(ctx.is_anybody_still_moving());

        // a defeat while the other side still stands is not the end
        ctx.character_mut(control).unwrap().take_sw(4);
        let outcome = ctx.update_status(&Event::Unconscious { subject: control });
        assert_eq!(outcome, Some(Outcome::Victory { group: 1 }));
        assert_eq!(ctx.outcome(), Some(Outcome::Victory { group: 1 }));
        assert!(!ctx.is_anybody_still_moving());
    }

    #[test]
    fn test_mutual_defeat() {
        let mut harness = TestHarness::duel();
        let (test, control) = (harness.test_id(), harness.control_id());
        let ctx = harness.context_mut();
        ctx.character_mut(test).unwrap().take_sw(5);
        ctx.character_mut(control).unwrap().take_sw(5);
        assert_eq!(
            ctx.update_status(&Event::Death { subject: test }),
            Some(Outcome::MutualDefeat)
        );
    }

    #[test]
    fn test_rolls_come_from_the_provider() {
        let mut harness = TestHarness::duel();
        let (test, control) = (harness.test_id(), harness.control_id());
        harness.roll_provider().rig(test, RollKind::Skill(Skill::Attack), 33);
        harness.roll_provider().rig(test, RollKind::Damage, 12);
        harness.roll_provider().queue_initiative(test, vec![4, 1]);
        let ctx = harness.context_mut();
        assert_eq!(ctx.roll_skill(test, Some(control), Skill::Attack, 0).unwrap(), 33);
        assert_eq!(ctx.roll_damage(test, control, Skill::Attack, 2).unwrap(), 12);
        assert_eq!(ctx.roll_initiative(test).unwrap(), vec![1, 4]);
        assert!(matches!(
            ctx.roll_wound_check(CharacterId::new(), 0),
            Err(EngineError::UnknownCharacter(_))
        ));
    }

    #[test]
    fn test_contested_roll_records_both_sides() {
        let mut harness = TestHarness::duel();
        let (test, control) = (harness.test_id(), harness.control_id());
        harness.roll_provider().rig(test, RollKind::Skill(Skill::Attack), 30);
        harness.roll_provider().rig(control, RollKind::Skill(Skill::Parry), 18);
        let mut contest =
            ContestedAction::new(test, control, control, Skill::Attack, Skill::Parry, 0).unwrap();
        harness.context_mut().roll_contested(&mut contest).unwrap();
        assert_eq!(contest.skill_roll(), Some(30));
        assert_eq!(contest.opponent_roll(), Some(18));
        assert_eq!(contest.margin(), Some(12));
        assert_eq!(contest.extra_damage_dice(), 2);
    }

    #[test]
    fn test_reset_restores_the_trial() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.set_phase(5);
        harness.context_mut().character_mut(test).unwrap().take_sw(2);
        harness.context_mut().reset().unwrap();
        let ctx = harness.context();
        assert_eq!((ctx.round(), ctx.phase()), (0, 0));
        assert_eq!(ctx.character(test).unwrap().sw(), 0);
        assert!(ctx.outcome().is_none());
        assert_eq!(
            ctx.character(harness.control_id()).unwrap().knowledge().tn_to_hit(test),
            10
        );
    }
}
