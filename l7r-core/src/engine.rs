//! The combat engine.
//!
//! The engine drives rounds and phases and dispatches events. Playable
//! events are stepped through one sub-event at a time, with each sub-event
//! fully settled before the next is asked for. Every other event is offered
//! to each character's listener in turn, and whatever a listener answers
//! with is dispatched before the next character hears the original event.
//!
//! The moment a status event leaves at most one group fighting, the engine
//! unwinds back to [`CombatEngine::run`] with the outcome.

use crate::character::{CharacterId, LAST_PHASE};
use crate::context::Context;
use crate::error::EngineError;
use crate::events::Event;
use crate::features::TrialFeatures;
use crate::groups::CONTROL_GROUP;
use crate::modifiers::ModifierId;
use crate::play::Play;
use serde::{Deserialize, Serialize};

/// Rounds a combat may last before it is abandoned.
pub const DEFAULT_MAX_ROUNDS: u32 = 100;

/// How a combat ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Only `group` still has anyone fighting.
    Victory { group: usize },
    /// Nobody is left fighting.
    MutualDefeat,
}

impl Outcome {
    /// -1 for a control victory, 1 for any other group, 0 for mutual defeat.
    pub fn winner(&self) -> i32 {
        match self {
            Outcome::Victory { group } if *group == CONTROL_GROUP => -1,
            Outcome::Victory { .. } => 1,
            Outcome::MutualDefeat => 0,
        }
    }
}

/// Why dispatch stopped early.
#[derive(Debug)]
enum Halt {
    CombatEnded(Outcome),
    Error(EngineError),
}

impl From<EngineError> for Halt {
    fn from(err: EngineError) -> Self {
        Halt::Error(err)
    }
}

pub struct CombatEngine {
    context: Context,
    features: TrialFeatures,
    history: Vec<Event>,
    record_history: bool,
    max_rounds: u32,
}

impl CombatEngine {
    pub fn new(context: Context) -> Self {
        let features = TrialFeatures::new();
        Self {
            context,
            features,
            history: Vec::new(),
            record_history: false,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Keep every dispatched event in [`CombatEngine::history`].
    pub fn with_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    pub fn into_context(self) -> Context {
        self.context
    }

    pub fn features(&self) -> &TrialFeatures {
        &self.features
    }

    pub fn history(&self) -> &[Event] {
        &self.history
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Dispatch one event and everything it sets off. Returns the outcome
    /// if combat ended along the way.
    pub fn dispatch(&mut self, event: Event) -> Result<Option<Outcome>, EngineError> {
        self.settle(|engine| engine.event(event))
    }

    /// Run one full round.
    pub fn run_round(&mut self) -> Result<Option<Outcome>, EngineError> {
        self.settle(Self::round)
    }

    /// Fight until one side is left standing.
    pub fn run(&mut self) -> Result<Outcome, EngineError> {
        if let Some(outcome) = self.context.outcome() {
            return Ok(outcome);
        }
        while self.context.round() < self.max_rounds {
            if let Some(outcome) = self.run_round()? {
                return Ok(outcome);
            }
        }
        tracing::warn!(rounds = self.max_rounds, "combat did not end");
        Err(EngineError::RoundLimitExceeded(self.max_rounds))
    }

    /// Put the context back to its pre-combat state and start a fresh
    /// record for another trial.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.context.reset()?;
        self.features = TrialFeatures::new();
        self.history.clear();
        Ok(())
    }

    fn settle(&mut self, f: impl FnOnce(&mut Self) -> Result<(), Halt>) -> Result<Option<Outcome>, EngineError> {
        match f(self) {
            Ok(()) => Ok(None),
            Err(Halt::CombatEnded(outcome)) => {
                tracing::info!(
                    round = self.context.round(),
                    phase = self.context.phase(),
                    winner = outcome.winner(),
                    "combat ended"
                );
                self.features.complete(&self.context, outcome);
                Ok(Some(outcome))
            }
            Err(Halt::Error(err)) => {
                tracing::warn!(
                    round = self.context.round(),
                    phase = self.context.phase(),
                    error = %err,
                    "trial abandoned"
                );
                Err(err)
            }
        }
    }

    fn round(&mut self) -> Result<(), Halt> {
        let round = self.context.round();
        if self.context.phase() != 0 {
            return Err(EngineError::RoundStartedMidway(round).into());
        }
        tracing::debug!(round, "round started");
        self.event(Event::NewRound { round })?;
        self.context.reevaluate_initiative();
        loop {
            let phase = self.context.phase();
            self.event(Event::NewPhase { phase })?;
            self.context.reset_still_moving();
            while self.context.is_anybody_still_moving() {
                for id in self.context.character_ids() {
                    if self.context.is_still_moving(id) {
                        self.event(Event::YourMove { subject: id })?;
                    }
                }
            }
            self.event(Event::EndOfPhase { phase })?;
            self.context.remove_defeated_from_formation();
            if phase >= LAST_PHASE {
                break;
            }
            self.context.next_phase()?;
        }
        self.event(Event::EndOfRound { round })?;
        self.context.next_round();
        Ok(())
    }

    fn event(&mut self, event: Event) -> Result<(), Halt> {
        if self.record_history {
            self.history.push(event.clone());
        }
        self.features.observe(&event, &self.context);
        if event.is_status() {
            if let Some(outcome) = self.context.update_status(&event) {
                return Err(Halt::CombatEnded(outcome));
            }
        }
        if matches!(
            event,
            Event::InitiativeChanged
                | Event::TakeAttack { .. }
                | Event::TakeParry { .. }
                | Event::TakeContest { .. }
        ) {
            self.context.reevaluate_initiative();
        }
        if event.is_playable() {
            self.play(&event)
        } else {
            self.offer(&event)
        }
    }

    fn play(&mut self, event: &Event) -> Result<(), Halt> {
        let Some(mut play) = Play::start(event, &mut self.context) else {
            return Ok(());
        };
        let result = self.step_through(&mut play);
        self.context.actions_mut().remove(play.action());
        result
    }

    fn step_through(&mut self, play: &mut Play) -> Result<(), Halt> {
        while let Some(step) = play.next(&mut self.context)? {
            self.event(step)?;
        }
        Ok(())
    }

    fn offer(&mut self, event: &Event) -> Result<(), Halt> {
        let attack = event
            .attack_id()
            .and_then(|id| self.context.actions().attack(id).ok())
            .map(|a| (a.subject, a.target));
        for id in self.dispatch_order(event) {
            let character = self.context.character(id)?;
            let expired: Vec<ModifierId> = character
                .modifiers()
                .iter()
                .filter(|m| m.expires_on(event, attack))
                .map(|m| m.id)
                .collect();
            let listener = character.listener(event.kind());
            for modifier in expired {
                self.event(Event::RemoveModifier {
                    subject: id,
                    modifier,
                })?;
            }
            let Some(listener) = listener else {
                continue;
            };
            for response in listener.handle(id, event, &mut self.context)? {
                self.event(response)?;
            }
        }
        Ok(())
    }

    /// Initiative order, except that a rolled attack is offered to its
    /// target first and then to the target's neighbours.
    fn dispatch_order(&self, event: &Event) -> Vec<CharacterId> {
        let order = self.context.character_ids();
        let Event::AttackRolled { action, .. } = event else {
            return order;
        };
        let Ok(attack) = self.context.actions().attack(*action) else {
            return order;
        };
        let target = attack.target;
        let neighbours = self.context.formation().adjacent_allies(target);
        let mut ordered = vec![target];
        ordered.extend(order.iter().copied().filter(|id| neighbours.contains(id)));
        let rest: Vec<CharacterId> = order.into_iter().filter(|id| !ordered.contains(id)).collect();
        ordered.extend(rest);
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{AttackAction, AttackKind};
    use crate::character::Character;
    use crate::events::EventKind;
    use crate::groups::TEST_GROUP;
    use crate::modifiers::{Expiry, Modifier};
    use crate::roll_provider::RollKind;
    use crate::skills::Skill;
    use crate::testing::{assert_defeated, TestHarness};

    #[test]
    fn test_outcome_winner() {
        assert_eq!(Outcome::Victory { group: CONTROL_GROUP }.winner(), -1);
        assert_eq!(Outcome::Victory { group: TEST_GROUP }.winner(), 1);
        assert_eq!(Outcome::MutualDefeat.winner(), 0);
    }

    #[test]
    fn test_defeat_ends_combat() {
        let mut harness = TestHarness::duel();
        let control = harness.control_id();
        harness.take_sw(control, 4);
        let outcome = harness.event(Event::Unconscious { subject: control }).unwrap();
        assert_eq!(outcome, Some(Outcome::Victory { group: TEST_GROUP }));
        assert_eq!(harness.engine().features().winner, Some(1));
    }

    #[test]
    fn test_round_must_start_at_phase_zero() {
        let mut harness = TestHarness::duel();
        harness.set_phase(3);
        assert_eq!(harness.run_round(), Err(EngineError::RoundStartedMidway(0)));
    }

    #[test]
    fn test_round_limit() {
        let ctx = Context::new(vec![vec![Character::new("A")], vec![Character::new("B")]]).unwrap();
        let mut engine = CombatEngine::new(ctx).with_max_rounds(0);
        assert_eq!(engine.max_rounds(), 0);
        assert_eq!(engine.run(), Err(EngineError::RoundLimitExceeded(0)));
    }

    #[test]
    fn test_round_walks_every_phase() {
        let mut harness = TestHarness::duel();
        let (test, control) = (harness.test_id(), harness.control_id());
        // nobody rolls an action this round
        harness.roll_provider().queue_initiative(test, vec![]);
        harness.roll_provider().queue_initiative(control, vec![]);
        assert_eq!(harness.run_round(), Ok(None));
        let phases = harness
            .history()
            .iter()
            .filter(|e| e.kind() == EventKind::NewPhase)
            .count();
        assert_eq!(phases, 11);
        assert_eq!(harness.context().round(), 1);
        assert_eq!(harness.context().phase(), 0);
        assert_eq!(harness.engine().features().rounds, 1);
        assert!(harness.saw(|e| matches!(e, Event::NoAction { subject } if *subject == test)));
    }

    #[test]
    fn test_modifier_expires_before_listeners_hear_the_event() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        let modifier = Modifier::any_attack(test, 5).expiring(Expiry::AtEndOfRound);
        harness
            .event(Event::AddModifier {
                subject: test,
                modifier,
            })
            .unwrap();
        assert_eq!(harness.character(test).modifiers().len(), 1);
        harness.event(Event::EndOfRound { round: 0 }).unwrap();
        assert!(harness.character(test).modifiers().is_empty());
        assert!(harness.saw(|e| e.kind() == EventKind::RemoveModifier));
    }

    #[test]
    fn test_played_action_leaves_the_arena() {
        let mut harness = TestHarness::duel();
        let (test, control) = (harness.test_id(), harness.control_id());
        harness.set_phase(2);
        harness.set_actions(control, vec![]);
        harness.roll_provider().rig(test, RollKind::Skill(Skill::Attack), 5);
        let attack = AttackAction::new(test, control, AttackKind::Attack, 10, 0);
        harness.event(Event::TakeAttack { action: attack }).unwrap();
        assert!(harness.context().actions().is_empty());
        assert!(harness.saw(|e| e.kind() == EventKind::AttackFailed));
    }

    #[test]
    fn test_attack_rolled_reaches_target_first() {
        let mut harness = TestHarness::new(vec![
            vec![Character::new("Target"), Character::new("Friend")],
            vec![Character::new("Attacker")],
        ]);
        let (target, friend, attacker) = (harness.id("Target"), harness.id("Friend"), harness.id("Attacker"));
        let action = harness
            .context_mut()
            .actions_mut()
            .insert(crate::actions::Action::Attack(AttackAction::new(
                attacker,
                target,
                AttackKind::Attack,
                10,
                0,
            )));
        let order = harness
            .engine()
            .dispatch_order(&Event::AttackRolled { action, roll: 20 });
        assert_eq!(order, vec![target, friend, attacker]);
    }

    #[test]
    fn test_duel_runs_to_a_single_winner() {
        let mut harness = TestHarness::duel();
        let outcome = harness.run().unwrap();
        match outcome {
            Outcome::Victory { group } => assert_defeated(&harness, 1 - group),
            Outcome::MutualDefeat => {
                assert_defeated(&harness, CONTROL_GROUP);
                assert_defeated(&harness, TEST_GROUP);
            }
        }
        assert!(harness.saw(|e| e.is_defeat()));
        assert_eq!(harness.engine().features().winner, Some(outcome.winner()));
        // a finished combat stays finished
        assert_eq!(harness.run(), Ok(outcome));
    }

    #[test]
    fn test_reset_allows_another_trial() {
        let mut harness = TestHarness::duel();
        harness.run().unwrap();
        harness.engine_mut().reset().unwrap();
        assert!(harness.history().is_empty());
        assert!(!harness.engine().features().is_complete());
        assert_eq!(harness.context().round(), 0);
        assert!(harness.context().outcome().is_none());
        harness.run().unwrap();
    }
}
