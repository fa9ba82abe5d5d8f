//! What to attack with, whom, and how much to spend.

use super::{spend_action, Strategy};
use crate::actions::{AttackAction, AttackKind};
use crate::character::CharacterId;
use crate::context::Context;
use crate::error::EngineError;
use crate::events::Event;
use crate::knowledge::TheoreticalCharacter;
use crate::optimizers::optimize_attack;
use crate::skills::Skill;

/// Success probability a double attack must reach.
pub const DOUBLE_ATTACK_THRESHOLD: f64 = 0.6;
/// Success probability for a feint or a confident attack.
pub const CONFIDENT_THRESHOLD: f64 = 0.7;
/// Success probability accepted for a desperate attack.
pub const DESPERATE_THRESHOLD: f64 = 0.01;

/// Find a target for `kind` and an affordable way to attack it.
///
/// Returns nothing when the character lacks the skill, has no target, or
/// cannot reach `threshold`.
pub fn try_skill(
    character: CharacterId,
    kind: AttackKind,
    threshold: f64,
    ctx: &Context,
) -> Result<Option<AttackAction>, EngineError> {
    let me = ctx.character(character)?;
    let skill = kind.skill();
    if me.skill(skill) <= 0 {
        return Ok(None);
    }
    let Some(target) = me.target_finder().find_target(character, skill, ctx)? else {
        return Ok(None);
    };
    let attack = optimize_attack(ctx, character, target, kind, threshold)?;
    if let Some(attack) = &attack {
        tracing::info!(
            character = me.name(),
            target = ctx.character(target)?.name(),
            skill = %skill,
            vp = attack.vp,
            "attacking"
        );
    }
    Ok(attack)
}

/// Pay for `attack` and take it.
fn take(character: CharacterId, attack: AttackAction, ctx: &Context) -> Result<Vec<Event>, EngineError> {
    let me = ctx.character(character)?;
    let mut events = spend_action(me, attack.skill(), ctx.phase())?;
    events.push(Event::TakeAttack { action: attack });
    Ok(events)
}

fn is_my_move(character: CharacterId, event: &Event) -> bool {
    matches!(event, Event::YourMove { subject } if *subject == character)
}

/// Double attack when likely, feint when out of Void Points, otherwise
/// attack, desperately if need be.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniversalAttackStrategy;

impl Strategy for UniversalAttackStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        if !is_my_move(character, event) {
            return Ok(Vec::new());
        }
        let me = ctx.character(character)?;
        if !me.has_action(ctx.phase()) {
            return Ok(vec![Event::NoAction { subject: character }]);
        }
        if let Some(attack) = try_skill(character, AttackKind::DoubleAttack, DOUBLE_ATTACK_THRESHOLD, ctx)? {
            return take(character, attack, ctx);
        }
        if me.vp() == 0 && me.actions().len() > 1 {
            if let Some(feint) = try_skill(character, AttackKind::Feint, CONFIDENT_THRESHOLD, ctx)? {
                return take(character, feint, ctx);
            }
        }
        for threshold in [CONFIDENT_THRESHOLD, DESPERATE_THRESHOLD] {
            if let Some(attack) = try_skill(character, AttackKind::Attack, threshold, ctx)? {
                return take(character, attack, ctx);
            }
        }
        Ok(vec![Event::HoldAction { subject: character }])
    }

    fn name(&self) -> &'static str {
        "universal attack"
    }
}

/// Only ever makes plain attacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainAttackStrategy;

impl Strategy for PlainAttackStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        if !is_my_move(character, event) {
            return Ok(Vec::new());
        }
        if !ctx.character(character)?.has_action(ctx.phase()) {
            return Ok(vec![Event::NoAction { subject: character }]);
        }
        for threshold in [CONFIDENT_THRESHOLD, DESPERATE_THRESHOLD] {
            if let Some(attack) = try_skill(character, AttackKind::Attack, threshold, ctx)? {
                return take(character, attack, ctx);
            }
        }
        Ok(vec![Event::HoldAction { subject: character }])
    }

    fn name(&self) -> &'static str {
        "plain attack"
    }
}

/// Attacks with every action and never spends resources on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct StingyAttackStrategy;

impl Strategy for StingyAttackStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        if !is_my_move(character, event) {
            return Ok(Vec::new());
        }
        let me = ctx.character(character)?;
        if !me.has_action(ctx.phase()) {
            return Ok(vec![Event::NoAction { subject: character }]);
        }
        match me.target_finder().find_target(character, Skill::Attack, ctx)? {
            Some(target) => {
                let believed_tn = TheoreticalCharacter::new(me.knowledge(), target).tn_to_hit();
                let attack = AttackAction::new(character, target, AttackKind::Attack, believed_tn, 0);
                tracing::info!(character = me.name(), "attacking without spending");
                take(character, attack, ctx)
            }
            None => Ok(vec![Event::HoldAction { subject: character }]),
        }
    }

    fn name(&self) -> &'static str {
        "stingy attack"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;

    fn spends_and_attacks(events: &[Event]) -> Option<&AttackAction> {
        assert!(matches!(events.first(), Some(Event::SpendAction { .. })));
        match events.last() {
            Some(Event::TakeAttack { action }) => Some(action),
            _ => None,
        }
    }

    #[test]
    fn test_plain_attack_targets_the_enemy() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.set_phase(1);
        harness.set_actions(test, vec![1, 5]);
        let events = PlainAttackStrategy
            .recommend(test, &Event::YourMove { subject: test }, harness.context())
            .unwrap();
        let attack = spends_and_attacks(&events).expect("attack");
        assert_eq!(attack.target, harness.control_id());
        assert_eq!(attack.kind, AttackKind::Attack);
    }

    #[test]
    fn test_no_action_without_dice() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.set_actions(test, vec![7]);
        for strategy in [
            &UniversalAttackStrategy as &dyn Strategy,
            &PlainAttackStrategy,
            &StingyAttackStrategy,
        ] {
            let events = strategy
                .recommend(test, &Event::YourMove { subject: test }, harness.context())
                .unwrap();
            assert_eq!(events, vec![Event::NoAction { subject: test }]);
        }
    }

    #[test]
    fn test_universal_prefers_double_attack_when_likely() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        {
            let me = harness.context_mut().character_mut(test).unwrap();
            me.set_skill(Skill::DoubleAttack, 5).unwrap();
            me.set_ring(crate::skills::Ring::Fire, 6).unwrap();
        }
        harness.set_phase(3);
        harness.set_actions(test, vec![2, 3]);
        let events = UniversalAttackStrategy
            .recommend(test, &Event::YourMove { subject: test }, harness.context())
            .unwrap();
        let attack = spends_and_attacks(&events).expect("attack");
        assert_eq!(attack.kind, AttackKind::DoubleAttack);
    }

    #[test]
    fn test_ignores_other_characters_moves() {
        let harness = TestHarness::duel();
        let events = UniversalAttackStrategy
            .recommend(
                harness.test_id(),
                &Event::YourMove {
                    subject: harness.control_id(),
                },
                harness.context(),
            )
            .unwrap();
        assert!(events.is_empty());
    }
}
