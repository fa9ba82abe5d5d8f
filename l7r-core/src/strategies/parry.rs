//! Parrying for oneself and for friends, and counterattacking.

use super::{can_act, spend_action, Strategy, StrategyKind};
use crate::actions::{ActionId, AttackAction, AttackKind, ParryAction};
use crate::character::CharacterId;
use crate::context::Context;
use crate::error::EngineError;
use crate::events::Event;
use crate::knowledge::TheoreticalCharacter;
use crate::skills::{Ring, Skill};

/// Whether `character` may parry the rolled attack at all.
fn may_parry(character: CharacterId, attack: &AttackAction, ctx: &Context) -> Result<bool, EngineError> {
    let me = ctx.character(character)?;
    if !me.is_fighting() || !can_act(me, Skill::Parry, ctx.phase()) {
        tracing::debug!(character = me.name(), "no action to parry with");
        return Ok(false);
    }
    if !ctx.are_allies(character, attack.target) {
        return Ok(false);
    }
    if !ctx.formation().can_parry_for(character, attack.target) {
        return Ok(false);
    }
    if !attack.is_hit() || attack.parried() {
        return Ok(false);
    }
    // one parry per attack
    Ok(!attack.parry_attempted())
}

fn rolled_attack<'a>(event: &Event, ctx: &'a Context) -> Result<Option<(ActionId, &'a AttackAction)>, EngineError> {
    match event {
        Event::AttackRolled { action, .. } => Ok(Some((*action, ctx.actions().attack(*action)?))),
        _ => Ok(None),
    }
}

fn parry(
    character: CharacterId,
    attack_id: ActionId,
    attack: &AttackAction,
    ctx: &Context,
) -> Result<Vec<Event>, EngineError> {
    let me = ctx.character(character)?;
    let mut events = spend_action(me, Skill::Parry, ctx.phase())?;
    events.push(Event::TakeParry {
        action: ParryAction::new(character, attack_id, attack, 0),
    });
    Ok(events)
}

/// Whether a willing friend could still parry this attack instead.
fn can_shirk(character: CharacterId, attack: &AttackAction, ctx: &Context) -> Result<bool, EngineError> {
    let Some(group) = ctx.group_of(character) else {
        return Ok(false);
    };
    for friend in ctx.groups()[group].friends_with_actions(ctx) {
        if friend == character || attack.parries_declined().contains(&friend) {
            continue;
        }
        let other = ctx.character(friend)?;
        if other.strategy(StrategyKind::Parry).will_parry()
            && ctx.formation().can_parry_for(friend, attack.target)
        {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Serious wounds the target is expected to take from this hit.
pub fn estimate_serious_wounds(
    character: CharacterId,
    attack: &AttackAction,
    ctx: &Context,
) -> Result<i32, EngineError> {
    let me = ctx.character(character)?;
    let attacker = ctx.character(attack.subject)?;
    let fire = TheoreticalCharacter::new(me.knowledge(), attack.subject).ring(Ring::Fire);
    let weapon = attacker.weapon();
    let expected_damage = ctx.mean_roll(
        fire + weapon.rolled + attack.extra_damage_dice(),
        weapon.kept,
        true,
    );
    let target = ctx.character(attack.target)?;
    let params = target.wound_check_roll_params(0);
    let expected_roll = ctx.mean_roll(params.rolled, params.kept, true) + params.bonus;
    let mut expected = target.wound_check(expected_roll, Some(target.lw() + expected_damage));
    if attack.kind == AttackKind::DoubleAttack {
        expected += 1;
    }
    Ok(expected)
}

/// Parry for friends when the hit looks dangerous and nobody else will.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReluctantParryStrategy;

impl Strategy for ReluctantParryStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        let Some((attack_id, attack)) = rolled_attack(event, ctx)? else {
            return Ok(Vec::new());
        };
        if !may_parry(character, attack, ctx)? {
            return Ok(Vec::new());
        }
        let name = ctx.character(character)?.name();
        let declined = Event::ParryDeclined {
            attack: attack_id,
            subject: character,
        };
        if can_shirk(character, attack, ctx)? {
            tracing::debug!(character = name, "shirking the parry");
            return Ok(vec![declined]);
        }
        let expected = estimate_serious_wounds(character, attack, ctx)?;
        let target = ctx.character(attack.target)?;
        let probably_fatal = target.sw_remaining() <= expected;
        let probably_critical = expected >= 2;
        if probably_fatal || probably_critical {
            tracing::info!(
                character = name,
                expected_sw = expected,
                fatal = probably_fatal,
                "parrying a dangerous attack"
            );
            parry(character, attack_id, attack, ctx)
        } else {
            tracing::debug!(character = name, expected_sw = expected, "not parrying a small attack");
            Ok(vec![declined])
        }
    }

    fn name(&self) -> &'static str {
        "reluctant parry"
    }
}

/// Parry every hit it can.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysParryStrategy;

impl Strategy for AlwaysParryStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        let Some((attack_id, attack)) = rolled_attack(event, ctx)? else {
            return Ok(Vec::new());
        };
        if !may_parry(character, attack, ctx)? {
            return Ok(Vec::new());
        }
        tracing::info!(character = ctx.character(character)?.name(), "always parries");
        parry(character, attack_id, attack, ctx)
    }

    fn name(&self) -> &'static str {
        "always parry"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeverParryStrategy;

impl Strategy for NeverParryStrategy {
    fn recommend(&self, _: CharacterId, _: &Event, _: &Context) -> Result<Vec<Event>, EngineError> {
        Ok(Vec::new())
    }

    fn will_parry(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "never parry"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCounterattackStrategy;

impl Strategy for NeverCounterattackStrategy {
    fn recommend(&self, _: CharacterId, _: &Event, _: &Context) -> Result<Vec<Event>, EngineError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "never counterattack"
    }
}

/// Counterattack whoever attacks this character, if able.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhenTargetedCounterattackStrategy;

impl Strategy for WhenTargetedCounterattackStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        let Event::AttackDeclared { action } = event else {
            return Ok(Vec::new());
        };
        let attack = ctx.actions().attack(*action)?;
        let me = ctx.character(character)?;
        if attack.target != character
            || attack.is_counterattack()
            || me.skill(Skill::Counterattack) <= 0
            || !me.is_fighting()
            || !can_act(me, Skill::Counterattack, ctx.phase())
            || ctx.are_allies(character, attack.subject)
        {
            return Ok(Vec::new());
        }
        let attacker = ctx.character(attack.subject)?;
        let believed_tn = TheoreticalCharacter::new(me.knowledge(), attack.subject).tn_to_hit();
        let counter = AttackAction::counterattack(
            character,
            *action,
            attack,
            attacker.skill(Skill::Attack),
            believed_tn,
            0,
        );
        tracing::info!(
            character = me.name(),
            attacker = attacker.name(),
            "counterattacking"
        );
        let mut events = spend_action(me, Skill::Counterattack, ctx.phase())?;
        events.push(Event::TakeAttack { action: counter });
        Ok(events)
    }

    fn name(&self) -> &'static str {
        "counterattack when targeted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;
    use crate::character::Character;
    use crate::testing::TestHarness;
    use std::sync::Arc;

    /// Stage a rolled attack by the control character on `target`.
    fn staged_attack(harness: &mut TestHarness, target: CharacterId, roll: i32) -> (ActionId, Event) {
        let attacker = harness.control_id();
        let mut attack = AttackAction::new(attacker, target, AttackKind::Attack, 10, 0);
        attack.set_skill_roll(roll);
        let id = harness
            .context_mut()
            .actions_mut()
            .insert(Action::Attack(attack));
        (id, Event::AttackRolled { action: id, roll })
    }

    #[test]
    fn test_always_parry_spends_an_action() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.set_phase(2);
        harness.set_actions(test, vec![2, 6]);
        let (_, event) = staged_attack(&mut harness, test, 30);
        let events = AlwaysParryStrategy
            .recommend(test, &event, harness.context())
            .unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::SpendAction { phase: 2, .. }));
        match &events[1] {
            Event::TakeParry { action } => {
                assert_eq!(action.tn(), 30);
                assert!(!action.on_behalf);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_no_parry_for_a_miss_or_without_actions() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.set_phase(2);
        harness.set_actions(test, vec![2]);
        let (_, miss) = staged_attack(&mut harness, test, 5);
        assert!(AlwaysParryStrategy
            .recommend(test, &miss, harness.context())
            .unwrap()
            .is_empty());

        harness.set_actions(test, vec![8]);
        let (_, hit) = staged_attack(&mut harness, test, 30);
        assert!(AlwaysParryStrategy
            .recommend(test, &hit, harness.context())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_only_one_parry_per_attack() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.set_phase(2);
        harness.set_actions(test, vec![1, 2]);
        let (id, event) = staged_attack(&mut harness, test, 30);
        harness
            .context_mut()
            .actions_mut()
            .attack_mut(id)
            .unwrap()
            .set_parry_attempted();
        assert!(AlwaysParryStrategy
            .recommend(test, &event, harness.context())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_reluctant_parry_declines_small_hits() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.set_phase(2);
        harness.set_actions(test, vec![2, 5]);
        harness
            .context_mut()
            .character_mut(test)
            .unwrap()
            .set_ring(Ring::Water, 5)
            .unwrap();
        let (id, event) = staged_attack(&mut harness, test, 11);
        let events = ReluctantParryStrategy
            .recommend(test, &event, harness.context())
            .unwrap();
        assert_eq!(
            events,
            vec![Event::ParryDeclined {
                attack: id,
                subject: test
            }]
        );
    }

    #[test]
    fn test_reluctant_parry_parries_when_near_death() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.set_phase(2);
        harness.set_actions(test, vec![2, 5]);
        {
            let me = harness.context_mut().character_mut(test).unwrap();
            me.take_sw(3);
            me.take_lw(30);
        }
        let (_, event) = staged_attack(&mut harness, test, 11);
        let events = ReluctantParryStrategy
            .recommend(test, &event, harness.context())
            .unwrap();
        assert!(matches!(events.last(), Some(Event::TakeParry { .. })));
    }

    #[test]
    fn test_reluctant_parry_shirks_to_willing_friend() {
        let attacker = Character::new("Attacker");
        let target = Character::new("Target");
        let friend = Character::new("Friend");
        let mut harness = TestHarness::new(vec![vec![attacker], vec![target, friend]]);
        let target = harness.id("Target");
        let friend = harness.id("Friend");
        harness.set_phase(2);
        harness.set_actions(target, vec![2]);
        harness.set_actions(friend, vec![1, 2]);
        {
            let me = harness.context_mut().character_mut(target).unwrap();
            me.take_sw(3);
            me.take_lw(30);
        }

        let mut attack = AttackAction::new(harness.id("Attacker"), target, AttackKind::Attack, 10, 0);
        attack.set_skill_roll(40);
        let id = harness
            .context_mut()
            .actions_mut()
            .insert(Action::Attack(attack));
        let event = Event::AttackRolled { action: id, roll: 40 };

        let events = ReluctantParryStrategy
            .recommend(target, &event, harness.context())
            .unwrap();
        assert_eq!(events, vec![Event::ParryDeclined { attack: id, subject: target }]);

        // once the target has declined, the friend cannot pass it back
        harness
            .context_mut()
            .actions_mut()
            .attack_mut(id)
            .unwrap()
            .add_parry_declined(target);
        let events = ReluctantParryStrategy
            .recommend(friend, &event, harness.context())
            .unwrap();
        match events.last() {
            Some(Event::TakeParry { action }) => assert!(action.on_behalf),
            other => panic!("unexpected {other:?}"),
        }

        // an unwilling friend is not counted on
        harness
            .context_mut()
            .character_mut(friend)
            .unwrap()
            .set_strategy(StrategyKind::Parry, Arc::new(NeverParryStrategy));
        assert!(!can_shirk(target, harness.context().actions().attack(id).unwrap(), harness.context()).unwrap());
    }

    #[test]
    fn test_counterattack_when_targeted() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        let control = harness.control_id();
        harness.set_phase(4);
        harness.set_actions(test, vec![7, 9]);
        harness
            .context_mut()
            .character_mut(test)
            .unwrap()
            .set_skill(Skill::Counterattack, 2)
            .unwrap();
        let attack = AttackAction::new(control, test, AttackKind::Attack, 10, 0);
        let id = harness
            .context_mut()
            .actions_mut()
            .insert(Action::Attack(attack));
        let event = Event::AttackDeclared { action: id };

        let events = WhenTargetedCounterattackStrategy
            .recommend(test, &event, harness.context())
            .unwrap();
        // interrupting costs the two highest dice
        assert_eq!(events.len(), 3);
        match events.last() {
            Some(Event::TakeAttack { action }) => {
                assert_eq!(action.target, control);
                assert_eq!(action.countering(), Some(id));
                assert_eq!(action.vp, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(NeverCounterattackStrategy
            .recommend(test, &event, harness.context())
            .unwrap()
            .is_empty());
        assert!(WhenTargetedCounterattackStrategy
            .recommend(control, &event, harness.context())
            .unwrap()
            .is_empty());
    }
}
