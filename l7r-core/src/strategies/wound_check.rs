//! Wound check declarations and what to do with light wounds afterwards.

use super::Strategy;
use crate::character::CharacterId;
use crate::context::Context;
use crate::error::EngineError;
use crate::events::Event;
use crate::optimizers::WoundCheckOptimizer;
use crate::skills::Skill;

/// Probability a wound check declaration aims for.
pub const WOUND_CHECK_THRESHOLD: f64 = 0.6;
/// Projected serious wounds that make banking light wounds too risky.
pub const KEEP_LIGHT_WOUNDS_LIMIT: i32 = 2;

/// The damage a light wounds event deals to `character`, with its TN
/// adjustment, if `character` is the one hit.
fn incoming(character: CharacterId, event: &Event) -> Option<(CharacterId, i32)> {
    match event {
        Event::LightWoundsDamage {
            subject,
            target,
            damage,
            wound_check_tn,
        } if *target == character => Some((*subject, wound_check_tn - damage)),
        _ => None,
    }
}

/// Spend VP to keep the check to one serious wound, or none when one more
/// would end the fight.
#[derive(Debug, Clone, Copy, Default)]
pub struct WoundCheckStrategy;

impl Strategy for WoundCheckStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        let Some((attacker, adjustment)) = incoming(character, event) else {
            return Ok(Vec::new());
        };
        let max_sw = 1.min(ctx.character(character)?.sw_remaining() - 1);
        let optimizer = WoundCheckOptimizer::new(ctx, character, attacker, adjustment)?;
        Ok(vec![optimizer.declare(max_sw, WOUND_CHECK_THRESHOLD)?])
    }

    fn name(&self) -> &'static str {
        "wound check"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StingyWoundCheckStrategy;

impl Strategy for StingyWoundCheckStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        let Some((attacker, adjustment)) = incoming(character, event) else {
            return Ok(Vec::new());
        };
        let lw = ctx.character(character)?.lw();
        Ok(vec![Event::WoundCheckDeclared {
            subject: character,
            attacker,
            damage: lw,
            tn: lw + adjustment,
            vp: 0,
        }])
    }

    fn name(&self) -> &'static str {
        "stingy wound check"
    }
}

fn succeeded(character: CharacterId, event: &Event) -> Option<(CharacterId, i32)> {
    match event {
        Event::WoundCheckSucceeded {
            subject,
            attacker,
            damage,
            ..
        } if *subject == character => Some((*attacker, *damage)),
        _ => None,
    }
}

/// Bank light wounds unless the next wound check is projected to go badly.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepLightWoundsStrategy;

impl Strategy for KeepLightWoundsStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        let Some((attacker, damage)) = succeeded(character, event) else {
            return Ok(Vec::new());
        };
        let me = ctx.character(character)?;
        let keep = Event::KeepLightWounds {
            subject: character,
            attacker,
            damage,
        };
        if me.sw_remaining() == 1 {
            tracing::info!(character = me.name(), "keeping light wounds to avoid defeat");
            return Ok(vec![keep]);
        }
        let history = me.lw_history();
        let expected_damage = if history.is_empty() {
            ctx.mean_roll(7, 2, true)
        } else {
            history.iter().sum::<i32>() / history.len() as i32
        };
        let params = me.wound_check_roll_params(0);
        let bonus: i32 = me
            .floating_bonuses(Skill::WoundCheck)
            .iter()
            .map(|b| b.bonus)
            .sum();
        let expected_roll = ctx.mean_roll(params.rolled, params.kept, true) + params.bonus + bonus;
        let projected = me.wound_check(expected_roll, Some(me.lw() + expected_damage));
        if projected > KEEP_LIGHT_WOUNDS_LIMIT {
            tracing::info!(
                character = me.name(),
                projected_sw = projected,
                "taking a serious wound before the next check"
            );
            Ok(vec![Event::TakeSeriousWound {
                subject: character,
                attacker,
                damage: 1,
            }])
        } else {
            tracing::info!(character = me.name(), projected_sw = projected, "keeping light wounds");
            Ok(vec![keep])
        }
    }

    fn name(&self) -> &'static str {
        "keep light wounds"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysKeepLightWoundsStrategy;

impl Strategy for AlwaysKeepLightWoundsStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        _ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        Ok(succeeded(character, event)
            .map(|(attacker, damage)| Event::KeepLightWounds {
                subject: character,
                attacker,
                damage,
            })
            .into_iter()
            .collect())
    }

    fn name(&self) -> &'static str {
        "always keep light wounds"
    }
}

/// Convert every successful check into one serious wound.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverKeepLightWoundsStrategy;

impl Strategy for NeverKeepLightWoundsStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        _ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        Ok(succeeded(character, event)
            .map(|(attacker, _)| Event::TakeSeriousWound {
                subject: character,
                attacker,
                damage: 1,
            })
            .into_iter()
            .collect())
    }

    fn name(&self) -> &'static str {
        "never keep light wounds"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;

    fn succeeded_check(harness: &TestHarness, damage: i32) -> Event {
        Event::WoundCheckSucceeded {
            subject: harness.test_id(),
            attacker: harness.control_id(),
            damage,
            tn: damage,
            roll: damage + 1,
        }
    }

    #[test]
    fn test_stingy_wound_check_declares_no_vp() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        let control = harness.control_id();
        harness.context_mut().character_mut(test).unwrap().take_lw(25);
        let hit = Event::LightWoundsDamage {
            subject: control,
            target: test,
            damage: 25,
            wound_check_tn: 30,
        };
        let events = StingyWoundCheckStrategy
            .recommend(test, &hit, harness.context())
            .unwrap();
        assert_eq!(
            events,
            vec![Event::WoundCheckDeclared {
                subject: test,
                attacker: control,
                damage: 25,
                tn: 30,
                vp: 0
            }]
        );
        assert!(StingyWoundCheckStrategy
            .recommend(control, &hit, harness.context())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_wound_check_strategy_spends_against_heavy_damage() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        let control = harness.control_id();
        harness.context_mut().character_mut(test).unwrap().take_lw(22);
        let hit = Event::LightWoundsDamage {
            subject: control,
            target: test,
            damage: 22,
            wound_check_tn: 22,
        };
        match WoundCheckStrategy
            .recommend(test, &hit, harness.context())
            .unwrap()
            .as_slice()
        {
            [Event::WoundCheckDeclared { damage, tn, vp, .. }] => {
                assert_eq!((*damage, *tn), (22, 22));
                assert!(*vp <= 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_keep_light_wounds_when_one_wound_from_defeat() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        {
            let me = harness.context_mut().character_mut(test).unwrap();
            me.take_sw(3);
            me.take_lw(60);
        }
        let events = KeepLightWoundsStrategy
            .recommend(test, &succeeded_check(&harness, 60), harness.context())
            .unwrap();
        assert!(matches!(events.as_slice(), [Event::KeepLightWounds { .. }]));
    }

    #[test]
    fn test_take_serious_wound_when_next_check_looks_bad() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.context_mut().character_mut(test).unwrap().take_lw(40);
        let events = KeepLightWoundsStrategy
            .recommend(test, &succeeded_check(&harness, 40), harness.context())
            .unwrap();
        assert!(matches!(
            events.as_slice(),
            [Event::TakeSeriousWound { damage: 1, .. }]
        ));
    }

    #[test]
    fn test_keep_small_light_wounds() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.context_mut().character_mut(test).unwrap().take_lw(3);
        let events = KeepLightWoundsStrategy
            .recommend(test, &succeeded_check(&harness, 3), harness.context())
            .unwrap();
        assert!(matches!(events.as_slice(), [Event::KeepLightWounds { .. }]));
    }

    #[test]
    fn test_always_and_never_keep() {
        let harness = TestHarness::duel();
        let event = succeeded_check(&harness, 12);
        let test = harness.test_id();
        assert!(matches!(
            AlwaysKeepLightWoundsStrategy
                .recommend(test, &event, harness.context())
                .unwrap()
                .as_slice(),
            [Event::KeepLightWounds { .. }]
        ));
        assert!(matches!(
            NeverKeepLightWoundsStrategy
                .recommend(test, &event, harness.context())
                .unwrap()
                .as_slice(),
            [Event::TakeSeriousWound { damage: 1, .. }]
        ));
        assert!(NeverKeepLightWoundsStrategy
            .recommend(harness.control_id(), &event, harness.context())
            .unwrap()
            .is_empty());
    }
}
