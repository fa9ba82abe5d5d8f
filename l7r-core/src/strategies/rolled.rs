//! Spending after the dice are down.
//!
//! Each of these receives a rolled event for its own character and returns
//! the spend events followed by the (possibly improved) rolled event.

use super::Strategy;
use crate::character::{Character, CharacterId};
use crate::context::Context;
use crate::error::EngineError;
use crate::events::Event;
use crate::modifiers::FloatingBonus;
use crate::skills::Skill;

/// Bonuses and AP that close `margin`, cheapest bonuses first.
#[derive(Debug, Default)]
struct Spend {
    bonuses: Vec<FloatingBonus>,
    ap: u32,
}

impl Spend {
    fn total(&self) -> i32 {
        self.bonuses.iter().map(|b| b.bonus).sum::<i32>() + 5 * self.ap as i32
    }

    fn into_events(self, subject: CharacterId, skill: Skill) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .bonuses
            .into_iter()
            .map(|bonus| Event::SpendFloatingBonus { subject, bonus })
            .collect();
        if self.ap > 0 {
            events.push(Event::SpendAdventurePoints {
                subject,
                skill,
                amount: self.ap,
            });
        }
        events
    }
}

fn max_ap(character: &Character, skill: Skill) -> u32 {
    if character.can_spend_ap(skill) {
        character.ap().min(character.max_ap_per_roll())
    } else {
        0
    }
}

/// Choose resources to raise a roll by `margin`.
fn close_margin(character: &Character, skill: Skill, margin: i32) -> Spend {
    let mut spend = Spend::default();
    let mut bonuses = character.floating_bonuses(skill);
    bonuses.sort();
    let mut remaining = margin;
    for bonus in bonuses {
        if remaining <= 0 {
            break;
        }
        remaining -= bonus.bonus;
        spend.bonuses.push(bonus);
    }
    if remaining > 0 {
        let needed = ((remaining + 4) / 5) as u32;
        spend.ap = needed.min(max_ap(character, skill));
    }
    spend
}

/// Spend floating bonuses and AP on a roll that missed `tn`, but only when
/// that makes it.
fn improve(
    character: &Character,
    skill: Skill,
    tn: i32,
    roll: i32,
) -> (Vec<Event>, i32) {
    let margin = tn - roll;
    if margin <= 0 {
        return (Vec::new(), roll);
    }
    let spend = close_margin(character, skill, margin);
    let improved = roll + spend.total();
    if improved < tn {
        return (Vec::new(), roll);
    }
    tracing::info!(
        character = character.name(),
        skill = %skill,
        bonuses = spend.bonuses.len(),
        ap = spend.ap,
        roll,
        improved,
        "spending to make the roll"
    );
    (spend.into_events(character.id(), skill), improved)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AttackRolledStrategy;

impl Strategy for AttackRolledStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        let Event::AttackRolled { action, roll } = event else {
            return Ok(Vec::new());
        };
        let attack = ctx.actions().attack(*action)?;
        if attack.subject != character {
            return Ok(Vec::new());
        }
        let me = ctx.character(character)?;
        let (mut events, roll) = improve(me, attack.skill(), attack.tn(), *roll);
        events.push(Event::AttackRolled {
            action: *action,
            roll,
        });
        Ok(events)
    }

    fn name(&self) -> &'static str {
        "attack rolled"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParryRolledStrategy;

impl Strategy for ParryRolledStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        let Event::ParryRolled { action, roll } = event else {
            return Ok(Vec::new());
        };
        let parry = ctx.actions().parry(*action)?;
        if parry.subject != character {
            return Ok(Vec::new());
        }
        let me = ctx.character(character)?;
        let (mut events, roll) = improve(me, parry.skill(), parry.tn(), *roll);
        events.push(Event::ParryRolled {
            action: *action,
            roll,
        });
        Ok(events)
    }

    fn name(&self) -> &'static str {
        "parry rolled"
    }
}

/// Spends only to hold a wound check to the tolerable number of serious
/// wounds; never spends merely to pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct WoundCheckRolledStrategy;

impl Strategy for WoundCheckRolledStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        let Event::WoundCheckRolled {
            subject,
            attacker,
            damage,
            tn,
            roll,
        } = event
        else {
            return Ok(Vec::new());
        };
        if *subject != character {
            return Ok(Vec::new());
        }
        let me = ctx.character(character)?;
        let expected_sw = me.wound_check(*roll, Some(*tn));
        if expected_sw == 0 {
            return Ok(vec![event.clone()]);
        }
        let tolerable = 1.min(me.sw_remaining() - 1);

        let mut spend = Spend::default();
        let mut new_roll = *roll;
        let mut bonuses = me.floating_bonuses(Skill::WoundCheck);
        bonuses.sort();
        for bonus in bonuses {
            if me.wound_check(new_roll, Some(*tn)) <= tolerable {
                break;
            }
            new_roll += bonus.bonus;
            spend.bonuses.push(bonus);
        }
        let max_ap = max_ap(me, Skill::WoundCheck);
        while spend.ap < max_ap && me.wound_check(new_roll, Some(*tn)) > tolerable {
            spend.ap += 1;
            new_roll += 5;
        }

        let new_sw = me.wound_check(new_roll, Some(*tn));
        if new_sw >= expected_sw {
            return Ok(vec![event.clone()]);
        }
        tracing::info!(
            character = me.name(),
            bonuses = spend.bonuses.len(),
            ap = spend.ap,
            expected_sw,
            new_sw,
            "spending on a wound check"
        );
        let mut events = spend.into_events(character, Skill::WoundCheck);
        events.push(Event::WoundCheckRolled {
            subject: *subject,
            attacker: *attacker,
            damage: *damage,
            tn: *tn,
            roll: new_roll,
        });
        Ok(events)
    }

    fn name(&self) -> &'static str {
        "wound check rolled"
    }
}
