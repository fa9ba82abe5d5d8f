//! Rule bookkeeping.
//!
//! Listeners are the only code that changes character state. Each reacts
//! to one kind of event on behalf of one character and may answer with
//! follow-up events; whenever a rule leaves a choice, the listener asks the
//! character's strategy for that decision and passes its answer along.

use crate::actions::AttackKind;
use crate::character::{serious_wounds, CharacterId};
use crate::context::Context;
use crate::error::EngineError;
use crate::events::{Event, EventKind};
use crate::modifiers::{Expiry, Modifier};
use crate::skills::Skill;
use crate::strategies::StrategyKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Bonus each enemy of a lunger gets on its next attack against the lunger.
pub const LUNGE_OPENING: i32 = 5;

/// Reacts to one kind of event for one character.
pub trait Listener: Send + Sync {
    fn handle(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &mut Context,
    ) -> Result<Vec<Event>, EngineError>;
}

/// Listeners keyed by event kind. Kinds with no listener are ignored.
#[derive(Clone)]
pub struct ListenerRegistry {
    listeners: HashMap<EventKind, Arc<dyn Listener>>,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.set(EventKind::NewRound, Arc::new(NewRoundListener));
        registry.set(EventKind::EndOfRound, Arc::new(EndOfRoundListener));
        registry.set(EventKind::YourMove, Arc::new(YourMoveListener));
        registry.set(EventKind::AddModifier, Arc::new(AddModifierListener));
        registry.set(EventKind::RemoveModifier, Arc::new(RemoveModifierListener));
        registry.set(EventKind::AttackDeclared, Arc::new(AttackDeclaredListener));
        registry.set(EventKind::AttackRolled, Arc::new(AttackRolledListener));
        registry.set(EventKind::AttackSucceeded, Arc::new(FeintSucceededListener));
        registry.set(EventKind::ParryDeclared, Arc::new(ParryDeclaredListener));
        registry.set(EventKind::ParryDeclined, Arc::new(ParryDeclinedListener));
        registry.set(EventKind::LightWoundsDamage, Arc::new(LightWoundsDamageListener));
        registry.set(EventKind::SeriousWoundsDamage, Arc::new(SeriousWoundsDamageListener));
        registry.set(EventKind::TakeSeriousWound, Arc::new(TakeSeriousWoundListener));
        registry.set(EventKind::WoundCheckDeclared, Arc::new(WoundCheckDeclaredListener));
        registry.set(EventKind::WoundCheckRolled, Arc::new(WoundCheckRolledListener));
        registry.set(EventKind::WoundCheckFailed, Arc::new(WoundCheckFailedListener));
        registry.set(EventKind::WoundCheckSucceeded, Arc::new(WoundCheckSucceededListener));
        registry.set(EventKind::GainTemporaryVoidPoints, Arc::new(ResourceListener));
        registry.set(EventKind::GainFloatingBonus, Arc::new(ResourceListener));
        registry.set(EventKind::SpendAction, Arc::new(ResourceListener));
        registry.set(EventKind::SpendVoidPoints, Arc::new(ResourceListener));
        registry.set(EventKind::SpendAdventurePoints, Arc::new(ResourceListener));
        registry.set(EventKind::SpendFloatingBonus, Arc::new(ResourceListener));
        registry
    }
}

impl ListenerRegistry {
    /// A registry that ignores every event.
    pub fn empty() -> Self {
        Self {
            listeners: HashMap::new(),
        }
    }

    pub fn get(&self, kind: EventKind) -> Option<Arc<dyn Listener>> {
        self.listeners.get(&kind).cloned()
    }

    pub fn set(&mut self, kind: EventKind, listener: Arc<dyn Listener>) {
        self.listeners.insert(kind, listener);
    }

    pub fn remove(&mut self, kind: EventKind) {
        self.listeners.remove(&kind);
    }
}

/// Roll initiative.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewRoundListener;

impl Listener for NewRoundListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        if !matches!(event, Event::NewRound { .. }) {
            return Ok(Vec::new());
        }
        let actions = if ctx.character(character)?.is_fighting() {
            ctx.roll_initiative(character)?
        } else {
            Vec::new()
        };
        let me = ctx.character_mut(character)?;
        tracing::debug!(character = me.name(), actions = ?actions, "rolled initiative");
        me.set_actions(actions);
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EndOfRoundListener;

impl Listener for EndOfRoundListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        if matches!(event, Event::EndOfRound { .. }) {
            ctx.character_mut(character)?.knowledge_mut().end_of_round();
        }
        Ok(Vec::new())
    }
}

/// Ask the action strategy; a silent strategy holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct YourMoveListener;

impl Listener for YourMoveListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        match event {
            Event::YourMove { subject } if *subject == character => {
                let strategy = ctx.character(character)?.strategy(StrategyKind::Action);
                let events = strategy.recommend(character, event, ctx)?;
                if events.is_empty() {
                    Ok(vec![Event::HoldAction { subject: character }])
                } else {
                    Ok(events)
                }
            }
            _ => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AddModifierListener;

impl Listener for AddModifierListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        if let Event::AddModifier { subject, modifier } = event {
            let me = ctx.character_mut(character)?;
            if *subject == character {
                me.add_modifier(modifier.clone());
            } else {
                me.knowledge_mut()
                    .observe_modifier_added(*subject, modifier.clone());
            }
        }
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveModifierListener;

impl Listener for RemoveModifierListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        if let Event::RemoveModifier { subject, modifier } = event {
            let me = ctx.character_mut(character)?;
            if *subject == character {
                me.remove_modifier(*modifier);
            } else {
                me.knowledge_mut().observe_modifier_removed(*subject, *modifier);
            }
        }
        Ok(Vec::new())
    }
}

/// Observe the attack, open up a lunger, and consider a counterattack.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttackDeclaredListener;

impl Listener for AttackDeclaredListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        let Event::AttackDeclared { action } = event else {
            return Ok(Vec::new());
        };
        let attack = ctx.actions().attack(*action)?.clone();
        if character == attack.subject {
            return Ok(Vec::new());
        }
        let target_tn = ctx.character(attack.target)?.tn_to_hit();
        let hostile = !ctx.are_allies(character, attack.subject);
        {
            let knowledge = ctx.character_mut(character)?.knowledge_mut();
            knowledge.observe_action(attack.subject);
            if character != attack.target {
                knowledge.observe_tn_to_hit(attack.target, target_tn);
            }
        }

        let mut responses = Vec::new();
        if attack.kind == AttackKind::Lunge && hostile {
            let modifier = Modifier::any_attack(character, LUNGE_OPENING)
                .against(attack.subject)
                .expiring(Expiry::AfterOwnAttackOn(attack.subject))
                .expiring(Expiry::AtEndOfRound);
            responses.push(Event::AddModifier {
                subject: character,
                modifier,
            });
        }
        let strategy = ctx.character(character)?.strategy(StrategyKind::Counterattack);
        responses.extend(strategy.recommend(character, event, ctx)?);
        Ok(responses)
    }
}

/// Observe the roll, then decide whether to parry.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttackRolledListener;

impl Listener for AttackRolledListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        let Event::AttackRolled { action, roll } = event else {
            return Ok(Vec::new());
        };
        let attacker = ctx.actions().attack(*action)?.subject;
        if character == attacker {
            return Ok(Vec::new());
        }
        ctx.character_mut(character)?
            .knowledge_mut()
            .observe_attack_roll(attacker, *roll);
        let strategy = ctx.character(character)?.strategy(StrategyKind::Parry);
        strategy.recommend(character, event, ctx)
    }
}

/// A successful feint earns a temporary Void Point and moves the feinter's
/// latest action die to now.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeintSucceededListener;

impl Listener for FeintSucceededListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        let Event::AttackSucceeded { action } = event else {
            return Ok(Vec::new());
        };
        let attack = ctx.actions().attack(*action)?;
        if attack.subject != character || attack.kind != AttackKind::Feint {
            return Ok(Vec::new());
        }
        let phase = ctx.phase();
        let mut responses = vec![Event::GainTemporaryVoidPoints {
            subject: character,
            amount: 1,
        }];
        if ctx.character_mut(character)?.advance_latest_action(phase) {
            responses.push(Event::InitiativeChanged);
        }
        Ok(responses)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParryDeclaredListener;

impl Listener for ParryDeclaredListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        if let Event::ParryDeclared { action } = event {
            let parrier = ctx.actions().parry(*action)?.subject;
            if parrier != character {
                ctx.character_mut(character)?
                    .knowledge_mut()
                    .observe_action(parrier);
            }
        }
        Ok(Vec::new())
    }
}

/// Record the decliner on the attack so friends stop counting on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParryDeclinedListener;

impl Listener for ParryDeclinedListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        if let Event::ParryDeclined { attack, subject } = event {
            if *subject == character {
                ctx.actions_mut()
                    .attack_mut(*attack)?
                    .add_parry_declined(character);
            }
        }
        Ok(Vec::new())
    }
}

/// Take the light wounds, then declare a wound check.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightWoundsDamageListener;

impl Listener for LightWoundsDamageListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        match event {
            Event::LightWoundsDamage {
                subject,
                target,
                damage,
                ..
            } if *target == character => {
                let me = ctx.character_mut(character)?;
                me.take_lw(*damage);
                me.knowledge_mut().observe_damage_roll(*subject, *damage);
                tracing::debug!(character = me.name(), damage, lw = me.lw(), "took light wounds");
                let strategy = me.strategy(StrategyKind::WoundCheck);
                strategy.recommend(character, event, ctx)
            }
            _ => Ok(Vec::new()),
        }
    }
}

/// Take serious wounds and report defeat.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriousWoundsDamageListener;

impl Listener for SeriousWoundsDamageListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        let Event::SeriousWoundsDamage { target, damage, .. } = event else {
            return Ok(Vec::new());
        };
        let me = ctx.character_mut(character)?;
        if *target != character {
            me.knowledge_mut().observe_wounds(*target, *damage);
            return Ok(Vec::new());
        }
        me.take_sw(*damage);
        tracing::info!(character = me.name(), damage, sw = me.sw(), "took serious wounds");
        if me.is_fighting() {
            return Ok(Vec::new());
        }
        me.clear_actions();
        let defeat = if !me.is_alive() {
            Event::Death { subject: character }
        } else if !me.is_conscious() {
            Event::Unconscious { subject: character }
        } else {
            Event::Surrender { subject: character }
        };
        Ok(vec![defeat])
    }
}

/// Trade banked light wounds for serious wounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct TakeSeriousWoundListener;

impl Listener for TakeSeriousWoundListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        match event {
            Event::TakeSeriousWound {
                subject,
                attacker,
                damage,
            } if *subject == character => {
                ctx.character_mut(character)?.reset_lw();
                Ok(vec![Event::SeriousWoundsDamage {
                    subject: *attacker,
                    target: character,
                    damage: *damage,
                }])
            }
            _ => Ok(Vec::new()),
        }
    }
}

/// Roll the declared check and let the strategy improve it.
#[derive(Debug, Clone, Copy, Default)]
pub struct WoundCheckDeclaredListener;

impl Listener for WoundCheckDeclaredListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        let Event::WoundCheckDeclared {
            subject,
            attacker,
            damage,
            tn,
            vp,
        } = event
        else {
            return Ok(Vec::new());
        };
        if *subject != character {
            return Ok(Vec::new());
        }
        let roll = ctx.roll_wound_check(character, *vp)?;
        let mut responses = Vec::new();
        if *vp > 0 {
            responses.push(Event::SpendVoidPoints {
                subject: character,
                skill: Skill::WoundCheck,
                amount: *vp,
            });
        }
        let rolled = Event::WoundCheckRolled {
            subject: character,
            attacker: *attacker,
            damage: *damage,
            tn: *tn,
            roll,
        };
        let strategy = ctx.character(character)?.strategy(StrategyKind::WoundCheckRolled);
        let recommended = strategy.recommend(character, &rolled, ctx)?;
        let settles = recommended
            .iter()
            .any(|e| e.kind() == EventKind::WoundCheckRolled);
        responses.extend(recommended);
        if !settles {
            responses.push(rolled);
        }
        Ok(responses)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WoundCheckRolledListener;

impl Listener for WoundCheckRolledListener {
    fn handle(&self, character: CharacterId, event: &Event, _ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        match *event {
            Event::WoundCheckRolled {
                subject,
                attacker,
                damage,
                tn,
                roll,
            } if subject == character => {
                let outcome = if roll < tn {
                    Event::WoundCheckFailed {
                        subject,
                        attacker,
                        damage,
                        tn,
                        roll,
                    }
                } else {
                    Event::WoundCheckSucceeded {
                        subject,
                        attacker,
                        damage,
                        tn,
                        roll,
                    }
                };
                Ok(vec![outcome])
            }
            _ => Ok(Vec::new()),
        }
    }
}

/// A failed check converts light wounds into serious wounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct WoundCheckFailedListener;

impl Listener for WoundCheckFailedListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        match *event {
            Event::WoundCheckFailed {
                subject,
                attacker,
                tn,
                roll,
                ..
            } if subject == character => {
                let sw = serious_wounds(roll, tn);
                let me = ctx.character_mut(character)?;
                me.reset_lw();
                tracing::info!(character = me.name(), roll, tn, sw, "failed wound check");
                Ok(vec![Event::SeriousWoundsDamage {
                    subject: attacker,
                    target: character,
                    damage: sw,
                }])
            }
            _ => Ok(Vec::new()),
        }
    }
}

/// After a passed check, decide whether to keep the light wounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct WoundCheckSucceededListener;

impl Listener for WoundCheckSucceededListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        match event {
            Event::WoundCheckSucceeded { subject, .. } if *subject == character => {
                let strategy = ctx.character(character)?.strategy(StrategyKind::LightWounds);
                strategy.recommend(character, event, ctx)
            }
            _ => Ok(Vec::new()),
        }
    }
}

/// Gains and spends of actions, Void Points, Adventure Points and floating
/// bonuses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceListener;

impl Listener for ResourceListener {
    fn handle(&self, character: CharacterId, event: &Event, ctx: &mut Context) -> Result<Vec<Event>, EngineError> {
        if event.subject() != Some(character) {
            return Ok(Vec::new());
        }
        let me = ctx.character_mut(character)?;
        match event {
            Event::GainTemporaryVoidPoints { amount, .. } => me.gain_tvp(*amount),
            Event::GainFloatingBonus { bonus, .. } => me.gain_floating_bonus(bonus.clone()),
            Event::SpendAction { phase, .. } => me.spend_action(*phase)?,
            Event::SpendVoidPoints { amount, .. } => me.spend_vp(*amount)?,
            Event::SpendAdventurePoints { skill, amount, .. } => me.spend_ap(*skill, *amount)?,
            Event::SpendFloatingBonus { bonus, .. } => me.spend_floating_bonus(bonus)?,
            _ => {}
        }
        Ok(Vec::new())
    }
}
