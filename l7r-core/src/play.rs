//! Step-by-step resolution of playable events.
//!
//! Taking an attack, a parry or a contest is a compound mechanic. Its play is a small
//! state machine: each call to `next` advances one step and hands back the
//! next sub-event, which the engine dispatches completely before asking for
//! another. A step may queue several events at once; they come out in order.

use crate::actions::{Action, ActionId};
use crate::context::Context;
use crate::error::EngineError;
use crate::events::{Event, EventKind};
use crate::modifiers::{Modifier, ModifierId};
use crate::skills::Skill;
use crate::strategies::StrategyKind;
use std::collections::VecDeque;

/// TN to be hit gained per parry rank while committed to an attack.
pub const COMMITTED_TN_PER_PARRY_RANK: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttackStep {
    Commit,
    Declare,
    Uncommit,
    Roll,
    Resolve,
    Damage,
    Done,
}

/// Declare, roll, resolve and deal damage for one attack.
#[derive(Debug)]
pub struct AttackPlay {
    action: ActionId,
    step: AttackStep,
    pending: VecDeque<Event>,
    commitment: Option<ModifierId>,
}

impl AttackPlay {
    pub fn new(action: ActionId) -> Self {
        Self {
            action,
            step: AttackStep::Commit,
            pending: VecDeque::new(),
            commitment: None,
        }
    }

    pub fn action(&self) -> ActionId {
        self.action
    }

    pub fn next(&mut self, ctx: &mut Context) -> Result<Option<Event>, EngineError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                if let Event::AttackRolled { action, roll } = &event {
                    if *action == self.action {
                        ctx.actions_mut().attack_mut(self.action)?.set_skill_roll(*roll);
                    }
                }
                return Ok(Some(event));
            }
            match self.step {
                AttackStep::Commit => {
                    self.step = AttackStep::Declare;
                    self.commit(ctx)?;
                }
                AttackStep::Declare => {
                    self.step = AttackStep::Uncommit;
                    let target = ctx.actions().attack(self.action)?.target;
                    let tn = ctx.character(target)?.tn_to_hit();
                    ctx.actions_mut().attack_mut(self.action)?.base_tn = tn;
                    self.pending.push_back(Event::AttackDeclared {
                        action: self.action,
                    });
                }
                AttackStep::Uncommit => {
                    self.step = AttackStep::Roll;
                    if let Some(modifier) = self.commitment.take() {
                        let subject = ctx.actions().attack(self.action)?.subject;
                        self.pending
                            .push_back(Event::RemoveModifier { subject, modifier });
                    }
                }
                AttackStep::Roll => {
                    self.step = AttackStep::Resolve;
                    self.roll(ctx)?;
                }
                AttackStep::Resolve => {
                    self.step = AttackStep::Damage;
                    self.resolve(ctx)?;
                }
                AttackStep::Damage => {
                    self.step = AttackStep::Done;
                    self.damage(ctx)?;
                }
                AttackStep::Done => return Ok(None),
            }
        }
    }

    /// An attacker who could be countered drops its guard until the
    /// counterattacks are settled.
    fn commit(&mut self, ctx: &Context) -> Result<(), EngineError> {
        let attack = ctx.actions().attack(self.action)?;
        if attack.is_counterattack() {
            return Ok(());
        }
        let parry = ctx.character(attack.subject)?.skill(Skill::Parry);
        if parry > 0 {
            let modifier = Modifier::new(
                attack.subject,
                vec![Skill::TnToHit],
                COMMITTED_TN_PER_PARRY_RANK * parry,
            );
            self.commitment = Some(modifier.id);
            self.pending.push_back(Event::AddModifier {
                subject: attack.subject,
                modifier,
            });
        }
        Ok(())
    }

    fn roll(&mut self, ctx: &mut Context) -> Result<(), EngineError> {
        let attack = ctx.actions().attack(self.action)?.clone();
        if !ctx.character(attack.subject)?.is_fighting() {
            tracing::debug!(action = ?self.action, "attacker fell before rolling");
            self.step = AttackStep::Done;
            self.pending.push_back(Event::AttackFailed {
                action: self.action,
            });
            return Ok(());
        }
        let skill = attack.skill();
        let roll = ctx.roll_skill(attack.subject, Some(attack.target), skill, attack.vp)?;
        ctx.actions_mut().attack_mut(self.action)?.set_skill_roll(roll);
        if attack.vp > 0 {
            self.pending.push_back(Event::SpendVoidPoints {
                subject: attack.subject,
                skill,
                amount: attack.vp,
            });
        }
        let rolled = Event::AttackRolled {
            action: self.action,
            roll,
        };
        let strategy = ctx.character(attack.subject)?.strategy(StrategyKind::AttackRolled);
        let recommended = strategy.recommend(attack.subject, &rolled, ctx)?;
        let settles = recommended
            .iter()
            .any(|e| e.kind() == EventKind::AttackRolled);
        self.pending.extend(recommended);
        if !settles {
            self.pending.push_back(rolled);
        }
        Ok(())
    }

    fn resolve(&mut self, ctx: &Context) -> Result<(), EngineError> {
        let attack = ctx.actions().attack(self.action)?;
        if attack.is_hit() {
            self.pending.push_back(Event::AttackSucceeded {
                action: self.action,
            });
            if let Some(damage) = attack.direct_damage() {
                self.pending.push_back(Event::SeriousWoundsDamage {
                    subject: attack.subject,
                    target: attack.target,
                    damage,
                });
            }
        } else {
            self.step = AttackStep::Done;
            self.pending.push_back(Event::AttackFailed {
                action: self.action,
            });
        }
        Ok(())
    }

    fn damage(&mut self, ctx: &mut Context) -> Result<(), EngineError> {
        let attack = ctx.actions().attack(self.action)?.clone();
        if !attack.deals_damage() || !attack.is_hit() || !ctx.character(attack.target)?.is_fighting() {
            return Ok(());
        }
        let damage = ctx.roll_damage(
            attack.subject,
            attack.target,
            attack.skill(),
            attack.extra_damage_dice(),
        )?;
        ctx.actions_mut().attack_mut(self.action)?.set_damage_roll(damage);
        self.pending.push_back(Event::LightWoundsDamage {
            subject: attack.subject,
            target: attack.target,
            damage,
            wound_check_tn: damage,
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParryStep {
    Declare,
    Roll,
    Resolve,
    Done,
}

/// Declare, roll and resolve one parry.
#[derive(Debug)]
pub struct ParryPlay {
    action: ActionId,
    step: ParryStep,
    pending: VecDeque<Event>,
}

impl ParryPlay {
    pub fn new(action: ActionId) -> Self {
        Self {
            action,
            step: ParryStep::Declare,
            pending: VecDeque::new(),
        }
    }

    pub fn action(&self) -> ActionId {
        self.action
    }

    pub fn next(&mut self, ctx: &mut Context) -> Result<Option<Event>, EngineError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                if let Event::ParryRolled { action, roll } = &event {
                    if *action == self.action {
                        ctx.actions_mut().parry_mut(self.action)?.set_skill_roll(*roll);
                    }
                }
                return Ok(Some(event));
            }
            match self.step {
                ParryStep::Declare => {
                    self.step = ParryStep::Roll;
                    let parry = ctx.actions().parry(self.action)?;
                    let (attack, subject) = (parry.attack, parry.subject);
                    ctx.actions_mut().attack_mut(attack)?.add_parry_declared(subject);
                    self.pending.push_back(Event::ParryDeclared {
                        action: self.action,
                    });
                }
                ParryStep::Roll => {
                    self.step = ParryStep::Resolve;
                    self.roll(ctx)?;
                }
                ParryStep::Resolve => {
                    self.step = ParryStep::Done;
                    let parry = ctx.actions().parry(self.action)?;
                    let (attack, success) = (parry.attack, parry.is_success());
                    if success {
                        ctx.actions_mut().attack_mut(attack)?.set_parried();
                        self.pending.push_back(Event::ParrySucceeded {
                            action: self.action,
                        });
                    } else {
                        self.pending.push_back(Event::ParryFailed {
                            action: self.action,
                        });
                    }
                }
                ParryStep::Done => return Ok(None),
            }
        }
    }

    fn roll(&mut self, ctx: &mut Context) -> Result<(), EngineError> {
        let parry = ctx.actions().parry(self.action)?.clone();
        let roll = ctx.roll_skill(parry.subject, Some(parry.target), parry.skill(), parry.vp)?
            - parry.penalty();
        ctx.actions_mut().parry_mut(self.action)?.set_skill_roll(roll);
        ctx.actions_mut().attack_mut(parry.attack)?.set_parry_attempted();
        if parry.vp > 0 {
            self.pending.push_back(Event::SpendVoidPoints {
                subject: parry.subject,
                skill: parry.skill(),
                amount: parry.vp,
            });
        }
        let rolled = Event::ParryRolled {
            action: self.action,
            roll,
        };
        let strategy = ctx.character(parry.subject)?.strategy(StrategyKind::ParryRolled);
        let recommended = strategy.recommend(parry.subject, &rolled, ctx)?;
        let settles = recommended
            .iter()
            .any(|e| e.kind() == EventKind::ParryRolled);
        self.pending.extend(recommended);
        if !settles {
            self.pending.push_back(rolled);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContestStep {
    Roll,
    Damage,
    Done,
}

/// Roll both sides of a contest, then strike with the margin.
#[derive(Debug)]
pub struct ContestPlay {
    action: ActionId,
    step: ContestStep,
    pending: VecDeque<Event>,
}

impl ContestPlay {
    pub fn new(action: ActionId) -> Self {
        Self {
            action,
            step: ContestStep::Roll,
            pending: VecDeque::new(),
        }
    }

    pub fn action(&self) -> ActionId {
        self.action
    }

    pub fn next(&mut self, ctx: &mut Context) -> Result<Option<Event>, EngineError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            match self.step {
                ContestStep::Roll => {
                    self.step = ContestStep::Damage;
                    self.roll(ctx)?;
                }
                ContestStep::Damage => {
                    self.step = ContestStep::Done;
                    self.damage(ctx)?;
                }
                ContestStep::Done => return Ok(None),
            }
        }
    }

    fn roll(&mut self, ctx: &mut Context) -> Result<(), EngineError> {
        let mut contest = ctx.actions().contest(self.action)?.clone();
        ctx.roll_contested(&mut contest)?;
        let (roll, opponent_roll) = (contest.skill_roll(), contest.opponent_roll());
        if contest.vp > 0 {
            self.pending.push_back(Event::SpendVoidPoints {
                subject: contest.challenger(),
                skill: contest.challenger_skill(),
                amount: contest.vp,
            });
        }
        *ctx.actions_mut().contest_mut(self.action)? = contest;
        if let (Some(roll), Some(opponent_roll)) = (roll, opponent_roll) {
            self.pending.push_back(Event::ContestRolled {
                action: self.action,
                roll,
                opponent_roll,
            });
        }
        Ok(())
    }

    fn damage(&mut self, ctx: &mut Context) -> Result<(), EngineError> {
        let contest = ctx.actions().contest(self.action)?.clone();
        if !ctx.character(contest.subject)?.is_fighting() || !ctx.character(contest.target)?.is_fighting() {
            return Ok(());
        }
        let base = ctx
            .character(contest.subject)?
            .damage_roll_params(Some(contest.target), contest.skill, 0);
        if !contest.is_hit(base) {
            tracing::debug!(action = ?self.action, margin = ?contest.margin(), "contest struck nothing");
            return Ok(());
        }
        let damage = ctx.roll_damage(
            contest.subject,
            contest.target,
            contest.skill,
            contest.extra_damage_dice(),
        )?;
        self.pending.push_back(Event::LightWoundsDamage {
            subject: contest.subject,
            target: contest.target,
            damage,
            wound_check_tn: damage,
        });
        Ok(())
    }
}

/// A playable event in progress.
#[derive(Debug)]
pub enum Play {
    Attack(AttackPlay),
    Parry(ParryPlay),
    Contest(ContestPlay),
}

impl Play {
    /// Put the event's action in the arena and start playing it. Returns
    /// nothing for events that are not playable.
    pub fn start(event: &Event, ctx: &mut Context) -> Option<Self> {
        match event {
            Event::TakeAttack { action } => {
                let id = ctx.actions_mut().insert(Action::Attack(action.clone()));
                Some(Play::Attack(AttackPlay::new(id)))
            }
            Event::TakeParry { action } => {
                let id = ctx.actions_mut().insert(Action::Parry(action.clone()));
                Some(Play::Parry(ParryPlay::new(id)))
            }
            Event::TakeContest { action } => {
                let id = ctx.actions_mut().insert(Action::Contest(action.clone()));
                Some(Play::Contest(ContestPlay::new(id)))
            }
            _ => None,
        }
    }

    pub fn action(&self) -> ActionId {
        match self {
            Play::Attack(play) => play.action(),
            Play::Parry(play) => play.action(),
            Play::Contest(play) => play.action(),
        }
    }

    pub fn next(&mut self, ctx: &mut Context) -> Result<Option<Event>, EngineError> {
        match self {
            Play::Attack(play) => play.next(ctx),
            Play::Parry(play) => play.next(ctx),
            Play::Contest(play) => play.next(ctx),
        }
    }
}
