//! Searches over small Void Point and Adventure Point spends.
//!
//! Each optimizer enumerates the affordable (VP, AP) pairs, scores them with
//! the probability tables and picks the cheapest one that meets a threshold.
//! None of them fail when nothing qualifies: they recommend nothing, or
//! spending nothing.

use crate::actions::{AttackAction, AttackKind};
use crate::character::{Character, CharacterId};
use crate::context::Context;
use crate::error::EngineError;
use crate::events::Event;
use crate::knowledge::TheoreticalCharacter;
use crate::skills::Skill;
use std::collections::BTreeMap;

/// Kept damage dice beyond which extra spending is not worth it.
pub const DAMAGE_KEPT_CUTOFF: i32 = 6;

/// A character's expected roll for one resource spend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedRoll {
    pub roll: i32,
    pub vp: u32,
    pub ap: u32,
    pub p: f64,
}

/// Finds the cheapest spend that hits a TN with a given probability.
///
/// Useful when exceeding the TN is worth nothing, like a feint.
pub struct AttackOptimizer<'a> {
    ctx: &'a Context,
    subject: &'a Character,
    target: CharacterId,
    kind: AttackKind,
    speculative: AttackAction,
    expected: Vec<ExpectedRoll>,
}

impl<'a> AttackOptimizer<'a> {
    pub fn new(
        ctx: &'a Context,
        subject: CharacterId,
        target: CharacterId,
        kind: AttackKind,
    ) -> Result<Self, EngineError> {
        let subject = ctx.character(subject)?;
        let skill = kind.skill();
        let max_vp = subject.max_vp_per_roll().min(subject.vp_available(skill));
        let max_ap = if subject.can_spend_ap(skill) {
            subject.max_ap_per_roll().min(subject.ap())
        } else {
            0
        };
        Self::with_limits(ctx, subject, target, kind, max_vp, max_ap)
    }

    /// An optimizer that spends at most `max_vp` and `max_ap`.
    pub fn with_limits(
        ctx: &'a Context,
        subject: &'a Character,
        target: CharacterId,
        kind: AttackKind,
        max_vp: u32,
        max_ap: u32,
    ) -> Result<Self, EngineError> {
        let skill = kind.skill();
        let max_vp = max_vp.min(subject.vp());
        let max_ap = max_ap.min(subject.ap());
        let explode = !subject.crippled();
        let believed_tn = TheoreticalCharacter::new(subject.knowledge(), target).tn_to_hit();
        let speculative = AttackAction::new(subject.id(), target, kind, believed_tn, 0);
        let tn = speculative.tn();
        let bonus: i32 = subject.floating_bonuses(skill).iter().map(|b| b.bonus).sum();
        let mut expected = Vec::new();
        for vp in 0..=max_vp {
            let params = subject.skill_roll_params(Some(target), skill, vp);
            let roll = ctx.mean_roll(params.rolled, params.kept, explode) + params.bonus + bonus;
            for ap in 0..=max_ap {
                let raises = 5 * ap as i32;
                let adjusted_tn = tn - raises - bonus - params.bonus;
                expected.push(ExpectedRoll {
                    roll: roll + raises,
                    vp,
                    ap,
                    p: ctx.p(adjusted_tn, params.rolled, params.kept, explode)?,
                });
            }
        }
        expected.sort_by_key(|r| r.roll);
        Ok(Self {
            ctx,
            subject,
            target,
            kind,
            speculative,
            expected,
        })
    }

    pub fn expected_rolls(&self) -> &[ExpectedRoll] {
        &self.expected
    }

    pub fn tn(&self) -> i32 {
        self.speculative.tn()
    }

    fn action(&self, vp: u32) -> AttackAction {
        AttackAction::new(
            self.subject.id(),
            self.target,
            self.kind,
            self.speculative.base_tn,
            vp,
        )
    }

    /// The lowest expected roll reaching `threshold`, as an attack.
    pub fn optimize(&self, threshold: f64) -> Option<AttackAction> {
        self.expected
            .iter()
            .find(|r| r.p >= threshold)
            .map(|r| self.action(r.vp))
    }

    /// Spend to keep more damage dice once `threshold` is met, stopping at
    /// the kept dice cutoff.
    pub fn optimize_damage(&self, threshold: f64) -> Option<AttackAction> {
        let mut best: Option<&ExpectedRoll> = None;
        let mut best_kept = 0;
        for r in self.expected.iter().filter(|r| r.p >= threshold) {
            let extra = self.speculative.extra_damage_dice_for(r.roll);
            let kept = self
                .subject
                .damage_roll_params(Some(self.target), self.kind.skill(), extra)
                .kept;
            if kept > best_kept {
                best = Some(r);
                best_kept = kept;
            }
            if kept >= DAMAGE_KEPT_CUTOFF {
                break;
            }
        }
        tracing::trace!(
            subject = self.subject.name(),
            skill = %self.kind.skill(),
            kept = best_kept,
            phase = self.ctx.phase(),
            "damage optimization"
        );
        best.map(|r| self.action(r.vp))
    }
}

/// Choose the optimizer objective for an attack kind and run it.
///
/// Attacks that deal damage optimize for kept damage dice; feints only
/// need to hit.
pub fn optimize_attack(
    ctx: &Context,
    subject: CharacterId,
    target: CharacterId,
    kind: AttackKind,
    threshold: f64,
) -> Result<Option<AttackAction>, EngineError> {
    let optimizer = AttackOptimizer::new(ctx, subject, target, kind)?;
    let probe = AttackAction::new(subject, target, kind, 0, 0);
    Ok(if probe.deals_damage() {
        optimizer.optimize_damage(threshold)
    } else {
        optimizer.optimize(threshold)
    })
}

/// Priority of a wound check spend. VP are worth about four AP, but a
/// fourth or fifth AP costs more than one more VP.
pub fn wound_check_cost(vp: u32, ap: u32) -> u32 {
    let vp_value = if ap < 4 { 4 * vp } else { 6 * (vp + 1) - 2 };
    let ap_value = if ap <= 3 { ap } else { ap + 4 };
    vp_value + ap_value
}

/// Smallest roll that limits a wound check to each number of serious
/// wounds, for `lw` light wounds.
pub fn serious_wound_breakpoints(character: &Character, lw: i32) -> BTreeMap<i32, i32> {
    let mut breakpoints = BTreeMap::new();
    let mut previous = i32::MAX;
    let mut roll = 0;
    loop {
        let sw = character.wound_check(roll, Some(lw));
        if sw < previous {
            breakpoints.insert(sw, roll);
            previous = sw;
        }
        if sw == 0 {
            return breakpoints;
        }
        roll += 1;
    }
}

/// Chooses Void Points to declare on a wound check.
pub struct WoundCheckOptimizer<'a> {
    ctx: &'a Context,
    subject: &'a Character,
    attacker: CharacterId,
    tn_adjustment: i32,
    max_vp: u32,
    max_ap: u32,
    breakpoints: BTreeMap<i32, i32>,
}

impl<'a> WoundCheckOptimizer<'a> {
    /// `tn_adjustment` is added to the light wounds to get the check's TN.
    pub fn new(
        ctx: &'a Context,
        subject: CharacterId,
        attacker: CharacterId,
        tn_adjustment: i32,
    ) -> Result<Self, EngineError> {
        let subject = ctx.character(subject)?;
        let max_vp = subject
            .max_vp_per_roll()
            .min(subject.vp_available(Skill::WoundCheck));
        let max_ap = if subject.can_spend_ap(Skill::WoundCheck) {
            subject.max_ap_per_roll().min(subject.ap())
        } else {
            0
        };
        Ok(Self {
            ctx,
            subject,
            attacker,
            tn_adjustment,
            max_vp,
            max_ap,
            breakpoints: serious_wound_breakpoints(subject, subject.lw() + tn_adjustment),
        })
    }

    pub fn with_max_vp(mut self, max_vp: u32) -> Self {
        self.max_vp = self.max_vp.min(max_vp);
        self
    }

    fn declaration(&self, vp: u32) -> Event {
        let lw = self.subject.lw();
        Event::WoundCheckDeclared {
            subject: self.subject.id(),
            attacker: self.attacker,
            damage: lw,
            tn: lw + self.tn_adjustment,
            vp,
        }
    }

    /// Declare the cheapest spend that keeps the check to `max_sw` serious
    /// wounds with probability `threshold`.
    pub fn declare(&self, max_sw: i32, threshold: f64) -> Result<Event, EngineError> {
        let bonus: i32 = self
            .subject
            .floating_bonuses(Skill::WoundCheck)
            .iter()
            .map(|b| b.bonus)
            .sum();
        let Some(roll_needed) = self.breakpoints.get(&max_sw) else {
            return Ok(self.declaration(0));
        };
        let tn = roll_needed - bonus;
        let mut options = Vec::new();
        for vp in 0..=self.max_vp {
            let params = self.subject.wound_check_roll_params(vp);
            for ap in 0..=self.max_ap {
                let adjusted = tn - 5 * ap as i32 - params.bonus;
                let p = self.ctx.p(adjusted, params.rolled, params.kept, true)?;
                options.push((wound_check_cost(vp, ap), vp, ap, p));
            }
            if params.kept >= 10 {
                break;
            }
        }
        options.sort_by_key(|(cost, ..)| *cost);
        match options.into_iter().find(|(.., p)| *p >= threshold) {
            Some((_, vp, ap, p)) => {
                tracing::debug!(
                    character = self.subject.name(),
                    vp,
                    ap,
                    max_sw,
                    p,
                    "declaring wound check"
                );
                Ok(self.declaration(vp))
            }
            None => Ok(self.declaration(0)),
        }
    }
}
