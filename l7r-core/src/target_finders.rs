//! Choosing whom to attack.

use crate::actions::{AttackAction, AttackKind};
use crate::character::CharacterId;
use crate::context::Context;
use crate::error::EngineError;
use crate::knowledge::TheoreticalCharacter;
use crate::skills::Skill;

/// Picks a target for an attack with `skill`.
pub trait TargetFinder: Send + Sync {
    fn find_target(
        &self,
        subject: CharacterId,
        skill: Skill,
        ctx: &Context,
    ) -> Result<Option<CharacterId>, EngineError>;

    fn name(&self) -> &'static str;
}

/// Enemies of `subject` who are still fighting and whom the formation lets
/// `subject` attack, in initiative order.
pub fn find_enemies(subject: CharacterId, ctx: &Context) -> Vec<CharacterId> {
    ctx.characters()
        .filter(|c| c.is_fighting())
        .map(|c| c.id())
        .filter(|id| !ctx.are_allies(subject, *id))
        .filter(|id| ctx.formation().can_attack(subject, *id))
        .collect()
}

/// The enemy the subject is most likely to hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct EasiestTargetFinder;

impl TargetFinder for EasiestTargetFinder {
    fn find_target(
        &self,
        subject: CharacterId,
        skill: Skill,
        ctx: &Context,
    ) -> Result<Option<CharacterId>, EngineError> {
        let me = ctx.character(subject)?;
        let explode = !me.crippled();
        let kind = AttackKind::for_skill(skill).unwrap_or(AttackKind::Attack);
        let mut best: Option<(CharacterId, f64)> = None;
        for enemy in find_enemies(subject, ctx) {
            let believed_tn = TheoreticalCharacter::new(me.knowledge(), enemy).tn_to_hit();
            let action = AttackAction::new(subject, enemy, kind, believed_tn, 0);
            let params = me.skill_roll_params(Some(enemy), skill, 0);
            let p = ctx.p(action.tn() - params.bonus, params.rolled, params.kept, explode)?;
            if best.map_or(true, |(_, best_p)| p > best_p) {
                best = Some((enemy, p));
            }
        }
        Ok(best.map(|(enemy, _)| enemy))
    }

    fn name(&self) -> &'static str {
        "easiest target"
    }
}

/// The enemy who has been seen rolling the most damage.
#[derive(Debug, Clone, Copy, Default)]
pub struct MostDangerousTargetFinder;

impl TargetFinder for MostDangerousTargetFinder {
    fn find_target(
        &self,
        subject: CharacterId,
        _skill: Skill,
        ctx: &Context,
    ) -> Result<Option<CharacterId>, EngineError> {
        let knowledge = ctx.character(subject)?.knowledge();
        let mut best: Option<(CharacterId, i32)> = None;
        for enemy in find_enemies(subject, ctx) {
            let damage = knowledge.average_damage_roll(enemy);
            if best.map_or(true, |(_, most)| damage > most) {
                best = Some((enemy, damage));
            }
        }
        Ok(best.map(|(enemy, _)| enemy))
    }

    fn name(&self) -> &'static str {
        "most dangerous target"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Character;
    use crate::testing::TestHarness;

    fn skirmish() -> TestHarness {
        let hero = Character::new("Hero");
        let mut brute = Character::new("Brute");
        brute.set_skill(Skill::Parry, 4).unwrap();
        let weakling = Character::new("Weakling");
        TestHarness::new(vec![vec![brute, weakling], vec![hero]])
    }

    #[test]
    fn test_easiest_target_has_lowest_tn() {
        let harness = skirmish();
        let ctx = harness.context();
        let hero = harness.id("Hero");
        let target = EasiestTargetFinder.find_target(hero, Skill::Attack, ctx).unwrap();
        assert_eq!(target, Some(harness.id("Weakling")));
    }

    #[test]
    fn test_most_dangerous_uses_observed_damage() {
        let mut harness = skirmish();
        let hero = harness.id("Hero");
        let brute = harness.id("Brute");
        harness
            .context_mut()
            .character_mut(hero)
            .unwrap()
            .knowledge_mut()
            .observe_damage_roll(brute, 40);
        let target = MostDangerousTargetFinder
            .find_target(hero, Skill::Attack, harness.context())
            .unwrap();
        assert_eq!(target, Some(brute));
    }

    #[test]
    fn test_no_target_when_enemies_are_down() {
        let mut harness = TestHarness::duel();
        let control = harness.control_id();
        let test = harness.test_id();
        harness.context_mut().character_mut(control).unwrap().take_sw(10);
        let target = EasiestTargetFinder
            .find_target(test, Skill::Attack, harness.context())
            .unwrap();
        assert_eq!(target, None);
    }
}
