//! Roll parameters: how many dice a character rolls and keeps, and the flat
//! modifier, for each kind of roll.
//!
//! Every provider returns normalized parameters.

use crate::character::{Character, CharacterId};
use crate::dice::RollParams;
use crate::skills::Skill;

/// Points of bonus per rank of skill advantage in a contested roll.
pub const CONTESTED_BONUS_PER_RANK: i32 = 5;

/// Computes roll parameters for a character.
///
/// Swapping the provider is how an ability changes the dice a character
/// rolls without touching the listeners that roll them.
pub trait RollParameterProvider: Send + Sync {
    /// Skill roll against `target`, spending `vp` Void Points.
    fn skill(&self, character: &Character, target: Option<CharacterId>, skill: Skill, vp: u32) -> RollParams;

    /// Damage roll with `extra_rolled` dice earned by the attack roll.
    fn damage(
        &self,
        character: &Character,
        target: Option<CharacterId>,
        skill: Skill,
        extra_rolled: i32,
    ) -> RollParams;

    fn initiative(&self, character: &Character) -> RollParams;

    fn wound_check(&self, character: &Character, vp: u32) -> RollParams;

    /// Skill roll contested by `opponent` using `contested_skill`. The side
    /// with the higher skill gets a bonus per rank of difference.
    fn contested(
        &self,
        character: &Character,
        opponent: &Character,
        skill: Skill,
        contested_skill: Skill,
        vp: u32,
    ) -> RollParams {
        let mut params = self.skill(character, Some(opponent.id()), skill, vp);
        let advantage = character.skill(skill) - opponent.skill(contested_skill);
        if advantage > 0 {
            params.bonus += CONTESTED_BONUS_PER_RANK * advantage;
        }
        params
    }
}

/// The standard rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRollParameterProvider;

impl RollParameterProvider for DefaultRollParameterProvider {
    fn skill(&self, character: &Character, target: Option<CharacterId>, skill: Skill, vp: u32) -> RollParams {
        let ring = character.ring(skill.ring());
        let vp = vp as i32;
        RollParams::new(
            ring + character.skill(skill) + character.extra_rolled(skill) + vp,
            ring + character.extra_kept(skill) + vp,
            character.modifier(target, skill),
        )
        .normalize()
    }

    fn damage(
        &self,
        character: &Character,
        target: Option<CharacterId>,
        _skill: Skill,
        extra_rolled: i32,
    ) -> RollParams {
        let weapon = character.weapon();
        RollParams::new(
            character.ring(Skill::Damage.ring())
                + character.extra_rolled(Skill::Damage)
                + extra_rolled
                + weapon.rolled,
            weapon.kept + character.extra_kept(Skill::Damage),
            character.modifier(target, Skill::Damage),
        )
        .normalize()
    }

    fn initiative(&self, character: &Character) -> RollParams {
        let ring = character.ring(Skill::Initiative.ring());
        RollParams::new(
            ring + 1 + character.extra_rolled(Skill::Initiative),
            ring + character.extra_kept(Skill::Initiative),
            0,
        )
        .normalize()
    }

    fn wound_check(&self, character: &Character, vp: u32) -> RollParams {
        let ring = character.ring(Skill::WoundCheck.ring());
        let vp = vp as i32;
        RollParams::new(
            ring + 1 + character.extra_rolled(Skill::WoundCheck) + vp,
            ring + character.extra_kept(Skill::WoundCheck) + vp,
            character.modifier(None, Skill::WoundCheck),
        )
        .normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifiers::Modifier;
    use crate::skills::Ring;

    #[test]
    fn test_damage_params() {
        let provider = DefaultRollParameterProvider;
        let mut c = Character::new("Akodo");
        assert_eq!(provider.damage(&c, None, Skill::Attack, 0), RollParams::new(6, 2, 0));
        c.set_ring(Ring::Fire, 5).unwrap();
        assert_eq!(provider.damage(&c, None, Skill::Attack, 2), RollParams::new(10, 3, 0));
    }

    #[test]
    fn test_initiative_params() {
        let provider = DefaultRollParameterProvider;
        let mut c = Character::new("Bayushi");
        assert_eq!(provider.initiative(&c), RollParams::new(3, 2, 0));
        c.set_ring(Ring::Void, 4).unwrap();
        assert_eq!(provider.initiative(&c), RollParams::new(5, 4, 0));
    }

    #[test]
    fn test_wound_check_params() {
        let provider = DefaultRollParameterProvider;
        let c = Character::new("Hida");
        assert_eq!(provider.wound_check(&c, 0), RollParams::new(3, 2, 0));
        assert_eq!(provider.wound_check(&c, 1), RollParams::new(4, 3, 0));
    }

    #[test]
    fn test_skill_params_include_vp_extra_dice_and_modifiers() {
        let provider = DefaultRollParameterProvider;
        let mut c = Character::new("Kakita");
        c.set_skill(Skill::Attack, 3).unwrap();
        c.set_extra_rolled(Skill::Attack, 1);
        let enemy = CharacterId::new();
        c.add_modifier(Modifier::any_attack(c.id(), 5).against(enemy));
        assert_eq!(provider.skill(&c, None, Skill::Attack, 0), RollParams::new(6, 2, 0));
        assert_eq!(provider.skill(&c, Some(enemy), Skill::Attack, 2), RollParams::new(8, 4, 5));
    }

    #[test]
    fn test_skill_params_are_normalized() {
        let provider = DefaultRollParameterProvider;
        let mut c = Character::new("Matsu");
        c.set_ring(Ring::Fire, 6).unwrap();
        c.set_skill(Skill::Attack, 5).unwrap();
        // 6 + 5 + 3 = 14 rolled, 6 + 3 = 9 kept
        let params = provider.skill(&c, None, Skill::Attack, 3);
        assert_eq!(params, RollParams::new(10, 10, 3));
        assert!(params.is_normalized());
    }

    #[test]
    fn test_contested_bonus_goes_to_higher_skill() {
        let provider = DefaultRollParameterProvider;
        let mut strong = Character::new("Kakita");
        strong.set_skill(Skill::Iaijutsu, 4).unwrap();
        let mut weak = Character::new("Doji");
        weak.set_skill(Skill::Iaijutsu, 1).unwrap();
        let params = provider.contested(&strong, &weak, Skill::Iaijutsu, Skill::Iaijutsu, 0);
        assert_eq!(params.bonus, 15);
        let params = provider.contested(&weak, &strong, Skill::Iaijutsu, Skill::Iaijutsu, 0);
        assert_eq!(params.bonus, 0);
    }
}
