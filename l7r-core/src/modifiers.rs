//! Modifiers and floating bonuses.
//!
//! A modifier is a flat adjustment that applies automatically to every
//! matching roll until it expires. A floating bonus is spent once, by
//! choice, on a roll of one of its skills.

use crate::character::CharacterId;
use crate::events::Event;
use crate::skills::{Skill, ATTACK_SKILLS};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Value of a free raise.
pub const FREE_RAISE: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModifierId(pub Uuid);

impl ModifierId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ModifierId {
    fn default() -> Self {
        Self::new()
    }
}

/// When a modifier stops applying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expiry {
    /// After the next attack against the modifier's holder resolves.
    AfterNextAttack,
    /// After the next attack by `attacker` against the holder resolves.
    AfterNextAttackBy(CharacterId),
    /// After the next attack the holder makes against `target` resolves.
    AfterOwnAttackOn(CharacterId),
    /// After the holder's next damage roll against `target`.
    AfterNextDamageTo(CharacterId),
    AtEndOfRound,
}

/// A flat adjustment to rolls of some skills, optionally only against one
/// target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub id: ModifierId,
    pub subject: CharacterId,
    pub target: Option<CharacterId>,
    pub skills: Vec<Skill>,
    pub adjustment: i32,
    /// The modifier ends at the first of these. Empty means permanent.
    pub expiries: Vec<Expiry>,
}

impl Modifier {
    pub fn new(subject: CharacterId, skills: Vec<Skill>, adjustment: i32) -> Self {
        Self {
            id: ModifierId::new(),
            subject,
            target: None,
            skills,
            adjustment,
            expiries: Vec::new(),
        }
    }

    /// A modifier on every attack skill.
    pub fn any_attack(subject: CharacterId, adjustment: i32) -> Self {
        Self::new(subject, ATTACK_SKILLS.to_vec(), adjustment)
    }

    pub fn free_raise(subject: CharacterId, skill: Skill) -> Self {
        Self::new(subject, vec![skill], FREE_RAISE)
    }

    pub fn against(mut self, target: CharacterId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn expiring(mut self, expiry: Expiry) -> Self {
        self.expiries.push(expiry);
        self
    }

    pub fn is_permanent(&self) -> bool {
        self.expiries.is_empty()
    }

    /// Adjustment for a roll of `skill` against `target`.
    pub fn apply(&self, target: Option<CharacterId>, skill: Skill) -> i32 {
        if !self.skills.contains(&skill) {
            return 0;
        }
        match self.target {
            None => self.adjustment,
            Some(t) if Some(t) == target => self.adjustment,
            Some(_) => 0,
        }
    }

    /// Whether `event` ends this modifier for its holder. `attack` is the
    /// (attacker, target) pair when `event` concerns an attack.
    pub fn expires_on(&self, event: &Event, attack: Option<(CharacterId, CharacterId)>) -> bool {
        self.expiries
            .iter()
            .any(|expiry| self.expiry_matches(*expiry, event, attack))
    }

    fn expiry_matches(
        &self,
        expiry: Expiry,
        event: &Event,
        attack: Option<(CharacterId, CharacterId)>,
    ) -> bool {
        let resolved = event.is_attack_resolution();
        match (expiry, attack) {
            (Expiry::AtEndOfRound, _) => matches!(event, Event::EndOfRound { .. }),
            (Expiry::AfterNextDamageTo(victim), _) => matches!(
                event,
                Event::LightWoundsDamage { subject, target, .. }
                    if *subject == self.subject && *target == victim
            ),
            (Expiry::AfterNextAttack, Some((_, target))) => resolved && target == self.subject,
            (Expiry::AfterNextAttackBy(attacker), Some((subject, target))) => {
                resolved && target == self.subject && subject == attacker
            }
            (Expiry::AfterOwnAttackOn(victim), Some((subject, target))) => {
                resolved && subject == self.subject && target == victim
            }
            (_, None) => false,
        }
    }
}

/// A one-shot bonus the holder may spend on a roll of one of `skills`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatingBonus {
    pub skills: Vec<Skill>,
    pub bonus: i32,
}

impl FloatingBonus {
    pub fn new(skill: Skill, bonus: i32) -> Self {
        Self {
            skills: vec![skill],
            bonus,
        }
    }

    pub fn any_attack(bonus: i32) -> Self {
        Self {
            skills: ATTACK_SKILLS.to_vec(),
            bonus,
        }
    }

    pub fn is_applicable(&self, skill: Skill) -> bool {
        self.skills.contains(&skill)
    }
}

impl PartialOrd for FloatingBonus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatingBonus {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bonus
            .cmp(&other.bonus)
            .then_with(|| self.skills.cmp(&other.skills))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_applies_to_matching_skill_and_target() {
        let holder = CharacterId::new();
        let enemy = CharacterId::new();
        let other = CharacterId::new();
        let modifier = Modifier::any_attack(holder, 5).against(enemy);
        assert_eq!(modifier.apply(Some(enemy), Skill::Attack), 5);
        assert_eq!(modifier.apply(Some(enemy), Skill::Lunge), 5);
        assert_eq!(modifier.apply(Some(other), Skill::Attack), 0);
        assert_eq!(modifier.apply(Some(enemy), Skill::Parry), 0);

        let untargeted = Modifier::new(holder, vec![Skill::TnToHit], -5);
        assert_eq!(untargeted.apply(None, Skill::TnToHit), -5);
        assert_eq!(untargeted.apply(Some(enemy), Skill::TnToHit), -5);
    }

    #[test]
    fn test_free_raise() {
        let holder = CharacterId::new();
        let raise = Modifier::free_raise(holder, Skill::WoundCheck);
        assert_eq!(raise.apply(None, Skill::WoundCheck), FREE_RAISE);
    }

    #[test]
    fn test_end_of_round_expiry() {
        let holder = CharacterId::new();
        let modifier = Modifier::any_attack(holder, 5).expiring(Expiry::AtEndOfRound);
        assert!(modifier.expires_on(&Event::EndOfRound { round: 1 }, None));
        assert!(!modifier.expires_on(&Event::EndOfPhase { phase: 3 }, None));
    }

    #[test]
    fn test_damage_expiry_matches_subject_and_target() {
        let holder = CharacterId::new();
        let victim = CharacterId::new();
        let modifier = Modifier::new(holder, vec![Skill::Damage], 5)
            .expiring(Expiry::AfterNextDamageTo(victim));
        let hit = Event::LightWoundsDamage {
            subject: holder,
            target: victim,
            damage: 12,
            wound_check_tn: 12,
        };
        let reversed = Event::LightWoundsDamage {
            subject: victim,
            target: holder,
            damage: 12,
            wound_check_tn: 12,
        };
        assert!(modifier.expires_on(&hit, None));
        assert!(!modifier.expires_on(&reversed, None));
    }

    #[test]
    fn test_first_of_several_expiries_wins() {
        let holder = CharacterId::new();
        let lunger = CharacterId::new();
        let modifier = Modifier::any_attack(holder, 5)
            .against(lunger)
            .expiring(Expiry::AfterOwnAttackOn(lunger))
            .expiring(Expiry::AtEndOfRound);
        assert!(!modifier.is_permanent());
        let resolved = Event::AttackFailed {
            action: crate::actions::ActionId(0),
        };
        assert!(modifier.expires_on(&resolved, Some((holder, lunger))));
        assert!(!modifier.expires_on(&resolved, Some((lunger, holder))));
        assert!(modifier.expires_on(&Event::EndOfRound { round: 2 }, None));
        assert!(Modifier::free_raise(holder, Skill::Parry).is_permanent());
    }

    #[test]
    fn test_floating_bonus_ordering() {
        let mut bonuses = vec![
            FloatingBonus::new(Skill::Attack, 10),
            FloatingBonus::any_attack(5),
            FloatingBonus::new(Skill::WoundCheck, 3),
        ];
        bonuses.sort();
        assert_eq!(
            bonuses.iter().map(|b| b.bonus).collect::<Vec<_>>(),
            vec![3, 5, 10]
        );
        assert!(bonuses[1].is_applicable(Skill::DoubleAttack));
        assert!(!bonuses[0].is_applicable(Skill::Attack));
    }
}
