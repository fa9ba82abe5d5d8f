//! Attack, parry and contested actions.
//!
//! An action is created by a strategy, filled in as its play runs (rolls,
//! parries, damage) and dropped when the play completes. While a play runs
//! the action lives in the context's [`ActionArena`] and events refer to it
//! by [`ActionId`].

use crate::character::CharacterId;
use crate::dice::RollParams;
use crate::error::EngineError;
use crate::skills::Skill;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// TN raise for a double attack.
pub const DOUBLE_ATTACK_RAISE: i32 = 20;
/// Penalty to a parry made on behalf of someone else.
pub const PARRY_FOR_OTHERS_PENALTY: i32 = 10;
/// Damage dice lost by a double attack the target tried to parry.
pub const DOUBLE_ATTACK_TARGET_PARRY_PENALTY: i32 = 4;
/// Damage dice lost by a double attack an ally tried to parry.
pub const DOUBLE_ATTACK_ALLY_PARRY_PENALTY: i32 = 2;

/// Handle to an action in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackKind {
    Attack,
    /// A counterattack against the attack `countering`.
    Counterattack { countering: ActionId },
    DoubleAttack,
    Feint,
    Lunge,
}

impl AttackKind {
    pub fn skill(&self) -> Skill {
        match self {
            AttackKind::Attack => Skill::Attack,
            AttackKind::Counterattack { .. } => Skill::Counterattack,
            AttackKind::DoubleAttack => Skill::DoubleAttack,
            AttackKind::Feint => Skill::Feint,
            AttackKind::Lunge => Skill::Lunge,
        }
    }

    /// The kind of attack made with `skill`, if any.
    pub fn for_skill(skill: Skill) -> Option<Self> {
        match skill {
            Skill::Attack => Some(AttackKind::Attack),
            Skill::DoubleAttack => Some(AttackKind::DoubleAttack),
            Skill::Feint => Some(AttackKind::Feint),
            Skill::Lunge => Some(AttackKind::Lunge),
            _ => None,
        }
    }

    fn tn_raise(&self) -> i32 {
        match self {
            AttackKind::DoubleAttack => DOUBLE_ATTACK_RAISE,
            _ => 0,
        }
    }
}

/// One attack attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackAction {
    pub subject: CharacterId,
    pub target: CharacterId,
    pub kind: AttackKind,
    pub vp: u32,
    /// The target's TN to be hit, before any raise for the kind of attack.
    pub base_tn: i32,
    /// Extra TN beyond `base_tn`.
    pub tn_penalty: i32,
    skill_roll: Option<i32>,
    damage_roll: Option<i32>,
    parries_declared: Vec<CharacterId>,
    parries_declined: Vec<CharacterId>,
    parry_attempted: bool,
    parried: bool,
}

impl AttackAction {
    pub fn new(subject: CharacterId, target: CharacterId, kind: AttackKind, base_tn: i32, vp: u32) -> Self {
        Self {
            subject,
            target,
            kind,
            vp,
            base_tn,
            tn_penalty: kind.tn_raise(),
            skill_roll: None,
            damage_roll: None,
            parries_declared: Vec::new(),
            parries_declined: Vec::new(),
            parry_attempted: false,
            parried: false,
        }
    }

    /// A counterattack by `subject` against the maker of `original`.
    ///
    /// Countering an attack aimed at someone else raises the TN by 5 per
    /// rank of the original attacker's attack skill.
    pub fn counterattack(
        subject: CharacterId,
        countering: ActionId,
        original: &AttackAction,
        attacker_attack_skill: i32,
        base_tn: i32,
        vp: u32,
    ) -> Self {
        let mut action = Self::new(
            subject,
            original.subject,
            AttackKind::Counterattack { countering },
            base_tn,
            vp,
        );
        if original.target != subject {
            action.tn_penalty = 5 * attacker_attack_skill;
        }
        action
    }

    pub fn skill(&self) -> Skill {
        self.kind.skill()
    }

    pub fn tn(&self) -> i32 {
        self.base_tn + self.tn_penalty
    }

    pub fn countering(&self) -> Option<ActionId> {
        match self.kind {
            AttackKind::Counterattack { countering } => Some(countering),
            _ => None,
        }
    }

    pub fn is_counterattack(&self) -> bool {
        self.countering().is_some()
    }

    pub fn skill_roll(&self) -> Option<i32> {
        self.skill_roll
    }

    pub fn set_skill_roll(&mut self, roll: i32) {
        self.skill_roll = Some(roll);
    }

    pub fn damage_roll(&self) -> Option<i32> {
        self.damage_roll
    }

    pub fn set_damage_roll(&mut self, roll: i32) {
        self.damage_roll = Some(roll);
    }

    /// A parry must reach the attack roll.
    pub fn parry_tn(&self) -> Option<i32> {
        self.skill_roll
    }

    pub fn is_hit(&self) -> bool {
        !self.parried && self.skill_roll.is_some_and(|roll| roll >= self.tn())
    }

    /// Whether a hit rolls damage at all.
    pub fn deals_damage(&self) -> bool {
        !matches!(self.kind, AttackKind::Feint)
    }

    /// Serious wounds dealt directly by a hit, before damage is rolled.
    pub fn direct_damage(&self) -> Option<i32> {
        match self.kind {
            AttackKind::DoubleAttack => Some(1),
            _ => None,
        }
    }

    /// Extra rolled damage dice earned by the recorded attack roll.
    pub fn extra_damage_dice(&self) -> i32 {
        self.skill_roll
            .map(|roll| self.extra_damage_dice_for(roll))
            .unwrap_or(0)
    }

    /// Extra rolled damage dice a hypothetical `roll` would earn.
    pub fn extra_damage_dice_for(&self, roll: i32) -> i32 {
        match self.kind {
            AttackKind::Feint => 0,
            AttackKind::DoubleAttack => {
                let penalty = if !self.parry_attempted {
                    0
                } else if self.parries_declared.contains(&self.target) {
                    DOUBLE_ATTACK_TARGET_PARRY_PENALTY
                } else {
                    DOUBLE_ATTACK_ALLY_PARRY_PENALTY
                };
                (roll - (self.tn() - DOUBLE_ATTACK_RAISE)).div_euclid(5) - penalty
            }
            AttackKind::Lunge => self.basic_extra_dice(roll) + 1,
            AttackKind::Attack | AttackKind::Counterattack { .. } => self.basic_extra_dice(roll),
        }
    }

    fn basic_extra_dice(&self, roll: i32) -> i32 {
        if self.parry_attempted {
            0
        } else {
            (roll - self.tn()).div_euclid(5)
        }
    }

    pub fn parried(&self) -> bool {
        self.parried
    }

    pub fn set_parried(&mut self) {
        self.parried = true;
    }

    pub fn parry_attempted(&self) -> bool {
        self.parry_attempted
    }

    pub fn set_parry_attempted(&mut self) {
        self.parry_attempted = true;
    }

    pub fn parries_declared(&self) -> &[CharacterId] {
        &self.parries_declared
    }

    pub fn add_parry_declared(&mut self, parrier: CharacterId) {
        self.parries_declared.push(parrier);
    }

    pub fn parries_declined(&self) -> &[CharacterId] {
        &self.parries_declined
    }

    pub fn add_parry_declined(&mut self, parrier: CharacterId) {
        if !self.parries_declined.contains(&parrier) {
            self.parries_declined.push(parrier);
        }
    }
}

/// One parry attempt against an attack.
#[derive(Debug, Clone, PartialEq)]
pub struct ParryAction {
    pub subject: CharacterId,
    /// The attacker.
    pub target: CharacterId,
    pub attack: ActionId,
    pub vp: u32,
    /// True when parrying an attack aimed at someone else.
    pub on_behalf: bool,
    tn: i32,
    skill_roll: Option<i32>,
}

impl ParryAction {
    pub fn new(subject: CharacterId, attack_id: ActionId, attack: &AttackAction, vp: u32) -> Self {
        Self {
            subject,
            target: attack.subject,
            attack: attack_id,
            vp,
            on_behalf: attack.target != subject,
            tn: attack.parry_tn().unwrap_or(0),
            skill_roll: None,
        }
    }

    pub fn skill(&self) -> Skill {
        Skill::Parry
    }

    pub fn tn(&self) -> i32 {
        self.tn
    }

    /// Flat penalty applied to the parry roll.
    pub fn penalty(&self) -> i32 {
        if self.on_behalf {
            PARRY_FOR_OTHERS_PENALTY
        } else {
            0
        }
    }

    pub fn skill_roll(&self) -> Option<i32> {
        self.skill_roll
    }

    pub fn set_skill_roll(&mut self, roll: i32) {
        self.skill_roll = Some(roll);
    }

    pub fn is_success(&self) -> bool {
        self.skill_roll.is_some_and(|roll| roll >= self.tn)
    }
}

/// One side of a contested roll, where both characters roll against each
/// other and the margin decides the outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ContestedAction {
    pub subject: CharacterId,
    pub target: CharacterId,
    pub skill: Skill,
    pub contested_skill: Skill,
    pub vp: u32,
    challenger: CharacterId,
    skill_roll: Option<i32>,
    opponent_roll: Option<i32>,
}

impl ContestedAction {
    /// `challenger` must be either the subject or the target.
    pub fn new(
        subject: CharacterId,
        target: CharacterId,
        challenger: CharacterId,
        skill: Skill,
        contested_skill: Skill,
        vp: u32,
    ) -> Result<Self, EngineError> {
        if challenger != subject && challenger != target {
            return Err(EngineError::InvalidChallenger(challenger));
        }
        Ok(Self {
            subject,
            target,
            skill,
            contested_skill,
            vp,
            challenger,
            skill_roll: None,
            opponent_roll: None,
        })
    }

    pub fn challenger(&self) -> CharacterId {
        self.challenger
    }

    pub fn defender(&self) -> CharacterId {
        if self.challenger == self.subject {
            self.target
        } else {
            self.subject
        }
    }

    pub fn challenger_skill(&self) -> Skill {
        if self.challenger == self.subject {
            self.skill
        } else {
            self.contested_skill
        }
    }

    pub fn defender_skill(&self) -> Skill {
        if self.challenger == self.subject {
            self.contested_skill
        } else {
            self.skill
        }
    }

    pub fn skill_roll(&self) -> Option<i32> {
        self.skill_roll
    }

    pub fn set_skill_roll(&mut self, roll: i32) {
        self.skill_roll = Some(roll);
    }

    pub fn opponent_roll(&self) -> Option<i32> {
        self.opponent_roll
    }

    pub fn set_opponent_roll(&mut self, roll: i32) {
        self.opponent_roll = Some(roll);
    }

    /// Own roll minus the opponent's, once both are known.
    pub fn margin(&self) -> Option<i32> {
        Some(self.skill_roll? - self.opponent_roll?)
    }

    /// Signed extra rolled damage dice: one per 5 points of margin, lost
    /// dice when the margin is negative.
    pub fn extra_damage_dice(&self) -> i32 {
        self.margin().map(|m| m.div_euclid(5)).unwrap_or(0)
    }

    /// Damage parameters after applying the margin to `base`.
    pub fn damage_params(&self, base: RollParams) -> RollParams {
        RollParams::new(base.rolled + self.extra_damage_dice(), base.kept, base.bonus).normalize()
    }

    /// A contested strike lands when it still keeps at least one damage die.
    pub fn is_hit(&self, base: RollParams) -> bool {
        self.margin().is_some() && self.damage_params(base).kept > 0
    }
}

/// Any action that can sit in the arena.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Attack(AttackAction),
    Parry(ParryAction),
    Contest(ContestedAction),
}

/// Storage for the actions of plays in progress.
#[derive(Debug, Clone, Default)]
pub struct ActionArena {
    next_id: u64,
    actions: HashMap<ActionId, Action>,
}

impl ActionArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, action: Action) -> ActionId {
        let id = ActionId(self.next_id);
        self.next_id += 1;
        self.actions.insert(id, action);
        id
    }

    pub fn remove(&mut self, id: ActionId) -> Option<Action> {
        self.actions.remove(&id)
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn attack(&self, id: ActionId) -> Result<&AttackAction, EngineError> {
        match self.actions.get(&id) {
            Some(Action::Attack(attack)) => Ok(attack),
            Some(_) => Err(EngineError::NotAnAttack(id)),
            None => Err(EngineError::UnknownAction(id)),
        }
    }

    pub fn attack_mut(&mut self, id: ActionId) -> Result<&mut AttackAction, EngineError> {
        match self.actions.get_mut(&id) {
            Some(Action::Attack(attack)) => Ok(attack),
            Some(_) => Err(EngineError::NotAnAttack(id)),
            None => Err(EngineError::UnknownAction(id)),
        }
    }

    pub fn parry(&self, id: ActionId) -> Result<&ParryAction, EngineError> {
        match self.actions.get(&id) {
            Some(Action::Parry(parry)) => Ok(parry),
            Some(_) => Err(EngineError::NotAParry(id)),
            None => Err(EngineError::UnknownAction(id)),
        }
    }

    pub fn parry_mut(&mut self, id: ActionId) -> Result<&mut ParryAction, EngineError> {
        match self.actions.get_mut(&id) {
            Some(Action::Parry(parry)) => Ok(parry),
            Some(_) => Err(EngineError::NotAParry(id)),
            None => Err(EngineError::UnknownAction(id)),
        }
    }

    pub fn contest(&self, id: ActionId) -> Result<&ContestedAction, EngineError> {
        match self.actions.get(&id) {
            Some(Action::Contest(contest)) => Ok(contest),
            Some(_) => Err(EngineError::NotAContest(id)),
            None => Err(EngineError::UnknownAction(id)),
        }
    }

    pub fn contest_mut(&mut self, id: ActionId) -> Result<&mut ContestedAction, EngineError> {
        match self.actions.get_mut(&id) {
            Some(Action::Contest(contest)) => Ok(contest),
            Some(_) => Err(EngineError::NotAContest(id)),
            None => Err(EngineError::UnknownAction(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attack(kind: AttackKind, base_tn: i32) -> AttackAction {
        AttackAction::new(CharacterId::new(), CharacterId::new(), kind, base_tn, 0)
    }

    #[test]
    fn test_hit_and_extra_dice() {
        let mut action = attack(AttackKind::Attack, 30);
        assert!(!action.is_hit());
        action.set_skill_roll(31);
        assert!(action.is_hit());
        assert_eq!(action.extra_damage_dice(), 0);
        action.set_skill_roll(42);
        assert_eq!(action.extra_damage_dice(), 2);
        action.set_skill_roll(29);
        assert!(!action.is_hit());
    }

    #[test]
    fn test_parry_negates_hit() {
        let mut action = attack(AttackKind::Attack, 10);
        action.set_skill_roll(50);
        action.set_parried();
        assert!(!action.is_hit());
    }

    #[test]
    fn test_attempted_parry_removes_extra_dice() {
        let mut action = attack(AttackKind::Attack, 10);
        action.set_skill_roll(40);
        assert_eq!(action.extra_damage_dice(), 6);
        action.set_parry_attempted();
        assert!(action.is_hit());
        assert_eq!(action.extra_damage_dice(), 0);
    }

    #[test]
    fn test_double_attack() {
        let mut action = attack(AttackKind::DoubleAttack, 15);
        assert_eq!(action.tn(), 35);
        assert_eq!(action.direct_damage(), Some(1));
        action.set_skill_roll(40);
        assert!(action.is_hit());
        // measured against the un-raised TN
        assert_eq!(action.extra_damage_dice(), 5);

        let mut parried_by_target = action.clone();
        parried_by_target.set_parry_attempted();
        parried_by_target.add_parry_declared(action.target);
        assert_eq!(parried_by_target.extra_damage_dice(), 1);

        let mut parried_by_ally = action.clone();
        parried_by_ally.set_parry_attempted();
        parried_by_ally.add_parry_declared(CharacterId::new());
        assert_eq!(parried_by_ally.extra_damage_dice(), 3);
    }

    #[test]
    fn test_feint_and_lunge() {
        let mut feint = attack(AttackKind::Feint, 10);
        feint.set_skill_roll(40);
        assert!(!feint.deals_damage());
        assert_eq!(feint.extra_damage_dice(), 0);

        let mut lunge = attack(AttackKind::Lunge, 10);
        lunge.set_skill_roll(20);
        assert_eq!(lunge.extra_damage_dice(), 3);
        lunge.set_parry_attempted();
        assert_eq!(lunge.extra_damage_dice(), 1);
    }

    #[test]
    fn test_counterattack_penalty() {
        let attacker = CharacterId::new();
        let defender = CharacterId::new();
        let bystander = CharacterId::new();
        let original = AttackAction::new(attacker, defender, AttackKind::Attack, 15, 0);
        let id = ActionId(7);

        let by_target = AttackAction::counterattack(defender, id, &original, 3, 20, 0);
        assert_eq!(by_target.target, attacker);
        assert_eq!(by_target.tn(), 20);
        assert_eq!(by_target.countering(), Some(id));
        assert_eq!(by_target.skill(), Skill::Counterattack);

        let by_ally = AttackAction::counterattack(bystander, id, &original, 3, 20, 0);
        assert_eq!(by_ally.tn(), 35);
    }

    #[test]
    fn test_parry_action() {
        let attacker = CharacterId::new();
        let defender = CharacterId::new();
        let ally = CharacterId::new();
        let mut original = AttackAction::new(attacker, defender, AttackKind::Attack, 15, 0);
        original.set_skill_roll(24);

        let mut own = ParryAction::new(defender, ActionId(0), &original, 0);
        assert_eq!(own.tn(), 24);
        assert_eq!(own.penalty(), 0);
        assert_eq!(own.target, attacker);
        own.set_skill_roll(24);
        assert!(own.is_success());

        let mut other = ParryAction::new(ally, ActionId(0), &original, 0);
        assert_eq!(other.penalty(), 10);
        other.set_skill_roll(23);
        assert!(!other.is_success());
    }

    #[test]
    fn test_contested_action() {
        let a = CharacterId::new();
        let b = CharacterId::new();
        assert!(matches!(
            ContestedAction::new(a, b, CharacterId::new(), Skill::Iaijutsu, Skill::Iaijutsu, 0),
            Err(EngineError::InvalidChallenger(_))
        ));

        let mut action = ContestedAction::new(a, b, b, Skill::Iaijutsu, Skill::Parry, 0).unwrap();
        assert_eq!(action.defender(), a);
        assert_eq!(action.challenger_skill(), Skill::Parry);
        assert_eq!(action.defender_skill(), Skill::Iaijutsu);
        assert_eq!(action.margin(), None);

        action.set_skill_roll(30);
        action.set_opponent_roll(19);
        assert_eq!(action.extra_damage_dice(), 2);
        let katana = RollParams::new(6, 2, 0);
        assert_eq!(action.damage_params(katana), RollParams::new(8, 2, 0));
        assert!(action.is_hit(katana));

        action.set_opponent_roll(61);
        assert_eq!(action.extra_damage_dice(), -7);
        assert!(!action.is_hit(katana));
        action.set_opponent_roll(40);
        assert!(action.is_hit(katana));
    }

    #[test]
    fn test_arena_lookups() {
        let mut arena = ActionArena::new();
        let original = attack(AttackKind::Attack, 10);
        let attack_id = arena.insert(Action::Attack(original.clone()));
        let parry_id = arena.insert(Action::Parry(ParryAction::new(
            original.target,
            attack_id,
            &original,
            0,
        )));
        assert_ne!(attack_id, parry_id);
        assert!(arena.attack(attack_id).is_ok());
        assert!(matches!(arena.attack(parry_id), Err(EngineError::NotAnAttack(_))));
        assert!(matches!(arena.parry(attack_id), Err(EngineError::NotAParry(_))));
        arena.attack_mut(attack_id).unwrap().set_skill_roll(12);
        assert_eq!(arena.attack(attack_id).unwrap().skill_roll(), Some(12));
        arena.remove(attack_id);
        assert!(matches!(arena.attack(attack_id), Err(EngineError::UnknownAction(_))));
        assert_eq!(arena.len(), 1);
    }
}
