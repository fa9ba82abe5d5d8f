//! Combat participants.
//!
//! A `Character` carries its sheet (rings, skills, advantages, weapon), its
//! combat state (actions, wounds, resources, modifiers) and the pluggable
//! behavior registered at build time: listeners, strategies, a target
//! finder, a roll parameter provider and a dice mutator.
//!
//! Combat state is only changed through the `pub(crate)` mutators below,
//! which listeners call while handling events.

use crate::dice::{DefaultMutator, Mutator, RollParams};
use crate::error::{ConfigError, EngineError};
use crate::events::EventKind;
use crate::knowledge::Knowledge;
use crate::listeners::{Listener, ListenerRegistry};
use crate::modifiers::{FloatingBonus, Modifier, ModifierId};
use crate::roll_params::{DefaultRollParameterProvider, RollParameterProvider};
use crate::skills::{Advantage, Disadvantage, Ring, Skill, MAX_RING_RANK, MAX_SKILL_RANK, MIN_RING_RANK};
use crate::strategies::{Strategy, StrategyKind, StrategySet};
use crate::target_finders::{EasiestTargetFinder, TargetFinder};
use crate::weapons::Weapon;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Last phase of a round.
pub const LAST_PHASE: u8 = 10;
/// Actions spent to interrupt when no other cost is set.
pub const DEFAULT_INTERRUPT_COST: usize = 2;
/// Rank every ring starts at.
pub const DEFAULT_RING_RANK: u8 = 2;

/// Unique identifier for characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serious wounds taken from a wound check `roll` against `lw` light wounds.
pub fn serious_wounds(roll: i32, lw: i32) -> i32 {
    if roll < lw {
        1 + (lw - roll) / 10
    } else {
        0
    }
}

/// Void Points held back for one skill so other rolls leave them alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoidPointManager {
    reservations: BTreeMap<Skill, u32>,
}

impl VoidPointManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(&mut self, skill: Skill, vp: u32) {
        *self.reservations.entry(skill).or_insert(0) += vp;
    }

    pub fn cancel(&mut self, skill: Skill) {
        self.reservations.remove(&skill);
    }

    pub fn clear(&mut self) {
        self.reservations.clear();
    }

    pub fn reserved(&self, skill: Skill) -> u32 {
        self.reservations.get(&skill).copied().unwrap_or(0)
    }

    /// VP from a pool of `vp` that may be spent on `skill`.
    pub fn available(&self, vp: u32, skill: Skill) -> u32 {
        let held_for_others: u32 = self
            .reservations
            .iter()
            .filter(|(s, _)| **s != skill)
            .map(|(_, n)| *n)
            .sum();
        vp.saturating_sub(held_for_others)
    }
}

/// A combat participant.
#[derive(Clone)]
pub struct Character {
    id: CharacterId,
    name: String,
    school: Option<String>,
    rings: BTreeMap<Ring, u8>,
    skills: BTreeMap<Skill, u8>,
    advantages: BTreeSet<Advantage>,
    disadvantages: BTreeSet<Disadvantage>,
    weapon: Weapon,
    extra_rolled: BTreeMap<Skill, i32>,
    extra_kept: BTreeMap<Skill, i32>,
    interrupt_skills: BTreeSet<Skill>,
    interrupt_costs: BTreeMap<Skill, usize>,
    ap_base_skill: Option<Skill>,
    ap_skills: BTreeSet<Skill>,
    starting_floating_bonuses: Vec<FloatingBonus>,

    actions: Vec<u8>,
    lw: i32,
    lw_history: Vec<i32>,
    sw: i32,
    vp_spent: u32,
    tvp: u32,
    ap_spent: u32,
    floating_bonuses: Vec<FloatingBonus>,
    modifiers: Vec<Modifier>,
    knowledge: Knowledge,
    void_points: VoidPointManager,

    listeners: ListenerRegistry,
    strategies: StrategySet,
    target_finder: Arc<dyn TargetFinder>,
    roll_parameters: Arc<dyn RollParameterProvider>,
    mutator: Arc<dyn Mutator>,
}

impl fmt::Debug for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Character")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("rings", &self.rings)
            .field("skills", &self.skills)
            .field("weapon", &self.weapon)
            .field("actions", &self.actions)
            .field("lw", &self.lw)
            .field("sw", &self.sw)
            .field("vp", &self.vp())
            .field("ap", &self.ap())
            .field("mutator", &self.mutator.name())
            .finish()
    }
}

impl Character {
    /// A default character: every ring 2, attack 1, parry 1, katana.
    pub fn new(name: impl Into<String>) -> Self {
        let rings = Ring::all()
            .iter()
            .map(|r| (*r, DEFAULT_RING_RANK))
            .collect();
        let skills = [(Skill::Attack, 1), (Skill::Parry, 1)].into_iter().collect();
        Self {
            id: CharacterId::new(),
            name: name.into(),
            school: None,
            rings,
            skills,
            advantages: BTreeSet::new(),
            disadvantages: BTreeSet::new(),
            weapon: Weapon::default(),
            extra_rolled: BTreeMap::new(),
            extra_kept: BTreeMap::new(),
            interrupt_skills: crate::skills::INTERRUPT_SKILLS.iter().copied().collect(),
            interrupt_costs: BTreeMap::new(),
            ap_base_skill: None,
            ap_skills: BTreeSet::new(),
            starting_floating_bonuses: Vec::new(),
            actions: Vec::new(),
            lw: 0,
            lw_history: Vec::new(),
            sw: 0,
            vp_spent: 0,
            tvp: 0,
            ap_spent: 0,
            floating_bonuses: Vec::new(),
            modifiers: Vec::new(),
            knowledge: Knowledge::new(),
            void_points: VoidPointManager::new(),
            listeners: ListenerRegistry::default(),
            strategies: StrategySet::default(),
            target_finder: Arc::new(EasiestTargetFinder),
            roll_parameters: Arc::new(DefaultRollParameterProvider),
            mutator: Arc::new(DefaultMutator),
        }
    }

    pub fn id(&self) -> CharacterId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// School or profession, as recorded. No rules depend on it.
    pub fn school(&self) -> Option<&str> {
        self.school.as_deref()
    }

    pub fn set_school(&mut self, school: impl Into<String>) {
        self.school = Some(school.into());
    }

    // ---- sheet ----

    pub fn ring(&self, ring: Ring) -> i32 {
        self.rings.get(&ring).copied().unwrap_or(0) as i32
    }

    pub fn rings(&self) -> &BTreeMap<Ring, u8> {
        &self.rings
    }

    pub fn set_ring(&mut self, ring: Ring, rank: u8) -> Result<(), ConfigError> {
        if rank > MAX_RING_RANK {
            return Err(ConfigError::RankTooHigh {
                name: ring.name().to_string(),
                rank,
                max: MAX_RING_RANK,
            });
        }
        if rank < MIN_RING_RANK {
            return Err(ConfigError::RankTooLow {
                name: ring.name().to_string(),
                rank,
                min: MIN_RING_RANK,
            });
        }
        self.rings.insert(ring, rank);
        Ok(())
    }

    pub fn skill(&self, skill: Skill) -> i32 {
        self.skills.get(&skill).copied().unwrap_or(0) as i32
    }

    pub fn skills(&self) -> &BTreeMap<Skill, u8> {
        &self.skills
    }

    pub fn set_skill(&mut self, skill: Skill, rank: u8) -> Result<(), ConfigError> {
        if !skill.is_purchasable() {
            return Err(ConfigError::NotPurchasable(skill.name().to_string()));
        }
        if rank > MAX_SKILL_RANK {
            return Err(ConfigError::RankTooHigh {
                name: skill.name().to_string(),
                rank,
                max: MAX_SKILL_RANK,
            });
        }
        if rank == 0 {
            self.skills.remove(&skill);
        } else {
            self.skills.insert(skill, rank);
        }
        Ok(())
    }

    pub fn advantages(&self) -> &BTreeSet<Advantage> {
        &self.advantages
    }

    pub fn take_advantage(&mut self, advantage: Advantage) {
        if self.advantages.insert(advantage) && advantage == Advantage::StrengthOfTheEarth {
            self.modifiers
                .push(Modifier::free_raise(self.id, Skill::WoundCheck));
        }
    }

    pub fn disadvantages(&self) -> &BTreeSet<Disadvantage> {
        &self.disadvantages
    }

    pub fn take_disadvantage(&mut self, disadvantage: Disadvantage) {
        self.disadvantages.insert(disadvantage);
    }

    pub fn weapon(&self) -> Weapon {
        self.weapon
    }

    pub fn set_weapon(&mut self, weapon: Weapon) {
        self.weapon = weapon;
    }

    pub fn extra_rolled(&self, skill: Skill) -> i32 {
        self.extra_rolled.get(&skill).copied().unwrap_or(0)
    }

    pub fn set_extra_rolled(&mut self, skill: Skill, dice: i32) {
        self.extra_rolled.insert(skill, dice);
    }

    pub fn extra_kept(&self, skill: Skill) -> i32 {
        self.extra_kept.get(&skill).copied().unwrap_or(0)
    }

    pub fn set_extra_kept(&mut self, skill: Skill, dice: i32) {
        self.extra_kept.insert(skill, dice);
    }

    pub fn interrupt_cost(&self, skill: Skill) -> usize {
        self.interrupt_costs
            .get(&skill)
            .copied()
            .unwrap_or(DEFAULT_INTERRUPT_COST)
    }

    pub fn set_interrupt_cost(&mut self, skill: Skill, actions: usize) {
        self.interrupt_skills.insert(skill);
        self.interrupt_costs.insert(skill, actions);
    }

    pub fn ap_base_skill(&self) -> Option<Skill> {
        self.ap_base_skill
    }

    pub fn ap_skills(&self) -> &BTreeSet<Skill> {
        &self.ap_skills
    }

    /// Grant Adventure Points based on `base`, spendable on `skills`.
    pub fn set_adventure_points(&mut self, base: Skill, skills: impl IntoIterator<Item = Skill>) {
        self.ap_base_skill = Some(base);
        self.ap_skills = skills.into_iter().collect();
    }

    pub fn starting_floating_bonuses(&self) -> &[FloatingBonus] {
        &self.starting_floating_bonuses
    }

    /// A floating bonus the character begins every trial with.
    pub fn add_starting_floating_bonus(&mut self, bonus: FloatingBonus) {
        self.starting_floating_bonuses.push(bonus.clone());
        self.floating_bonuses.push(bonus);
    }

    // ---- derived statistics ----

    fn min_ring(&self) -> i32 {
        Ring::all().iter().map(|r| self.ring(*r)).min().unwrap_or(0)
    }

    pub fn max_sw(&self) -> i32 {
        let bonus = if self.advantages.contains(&Advantage::GreatDestiny) {
            1
        } else if self.disadvantages.contains(&Disadvantage::PermanentWound) {
            -1
        } else {
            0
        };
        2 * self.ring(Ring::Earth) + bonus
    }

    pub fn sw_remaining(&self) -> i32 {
        self.max_sw() - self.sw
    }

    pub fn is_alive(&self) -> bool {
        self.sw <= self.max_sw()
    }

    pub fn is_conscious(&self) -> bool {
        self.sw < self.max_sw()
    }

    pub fn is_fighting(&self) -> bool {
        self.is_conscious()
    }

    /// Crippled characters' skill dice do not explode.
    pub fn crippled(&self) -> bool {
        self.sw >= self.ring(Ring::Earth)
    }

    pub fn max_vp(&self) -> u32 {
        (self.min_ring() + self.skill(Skill::Worldliness)).max(0) as u32
    }

    pub fn max_vp_per_roll(&self) -> u32 {
        self.min_ring().max(0) as u32
    }

    pub fn vp(&self) -> u32 {
        self.max_vp().saturating_sub(self.vp_spent) + self.tvp
    }

    pub fn tvp(&self) -> u32 {
        self.tvp
    }

    /// VP that may go to `skill` without touching other reservations.
    pub fn vp_available(&self, skill: Skill) -> u32 {
        self.void_points.available(self.vp(), skill)
    }

    pub fn void_points_mut(&mut self) -> &mut VoidPointManager {
        &mut self.void_points
    }

    pub fn ap(&self) -> u32 {
        match self.ap_base_skill {
            Some(base) => ((2 * self.skill(base)).max(0) as u32).saturating_sub(self.ap_spent),
            None => 0,
        }
    }

    pub fn max_ap_per_roll(&self) -> u32 {
        self.ap_base_skill
            .map(|base| self.skill(base).max(0) as u32)
            .unwrap_or(0)
    }

    pub fn can_spend_ap(&self, skill: Skill) -> bool {
        self.ap_skills.contains(&skill)
    }

    pub fn tn_to_hit(&self) -> i32 {
        5 * (1 + self.skill(Skill::Parry)) + self.modifier(None, Skill::TnToHit)
    }

    /// Sum of active modifiers for a roll of `skill` against `target`.
    pub fn modifier(&self, target: Option<CharacterId>, skill: Skill) -> i32 {
        self.modifiers.iter().map(|m| m.apply(target, skill)).sum()
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn floating_bonuses(&self, skill: Skill) -> Vec<FloatingBonus> {
        self.floating_bonuses
            .iter()
            .filter(|b| b.is_applicable(skill))
            .cloned()
            .collect()
    }

    /// Serious wounds a wound check `roll` would cause against `lw`, or
    /// against the current light wounds.
    pub fn wound_check(&self, roll: i32, lw: Option<i32>) -> i32 {
        serious_wounds(roll, lw.unwrap_or(self.lw))
    }

    pub fn lw(&self) -> i32 {
        self.lw
    }

    pub fn lw_history(&self) -> &[i32] {
        &self.lw_history
    }

    pub fn sw(&self) -> i32 {
        self.sw
    }

    pub fn knowledge(&self) -> &Knowledge {
        &self.knowledge
    }

    // ---- actions ----

    /// Remaining action dice, ascending.
    pub fn actions(&self) -> &[u8] {
        &self.actions
    }

    pub fn has_action(&self, phase: u8) -> bool {
        self.actions.first().is_some_and(|first| *first <= phase)
    }

    /// Action dice usable in `phase`.
    pub fn available_actions(&self, phase: u8) -> Vec<u8> {
        self.actions.iter().copied().filter(|a| *a <= phase).collect()
    }

    pub fn has_interrupt_action(&self, skill: Skill) -> bool {
        self.interrupt_skills.contains(&skill) && self.interrupt_cost(skill) <= self.actions.len()
    }

    /// Priority used to order characters within a phase. Higher acts first.
    ///
    /// More and earlier actions dominate; the void ring breaks ties.
    pub fn initiative_priority(&self, max_actions: usize) -> u64 {
        let mut priority = 0u64;
        let mut exponent = max_actions as i64 + 1;
        for action in &self.actions {
            if exponent >= 0 {
                let weight = 10u64.saturating_pow(exponent as u32);
                priority = priority.saturating_add(u64::from(LAST_PHASE.saturating_sub(*action)) * weight);
            }
            exponent -= 1;
        }
        priority + self.ring(Ring::Void).max(0) as u64
    }

    // ---- behavior ----

    pub fn listener(&self, kind: EventKind) -> Option<Arc<dyn Listener>> {
        self.listeners.get(kind)
    }

    pub fn set_listener(&mut self, kind: EventKind, listener: Arc<dyn Listener>) {
        self.listeners.set(kind, listener);
    }

    pub fn strategy(&self, kind: StrategyKind) -> Arc<dyn Strategy> {
        self.strategies.get(kind)
    }

    pub fn set_strategy(&mut self, kind: StrategyKind, strategy: Arc<dyn Strategy>) {
        self.strategies.set(kind, strategy);
    }

    pub fn strategies(&self) -> &StrategySet {
        &self.strategies
    }

    pub fn target_finder(&self) -> Arc<dyn TargetFinder> {
        Arc::clone(&self.target_finder)
    }

    pub fn set_target_finder(&mut self, finder: Arc<dyn TargetFinder>) {
        self.target_finder = finder;
    }

    pub fn roll_parameters(&self) -> Arc<dyn RollParameterProvider> {
        Arc::clone(&self.roll_parameters)
    }

    pub fn set_roll_parameters(&mut self, provider: Arc<dyn RollParameterProvider>) {
        self.roll_parameters = provider;
    }

    pub fn mutator(&self) -> Arc<dyn Mutator> {
        Arc::clone(&self.mutator)
    }

    pub fn set_mutator(&mut self, mutator: Arc<dyn Mutator>) {
        self.mutator = mutator;
    }

    // ---- roll parameters ----

    pub fn skill_roll_params(&self, target: Option<CharacterId>, skill: Skill, vp: u32) -> RollParams {
        self.roll_parameters.skill(self, target, skill, vp)
    }

    pub fn damage_roll_params(&self, target: Option<CharacterId>, skill: Skill, extra_rolled: i32) -> RollParams {
        self.roll_parameters.damage(self, target, skill, extra_rolled)
    }

    pub fn initiative_roll_params(&self) -> RollParams {
        self.roll_parameters.initiative(self)
    }

    pub fn wound_check_roll_params(&self, vp: u32) -> RollParams {
        self.roll_parameters.wound_check(self, vp)
    }

    // ---- state changes, reserved for listeners ----

    pub(crate) fn set_actions(&mut self, mut actions: Vec<u8>) {
        actions.sort_unstable();
        self.actions = actions;
    }

    pub(crate) fn clear_actions(&mut self) {
        self.actions.clear();
    }

    pub(crate) fn spend_action(&mut self, phase: u8) -> Result<(), EngineError> {
        match self.actions.iter().position(|a| *a == phase) {
            Some(idx) => {
                self.actions.remove(idx);
                Ok(())
            }
            None => Err(EngineError::NoSuchAction {
                character: self.name.clone(),
                phase,
            }),
        }
    }

    /// Move the latest action die to `phase`.
    pub(crate) fn advance_latest_action(&mut self, phase: u8) -> bool {
        match self.actions.pop() {
            Some(_) => {
                self.actions.push(phase);
                self.actions.sort_unstable();
                true
            }
            None => false,
        }
    }

    pub(crate) fn take_lw(&mut self, amount: i32) {
        self.lw += amount.max(0);
        self.lw_history.push(amount);
    }

    pub(crate) fn reset_lw(&mut self) {
        self.lw = 0;
    }

    pub(crate) fn take_sw(&mut self, amount: i32) {
        self.sw += amount.max(0);
    }

    pub(crate) fn gain_tvp(&mut self, amount: u32) {
        self.tvp += amount;
    }

    /// Spend VP, temporary points first.
    pub(crate) fn spend_vp(&mut self, amount: u32) -> Result<(), EngineError> {
        let available = self.vp();
        if available < amount {
            return Err(EngineError::NotEnoughResource {
                character: self.name.clone(),
                resource: "void points",
                amount,
                available,
            });
        }
        let from_temporary = amount.min(self.tvp);
        self.tvp -= from_temporary;
        self.vp_spent += amount - from_temporary;
        Ok(())
    }

    pub(crate) fn spend_ap(&mut self, skill: Skill, amount: u32) -> Result<(), EngineError> {
        if amount == 0 {
            return Ok(());
        }
        let available = if self.can_spend_ap(skill) { self.ap() } else { 0 };
        if available < amount {
            return Err(EngineError::NotEnoughResource {
                character: self.name.clone(),
                resource: "adventure points",
                amount,
                available,
            });
        }
        self.ap_spent += amount;
        Ok(())
    }

    pub(crate) fn gain_floating_bonus(&mut self, bonus: FloatingBonus) {
        self.floating_bonuses.push(bonus);
    }

    pub(crate) fn spend_floating_bonus(&mut self, bonus: &FloatingBonus) -> Result<(), EngineError> {
        match self.floating_bonuses.iter().position(|b| b == bonus) {
            Some(idx) => {
                self.floating_bonuses.remove(idx);
                Ok(())
            }
            None => Err(EngineError::NoSuchFloatingBonus {
                character: self.name.clone(),
            }),
        }
    }

    pub(crate) fn add_modifier(&mut self, modifier: Modifier) {
        self.modifiers.push(modifier);
    }

    pub(crate) fn remove_modifier(&mut self, id: ModifierId) {
        self.modifiers.retain(|m| m.id != id);
    }

    pub(crate) fn knowledge_mut(&mut self) -> &mut Knowledge {
        &mut self.knowledge
    }

    /// Restore the pre-combat state.
    pub fn reset(&mut self) {
        self.actions.clear();
        self.lw = 0;
        self.lw_history.clear();
        self.sw = 0;
        self.vp_spent = 0;
        self.tvp = 0;
        self.ap_spent = 0;
        self.floating_bonuses = self.starting_floating_bonuses.clone();
        let id = self.id;
        self.modifiers.retain(|m| m.is_permanent() && m.subject == id);
        self.knowledge.clear();
        self.void_points.clear();
    }
}
