//! Testing utilities for the combat engine.
//!
//! This module provides tools for deterministic tests:
//! - `TestRollProvider` for rigging rolls per character
//! - `TestHarness` for scripted combat scenarios
//! - Sample characters and assertion helpers

use crate::character::{Character, CharacterId};
use crate::context::Context;
use crate::dice::{Mutator, RollParams};
use crate::engine::{CombatEngine, Outcome};
use crate::error::EngineError;
use crate::events::Event;
use crate::groups::{CONTROL_GROUP, TEST_GROUP};
use crate::roll_provider::{DiceRollProvider, RollKind, RollProvider};
use crate::skills::{Advantage, Ring, Skill};
use crate::weapons::WeaponKind;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Seed for the dice behind any roll that was not rigged.
pub const TEST_SEED: u64 = 7;

#[derive(Default)]
struct RiggedRolls {
    rolls: HashMap<(CharacterId, RollKind), VecDeque<i32>>,
    initiative: HashMap<CharacterId, VecDeque<Vec<u8>>>,
    requests: Vec<(CharacterId, RollKind, RollParams)>,
}

/// A roll provider that returns queued results.
///
/// Rigged values are final results: parameters and mutators are ignored.
/// The parameters of every skill, damage and wound check roll are recorded
/// either way, so tests can check what was asked for.
/// When a character has nothing queued for a roll, real dice are rolled from
/// a seeded stream. Clones share the same queues, so a test keeps one handle
/// while the context owns another.
#[derive(Clone)]
pub struct TestRollProvider {
    rigged: Arc<Mutex<RiggedRolls>>,
    dice: Arc<Mutex<DiceRollProvider>>,
}

impl TestRollProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            rigged: Arc::new(Mutex::new(RiggedRolls::default())),
            dice: Arc::new(Mutex::new(DiceRollProvider::new(seed))),
        }
    }

    fn rigged(&self) -> MutexGuard<'_, RiggedRolls> {
        self.rigged.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn dice(&self) -> MutexGuard<'_, DiceRollProvider> {
        self.dice.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue the next result of `kind` for `character`.
    pub fn rig(&self, character: CharacterId, kind: RollKind, value: i32) {
        self.rigged()
            .rolls
            .entry((character, kind))
            .or_default()
            .push_back(value);
    }

    /// Queue the action phases for `character`'s next initiative roll.
    pub fn queue_initiative(&self, character: CharacterId, mut actions: Vec<u8>) {
        actions.sort_unstable();
        self.rigged()
            .initiative
            .entry(character)
            .or_default()
            .push_back(actions);
    }

    /// Rolls still waiting to be used.
    pub fn pending(&self) -> usize {
        let rigged = self.rigged();
        rigged.rolls.values().map(VecDeque::len).sum::<usize>()
            + rigged.initiative.values().map(VecDeque::len).sum::<usize>()
    }

    /// Parameters of every `kind` roll `character` has made, oldest first.
    pub fn requested(&self, character: CharacterId, kind: RollKind) -> Vec<RollParams> {
        self.rigged()
            .requests
            .iter()
            .filter(|(id, k, _)| *id == character && *k == kind)
            .map(|(_, _, params)| *params)
            .collect()
    }

    fn take(&self, character: CharacterId, kind: RollKind, params: RollParams) -> Option<i32> {
        let mut rigged = self.rigged();
        rigged.requests.push((character, kind, params));
        rigged
            .rolls
            .get_mut(&(character, kind))
            .and_then(VecDeque::pop_front)
    }
}

impl Default for TestRollProvider {
    fn default() -> Self {
        Self::new(TEST_SEED)
    }
}

impl RollProvider for TestRollProvider {
    fn skill_roll(
        &mut self,
        subject: CharacterId,
        skill: Skill,
        params: RollParams,
        explode: bool,
        mutator: &dyn Mutator,
    ) -> i32 {
        match self.take(subject, RollKind::Skill(skill), params) {
            Some(value) => value,
            None => self
                .dice()
                .skill_roll(subject, skill, params, explode, mutator),
        }
    }

    fn damage_roll(&mut self, subject: CharacterId, params: RollParams, mutator: &dyn Mutator) -> i32 {
        match self.take(subject, RollKind::Damage, params) {
            Some(value) => value,
            None => self.dice().damage_roll(subject, params, mutator),
        }
    }

    fn wound_check_roll(&mut self, subject: CharacterId, params: RollParams, mutator: &dyn Mutator) -> i32 {
        match self.take(subject, RollKind::WoundCheck, params) {
            Some(value) => value,
            None => self.dice().wound_check_roll(subject, params, mutator),
        }
    }

    fn initiative_roll(&mut self, subject: CharacterId, params: RollParams) -> Vec<u8> {
        let queued = self
            .rigged()
            .initiative
            .get_mut(&subject)
            .and_then(VecDeque::pop_front);
        match queued {
            Some(actions) => actions,
            None => self.dice().initiative_roll(subject, params),
        }
    }
}

// ============================================================================
// Sample characters
// ============================================================================

/// A plain character with every ring at 3 and attack and parry at 3.
pub fn create_sample_bushi(name: &str) -> Character {
    let mut character = Character::new(name);
    for ring in Ring::all().iter().copied() {
        set_ring(&mut character, ring, 3);
    }
    set_skill(&mut character, Skill::Attack, 3);
    set_skill(&mut character, Skill::Parry, 3);
    character
}

/// Hits hard and never parries well: Fire 4, attack 4, parry 1, yari.
pub fn create_sample_brute(name: &str) -> Character {
    let mut character = Character::new(name);
    set_ring(&mut character, Ring::Fire, 4);
    set_ring(&mut character, Ring::Earth, 3);
    set_skill(&mut character, Skill::Attack, 4);
    character.set_weapon(WeaponKind::Yari.weapon());
    character.take_advantage(Advantage::StrengthOfTheEarth);
    character
}

/// Hard to hit and patient: Air 4, parry 4, lunges and double attacks.
pub fn create_sample_duelist(name: &str) -> Character {
    let mut character = Character::new(name);
    set_ring(&mut character, Ring::Air, 4);
    set_ring(&mut character, Ring::Void, 3);
    set_skill(&mut character, Skill::Attack, 3);
    set_skill(&mut character, Skill::Parry, 4);
    set_skill(&mut character, Skill::Lunge, 2);
    set_skill(&mut character, Skill::DoubleAttack, 2);
    character
}

fn set_ring(character: &mut Character, ring: Ring, rank: u8) {
    if let Err(e) = character.set_ring(ring, rank) {
        panic!("sample character: {e}");
    }
}

fn set_skill(character: &mut Character, skill: Skill, rank: u8) {
    if let Err(e) = character.set_skill(skill, rank) {
        panic!("sample character: {e}");
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A combat engine wired to a `TestRollProvider`, with history recording on.
///
/// The first member of group 0 is the control character and the first member
/// of group 1 is the test character.
pub struct TestHarness {
    engine: CombatEngine,
    rolls: TestRollProvider,
    control: CharacterId,
    test: CharacterId,
}

impl TestHarness {
    /// Panics if the groups are not a valid combat.
    pub fn new(groups: Vec<Vec<Character>>) -> Self {
        let control = first_member(&groups, CONTROL_GROUP);
        let test = first_member(&groups, TEST_GROUP);
        let rolls = TestRollProvider::default();
        let context = match Context::new(groups) {
            Ok(context) => context.with_roll_provider(Box::new(rolls.clone())),
            Err(e) => panic!("invalid test groups: {e}"),
        };
        Self {
            engine: CombatEngine::new(context).with_history(true),
            rolls,
            control,
            test,
        }
    }

    /// Two default characters, "Control" against "Test".
    pub fn duel() -> Self {
        Self::new(vec![
            vec![Character::new("Control")],
            vec![Character::new("Test")],
        ])
    }

    pub fn context(&self) -> &Context {
        self.engine.context()
    }

    pub fn context_mut(&mut self) -> &mut Context {
        self.engine.context_mut()
    }

    pub fn engine(&self) -> &CombatEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut CombatEngine {
        &mut self.engine
    }

    pub fn roll_provider(&self) -> &TestRollProvider {
        &self.rolls
    }

    pub fn control_id(&self) -> CharacterId {
        self.control
    }

    pub fn test_id(&self) -> CharacterId {
        self.test
    }

    /// Id of the character called `name`. Panics if there is none.
    pub fn id(&self, name: &str) -> CharacterId {
        match self.context().find_by_name(name) {
            Some(character) => character.id(),
            None => panic!("no character named {name}"),
        }
    }

    pub fn character(&self, id: CharacterId) -> &Character {
        match self.context().character(id) {
            Ok(character) => character,
            Err(e) => panic!("{e}"),
        }
    }

    fn character_mut(&mut self, id: CharacterId) -> &mut Character {
        match self.context_mut().character_mut(id) {
            Ok(character) => character,
            Err(e) => panic!("{e}"),
        }
    }

    /// Jump the clock to `phase` of the current round.
    pub fn set_phase(&mut self, phase: u8) {
        self.context_mut().set_phase(phase);
    }

    pub fn set_actions(&mut self, id: CharacterId, actions: Vec<u8>) {
        self.character_mut(id).set_actions(actions);
    }

    /// Replace `id`'s light wounds with `lw`.
    pub fn set_lw(&mut self, id: CharacterId, lw: i32) {
        let character = self.character_mut(id);
        character.reset_lw();
        character.take_lw(lw);
    }

    pub fn take_sw(&mut self, id: CharacterId, sw: i32) {
        self.character_mut(id).take_sw(sw);
    }

    /// Dispatch one event through the engine.
    pub fn event(&mut self, event: Event) -> Result<Option<Outcome>, EngineError> {
        self.engine.dispatch(event)
    }

    pub fn run_round(&mut self) -> Result<Option<Outcome>, EngineError> {
        self.engine.run_round()
    }

    pub fn run(&mut self) -> Result<Outcome, EngineError> {
        self.engine.run()
    }

    pub fn history(&self) -> &[Event] {
        self.engine.history()
    }

    /// Whether any recorded event satisfies `predicate`.
    pub fn saw(&self, predicate: impl Fn(&Event) -> bool) -> bool {
        self.history().iter().any(predicate)
    }
}

fn first_member(groups: &[Vec<Character>], group: usize) -> CharacterId {
    // Context::new rejects these shapes; fall back to a fresh id so the
    // panic names the real problem.
    groups
        .get(group)
        .and_then(|g| g.first())
        .map(Character::id)
        .unwrap_or_default()
}

// ============================================================================
// Assertion helpers
// ============================================================================

/// Assert a character's serious and light wounds.
pub fn assert_wounds(harness: &TestHarness, id: CharacterId, sw: i32, lw: i32) {
    let character = harness.character(id);
    assert_eq!(
        (character.sw(), character.lw()),
        (sw, lw),
        "{} should have {sw} SW and {lw} LW",
        character.name()
    );
}

/// Assert nobody on the losing side is still fighting.
pub fn assert_defeated(harness: &TestHarness, group: usize) {
    let ctx = harness.context();
    assert!(
        !ctx.groups()[group].is_fighting(ctx),
        "group {group} should be defeated"
    );
}
