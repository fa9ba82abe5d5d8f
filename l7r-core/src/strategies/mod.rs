//! Decision making.
//!
//! A strategy reads the context and recommends follow-up events; it never
//! changes state. Listeners consult a character's strategy whenever a rule
//! leaves that character a choice, then the recommended events are
//! dispatched like any other.

pub mod action;
pub mod attack;
pub mod parry;
pub mod rolled;
pub mod wound_check;

use crate::character::Character;
use crate::character::CharacterId;
use crate::context::Context;
use crate::error::{ConfigError, EngineError};
use crate::events::Event;
use crate::skills::Skill;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use action::{AlwaysActStrategy, HoldOneActionStrategy};
pub use attack::{PlainAttackStrategy, StingyAttackStrategy, UniversalAttackStrategy};
pub use parry::{
    AlwaysParryStrategy, NeverCounterattackStrategy, NeverParryStrategy, ReluctantParryStrategy,
    WhenTargetedCounterattackStrategy,
};
pub use rolled::{AttackRolledStrategy, ParryRolledStrategy, WoundCheckRolledStrategy};
pub use wound_check::{
    AlwaysKeepLightWoundsStrategy, KeepLightWoundsStrategy, NeverKeepLightWoundsStrategy,
    StingyWoundCheckStrategy, WoundCheckStrategy,
};

/// Chooses how a character responds to an event.
pub trait Strategy: Send + Sync {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &Context,
    ) -> Result<Vec<Event>, EngineError>;

    /// Whether allies may count on this character to parry for them.
    fn will_parry(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str;
}

/// The decision points a character has a strategy for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
    Action,
    Attack,
    AttackRolled,
    Parry,
    ParryRolled,
    Counterattack,
    WoundCheck,
    WoundCheckRolled,
    LightWounds,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Action => "action",
            StrategyKind::Attack => "attack",
            StrategyKind::AttackRolled => "attack rolled",
            StrategyKind::Parry => "parry",
            StrategyKind::ParryRolled => "parry rolled",
            StrategyKind::Counterattack => "counterattack",
            StrategyKind::WoundCheck => "wound check",
            StrategyKind::WoundCheckRolled => "wound check rolled",
            StrategyKind::LightWounds => "light wounds",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', " ").as_str() {
            "action" => Ok(StrategyKind::Action),
            "attack" => Ok(StrategyKind::Attack),
            "attack rolled" => Ok(StrategyKind::AttackRolled),
            "parry" => Ok(StrategyKind::Parry),
            "parry rolled" => Ok(StrategyKind::ParryRolled),
            "counterattack" => Ok(StrategyKind::Counterattack),
            "wound check" => Ok(StrategyKind::WoundCheck),
            "wound check rolled" => Ok(StrategyKind::WoundCheckRolled),
            "light wounds" => Ok(StrategyKind::LightWounds),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

fn shared(strategy: impl Strategy + 'static) -> Arc<dyn Strategy> {
    Arc::new(strategy)
}

/// The built-in strategies for a decision point, under their short names.
fn builtin_strategies(kind: StrategyKind) -> Vec<(&'static str, Arc<dyn Strategy>)> {
    match kind {
        StrategyKind::Action => vec![
            ("hold one action", shared(HoldOneActionStrategy)),
            ("always act", shared(AlwaysActStrategy)),
        ],
        StrategyKind::Attack => vec![
            ("universal", shared(UniversalAttackStrategy)),
            ("plain", shared(PlainAttackStrategy)),
            ("stingy", shared(StingyAttackStrategy)),
        ],
        StrategyKind::AttackRolled => vec![("default", shared(AttackRolledStrategy))],
        StrategyKind::Parry => vec![
            ("reluctant", shared(ReluctantParryStrategy)),
            ("always", shared(AlwaysParryStrategy)),
            ("never", shared(NeverParryStrategy)),
        ],
        StrategyKind::ParryRolled => vec![("default", shared(ParryRolledStrategy))],
        StrategyKind::Counterattack => vec![
            ("never", shared(NeverCounterattackStrategy)),
            ("when targeted", shared(WhenTargetedCounterattackStrategy)),
        ],
        StrategyKind::WoundCheck => vec![
            ("default", shared(WoundCheckStrategy)),
            ("stingy", shared(StingyWoundCheckStrategy)),
        ],
        StrategyKind::WoundCheckRolled => vec![("default", shared(WoundCheckRolledStrategy))],
        StrategyKind::LightWounds => vec![
            ("keep light wounds", shared(KeepLightWoundsStrategy)),
            ("always keep", shared(AlwaysKeepLightWoundsStrategy)),
            ("never keep", shared(NeverKeepLightWoundsStrategy)),
        ],
    }
}

/// Look up a built-in strategy by decision point and name. Either the short
/// name or the strategy's own [`Strategy::name`] is accepted.
pub fn named_strategy(kind: StrategyKind, name: &str) -> Result<Arc<dyn Strategy>, ConfigError> {
    let normalized = name.trim().to_lowercase().replace('_', " ");
    builtin_strategies(kind)
        .into_iter()
        .find(|(short, strategy)| *short == normalized || strategy.name() == normalized)
        .map(|(_, strategy)| strategy)
        .ok_or_else(|| ConfigError::UnknownStrategy(format!("{kind}: {name}")))
}

/// Every decision point, in slot order.
pub const STRATEGY_KINDS: [StrategyKind; 9] = [
    StrategyKind::Action,
    StrategyKind::Attack,
    StrategyKind::AttackRolled,
    StrategyKind::Parry,
    StrategyKind::ParryRolled,
    StrategyKind::Counterattack,
    StrategyKind::WoundCheck,
    StrategyKind::WoundCheckRolled,
    StrategyKind::LightWounds,
];

/// One strategy per decision point.
#[derive(Clone)]
pub struct StrategySet {
    action: Arc<dyn Strategy>,
    attack: Arc<dyn Strategy>,
    attack_rolled: Arc<dyn Strategy>,
    parry: Arc<dyn Strategy>,
    parry_rolled: Arc<dyn Strategy>,
    counterattack: Arc<dyn Strategy>,
    wound_check: Arc<dyn Strategy>,
    wound_check_rolled: Arc<dyn Strategy>,
    light_wounds: Arc<dyn Strategy>,
}

impl Default for StrategySet {
    fn default() -> Self {
        Self {
            action: Arc::new(HoldOneActionStrategy),
            attack: Arc::new(UniversalAttackStrategy),
            attack_rolled: Arc::new(AttackRolledStrategy),
            parry: Arc::new(ReluctantParryStrategy),
            parry_rolled: Arc::new(ParryRolledStrategy),
            counterattack: Arc::new(NeverCounterattackStrategy),
            wound_check: Arc::new(WoundCheckStrategy),
            wound_check_rolled: Arc::new(WoundCheckRolledStrategy),
            light_wounds: Arc::new(KeepLightWoundsStrategy),
        }
    }
}

impl StrategySet {
    fn slot(&mut self, kind: StrategyKind) -> &mut Arc<dyn Strategy> {
        match kind {
            StrategyKind::Action => &mut self.action,
            StrategyKind::Attack => &mut self.attack,
            StrategyKind::AttackRolled => &mut self.attack_rolled,
            StrategyKind::Parry => &mut self.parry,
            StrategyKind::ParryRolled => &mut self.parry_rolled,
            StrategyKind::Counterattack => &mut self.counterattack,
            StrategyKind::WoundCheck => &mut self.wound_check,
            StrategyKind::WoundCheckRolled => &mut self.wound_check_rolled,
            StrategyKind::LightWounds => &mut self.light_wounds,
        }
    }

    pub fn get(&self, kind: StrategyKind) -> Arc<dyn Strategy> {
        let strategy = match kind {
            StrategyKind::Action => &self.action,
            StrategyKind::Attack => &self.attack,
            StrategyKind::AttackRolled => &self.attack_rolled,
            StrategyKind::Parry => &self.parry,
            StrategyKind::ParryRolled => &self.parry_rolled,
            StrategyKind::Counterattack => &self.counterattack,
            StrategyKind::WoundCheck => &self.wound_check,
            StrategyKind::WoundCheckRolled => &self.wound_check_rolled,
            StrategyKind::LightWounds => &self.light_wounds,
        };
        Arc::clone(strategy)
    }

    pub fn set(&mut self, kind: StrategyKind, strategy: Arc<dyn Strategy>) {
        *self.slot(kind) = strategy;
    }
}

impl fmt::Debug for StrategySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategySet")
            .field("action", &self.action.name())
            .field("attack", &self.attack.name())
            .field("parry", &self.parry.name())
            .field("counterattack", &self.counterattack.name())
            .field("wound_check", &self.wound_check.name())
            .field("light_wounds", &self.light_wounds.name())
            .finish()
    }
}

/// Events that pay for an action with `skill` in `phase`.
///
/// Uses the newest die already available; otherwise interrupts by spending
/// the highest dice.
pub fn spend_action(character: &Character, skill: Skill, phase: u8) -> Result<Vec<Event>, EngineError> {
    let subject = character.id();
    if let Some(die) = character.available_actions(phase).into_iter().max() {
        return Ok(vec![Event::SpendAction {
            subject,
            skill,
            phase: die,
        }]);
    }
    if character.has_interrupt_action(skill) {
        let cost = character.interrupt_cost(skill);
        return Ok(character
            .actions()
            .iter()
            .rev()
            .take(cost)
            .map(|die| Event::SpendAction {
                subject,
                skill,
                phase: *die,
            })
            .collect());
    }
    Err(EngineError::NotEnoughActions(character.name().to_string()))
}

/// Whether `character` can act with `skill` now, normally or by interrupting.
pub fn can_act(character: &Character, skill: Skill, phase: u8) -> bool {
    character.has_action(phase) || character.has_interrupt_action(skill)
}
