//! Combat events.
//!
//! Events are messages: something happened, or a decision must be made.
//! They are never changed after creation. By convention the `subject` is
//! the character doing something and the `target` the character it is done
//! to; damage events carry the amount in `damage`.
//!
//! `TakeAttack`, `TakeParry` and `TakeContest` are playable: the engine does
//! not offer them to listeners but steps through the sub-events their play
//! produces.

use crate::actions::{ActionId, AttackAction, ContestedAction, ParryAction};
use crate::character::CharacterId;
use crate::modifiers::{FloatingBonus, Modifier, ModifierId};
use crate::skills::Skill;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    NewRound { round: u32 },
    NewPhase { phase: u8 },
    EndOfPhase { phase: u8 },
    EndOfRound { round: u32 },

    /// Asks `subject` whether it will use an action now.
    YourMove { subject: CharacterId },
    InitiativeChanged,

    TakeAttack { action: AttackAction },
    TakeParry { action: ParryAction },
    /// Both sides roll and the margin sets the damage.
    TakeContest { action: ContestedAction },

    AttackDeclared { action: ActionId },
    AttackRolled { action: ActionId, roll: i32 },
    AttackSucceeded { action: ActionId },
    AttackFailed { action: ActionId },

    ParryDeclared { action: ActionId },
    /// `subject` chose not to parry `attack`.
    ParryDeclined { attack: ActionId, subject: CharacterId },
    ParryRolled { action: ActionId, roll: i32 },
    ParrySucceeded { action: ActionId },
    ParryFailed { action: ActionId },

    /// `roll` is the subject's, `opponent_roll` the target's.
    ContestRolled {
        action: ActionId,
        roll: i32,
        opponent_roll: i32,
    },

    /// `wound_check_tn` is the base TN for the wound check this damage
    /// triggers, normally the damage itself.
    LightWoundsDamage {
        subject: CharacterId,
        target: CharacterId,
        damage: i32,
        wound_check_tn: i32,
    },
    SeriousWoundsDamage {
        subject: CharacterId,
        target: CharacterId,
        damage: i32,
    },

    Death { subject: CharacterId },
    Unconscious { subject: CharacterId },
    Surrender { subject: CharacterId },
    HoldAction { subject: CharacterId },
    NoAction { subject: CharacterId },

    /// `damage` is the total light wounds being checked.
    WoundCheckDeclared {
        subject: CharacterId,
        attacker: CharacterId,
        damage: i32,
        tn: i32,
        vp: u32,
    },
    WoundCheckRolled {
        subject: CharacterId,
        attacker: CharacterId,
        damage: i32,
        tn: i32,
        roll: i32,
    },
    WoundCheckFailed {
        subject: CharacterId,
        attacker: CharacterId,
        damage: i32,
        tn: i32,
        roll: i32,
    },
    WoundCheckSucceeded {
        subject: CharacterId,
        attacker: CharacterId,
        damage: i32,
        tn: i32,
        roll: i32,
    },
    KeepLightWounds {
        subject: CharacterId,
        attacker: CharacterId,
        damage: i32,
    },
    TakeSeriousWound {
        subject: CharacterId,
        attacker: CharacterId,
        damage: i32,
    },

    GainTemporaryVoidPoints { subject: CharacterId, amount: u32 },
    GainFloatingBonus { subject: CharacterId, bonus: FloatingBonus },

    /// Spends the action die showing `phase`.
    SpendAction {
        subject: CharacterId,
        skill: Skill,
        phase: u8,
    },
    SpendVoidPoints {
        subject: CharacterId,
        skill: Skill,
        amount: u32,
    },
    SpendAdventurePoints {
        subject: CharacterId,
        skill: Skill,
        amount: u32,
    },
    SpendFloatingBonus {
        subject: CharacterId,
        bonus: FloatingBonus,
    },

    AddModifier { subject: CharacterId, modifier: Modifier },
    RemoveModifier { subject: CharacterId, modifier: ModifierId },
}

/// Discriminant of [`Event`], used to key listener registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    NewRound,
    NewPhase,
    EndOfPhase,
    EndOfRound,
    YourMove,
    InitiativeChanged,
    TakeAttack,
    TakeParry,
    TakeContest,
    AttackDeclared,
    AttackRolled,
    AttackSucceeded,
    AttackFailed,
    ParryDeclared,
    ParryDeclined,
    ParryRolled,
    ParrySucceeded,
    ParryFailed,
    ContestRolled,
    LightWoundsDamage,
    SeriousWoundsDamage,
    Death,
    Unconscious,
    Surrender,
    HoldAction,
    NoAction,
    WoundCheckDeclared,
    WoundCheckRolled,
    WoundCheckFailed,
    WoundCheckSucceeded,
    KeepLightWounds,
    TakeSeriousWound,
    GainTemporaryVoidPoints,
    GainFloatingBonus,
    SpendAction,
    SpendVoidPoints,
    SpendAdventurePoints,
    SpendFloatingBonus,
    AddModifier,
    RemoveModifier,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::NewRound { .. } => EventKind::NewRound,
            Event::NewPhase { .. } => EventKind::NewPhase,
            Event::EndOfPhase { .. } => EventKind::EndOfPhase,
            Event::EndOfRound { .. } => EventKind::EndOfRound,
            Event::YourMove { .. } => EventKind::YourMove,
            Event::InitiativeChanged => EventKind::InitiativeChanged,
            Event::TakeAttack { .. } => EventKind::TakeAttack,
            Event::TakeParry { .. } => EventKind::TakeParry,
            Event::TakeContest { .. } => EventKind::TakeContest,
            Event::AttackDeclared { .. } => EventKind::AttackDeclared,
            Event::AttackRolled { .. } => EventKind::AttackRolled,
            Event::AttackSucceeded { .. } => EventKind::AttackSucceeded,
            Event::AttackFailed { .. } => EventKind::AttackFailed,
            Event::ParryDeclared { .. } => EventKind::ParryDeclared,
            Event::ParryDeclined { .. } => EventKind::ParryDeclined,
            Event::ParryRolled { .. } => EventKind::ParryRolled,
            Event::ParrySucceeded { .. } => EventKind::ParrySucceeded,
            Event::ParryFailed { .. } => EventKind::ParryFailed,
            Event::ContestRolled { .. } => EventKind::ContestRolled,
            Event::LightWoundsDamage { .. } => EventKind::LightWoundsDamage,
            Event::SeriousWoundsDamage { .. } => EventKind::SeriousWoundsDamage,
            Event::Death { .. } => EventKind::Death,
            Event::Unconscious { .. } => EventKind::Unconscious,
            Event::Surrender { .. } => EventKind::Surrender,
            Event::HoldAction { .. } => EventKind::HoldAction,
            Event::NoAction { .. } => EventKind::NoAction,
            Event::WoundCheckDeclared { .. } => EventKind::WoundCheckDeclared,
            Event::WoundCheckRolled { .. } => EventKind::WoundCheckRolled,
            Event::WoundCheckFailed { .. } => EventKind::WoundCheckFailed,
            Event::WoundCheckSucceeded { .. } => EventKind::WoundCheckSucceeded,
            Event::KeepLightWounds { .. } => EventKind::KeepLightWounds,
            Event::TakeSeriousWound { .. } => EventKind::TakeSeriousWound,
            Event::GainTemporaryVoidPoints { .. } => EventKind::GainTemporaryVoidPoints,
            Event::GainFloatingBonus { .. } => EventKind::GainFloatingBonus,
            Event::SpendAction { .. } => EventKind::SpendAction,
            Event::SpendVoidPoints { .. } => EventKind::SpendVoidPoints,
            Event::SpendAdventurePoints { .. } => EventKind::SpendAdventurePoints,
            Event::SpendFloatingBonus { .. } => EventKind::SpendFloatingBonus,
            Event::AddModifier { .. } => EventKind::AddModifier,
            Event::RemoveModifier { .. } => EventKind::RemoveModifier,
        }
    }

    /// Playable events are stepped through rather than offered to listeners.
    pub fn is_playable(&self) -> bool {
        matches!(
            self,
            Event::TakeAttack { .. } | Event::TakeParry { .. } | Event::TakeContest { .. }
        )
    }

    /// An event that ends the subject's fighting.
    pub fn is_defeat(&self) -> bool {
        matches!(
            self,
            Event::Death { .. } | Event::Unconscious { .. } | Event::Surrender { .. }
        )
    }

    /// An event after which the subject will not move again this phase.
    pub fn is_not_moving(&self) -> bool {
        matches!(self, Event::HoldAction { .. } | Event::NoAction { .. })
    }

    pub fn is_status(&self) -> bool {
        self.is_defeat() || self.is_not_moving()
    }

    /// The attack this event reports as finished.
    pub fn is_attack_resolution(&self) -> bool {
        matches!(
            self,
            Event::AttackSucceeded { .. } | Event::AttackFailed { .. }
        )
    }

    /// The attack action an event refers to, if any.
    pub fn attack_id(&self) -> Option<ActionId> {
        match self {
            Event::AttackDeclared { action }
            | Event::AttackRolled { action, .. }
            | Event::AttackSucceeded { action }
            | Event::AttackFailed { action } => Some(*action),
            Event::ParryDeclined { attack, .. } => Some(*attack),
            _ => None,
        }
    }

    /// The character an event is about, for events that have one.
    pub fn subject(&self) -> Option<CharacterId> {
        match self {
            Event::YourMove { subject }
            | Event::ParryDeclined { subject, .. }
            | Event::LightWoundsDamage { subject, .. }
            | Event::SeriousWoundsDamage { subject, .. }
            | Event::Death { subject }
            | Event::Unconscious { subject }
            | Event::Surrender { subject }
            | Event::HoldAction { subject }
            | Event::NoAction { subject }
            | Event::WoundCheckDeclared { subject, .. }
            | Event::WoundCheckRolled { subject, .. }
            | Event::WoundCheckFailed { subject, .. }
            | Event::WoundCheckSucceeded { subject, .. }
            | Event::KeepLightWounds { subject, .. }
            | Event::TakeSeriousWound { subject, .. }
            | Event::GainTemporaryVoidPoints { subject, .. }
            | Event::GainFloatingBonus { subject, .. }
            | Event::SpendAction { subject, .. }
            | Event::SpendVoidPoints { subject, .. }
            | Event::SpendAdventurePoints { subject, .. }
            | Event::SpendFloatingBonus { subject, .. }
            | Event::AddModifier { subject, .. }
            | Event::RemoveModifier { subject, .. } => Some(*subject),
            Event::TakeAttack { action } => Some(action.subject),
            Event::TakeParry { action } => Some(action.subject),
            Event::TakeContest { action } => Some(action.subject),
            _ => None,
        }
    }
}
