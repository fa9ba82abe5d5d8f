//! Whether to act now or wait.

use super::{Strategy, StrategyKind};
use crate::character::{CharacterId, LAST_PHASE};
use crate::context::Context;
use crate::error::EngineError;
use crate::events::Event;

/// Keep one action in reserve for parries until phase 10.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldOneActionStrategy;

impl Strategy for HoldOneActionStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        if !matches!(event, Event::YourMove { subject } if *subject == character) {
            return Ok(Vec::new());
        }
        let me = ctx.character(character)?;
        let phase = ctx.phase();
        if !me.has_action(phase) {
            return Ok(vec![Event::NoAction { subject: character }]);
        }
        if me.available_actions(phase).len() > 1 || phase == LAST_PHASE {
            me.strategy(StrategyKind::Attack).recommend(character, event, ctx)
        } else {
            tracing::debug!(character = me.name(), phase, "holding an action");
            Ok(vec![Event::HoldAction { subject: character }])
        }
    }

    fn name(&self) -> &'static str {
        "hold one action"
    }
}

/// Attack whenever an action is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysActStrategy;

impl Strategy for AlwaysActStrategy {
    fn recommend(
        &self,
        character: CharacterId,
        event: &Event,
        ctx: &Context,
    ) -> Result<Vec<Event>, EngineError> {
        if !matches!(event, Event::YourMove { subject } if *subject == character) {
            return Ok(Vec::new());
        }
        let me = ctx.character(character)?;
        if me.has_action(ctx.phase()) {
            me.strategy(StrategyKind::Attack).recommend(character, event, ctx)
        } else {
            Ok(vec![Event::NoAction { subject: character }])
        }
    }

    fn name(&self) -> &'static str {
        "always act"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;

    fn your_move(harness: &TestHarness) -> Event {
        Event::YourMove {
            subject: harness.test_id(),
        }
    }

    fn attacks(events: &[Event]) -> bool {
        matches!(events.first(), Some(Event::SpendAction { .. }))
            && matches!(events.last(), Some(Event::TakeAttack { .. }))
    }

    #[test]
    fn test_holds_a_single_die_for_parrying() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.set_phase(4);
        harness.set_actions(test, vec![2, 9]);
        let events = HoldOneActionStrategy
            .recommend(test, &your_move(&harness), harness.context())
            .unwrap();
        assert_eq!(events, vec![Event::HoldAction { subject: test }]);
    }

    #[test]
    fn test_acts_with_two_eligible_dice() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.set_phase(4);
        harness.set_actions(test, vec![2, 4]);
        let events = HoldOneActionStrategy
            .recommend(test, &your_move(&harness), harness.context())
            .unwrap();
        assert!(attacks(&events), "{events:?}");
    }

    #[test]
    fn test_last_phase_spends_the_held_die() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.set_phase(LAST_PHASE);
        harness.set_actions(test, vec![6]);
        let events = HoldOneActionStrategy
            .recommend(test, &your_move(&harness), harness.context())
            .unwrap();
        assert!(attacks(&events), "{events:?}");
    }

    #[test]
    fn test_always_act_spends_a_lone_die() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.set_phase(4);
        harness.set_actions(test, vec![3]);
        let events = AlwaysActStrategy
            .recommend(test, &your_move(&harness), harness.context())
            .unwrap();
        assert!(attacks(&events), "{events:?}");
    }

    #[test]
    fn test_no_action_before_the_first_die() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.set_phase(2);
        harness.set_actions(test, vec![5]);
        for strategy in [&HoldOneActionStrategy as &dyn Strategy, &AlwaysActStrategy] {
            let events = strategy
                .recommend(test, &your_move(&harness), harness.context())
                .unwrap();
            assert_eq!(events, vec![Event::NoAction { subject: test }], "{}", strategy.name());
        }
    }

    #[test]
    fn test_other_characters_moves_are_ignored() {
        let mut harness = TestHarness::duel();
        let test = harness.test_id();
        harness.set_actions(test, vec![1, 1]);
        harness.set_phase(1);
        let theirs = Event::YourMove {
            subject: harness.control_id(),
        };
        assert!(HoldOneActionStrategy
            .recommend(test, &theirs, harness.context())
            .unwrap()
            .is_empty());
        assert!(AlwaysActStrategy
            .recommend(test, &theirs, harness.context())
            .unwrap()
            .is_empty());
    }
}
