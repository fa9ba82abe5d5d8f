//! Per-trial statistics and their aggregate over a batch.
//!
//! `TrialFeatures` watches every event the engine dispatches and is
//! finished off with the outcome once combat ends. `SummaryFeatures` folds
//! finished trials together for whoever is comparing the two groups.

use crate::character::CharacterId;
use crate::context::Context;
use crate::engine::Outcome;
use crate::events::Event;
use crate::groups::{CONTROL_GROUP, TEST_GROUP};
use crate::skills::{Skill, ATTACK_SKILLS};
use serde::{Deserialize, Serialize};

/// What one side did over a trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideFeatures {
    pub actions_taken: u32,
    pub attacks_taken: u32,
    pub parries_taken: u32,
    pub damage_rolls: u32,
    pub damage_sum: i64,
    pub damage_sum_of_squares: i64,
    pub sw_dealt: i32,
    pub sw_remaining: i32,
    pub vp_remaining: u32,
    pub vp_spent: u32,
    pub vp_spent_on_attacks: u32,
    pub vp_spent_on_wound_checks: u32,
    pub ap_remaining: u32,
    pub ap_spent: u32,
    pub ap_spent_on_wound_checks: u32,
}

impl SideFeatures {
    fn observe_damage(&mut self, damage: i32) {
        let damage = i64::from(damage);
        self.damage_rolls += 1;
        self.damage_sum += damage;
        self.damage_sum_of_squares += damage * damage;
    }
}

/// Features of a single trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialFeatures {
    /// -1 when the control group won, 1 when the test group won, 0 for a
    /// mutual defeat. `None` until the trial completes.
    pub winner: Option<i32>,
    /// Rounds started, counting the one combat ended in.
    pub rounds: u32,
    /// Phases started across all rounds.
    pub phases: u32,
    pub control: SideFeatures,
    pub test: SideFeatures,
}

impl TrialFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    fn side_mut(&mut self, ctx: &Context, character: CharacterId) -> Option<&mut SideFeatures> {
        match ctx.group_of(character)? {
            CONTROL_GROUP => Some(&mut self.control),
            TEST_GROUP => Some(&mut self.test),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.winner.is_some()
    }

    /// Record what an event tells us about either side.
    pub fn observe(&mut self, event: &Event, ctx: &Context) {
        match event {
            Event::NewRound { .. } => self.rounds += 1,
            Event::NewPhase { .. } => self.phases += 1,
            Event::SpendAction { subject, .. } => {
                if let Some(side) = self.side_mut(ctx, *subject) {
                    side.actions_taken += 1;
                }
            }
            Event::TakeAttack { action } => {
                if let Some(side) = self.side_mut(ctx, action.subject) {
                    side.attacks_taken += 1;
                }
            }
            Event::TakeParry { action } => {
                if let Some(side) = self.side_mut(ctx, action.subject) {
                    side.parries_taken += 1;
                }
            }
            Event::LightWoundsDamage { subject, damage, .. } => {
                if let Some(side) = self.side_mut(ctx, *subject) {
                    side.observe_damage(*damage);
                }
            }
            Event::SeriousWoundsDamage { subject, damage, .. } => {
                if let Some(side) = self.side_mut(ctx, *subject) {
                    side.sw_dealt += damage;
                }
            }
            Event::SpendVoidPoints {
                subject,
                skill,
                amount,
            } => {
                if let Some(side) = self.side_mut(ctx, *subject) {
                    side.vp_spent += amount;
                    if ATTACK_SKILLS.contains(skill) {
                        side.vp_spent_on_attacks += amount;
                    } else if *skill == Skill::WoundCheck {
                        side.vp_spent_on_wound_checks += amount;
                    }
                }
            }
            Event::SpendAdventurePoints {
                subject,
                skill,
                amount,
            } => {
                if let Some(side) = self.side_mut(ctx, *subject) {
                    side.ap_spent += amount;
                    if *skill == Skill::WoundCheck {
                        side.ap_spent_on_wound_checks += amount;
                    }
                }
            }
            _ => {}
        }
    }

    /// Finish the trial: record the winner and what each side has left.
    pub fn complete(&mut self, ctx: &Context, outcome: Outcome) {
        self.winner = Some(outcome.winner());
        let (mut control, mut test) = (SideFeatures::default(), SideFeatures::default());
        for character in ctx.characters() {
            let side = match ctx.group_of(character.id()) {
                Some(CONTROL_GROUP) => &mut control,
                Some(TEST_GROUP) => &mut test,
                _ => continue,
            };
            side.sw_remaining += character.sw_remaining().max(0);
            side.vp_remaining += character.vp();
            side.ap_remaining += character.ap();
        }
        for (side, left) in [(&mut self.control, control), (&mut self.test, test)] {
            side.sw_remaining = left.sw_remaining;
            side.vp_remaining = left.vp_remaining;
            side.ap_remaining = left.ap_remaining;
        }
    }
}

/// Running totals for one side across trials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideSummary {
    pub victories: u32,
    pub damage_rolls: u64,
    pub damage_sum: i64,
    pub damage_sum_of_squares: i64,
    pub vp_spent: u64,
    pub sw_dealt: i64,
}

impl SideSummary {
    fn add(&mut self, side: &SideFeatures) {
        self.damage_rolls += u64::from(side.damage_rolls);
        self.damage_sum += side.damage_sum;
        self.damage_sum_of_squares += side.damage_sum_of_squares;
        self.vp_spent += u64::from(side.vp_spent);
        self.sw_dealt += i64::from(side.sw_dealt);
    }

    pub fn mean_damage(&self) -> f64 {
        if self.damage_rolls == 0 {
            return 0.0;
        }
        self.damage_sum as f64 / self.damage_rolls as f64
    }

    /// Population variance of the damage rolls.
    pub fn damage_variance(&self) -> f64 {
        if self.damage_rolls == 0 {
            return 0.0;
        }
        let n = self.damage_rolls as f64;
        let mean = self.mean_damage();
        (self.damage_sum_of_squares as f64 / n - mean * mean).max(0.0)
    }
}

/// Aggregate of many trials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryFeatures {
    pub trials: u32,
    pub mutual_defeats: u32,
    pub rounds: u64,
    pub phases: u64,
    pub control: SideSummary,
    pub test: SideSummary,
}

impl SummaryFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, trial: &TrialFeatures) {
        self.trials += 1;
        self.rounds += u64::from(trial.rounds);
        self.phases += u64::from(trial.phases);
        match trial.winner {
            Some(-1) => self.control.victories += 1,
            Some(1) => self.test.victories += 1,
            Some(_) => self.mutual_defeats += 1,
            None => {}
        }
        self.control.add(&trial.control);
        self.test.add(&trial.test);
    }

    /// Fold another summary into this one.
    pub fn merge(&mut self, other: &SummaryFeatures) {
        self.trials += other.trials;
        self.mutual_defeats += other.mutual_defeats;
        self.rounds += other.rounds;
        self.phases += other.phases;
        for (mine, theirs) in [(&mut self.control, &other.control), (&mut self.test, &other.test)] {
            mine.victories += theirs.victories;
            mine.damage_rolls += theirs.damage_rolls;
            mine.damage_sum += theirs.damage_sum;
            mine.damage_sum_of_squares += theirs.damage_sum_of_squares;
            mine.vp_spent += theirs.vp_spent;
            mine.sw_dealt += theirs.sw_dealt;
        }
    }

    fn per_trial(&self, total: f64) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            total / f64::from(self.trials)
        }
    }

    pub fn mean_rounds(&self) -> f64 {
        self.per_trial(self.rounds as f64)
    }

    pub fn mean_phases(&self) -> f64 {
        self.per_trial(self.phases as f64)
    }

    pub fn mean_vp_spent(&self, group: usize) -> f64 {
        match group {
            CONTROL_GROUP => self.per_trial(self.control.vp_spent as f64),
            TEST_GROUP => self.per_trial(self.test.vp_spent as f64),
            _ => 0.0,
        }
    }

    /// Fraction of trials the test group won.
    pub fn test_win_rate(&self) -> f64 {
        self.per_trial(f64::from(self.test.victories))
    }
}

impl FromIterator<TrialFeatures> for SummaryFeatures {
    fn from_iter<I: IntoIterator<Item = TrialFeatures>>(iter: I) -> Self {
        let mut summary = Self::new();
        for trial in iter {
            summary.add(&trial);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{AttackAction, AttackKind};
    use crate::testing::TestHarness;

    #[test]
    fn test_observe_counts_by_side() {
        let harness = TestHarness::duel();
        let (test, control) = (harness.test_id(), harness.control_id());
        let ctx = harness.context();
        let mut features = TrialFeatures::new();
        features.observe(&Event::NewRound { round: 0 }, ctx);
        features.observe(&Event::NewPhase { phase: 0 }, ctx);
        features.observe(
            &Event::TakeAttack {
                action: AttackAction::new(test, control, AttackKind::Attack, 10, 0),
            },
            ctx,
        );
        for damage in [10, 20] {
            features.observe(
                &Event::LightWoundsDamage {
                    subject: test,
                    target: control,
                    damage,
                    wound_check_tn: damage,
                },
                ctx,
            );
        }
        features.observe(
            &Event::SpendVoidPoints {
                subject: control,
                skill: Skill::WoundCheck,
                amount: 1,
            },
            ctx,
        );
        assert_eq!((features.rounds, features.phases), (1, 1));
        assert_eq!(features.test.attacks_taken, 1);
        assert_eq!(features.test.damage_rolls, 2);
        assert_eq!(features.test.damage_sum, 30);
        assert_eq!(features.test.damage_sum_of_squares, 500);
        assert_eq!(features.control.vp_spent_on_wound_checks, 1);
        assert_eq!(features.control.vp_spent_on_attacks, 0);
        assert!(!features.is_complete());
    }

    #[test]
    fn test_complete_records_what_is_left() {
        let mut harness = TestHarness::duel();
        let control = harness.control_id();
        harness.take_sw(control, 3);
        let mut features = TrialFeatures::new();
        features.complete(harness.context(), Outcome::Victory { group: TEST_GROUP });
        assert_eq!(features.winner, Some(1));
        assert_eq!(features.control.sw_remaining, 1);
        assert_eq!(features.test.sw_remaining, 4);
        assert_eq!(features.test.vp_remaining, 2);
    }

    #[test]
    fn test_summary_statistics() {
        let mut a = TrialFeatures::default();
        a.winner = Some(1);
        a.rounds = 2;
        a.test.damage_rolls = 2;
        a.test.damage_sum = 30;
        a.test.damage_sum_of_squares = 500;
        a.test.vp_spent = 2;
        let mut b = TrialFeatures::default();
        b.winner = Some(0);
        b.rounds = 4;
        let summary: SummaryFeatures = vec![a, b].into_iter().collect();
        assert_eq!(summary.trials, 2);
        assert_eq!(summary.test.victories, 1);
        assert_eq!(summary.mutual_defeats, 1);
        assert_eq!(summary.mean_rounds(), 3.0);
        assert_eq!(summary.test.mean_damage(), 15.0);
        assert_eq!(summary.test.damage_variance(), 25.0);
        assert_eq!(summary.mean_vp_spent(TEST_GROUP), 1.0);
        assert_eq!(summary.test_win_rate(), 0.5);

        let mut merged = SummaryFeatures::new();
        merged.merge(&summary);
        merged.merge(&summary);
        assert_eq!(merged.trials, 4);
        assert_eq!(merged.test.mean_damage(), 15.0);
    }
}
