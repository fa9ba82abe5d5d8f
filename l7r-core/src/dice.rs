//! L7R dice: exploding d10 pools, "roll N keep K".
//!
//! Roll parameters display as `NkK+B`. Parameters are normalized before
//! every roll, and pluggable mutators post-process the rolled pool.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Faces on every die.
pub const DIE_FACES: i32 = 10;
/// Most dice that can be rolled or kept in one pool.
pub const POOL_CAP: i32 = 10;

/// Normalize roll parameters.
///
/// Rolled dice above the cap become kept dice one for one, and kept dice
/// above the cap become a flat bonus one for one. Kept never exceeds rolled
/// and neither goes below zero. Idempotent.
pub fn normalize(rolled: i32, kept: i32, bonus: i32) -> (i32, i32, i32) {
    let mut rolled = rolled.max(0);
    let mut kept = kept.max(0);
    let mut bonus = bonus;
    if rolled > POOL_CAP {
        kept += rolled - POOL_CAP;
        rolled = POOL_CAP;
    }
    if kept > POOL_CAP {
        bonus += kept - POOL_CAP;
        kept = POOL_CAP;
    }
    if kept > rolled {
        kept = rolled;
    }
    (rolled, kept, bonus)
}

/// The (rolled, kept, bonus) triple describing one roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RollParams {
    pub rolled: i32,
    pub kept: i32,
    pub bonus: i32,
}

impl RollParams {
    pub fn new(rolled: i32, kept: i32, bonus: i32) -> Self {
        Self {
            rolled,
            kept,
            bonus,
        }
    }

    /// Normalized copy of these parameters.
    pub fn normalize(self) -> Self {
        let (rolled, kept, bonus) = normalize(self.rolled, self.kept, self.bonus);
        Self::new(rolled, kept, bonus)
    }

    pub fn is_normalized(&self) -> bool {
        *self == self.normalize()
    }
}

impl fmt::Display for RollParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}k{}", self.rolled, self.kept)?;
        match self.bonus {
            0 => Ok(()),
            b if b > 0 => write!(f, "+{b}"),
            b => write!(f, "{b}"),
        }
    }
}

/// Roll one die, adding further rolls while it shows the top face.
pub fn roll_die<R: Rng + ?Sized>(rng: &mut R, explode: bool) -> i32 {
    let mut total = 0;
    loop {
        let face = rng.gen_range(1..=DIE_FACES);
        total += face;
        if !(explode && face == DIE_FACES) {
            return total;
        }
    }
}

/// Roll a pool of dice, sorted highest first.
pub fn roll_pool<R: Rng + ?Sized>(rng: &mut R, rolled: i32, explode: bool) -> Vec<i32> {
    let mut pool: Vec<i32> = (0..rolled.max(0)).map(|_| roll_die(&mut *rng, explode)).collect();
    pool.sort_unstable_by(|a, b| b.cmp(a));
    pool
}

/// Result of a mutated roll: the total and how much of it the mutator added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutatedRoll {
    pub result: i32,
    pub bonus: i32,
}

/// Post-processing over a rolled pool.
///
/// `pool` arrives sorted highest first. `reroll` produces a fresh die for
/// mutators that replace dice.
pub trait Mutator: Send + Sync {
    fn mutate(&self, pool: Vec<i32>, kept: usize, reroll: &mut dyn FnMut() -> i32)
        -> MutatedRoll;

    fn name(&self) -> &'static str;
}

fn keep_highest(pool: &[i32], kept: usize) -> i32 {
    pool.iter().take(kept).sum()
}

/// Sum of the highest kept dice.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMutator;

impl Mutator for DefaultMutator {
    fn mutate(
        &self,
        pool: Vec<i32>,
        kept: usize,
        _reroll: &mut dyn FnMut() -> i32,
    ) -> MutatedRoll {
        MutatedRoll {
            result: keep_highest(&pool, kept),
            bonus: 0,
        }
    }

    fn name(&self) -> &'static str {
        "default"
    }
}

/// Adds up to three of the lowest unkept dice on top of the kept dice.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowestUnkeptMutator;

impl Mutator for LowestUnkeptMutator {
    fn mutate(
        &self,
        pool: Vec<i32>,
        kept: usize,
        _reroll: &mut dyn FnMut() -> i32,
    ) -> MutatedRoll {
        let base = keep_highest(&pool, kept);
        let unkept = pool.len().saturating_sub(kept);
        let n_lowest = unkept.min(3);
        let bonus: i32 = pool.iter().rev().take(n_lowest).sum();
        MutatedRoll {
            result: base + bonus,
            bonus,
        }
    }

    fn name(&self) -> &'static str {
        "lowest unkept"
    }
}

/// Rerolls the largest group of lowest unkept dice allowed by the reroll
/// constraint: `n` dice may be rerolled when they sum to at least `5 * (n - 1)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RerollMutator;

impl RerollMutator {
    pub fn constraint(n: usize) -> i32 {
        5 * (n as i32 - 1)
    }

    /// How many of the lowest unkept dice to reroll.
    pub fn reroll_count(pool: &[i32], kept: usize) -> usize {
        let unkept = pool.len().saturating_sub(kept);
        let lowest: Vec<i32> = pool.iter().rev().take(unkept).copied().collect();
        let mut n = unkept;
        while n > 0 {
            let sum: i32 = lowest.iter().take(n).sum();
            if sum >= Self::constraint(n) {
                break;
            }
            n -= 1;
        }
        n
    }
}

impl Mutator for RerollMutator {
    fn mutate(
        &self,
        mut pool: Vec<i32>,
        kept: usize,
        reroll: &mut dyn FnMut() -> i32,
    ) -> MutatedRoll {
        let base = keep_highest(&pool, kept);
        let n = Self::reroll_count(&pool, kept);
        let len = pool.len();
        for die in pool.iter_mut().skip(len - n) {
            *die = reroll();
        }
        pool.sort_unstable_by(|a, b| b.cmp(a));
        let result = keep_highest(&pool, kept).max(base);
        MutatedRoll {
            result,
            bonus: result - base,
        }
    }

    fn name(&self) -> &'static str {
        "reroll"
    }
}

/// Roll normalized parameters with a mutator. Returns the total including the
/// parameter bonus and the mutator's own contribution.
pub fn roll_with_mutator<R: Rng + ?Sized>(
    rng: &mut R,
    params: RollParams,
    explode: bool,
    mutator: &dyn Mutator,
) -> MutatedRoll {
    let params = params.normalize();
    let pool = roll_pool(rng, params.rolled, explode);
    let mut reroll = || roll_die(&mut *rng, explode);
    let mutated = mutator.mutate(pool, params.kept as usize, &mut reroll);
    MutatedRoll {
        result: mutated.result + params.bonus,
        bonus: mutated.bonus,
    }
}

/// Roll `rolled` dice keeping the best `kept`, with the default mutator.
pub fn roll<R: Rng + ?Sized>(rng: &mut R, rolled: i32, kept: i32, explode: bool) -> i32 {
    roll_with_mutator(rng, RollParams::new(rolled, kept, 0), explode, &DefaultMutator).result
}

/// Initiative: dice never explode and the lowest `kept` dice become the
/// character's action phases, sorted ascending.
pub fn roll_initiative<R: Rng + ?Sized>(rng: &mut R, params: RollParams) -> Vec<u8> {
    let params = params.normalize();
    let mut pool = roll_pool(rng, params.rolled, false);
    pool.reverse();
    pool.into_iter()
        .take(params.kept as usize)
        .map(|d| d.clamp(0, DIE_FACES) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_normalize_examples() {
        assert_eq!(normalize(12, 3, 0), (10, 5, 0));
        assert_eq!(normalize(14, 6, 0), (10, 10, 0));
        assert_eq!(normalize(14, 8, 0), (10, 10, 2));
        assert_eq!(normalize(6, 3, 5), (6, 3, 5));
        assert_eq!(normalize(2, 4, 0), (2, 2, 0));
        assert_eq!(normalize(-1, -2, 3), (0, 0, 3));
    }

    proptest! {
        #[test]
        fn test_normalize_is_idempotent(rolled in -5i32..40, kept in -5i32..40, bonus in -20i32..20) {
            let once = normalize(rolled, kept, bonus);
            let twice = normalize(once.0, once.1, once.2);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn test_normalize_moves_excess_one_for_one(rolled in 0i32..40, kept in 0i32..40) {
            let kept = kept.min(rolled);
            let (r, k, b) = normalize(rolled, kept, 0);
            prop_assert!(r <= POOL_CAP && k <= POOL_CAP && k <= r);
            let expected_kept = kept + (rolled - POOL_CAP).max(0);
            prop_assert_eq!(k + b, expected_kept);
        }
    }

    #[test]
    fn test_params_display() {
        assert_eq!(RollParams::new(7, 2, 5).to_string(), "7k2+5");
        assert_eq!(RollParams::new(3, 3, -2).to_string(), "3k3-2");
        assert_eq!(RollParams::new(10, 10, 0).to_string(), "10k10");
    }

    #[test]
    fn test_degenerate_pool_is_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(roll(&mut rng, 0, 0, true), 0);
        assert_eq!(roll(&mut rng, 3, 0, true), 0);
    }

    #[test]
    fn test_roll_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..500 {
            let result = roll(&mut rng, 5, 2, false);
            assert!((2..=20).contains(&result));
        }
    }

    #[test]
    fn test_exploding_dice_exceed_face() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let exploded = (0..2000).any(|_| roll_die(&mut rng, true) > DIE_FACES);
        assert!(exploded);
        let capped = (0..2000).all(|_| roll_die(&mut rng, false) <= DIE_FACES);
        assert!(capped);
    }

    #[test]
    fn test_lowest_unkept_mutator() {
        let mut reroll = || 0;
        let pool = vec![9, 7, 5, 3, 2, 1];
        let mutated = LowestUnkeptMutator.mutate(pool, 2, &mut reroll);
        assert_eq!(mutated.bonus, 6);
        assert_eq!(mutated.result, 22);
    }

    #[test]
    fn test_reroll_mutator_constraint() {
        // lowest two sum to 3 < 5, so only the single lowest die is rerolled
        assert_eq!(RerollMutator::reroll_count(&[9, 8, 2, 1], 2), 1);
        assert_eq!(RerollMutator::reroll_count(&[9, 8, 3, 2], 2), 2);
        let mut reroll = || 10;
        let mutated = RerollMutator.mutate(vec![6, 5, 3, 2], 2, &mut reroll);
        assert_eq!(mutated.result, 20);
        assert_eq!(mutated.bonus, 9);
    }

    #[test]
    fn test_initiative_keeps_lowest_dice() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let actions = roll_initiative(&mut rng, RollParams::new(3, 2, 0));
            assert_eq!(actions.len(), 2);
            assert!(actions[0] <= actions[1]);
            assert!(actions.iter().all(|&a| (1..=10).contains(&a)));
        }
    }
}
