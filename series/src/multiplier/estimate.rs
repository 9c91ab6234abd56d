//! Randomized pre-sizing of the product container.
//!
//! A trial randomly pairs operand terms and multiplies them into a scratch
//! series until the first key collision. Squaring the mean collision-free
//! run length (a birthday-style argument) and scaling by a safety factor and
//! by the fraction of terms an active filter would discard gives an estimate
//! of the product's final size. The estimate only ever affects how the real
//! destination is pre-sized; a poor estimate costs rehashes, never
//! correctness.

use rand::{rngs::SmallRng, seq::SliceRandom, SeedableRng};

use crate::{
    error::Error,
    series::Series,
    symbol_set::SymbolSet,
    term::{Coefficient, Key},
    truncate::Truncator,
};

use super::MulCtx;

/// Seed mixed with the trial index, so every trial shuffles differently
/// while the whole pass stays reproducible.
const TRIAL_SEED: u64 = 0x7d87_13f2_03c5_7cbb;

pub(super) fn estimate_product_size<C, K, T>(
    ctx: &MulCtx<'_, C, K, T>,
    symbols: &SymbolSet,
) -> Result<usize, Error>
where
    C: Coefficient,
    K: Key,
    T: Truncator<C, K>,
{
    let size1 = ctx.v1.len();
    let size2 = ctx.v2.len();
    if size1 == 0 || size2 == 0 {
        return Ok(0);
    }
    let trials = ctx.config.estimation_trials.max(1);
    let multiplier = ctx.config.estimation_multiplier.max(1) as u128;
    // Number of pairings a trial may perform before a collision must have
    // appeared for the estimate to stay within the safety factor.
    let cap = ((size1 as u128 * size2 as u128) / multiplier).isqrt();
    let cap = usize::try_from(cap).unwrap_or(usize::MAX);

    let mut idx1: Vec<usize> = (0..size1).collect();
    let mut idx2: Vec<usize> = (0..size2).collect();
    let mut scratch: Series<C, K> = Series::new(symbols.clone());
    let mut total: u128 = 0;
    let mut filtered: u128 = 0;
    for trial in 0..trials {
        let mut rng = SmallRng::seed_from_u64(TRIAL_SEED ^ trial as u64);
        idx1.shuffle(&mut rng);
        idx2.shuffle(&mut rng);
        let mut count: usize = 0;
        let mut count_filtered: usize = 0;
        let mut p1 = 0;
        let mut p2 = 0;
        while count < cap {
            if p1 == idx1.len() {
                // Each wrap of the first view rotates the second so fresh
                // pairings keep appearing.
                p1 = 0;
                idx2.rotate_right(1);
                p2 = 0;
            }
            if p2 == idx2.len() {
                p2 = 0;
            }
            let product = ctx.v1[idx1[p1]].multiply(ctx.v2[idx2[p2]], symbols);
            let mut produced = 0usize;
            let mut produced_filtered = 0usize;
            for term in product {
                if ctx.filtering && ctx.truncator.filter(&term) {
                    produced_filtered += 1;
                }
                produced += 1;
                // Inserted unfiltered; the would-be filtered terms are
                // accounted for separately when scaling the estimate.
                scratch.insert(term)?;
            }
            debug_assert_eq!(produced, K::ARITY);
            let expected = count.checked_add(produced).ok_or(Error::Overflow)?;
            if scratch.len() != expected {
                // First duplicate key (or dropped term): the collision-free
                // run ends here.
                break;
            }
            count = expected;
            count_filtered += produced_filtered;
            p1 += 1;
            p2 += 1;
        }
        total += count as u128;
        filtered += count_filtered as u128;
        scratch.clear();
    }
    if total == 0 {
        return Ok(0);
    }
    let mean = total / trials as u128;
    let estimated = mean
        .checked_mul(mean)
        .and_then(|m| m.checked_mul(multiplier))
        .and_then(|m| m.checked_mul(total - filtered))
        .ok_or(Error::Overflow)?
        / total;
    usize::try_from(estimated).map_err(|_| Error::Overflow)
}
