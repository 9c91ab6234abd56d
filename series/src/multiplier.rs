//! The single- and multi-threaded series multiplication engine.
//!
//! A multiplication flattens both operands into term-reference arrays,
//! decides on a worker count from the estimated workload, and then either
//! runs the whole pipeline on the calling thread or fans out over scoped
//! workers, each multiplying a contiguous block of the first operand against
//! the entire second operand into a private destination. The private
//! destinations are combined by a sharded merge that partitions the final
//! table's bucket index space among the workers.
//!
//! The call either returns a correct result or fails atomically: operands
//! are never mutated, and on any failure every partial destination is
//! discarded before the failure surfaces.

mod estimate;
mod merge;

use std::cell::Cell;

use crate::{
    config::MulConfig,
    error::Error,
    series::{term_hash, Series},
    term::{Coefficient, Key, Term},
    truncate::{NoTruncation, Truncator},
};

/// Edge length of the square index blocks visited by the inner loops.
const BLOCK_SIZE: usize = 256;

thread_local! {
    static IN_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Returns `true` on threads spawned by the engine itself, where a nested
/// multiplication must stay single-threaded.
fn in_worker() -> bool {
    IN_WORKER.with(|flag| flag.get())
}

/// Multiplies two series sharing a symbol set, without truncation.
///
/// See [`multiply_truncated`] for the failure conditions.
pub fn multiply<C, K>(
    lhs: &Series<C, K>,
    rhs: &Series<C, K>,
    config: &MulConfig,
) -> Result<Series<C, K>, Error>
where
    C: Coefficient + Send + Sync,
    K: Key + Send + Sync,
{
    multiply_truncated(lhs, rhs, &NoTruncation, config)
}

/// Multiplies two series under a truncator bound to them by the caller.
///
/// The operands must share their symbol set; otherwise the call fails
/// immediately with [`Error::SymbolSetMismatch`]. An empty operand on either
/// side yields the empty series.
///
/// The result does not depend on the configured worker count. The operands
/// are never mutated, and when the multiplication fails, no partially
/// computed result is observable.
pub fn multiply_truncated<C, K, T>(
    lhs: &Series<C, K>,
    rhs: &Series<C, K>,
    truncator: &T,
    config: &MulConfig,
) -> Result<Series<C, K>, Error>
where
    C: Coefficient + Send + Sync,
    K: Key + Send + Sync,
    T: Truncator<C, K> + Sync,
{
    if lhs.symbols() != rhs.symbols() {
        return Err(Error::SymbolSetMismatch);
    }
    let symbols = lhs.symbols().clone();
    if lhs.is_empty() || rhs.is_empty() {
        return Ok(Series::new(symbols));
    }
    let mut v1: Vec<&Term<C, K>> = lhs.iter().collect();
    let mut v2: Vec<&Term<C, K>> = rhs.iter().collect();
    let active = truncator.is_active();
    let skipping = active && truncator.is_skipping();
    let filtering = active && truncator.is_filtering();
    if skipping {
        // A stable sort keeps runs deterministic under comparators that
        // order only a projection of the term.
        v1.sort_by(|a, b| truncator.compare_terms(a, b));
        v2.sort_by(|a, b| truncator.compare_terms(a, b));
    }
    let workers = worker_count(v1.len(), v2.len(), config);
    log::debug!(
        "series mul size1={} size2={} workers={workers}",
        v1.len(),
        v2.len()
    );
    let ctx = MulCtx {
        v1: &v1,
        v2: &v2,
        truncator,
        skipping,
        filtering,
        config,
    };
    if workers == 1 {
        let mut result = Series::new(symbols);
        ctx.multiply_into(&mut result)?;
        Ok(result)
    } else {
        merge::multiply_parallel(&ctx, symbols, workers)
    }
}

/// Derives the worker count from the estimated workload.
///
/// The workload `size1 * size2` is computed in `u128`, divided by the
/// configured minimum work per worker, and clamped to the configured maximum,
/// to `size1` (the first operand is what gets split), and to 1 inside a
/// worker context.
fn worker_count(size1: usize, size2: usize, config: &MulConfig) -> usize {
    if in_worker() || config.max_workers <= 1 {
        return 1;
    }
    let work = size1 as u128 * size2 as u128;
    let min_work = config.min_work_per_worker.max(1) as u128;
    let by_work = (work / min_work).min(config.max_workers as u128) as usize;
    by_work.clamp(1, size1)
}

/// Shared context of one multiplication call: the flattened operand views,
/// the truncator with its capability flags resolved once, and the
/// configuration.
struct MulCtx<'a, C, K, T> {
    v1: &'a [&'a Term<C, K>],
    v2: &'a [&'a Term<C, K>],
    truncator: &'a T,
    skipping: bool,
    filtering: bool,
    config: &'a MulConfig,
}

impl<C, K, T> Clone for MulCtx<'_, C, K, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, K, T> Copy for MulCtx<'_, C, K, T> {}

impl<C, K, T> MulCtx<'_, C, K, T>
where
    C: Coefficient,
    K: Key,
    T: Truncator<C, K>,
{
    /// Runs the single-destination pipeline: an optional size-estimation
    /// pass pre-sizing `dest` once, then the blocked multiplication.
    fn multiply_into(&self, dest: &mut Series<C, K>) -> Result<(), Error> {
        let work = self.v1.len() as u128 * self.v2.len() as u128;
        let mut presized = None;
        if work >= self.config.min_work_per_worker.max(1) as u128 {
            // A missing estimate only costs rehashes during the bulk
            // insertion below, so failures are logged and ignored here.
            match estimate::estimate_product_size(self, dest.symbols()) {
                Ok(estimated) => {
                    let buckets =
                        (estimated as f64 / dest.table().max_load_factor()).ceil() as usize;
                    match dest.table_mut().rehash(buckets, term_hash) {
                        Ok(()) => presized = Some(estimated),
                        Err(err) => log::debug!("pre-size rehash failed: {err}"),
                    }
                }
                Err(err) => log::debug!("size estimation failed: {err}"),
            }
        }
        self.blocked_multiplication(dest)?;
        if let Some(estimated) = presized {
            let actual = dest.len();
            log::debug!(
                "mul estimate={estimated} actual={actual} held={}",
                estimated >= actual
            );
            if actual != 0 {
                log::trace!("mul estimate ratio {:.3}", estimated as f64 / actual as f64);
            }
        }
        Ok(())
    }

    fn should_skip(&self, i: usize, j: usize) -> bool {
        self.skipping && self.truncator.skip(self.v1[i], self.v2[j])
    }

    /// Multiplies the `i`-th term of the first view by the `j`-th term of
    /// the second and inserts the result terms into `dest`. The filter is
    /// applied per result term unless skipping already subsumes it.
    fn multiply_pair_into(&self, i: usize, j: usize, dest: &mut Series<C, K>) -> Result<(), Error> {
        let product = self.v1[i].multiply(self.v2[j], dest.symbols());
        for term in product {
            if !self.skipping && self.filtering && self.truncator.filter(&term) {
                continue;
            }
            dest.insert(term)?;
        }
        Ok(())
    }

    /// Visits all index pairs in fixed-size square blocks, in the order
    /// full × full, full × remainder, remainder × full, remainder ×
    /// remainder. A skipping truncator breaks the innermost loop, which is
    /// valid because both views were sorted with its comparator.
    fn blocked_multiplication(&self, dest: &mut Series<C, K>) -> Result<(), Error> {
        let size1 = self.v1.len();
        let size2 = self.v2.len();
        let nblocks1 = size1 / BLOCK_SIZE;
        let nblocks2 = size2 / BLOCK_SIZE;
        let i_rem = nblocks1 * BLOCK_SIZE;
        let j_rem = nblocks2 * BLOCK_SIZE;
        for n1 in 0..nblocks1 {
            let i_start = n1 * BLOCK_SIZE;
            let i_end = i_start + BLOCK_SIZE;
            for n2 in 0..nblocks2 {
                let j_start = n2 * BLOCK_SIZE;
                let j_end = j_start + BLOCK_SIZE;
                for i in i_start..i_end {
                    for j in j_start..j_end {
                        if self.should_skip(i, j) {
                            break;
                        }
                        self.multiply_pair_into(i, j, dest)?;
                    }
                }
            }
            for i in i_start..i_end {
                for j in j_rem..size2 {
                    if self.should_skip(i, j) {
                        break;
                    }
                    self.multiply_pair_into(i, j, dest)?;
                }
            }
        }
        for n2 in 0..nblocks2 {
            let j_start = n2 * BLOCK_SIZE;
            let j_end = j_start + BLOCK_SIZE;
            for i in i_rem..size1 {
                for j in j_start..j_end {
                    if self.should_skip(i, j) {
                        break;
                    }
                    self.multiply_pair_into(i, j, dest)?;
                }
            }
        }
        for i in i_rem..size1 {
            for j in j_rem..size2 {
                if self.should_skip(i, j) {
                    break;
                }
                self.multiply_pair_into(i, j, dest)?;
            }
        }
        Ok(())
    }
}
