//! The multi-threaded multiplication path and its sharded final merge.
//!
//! Workers first produce private partial products with no shared mutable
//! state at all. The partials are then combined into one destination whose
//! bucket index space is statically partitioned: each worker owns a disjoint
//! contiguous bucket range, receives exactly the terms routed to that range,
//! and splices them in through plain `&mut` access to its shard. Worker
//! failures are observed only at the join barriers; the first recorded
//! failure wins and every partial result is discarded before it surfaces.

use std::panic;

use term_table::split_chunks;

use crate::{
    error::Error,
    series::{term_hash, Series},
    symbol_set::SymbolSet,
    term::{Coefficient, Key, Term},
    truncate::Truncator,
};

use super::{estimate, MulCtx, IN_WORKER};

pub(super) fn multiply_parallel<C, K, T>(
    ctx: &MulCtx<'_, C, K, T>,
    symbols: SymbolSet,
    workers: usize,
) -> Result<Series<C, K>, Error>
where
    C: Coefficient + Send + Sync,
    K: Key + Send + Sync,
    T: Truncator<C, K> + Sync,
{
    debug_assert!(workers >= 2 && workers <= ctx.v1.len());
    let size1 = ctx.v1.len();
    let block = size1 / workers;

    // Multiply phase: every worker runs the full single-destination pipeline
    // on its contiguous block of the first operand, against the entire
    // second operand. The last block absorbs the division remainder.
    let joined: Vec<_> = std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for w in 0..workers {
            let start = w * block;
            let end = if w == workers - 1 { size1 } else { start + block };
            let symbols = symbols.clone();
            handles.push(scope.spawn(move || -> Result<Series<C, K>, Error> {
                IN_WORKER.with(|flag| flag.set(true));
                let mut block_ctx = *ctx;
                block_ctx.v1 = &ctx.v1[start..end];
                let mut dest = Series::new(symbols);
                block_ctx.multiply_into(&mut dest)?;
                Ok(dest)
            }));
        }
        handles.into_iter().map(|handle| handle.join()).collect()
    });
    let partials = collect_worker_results(joined)?;
    merge_partials(ctx, symbols, workers, partials)
}

/// Observes worker outcomes after a join barrier.
///
/// The first panic payload is resumed on the calling thread; otherwise the
/// first error is returned. Either way every sibling result is discarded.
fn collect_worker_results<V>(
    joined: Vec<std::thread::Result<Result<V, Error>>>,
) -> Result<Vec<V>, Error> {
    let mut values = Vec::with_capacity(joined.len());
    let mut first_error = None;
    let mut first_panic = None;
    for outcome in joined {
        match outcome {
            Ok(Ok(value)) => values.push(value),
            Ok(Err(err)) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
            Err(payload) => {
                if first_panic.is_none() {
                    first_panic = Some(payload);
                }
            }
        }
    }
    if let Some(payload) = first_panic {
        drop(values);
        panic::resume_unwind(payload);
    }
    if let Some(err) = first_error {
        return Err(err);
    }
    Ok(values)
}

fn merge_partials<C, K, T>(
    ctx: &MulCtx<'_, C, K, T>,
    symbols: SymbolSet,
    workers: usize,
    mut partials: Vec<Series<C, K>>,
) -> Result<Series<C, K>, Error>
where
    C: Coefficient + Send + Sync,
    K: Key + Send + Sync,
    T: Truncator<C, K> + Sync,
{
    // One representative estimation pass sizes the final destination; at
    // least one bucket so the low-level bucket paths below are valid.
    let estimated = estimate::estimate_product_size(ctx, &symbols)?.max(1);

    // Reuse a partial destination that already has enough buckets for the
    // estimate, or allocate and size a fresh one.
    let reusable = partials.iter().position(|partial| {
        partial.table().bucket_count() as f64 * partial.table().max_load_factor()
            >= estimated as f64
    });
    let mut dest = match reusable {
        Some(index) => partials.swap_remove(index),
        None => {
            let mut fresh = Series::new(symbols.clone());
            let buckets = (estimated as f64 / fresh.table().max_load_factor()).ceil() as usize;
            fresh.table_mut().rehash(buckets, term_hash)?;
            fresh
        }
    };
    let bucket_count = dest.table().bucket_count();
    debug_assert!(bucket_count.is_power_of_two());
    let mask = bucket_count - 1;
    let shards = workers.min(bucket_count);
    let shard_len = bucket_count / shards;

    // Bin phase: drain every remaining partial in parallel, routing each
    // term, tagged with its destination bucket index, to the shard owning
    // that index.
    let joined: Vec<_> = std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(partials.len());
        for mut partial in partials.drain(..) {
            handles.push(scope.spawn(move || {
                let mut bins: Vec<Vec<(usize, Term<C, K>)>> =
                    (0..shards).map(|_| Vec::new()).collect();
                for term in partial.drain_terms() {
                    let bucket_index = term_hash(&term) as usize & mask;
                    let shard = (bucket_index / shard_len).min(shards - 1);
                    bins[shard].push((bucket_index, term));
                }
                bins
            }));
        }
        handles.into_iter().map(|handle| handle.join()).collect()
    });
    let mut all_bins = Vec::with_capacity(joined.len());
    let mut first_panic = None;
    for outcome in joined {
        match outcome {
            Ok(bins) => all_bins.push(bins),
            Err(payload) => {
                if first_panic.is_none() {
                    first_panic = Some(payload);
                }
            }
        }
    }
    if let Some(payload) = first_panic {
        drop(all_bins);
        dest.clear();
        panic::resume_unwind(payload);
    }

    // Transpose so each shard worker receives its column of bins from every
    // partial.
    let mut columns: Vec<Vec<Vec<(usize, Term<C, K>)>>> =
        (0..shards).map(|_| Vec::new()).collect();
    for bins in all_bins {
        for (shard, bin) in bins.into_iter().enumerate() {
            columns[shard].push(bin);
        }
    }

    // Insert phase: each worker gets exclusive `&mut` access to its
    // contiguous bucket range (disjoint slices by construction) plus
    // ownership of the terms routed there. New keys are spliced in, existing
    // keys accumulate in place and are removed when they become ignorable;
    // every worker tracks its own net size delta.
    let symbols_ref = &symbols;
    let deltas: Vec<std::thread::Result<isize>> = {
        let chunks = split_chunks(dest.table_mut().buckets_mut(), shards);
        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(shards);
            let mut start = 0;
            for (chunk, column) in chunks.into_iter().zip(columns) {
                let chunk_start = start;
                start += chunk.len();
                handles.push(scope.spawn(move || -> isize {
                    let mut delta = 0isize;
                    for bin in column {
                        for (bucket_index, term) in bin {
                            let bucket = &mut chunk[bucket_index - chunk_start];
                            let merged = match bucket.find_mut(|t| t.key == term.key) {
                                Some(existing) => {
                                    existing.coefficient.add_assign(&term.coefficient);
                                    true
                                }
                                None => false,
                            };
                            if merged {
                                let cancelled = bucket
                                    .find(|t| t.key == term.key)
                                    .is_some_and(|t| t.is_ignorable(symbols_ref));
                                if cancelled {
                                    bucket.remove_where(|t| t.key == term.key);
                                    delta -= 1;
                                }
                            } else {
                                bucket.push_front(term);
                                delta += 1;
                            }
                        }
                    }
                    delta
                }));
            }
            handles.into_iter().map(|handle| handle.join()).collect()
        })
    };
    let mut net = 0isize;
    let mut first_panic = None;
    for outcome in deltas {
        match outcome {
            Ok(delta) => net += delta,
            Err(payload) => {
                if first_panic.is_none() {
                    first_panic = Some(payload);
                }
            }
        }
    }
    if let Some(payload) = first_panic {
        dest.clear();
        panic::resume_unwind(payload);
    }
    dest.table_mut().adjust_size_by(net);

    let actual = dest.len();
    log::debug!(
        "merge estimate={estimated} actual={actual} held={}",
        estimated >= actual
    );

    // One closing rehash when the low-level insertions overshot the bound.
    if dest.table().load_factor() > dest.table().max_load_factor() {
        let buckets = (actual as f64 / dest.table().max_load_factor()).ceil() as usize;
        dest.table_mut().rehash(buckets, term_hash)?;
    }
    Ok(dest)
}
