//! The truncator contract consumed by the multiplication engine.

use std::cmp::Ordering;

use crate::term::{Coefficient, Key, Term};

/// Policy object pruning terms and term pairs during a multiplication.
///
/// A truncator is bound to a pair of operand series by the caller and queried
/// by the engine in three capacities:
///
/// - a *skipping* truncator imposes a term ordering
///   ([`compare_terms`][Self::compare_terms]) under which
///   [`skip`][Self::skip] is monotone in both arguments, letting the engine
///   sort the operands once and break out of its inner loops early;
/// - a *filtering* truncator discards individual result terms
///   ([`filter`][Self::filter]) before they are inserted;
/// - an inactive truncator is ignored entirely, avoiding all per-pair
///   overhead.
///
/// When a truncator is skipping, the engine assumes the skip criterion
/// subsumes filtering and does not additionally call `filter` on the terms it
/// inserts.
pub trait Truncator<C: Coefficient, K: Key> {
    /// Returns `true` when the truncator prunes anything at all.
    fn is_active(&self) -> bool;

    /// Returns `true` when the truncator imposes an ordering for early
    /// pruning.
    fn is_skipping(&self) -> bool {
        false
    }

    /// Returns `true` when the truncator discards individual result terms.
    fn is_filtering(&self) -> bool {
        false
    }

    /// Orders terms for the skip criterion.
    fn compare_terms(&self, lhs: &Term<C, K>, rhs: &Term<C, K>) -> Ordering {
        let _ = (lhs, rhs);
        Ordering::Equal
    }

    /// Returns `true` when the product of `lhs` and `rhs`, and of every later
    /// pair under the sort order, can be pruned.
    fn skip(&self, lhs: &Term<C, K>, rhs: &Term<C, K>) -> bool {
        let _ = (lhs, rhs);
        false
    }

    /// Returns `true` when the result term `term` is to be discarded.
    fn filter(&self, term: &Term<C, K>) -> bool {
        let _ = term;
        false
    }
}

/// The inactive truncator: multiplication without any pruning.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTruncation;

impl<C: Coefficient, K: Key> Truncator<C, K> for NoTruncation {
    fn is_active(&self) -> bool {
        false
    }
}
