//! Polynomial instantiation: exponent-vector keys and degree truncation.

use std::cmp::Ordering;

use crate::{
    symbol_set::SymbolSet,
    term::{Coefficient, Key, Term},
    truncate::Truncator,
};

/// A monomial key: one exponent per symbol of the owning series.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Monomial {
    exponents: Box<[u32]>,
}

impl Monomial {
    /// Creates a key from an exponent vector.
    pub fn new(exponents: impl Into<Box<[u32]>>) -> Self {
        Monomial {
            exponents: exponents.into(),
        }
    }

    /// Creates the unit key (all exponents zero) for `len` symbols.
    pub fn unit(len: usize) -> Self {
        Monomial {
            exponents: vec![0; len].into(),
        }
    }

    /// Returns the exponent vector.
    pub fn exponents(&self) -> &[u32] {
        &self.exponents
    }

    /// Returns the sum of all exponents.
    pub fn total_degree(&self) -> u64 {
        self.exponents.iter().map(|&e| e as u64).sum()
    }
}

impl Key for Monomial {
    const ARITY: usize = 1;

    type Product<C: Coefficient> = [Term<C, Monomial>; 1];

    fn multiply<C: Coefficient>(
        lhs: &Term<C, Self>,
        rhs: &Term<C, Self>,
        _symbols: &SymbolSet,
    ) -> [Term<C, Monomial>; 1] {
        debug_assert_eq!(lhs.key.exponents.len(), rhs.key.exponents.len());
        let exponents: Box<[u32]> = lhs
            .key
            .exponents
            .iter()
            .zip(rhs.key.exponents.iter())
            .map(|(a, b)| a.checked_add(*b).expect("monomial exponent overflow"))
            .collect();
        [Term::new(
            lhs.coefficient.mul(&rhs.coefficient),
            Monomial { exponents },
        )]
    }

    fn is_compatible(&self, symbols: &SymbolSet) -> bool {
        self.exponents.len() == symbols.len()
    }
}

/// Truncator dropping every term whose total degree exceeds a limit.
///
/// Total degree is monotone under monomial multiplication, so the truncator
/// is both skipping (sort by degree, break once the degrees of a pair exceed
/// the limit) and filtering.
#[derive(Clone, Copy, Debug)]
pub struct DegreeTruncator {
    limit: u64,
}

impl DegreeTruncator {
    /// Creates a truncator keeping terms of total degree at most `limit`.
    pub fn new(limit: u64) -> Self {
        DegreeTruncator { limit }
    }

    /// Returns the degree limit.
    pub fn limit(&self) -> u64 {
        self.limit
    }
}

impl<C: Coefficient> Truncator<C, Monomial> for DegreeTruncator {
    fn is_active(&self) -> bool {
        true
    }

    fn is_skipping(&self) -> bool {
        true
    }

    fn is_filtering(&self) -> bool {
        true
    }

    fn compare_terms(&self, lhs: &Term<C, Monomial>, rhs: &Term<C, Monomial>) -> Ordering {
        lhs.key.total_degree().cmp(&rhs.key.total_degree())
    }

    fn skip(&self, lhs: &Term<C, Monomial>, rhs: &Term<C, Monomial>) -> bool {
        lhs.key.total_degree() + rhs.key.total_degree() > self.limit
    }

    fn filter(&self, term: &Term<C, Monomial>) -> bool {
        term.key.total_degree() > self.limit
    }
}
