//! Terms and the coefficient/key operation contracts.

use std::hash::Hash;

use crate::symbol_set::SymbolSet;

/// Operation contract for series coefficients.
///
/// Coefficients are opaque to the engine: it only ever adds them when two
/// product terms collide on the same key, multiplies them term by term, and
/// drops terms whose coefficient reports zero. Accumulation must be
/// commutative and associative, since the engine gives no guarantee about
/// the order in which colliding products are folded together.
pub trait Coefficient: Clone {
    /// Adds `rhs` into `self`.
    fn add_assign(&mut self, rhs: &Self);

    /// Returns the product of `self` and `rhs`.
    fn mul(&self, rhs: &Self) -> Self;

    /// Returns `true` when the coefficient is the additive identity.
    fn is_zero(&self) -> bool;
}

macro_rules! impl_coefficient_for_int {
    ($($ty:ty),*) => {
        $(
            impl Coefficient for $ty {
                fn add_assign(&mut self, rhs: &Self) {
                    *self += *rhs;
                }

                fn mul(&self, rhs: &Self) -> Self {
                    *self * *rhs
                }

                fn is_zero(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

impl_coefficient_for_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128);

macro_rules! impl_coefficient_for_float {
    ($($ty:ty),*) => {
        $(
            impl Coefficient for $ty {
                fn add_assign(&mut self, rhs: &Self) {
                    *self += *rhs;
                }

                fn mul(&self, rhs: &Self) -> Self {
                    *self * *rhs
                }

                fn is_zero(&self) -> bool {
                    *self == 0.0
                }
            }
        )*
    };
}

impl_coefficient_for_float!(f32, f64);

/// Operation contract for term keys.
///
/// A key identifies a term within its series (hashing and equality are by
/// key alone) and defines the term-by-term product. The product has a fixed
/// arity known per key type: a monomial product yields one term, while keys
/// with product-to-sum identities yield a fixed-size array of terms.
pub trait Key: Clone + Eq + Hash {
    /// Number of terms produced by one key-by-key product.
    const ARITY: usize;

    /// Result of a term-by-term product, typically `[Term<C, Self>; ARITY]`.
    type Product<C: Coefficient>: IntoIterator<Item = Term<C, Self>>;

    /// Multiplies two terms over `symbols`, producing [`ARITY`][Self::ARITY]
    /// result terms.
    fn multiply<C: Coefficient>(
        lhs: &Term<C, Self>,
        rhs: &Term<C, Self>,
        symbols: &SymbolSet,
    ) -> Self::Product<C>;

    /// Returns `true` when the key is consistent with `symbols`.
    fn is_compatible(&self, symbols: &SymbolSet) -> bool;

    /// Returns `true` when a term with this key is structurally zero
    /// regardless of its coefficient.
    fn is_ignorable(&self, symbols: &SymbolSet) -> bool {
        let _ = symbols;
        false
    }
}

/// A single coefficient/key pair of a series.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Term<C, K> {
    /// The numeric or symbolic value carried by the term.
    pub coefficient: C,
    /// The term's identity relative to the owning series' symbol set.
    pub key: K,
}

impl<C: Coefficient, K: Key> Term<C, K> {
    /// Creates a term from a coefficient and a key.
    pub fn new(coefficient: C, key: K) -> Self {
        Term { coefficient, key }
    }

    /// Returns `true` when the term's key is consistent with `symbols`.
    pub fn is_compatible(&self, symbols: &SymbolSet) -> bool {
        self.key.is_compatible(symbols)
    }

    /// Returns `true` when the term contributes nothing and may be dropped.
    pub fn is_ignorable(&self, symbols: &SymbolSet) -> bool {
        self.coefficient.is_zero() || self.key.is_ignorable(symbols)
    }

    /// Multiplies `self` by `rhs` over `symbols`.
    pub fn multiply(&self, rhs: &Self, symbols: &SymbolSet) -> K::Product<C> {
        K::multiply(self, rhs, symbols)
    }
}
