//! Hashing helpers shared by the table and its callers.
//!
//! The table itself never hashes anything; callers derive hashes up front
//! (and keep them for the low-level insertion paths) using these helpers.

use std::hash::{BuildHasher, BuildHasherDefault, Hash};

use zwohash::ZwoHasher;

/// The default build hasher used for term keys.
pub type DefaultBuildHasher = BuildHasherDefault<ZwoHasher>;

/// Computes the hash of a value using the default hasher.
#[inline]
pub fn hash_value<T: Hash>(value: T) -> u64 {
    DefaultBuildHasher::default().hash_one(value)
}

/// Computes the hash of a reference using the default hasher.
///
/// This forwards to [`hash_value`]. Restricting the argument to be a
/// reference is occasionally useful for type inference or for avoiding
/// warnings.
#[inline]
pub fn hash_ref<T: Hash>(value: &T) -> u64 {
    hash_value(value)
}
