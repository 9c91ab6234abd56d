//! Ordered symbol sets shared by all terms of a series.

use std::{fmt, sync::Arc};

/// An ordered, deduplicated sequence of symbol names.
///
/// Every series holds one symbol set, and a term's key is only meaningful
/// relative to it. The names live behind an [`Arc`] so cloning a set into a
/// result series is cheap. Two sets compare equal only when they hold the
/// same names in the same order; a permutation of the same names is a
/// different set.
#[derive(Clone, PartialEq, Eq)]
pub struct SymbolSet {
    names: Arc<[Box<str>]>,
}

impl SymbolSet {
    /// Creates a symbol set from `names`, sorting and deduplicating them.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Box<str>>,
    {
        let mut names: Vec<Box<str>> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        SymbolSet {
            names: names.into(),
        }
    }

    /// Creates the empty symbol set.
    pub fn empty() -> Self {
        SymbolSet {
            names: Arc::from([]),
        }
    }

    /// Returns the number of symbols.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` when the set holds no symbols.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the ordered symbol names.
    pub fn names(&self) -> &[Box<str>] {
        &self.names
    }

    /// Returns the position of `name` within the set, if present.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.binary_search_by(|n| n.as_ref().cmp(name)).ok()
    }
}

impl fmt::Debug for SymbolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names.iter()).finish()
    }
}
