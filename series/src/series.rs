//! Term collections over a shared symbol set.

use std::fmt;

use term_table::{hash::hash_ref, TermTable};

use crate::{
    error::Error,
    symbol_set::SymbolSet,
    term::{Coefficient, Key, Term},
};

/// Computes the table hash of a term, which is the hash of its key alone.
pub(crate) fn term_hash<C, K: Key>(term: &Term<C, K>) -> u64 {
    hash_ref(&term.key)
}

/// An unordered collection of unique-keyed terms over one symbol set.
///
/// No two stored terms have equal keys: inserting a term whose key is already
/// present merges the coefficients by addition, and erases the entry when the
/// accumulated term becomes ignorable. Insertion order is irrelevant and
/// iteration order is unspecified.
pub struct Series<C: Coefficient, K: Key> {
    table: TermTable<Term<C, K>>,
    symbols: SymbolSet,
}

impl<C: Coefficient, K: Key> Series<C, K> {
    /// Creates an empty series over `symbols`.
    pub fn new(symbols: SymbolSet) -> Self {
        Series {
            table: TermTable::new(),
            symbols,
        }
    }

    /// Creates a series over `symbols` from a sequence of terms, merging
    /// duplicate keys as it goes.
    pub fn from_terms(
        symbols: SymbolSet,
        terms: impl IntoIterator<Item = Term<C, K>>,
    ) -> Result<Self, Error> {
        let mut series = Series::new(symbols);
        for term in terms {
            series.insert(term)?;
        }
        Ok(series)
    }

    /// Returns the symbol set shared by all terms of this series.
    pub fn symbols(&self) -> &SymbolSet {
        &self.symbols
    }

    /// Returns the number of stored terms.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` when the series stores no terms.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Iterates over the stored terms in unspecified order.
    pub fn iter(&self) -> term_table::Iter<'_, Term<C, K>> {
        self.table.iter()
    }

    /// Returns the term stored under `key`, if any.
    pub fn find(&self, key: &K) -> Option<&Term<C, K>> {
        self.table.find(hash_ref(key), |term| &term.key == key)
    }

    /// Inserts `term`, accumulating into an existing term with an equal key.
    ///
    /// Incompatible terms are rejected with [`Error::IncompatibleTerm`];
    /// ignorable terms are dropped without touching the series, and an
    /// accumulation whose result becomes ignorable erases the entry.
    pub fn insert(&mut self, term: Term<C, K>) -> Result<(), Error> {
        if !term.is_compatible(&self.symbols) {
            return Err(Error::IncompatibleTerm);
        }
        if term.is_ignorable(&self.symbols) {
            return Ok(());
        }
        let hash = term_hash(&term);
        let mut removal_key = None;
        {
            let (entry, rejected) =
                self.table
                    .insert(hash, term, |a, b| a.key == b.key, term_hash)?;
            if let Some(duplicate) = rejected {
                entry.coefficient.add_assign(&duplicate.coefficient);
                if entry.is_ignorable(&self.symbols) {
                    removal_key = Some(duplicate.key);
                }
            }
        }
        if let Some(key) = removal_key {
            self.table.remove(hash, |t| t.key == key);
        }
        Ok(())
    }

    /// Removes all terms and releases the underlying storage.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub(crate) fn table(&self) -> &TermTable<Term<C, K>> {
        &self.table
    }

    pub(crate) fn drain_terms(&mut self) -> term_table::Drain<'_, Term<C, K>> {
        self.table.drain()
    }

    pub(crate) fn table_mut(&mut self) -> &mut TermTable<Term<C, K>> {
        &mut self.table
    }
}

impl<C: Coefficient, K: Key> Clone for Series<C, K> {
    fn clone(&self) -> Self {
        Series {
            table: self.table.clone(),
            symbols: self.symbols.clone(),
        }
    }
}

impl<C: Coefficient + PartialEq, K: Key> PartialEq for Series<C, K> {
    fn eq(&self, other: &Self) -> bool {
        self.symbols == other.symbols
            && self.len() == other.len()
            && self.iter().all(|term| {
                other
                    .find(&term.key)
                    .is_some_and(|found| found.coefficient == term.coefficient)
            })
    }
}

impl<C: Coefficient + fmt::Debug, K: Key + fmt::Debug> fmt::Debug for Series<C, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Series")
            .field("symbols", &self.symbols)
            .field("terms", &self.table)
            .finish()
    }
}
