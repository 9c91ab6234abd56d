//! Failure conditions of series construction and multiplication.

/// Failure conditions reported by series operations.
///
/// Every failure aborts the whole operation and leaves the operands
/// untouched; nothing is retried, and no partially computed result is ever
/// observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The operands of a multiplication have different symbol sets.
    #[error("operands have different symbol sets")]
    SymbolSetMismatch,
    /// A term's key is not consistent with the series' symbol set.
    #[error("term is not compatible with the series symbol set")]
    IncompatibleTerm,
    /// Arithmetic overflow while sizing the workload or the result.
    #[error("arithmetic overflow while sizing the multiplication")]
    Overflow,
    /// A failure reported by the underlying term container.
    #[error(transparent)]
    Table(#[from] term_table::Error),
}
