//! Error types for the document engine.
//!
//! Catalog problems are configuration errors and abort start-up. Missing
//! document content is never an error at this level: the loader degrades to
//! placeholder text instead (see [`crate::loader`]).

use chrono::NaiveDate;
use thiserror::Error;

/// Top-level error returned by store, resolver, and engine operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("catalog configuration error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("document not found: {id}")]
    NotFound { id: String },

    #[error("invalid payslip period: month {month}, year {year}")]
    InvalidPeriod { month: u32, year: i32 },

    #[error("effective_to ({to}) is before effective_from ({from})")]
    InvertedWindow { from: NaiveDate, to: NaiveDate },
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// A version catalog that violates the validity-window rules.
///
/// Raised by [`VersionCatalog::register`](crate::catalog::VersionCatalog::register)
/// and never corrected silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("logical document key must not be empty")]
    EmptyKey,

    #[error("logical document '{0}' is already registered")]
    DuplicateKey(String),

    #[error("'{key}' lists version {version} more than once")]
    DuplicateVersion { key: String, version: String },

    #[error("'{key}' version {version} ends ({to}) before it starts ({from})")]
    InvertedWindow {
        key: String,
        version: String,
        from: NaiveDate,
        to: NaiveDate,
    },

    #[error("'{key}' has more than one open-ended version: {}", versions.join(", "))]
    MultipleOpenEnded { key: String, versions: Vec<String> },

    #[error("'{key}' version {first} overlaps version {second} (from {overlap_start})")]
    OverlappingWindows {
        key: String,
        first: String,
        second: String,
        overlap_start: NaiveDate,
    },
}

/// Failure reading a single text source.
///
/// `Missing` and `Unreadable` are kept apart so callers can tell an absent
/// file from a permissions or encoding problem.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source not found: {0}")]
    Missing(String),

    #[error("source unreadable: {source_ref}: {source}")]
    Unreadable {
        source_ref: String,
        #[source]
        source: std::io::Error,
    },
}
