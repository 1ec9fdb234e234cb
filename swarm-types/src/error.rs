//! Error types for beeswarm data.

use thiserror::Error;

/// Why an aggregate report carries no summary.
///
/// These are reportable conditions, not failures of the attack itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    /// Every node timed out or failed to connect.
    #[error("no node completed the attack")]
    NoNodeCompleted,

    /// Some nodes finished but none of them completed a request.
    #[error("nodes finished but completed no requests")]
    NoCompletedRequests,
}

/// A malformed `Name: value` header specification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// The entry has no `:` separator.
    #[error("header {0:?} is missing a ':' separator")]
    MissingSeparator(String),

    /// The entry has an empty name.
    #[error("header {0:?} has an empty name")]
    EmptyName(String),
}
