//! Error types for trend counters.
//!
//! Follows ODF-REP: Library crates use `thiserror` for explicit error enums.

use thiserror::Error;

/// Result alias used across the crate.
pub type TrendResult<T> = Result<T, TrendError>;

/// Error types for counter sets, deltas and store adapters.
#[derive(Error, Debug)]
pub enum TrendError {
    /// Caller supplied an invalid argument. Nothing was written.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Valkey/Redis command failed.
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    /// Store adapter could not serve the request (e.g. poisoned local state).
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Store reply could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Delta definitions could not be parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// The batched score rewrite of a decay pass failed.
    ///
    /// The set's last decay date is left untouched.
    #[error("Decay write failed for set '{set}': {source}")]
    DecayWrite {
        /// Name of the counter set being decayed.
        set: String,
        /// Underlying store failure.
        #[source]
        source: Box<TrendError>,
    },
}

impl TrendError {
    /// Whether this error came from the store rather than from the caller.
    #[must_use]
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::StoreUnavailable(_) | Self::DecayWrite { .. }
        )
    }
}
