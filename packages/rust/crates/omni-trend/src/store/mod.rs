//! Ordered key-value store capabilities consumed by counter sets.
//!
//! Counter sets never talk to Valkey directly. They go through [`TrendStore`],
//! which has a Valkey-backed implementation and a local in-process one.

mod local;
mod valkey;

use crate::encoding::format_float;
use crate::error::TrendResult;

pub use local::LocalTrendStore;
pub use valkey::ValkeyTrendStore;

/// One end of a score range used by [`TrendStore::remove_by_score_range`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    /// Bound value is part of the range.
    Inclusive(f64),
    /// Bound value is excluded from the range.
    Exclusive(f64),
    /// `-inf`.
    NegInfinity,
    /// `+inf`.
    PosInfinity,
}

impl ScoreBound {
    /// Valkey range argument (`x`, `(x`, `-inf`, `+inf`).
    pub fn encode(self) -> TrendResult<String> {
        match self {
            Self::Inclusive(value) => format_float(value),
            Self::Exclusive(value) => Ok(format!("({}", format_float(value)?)),
            Self::NegInfinity => Ok("-inf".to_string()),
            Self::PosInfinity => Ok("+inf".to_string()),
        }
    }

    /// Whether `score` satisfies this bound used as a range minimum.
    #[must_use]
    pub fn admits_as_min(self, score: f64) -> bool {
        match self {
            Self::Inclusive(value) => score >= value,
            Self::Exclusive(value) => score > value,
            Self::NegInfinity => true,
            Self::PosInfinity => score == f64::INFINITY,
        }
    }

    /// Whether `score` satisfies this bound used as a range maximum.
    #[must_use]
    pub fn admits_as_max(self, score: f64) -> bool {
        match self {
            Self::Inclusive(value) => score <= value,
            Self::Exclusive(value) => score < value,
            Self::NegInfinity => score == f64::NEG_INFINITY,
            Self::PosInfinity => true,
        }
    }
}

/// A write submitted as part of an atomic [`TrendStore::apply_batch`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Set the absolute score of `member` in the sorted collection `key`.
    SetMemberScore {
        /// Collection key.
        key: String,
        /// Member name.
        member: String,
        /// Absolute score.
        score: f64,
    },
    /// Set a plain scalar value.
    SetPlainValue {
        /// Value key.
        key: String,
        /// Encoded value.
        value: String,
    },
}

/// Capability interface of the external ordered store.
///
/// Every call is synchronous. Implementations acquire whatever handle they
/// need per call and release it on every exit path.
pub trait TrendStore: Send + Sync {
    /// Backend identifier for logs.
    fn backend_name(&self) -> &'static str;

    /// Add `amount` to `member`'s score in `key`, creating it if absent.
    /// Returns the new raw score.
    fn increment_member_score(&self, key: &str, amount: f64, member: &str) -> TrendResult<f64>;

    /// Set `member`'s absolute score in `key`.
    fn set_member_score(&self, key: &str, score: f64, member: &str) -> TrendResult<()>;

    /// Current score of `member`. Absent members are a decode error.
    fn member_score(&self, key: &str, member: &str) -> TrendResult<f64>;

    /// Members ranked by descending score between rank `start` and `stop`
    /// (inclusive, negative ranks count from the end; `-1` = last).
    fn top_by_score_desc(&self, key: &str, start: i64, stop: i64)
    -> TrendResult<Vec<(String, f64)>>;

    /// Remove members whose score lies within `[min, max]` under the given
    /// bound kinds. Returns how many were removed.
    fn remove_by_score_range(&self, key: &str, min: ScoreBound, max: ScoreBound)
    -> TrendResult<u64>;

    /// Read a plain scalar value.
    fn plain_value(&self, key: &str) -> TrendResult<Option<String>>;

    /// Write a plain scalar value.
    fn set_plain_value(&self, key: &str, value: &str) -> TrendResult<()>;

    /// Apply every op as one atomic unit: either all become visible or none.
    fn apply_batch(&self, ops: &[BatchOp]) -> TrendResult<()>;
}

/// Resolve Valkey-style inclusive rank bounds against a collection length.
pub(crate) fn resolve_rank_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len_i64 = i64::try_from(len).ok()?;
    let start = if start < 0 { (len_i64 + start).max(0) } else { start };
    let stop = if stop < 0 { len_i64 + stop } else { stop.min(len_i64 - 1) };
    if len_i64 == 0 || start > stop || start >= len_i64 || stop < 0 {
        return None;
    }
    Some((usize::try_from(start).ok()?, usize::try_from(stop).ok()?))
}
