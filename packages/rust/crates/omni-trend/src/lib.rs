//! omni-trend - Time-decaying trend counters over Valkey sorted sets.
//!
//! Tracks "how hot is this key right now relative to its usual rate":
//! - Counter sets with lazy exponential decay and near-zero scrubbing
//! - Deltas pairing a fast primary set with a slower baseline set
//! - Replay anchoring for backfilling historical observations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TrendTable / Delta                       │
//! │  - incr_by → both counter sets                              │
//! │  - scores  → primary / secondary per key                    │
//! └─────────────────────────────────────────────────────────────┘
//!                             │
//!                             ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CounterSet                               │
//! │  - raw increments, stale-observation guard                  │
//! │  - decay on read (atomic batch), scrub                      │
//! └─────────────────────────────────────────────────────────────┘
//!                             │
//!                             ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TrendStore                               │
//! │  - ValkeyTrendStore (ZINCRBY / ZREVRANGE / MULTI)           │
//! │  - LocalTrendStore (in-process)                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust
//! use chrono::{TimeDelta, Utc};
//! use omni_trend::TrendTable;
//!
//! # fn main() -> omni_trend::TrendResult<()> {
//! let table = TrendTable::local();
//! let delta = table.create_delta("favorites", TimeDelta::hours(168), None, true)?;
//! delta.incr_by("art_1", 1.0, Some(Utc::now() - TimeDelta::days(1)))?;
//! delta.incr("art_1")?;
//!
//! let scores = delta.scores()?;
//! assert!(scores["art_1"] > 0.0);
//! # Ok(())
//! # }
//! ```

mod config;
mod counter_set;
mod delta;
mod encoding;
mod error;
mod observability;
mod store;
mod table;

pub use config::{
    DEFAULT_TREND_KEY_PREFIX, DeltaSpec, TREND_VALKEY_KEY_PREFIX_ENV, TREND_VALKEY_URL_ENV,
    TrendRuntimeConfig, parse_delta_specs_yaml,
};
pub use counter_set::{CounterSet, SCRUB_THRESHOLD};
pub use delta::{Delta, NORM_TIME_MULT, secondary_key_for};
pub use encoding::{float_pairs, format_float, parse_float};
pub use error::{TrendError, TrendResult};
pub use observability::TrendEvent;
pub use store::{BatchOp, LocalTrendStore, ScoreBound, TrendStore, ValkeyTrendStore};
pub use table::TrendTable;
