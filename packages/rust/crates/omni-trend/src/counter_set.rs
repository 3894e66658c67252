//! Lazily decaying counter set.
//!
//! A set stores raw, undecayed scores. Decay is applied only when
//! [`CounterSet::all_scores`] runs: every member is multiplied by
//! `e^(-elapsed / lifetime)` and near-zero members are scrubbed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::encoding::{
    duration_from_seconds, duration_seconds, epoch_seconds, format_float, from_epoch_seconds,
    parse_float,
};
use crate::error::{TrendError, TrendResult};
use crate::observability::TrendEvent;
use crate::store::{BatchOp, ScoreBound, TrendStore};

/// Members whose decayed score falls below this are removed.
pub const SCRUB_THRESHOLD: f64 = 0.0001;

const LAST_DECAY_SUFFIX: &str = "_last_decay";
const LIFETIME_SUFFIX: &str = "_lifetime";

/// Handle to one named collection of decaying scores.
///
/// Holds only the name and a store reference; many handles may point at the
/// same underlying set.
#[derive(Clone)]
pub struct CounterSet {
    name: String,
    store: Arc<dyn TrendStore>,
}

impl std::fmt::Debug for CounterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterSet")
            .field("name", &self.name)
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

impl CounterSet {
    /// Handle for the set stored under `name`. Performs no store calls.
    pub fn new(name: impl Into<String>, store: Arc<dyn TrendStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// Set name (the sorted collection key).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key of the lifetime metadata value.
    #[must_use]
    pub fn lifetime_key(&self) -> String {
        format!("{}{LIFETIME_SUFFIX}", self.name)
    }

    /// Key of the last decay date metadata value.
    #[must_use]
    pub fn last_decay_key(&self) -> String {
        format!("{}{LAST_DECAY_SUFFIX}", self.name)
    }

    /// Persist the decay time constant.
    pub fn init_lifetime(&self, lifetime: TimeDelta) -> TrendResult<()> {
        if lifetime <= TimeDelta::zero() {
            return Err(TrendError::Validation(format!(
                "lifetime of set '{}' must be positive, got {lifetime}",
                self.name
            )));
        }
        let seconds = format_float(duration_seconds(lifetime)?)?;
        self.store.set_plain_value(&self.lifetime_key(), &seconds)
    }

    /// Persisted decay time constant.
    pub fn lifetime(&self) -> TrendResult<TimeDelta> {
        duration_from_seconds(self.lifetime_seconds()?)
    }

    fn lifetime_seconds(&self) -> TrendResult<f64> {
        let key = self.lifetime_key();
        let seconds = parse_float(&self.required_plain_value(&key)?)?;
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(TrendError::Decode(format!(
                "stored lifetime '{seconds}' at '{key}' is not positive"
            )));
        }
        Ok(seconds)
    }

    /// Persist the last applied decay instant.
    pub fn update_decay_date(&self, datetime: DateTime<Utc>) -> TrendResult<()> {
        let seconds = format_float(epoch_seconds(datetime))?;
        self.store.set_plain_value(&self.last_decay_key(), &seconds)
    }

    /// Last applied decay instant (microsecond precision).
    pub fn last_decay_date(&self) -> TrendResult<DateTime<Utc>> {
        let raw = self.required_plain_value(&self.last_decay_key())?;
        from_epoch_seconds(parse_float(&raw)?)
    }

    fn required_plain_value(&self, key: &str) -> TrendResult<String> {
        self.store.plain_value(key)?.ok_or_else(|| {
            TrendError::Decode(format!("missing metadata '{key}' for set '{}'", self.name))
        })
    }

    /// Increment `bin` by 1 now.
    pub fn incr(&self, bin: &str) -> TrendResult<bool> {
        self.incr_by(bin, 1.0, None)
    }

    /// Add `amount` to the raw score of `bin` as observed at `datetime`
    /// (defaults to now).
    ///
    /// Observations at or before the last decay date are dropped and
    /// `Ok(false)` is returned; the baseline already moved past them.
    pub fn incr_by(
        &self,
        bin: &str,
        amount: f64,
        datetime: Option<DateTime<Utc>>,
    ) -> TrendResult<bool> {
        if !amount.is_finite() {
            return Err(TrendError::Validation(format!(
                "increment amount for '{bin}' must be finite, got {amount}"
            )));
        }
        let datetime = datetime.unwrap_or_else(Utc::now);
        if !self.accepts(datetime)? {
            tracing::debug!(
                event = TrendEvent::IncrementRejectedStale.as_str(),
                set = %self.name,
                bin,
                observed_at = %datetime,
                "observation predates last decay; dropped"
            );
            return Ok(false);
        }
        self.store.increment_member_score(&self.name, amount, bin)?;
        Ok(true)
    }

    /// Whether an observation at `datetime` would be recorded.
    pub fn accepts(&self, datetime: DateTime<Utc>) -> TrendResult<bool> {
        let last = self.last_decay_date()?;
        Ok(datetime.timestamp_micros() > last.timestamp_micros())
    }

    /// Top `limit` entries by score, descending (`None` = all).
    ///
    /// Reflects whatever decay was last applied; it never decays by itself.
    pub fn fetch(&self, limit: Option<usize>) -> TrendResult<Vec<(String, f64)>> {
        let stop = match limit {
            None => -1,
            Some(0) => return Ok(Vec::new()),
            Some(count) => i64::try_from(count - 1).unwrap_or(i64::MAX),
        };
        self.store.top_by_score_desc(&self.name, 0, stop)
    }

    /// Decay to now, scrub, and return every remaining score.
    pub fn all_scores(&self) -> TrendResult<HashMap<String, f64>> {
        self.all_scores_at(Utc::now())
    }

    /// [`Self::all_scores`] against an explicit clock reading.
    pub fn all_scores_at(&self, now: DateTime<Utc>) -> TrendResult<HashMap<String, f64>> {
        self.decay(now)?;
        self.scrub()?;
        Ok(self.fetch(None)?.into_iter().collect())
    }

    fn decay(&self, now: DateTime<Utc>) -> TrendResult<()> {
        let last = self.last_decay_date()?;
        let lifetime = self.lifetime_seconds()?;
        // Clock skew must not move the decay date backward or grow scores.
        let next = now.max(last);
        let elapsed = elapsed_seconds(next - last);
        let factor = (-elapsed / lifetime).exp();

        let members = if elapsed > 0.0 { self.fetch(None)? } else { Vec::new() };
        let mut ops = Vec::with_capacity(members.len() + 1);
        for (member, score) in &members {
            ops.push(BatchOp::SetMemberScore {
                key: self.name.clone(),
                member: member.clone(),
                score: score * factor,
            });
        }
        ops.push(BatchOp::SetPlainValue {
            key: self.last_decay_key(),
            value: format_float(epoch_seconds(next))?,
        });

        if let Err(err) = self.store.apply_batch(&ops) {
            tracing::warn!(
                event = TrendEvent::DecayWriteFailed.as_str(),
                set = %self.name,
                backend = self.store.backend_name(),
                error = %err,
                "could not decay set"
            );
            return Err(TrendError::DecayWrite {
                set: self.name.clone(),
                source: Box::new(err),
            });
        }
        tracing::debug!(
            event = TrendEvent::DecayApplied.as_str(),
            set = %self.name,
            elapsed_secs = elapsed,
            factor,
            members = members.len(),
            "set decayed"
        );
        Ok(())
    }

    fn scrub(&self) -> TrendResult<u64> {
        let removed = self.store.remove_by_score_range(
            &self.name,
            ScoreBound::NegInfinity,
            ScoreBound::Exclusive(SCRUB_THRESHOLD),
        )?;
        if removed > 0 {
            tracing::debug!(
                event = TrendEvent::ScrubApplied.as_str(),
                set = %self.name,
                removed,
                "near-zero members scrubbed"
            );
        }
        Ok(removed)
    }
}

fn elapsed_seconds(delta: TimeDelta) -> f64 {
    delta.num_microseconds().map_or_else(
        || delta.num_milliseconds() as f64 / 1_000.0,
        |micros| micros as f64 / 1_000_000.0,
    )
}
