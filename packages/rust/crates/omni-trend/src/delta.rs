//! Trend deltas: a fast primary set normalized by a slower secondary set.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::counter_set::CounterSet;
use crate::error::{TrendError, TrendResult};
use crate::observability::TrendEvent;
use crate::store::TrendStore;

/// Ratio between the secondary and primary set lifetimes.
pub const NORM_TIME_MULT: i32 = 2;

/// Secondary set key for a delta named `name`.
#[must_use]
pub fn secondary_key_for(name: &str) -> String {
    format!("{name}_{NORM_TIME_MULT}t")
}

/// Describes a trend using two counter sets over the same observations.
///
/// The primary decays with the configured lifetime, the secondary with
/// `lifetime * NORM_TIME_MULT`. Their per-key ratio is the trend score.
#[derive(Debug, Clone)]
pub struct Delta {
    name: String,
    primary: CounterSet,
    secondary: CounterSet,
}

impl Delta {
    /// Create (or reinitialize) a delta anchored at `anchor` (default now).
    ///
    /// With `replay`, the anchor is forced one lifetime into the past so that
    /// backdated observations still land inside the decay window.
    pub fn create(
        store: Arc<dyn TrendStore>,
        name: impl Into<String>,
        lifetime: TimeDelta,
        anchor: Option<DateTime<Utc>>,
        replay: bool,
    ) -> TrendResult<Self> {
        Self::create_at(store, name, lifetime, anchor, replay, Utc::now())
    }

    /// [`Self::create`] against an explicit clock reading.
    pub fn create_at(
        store: Arc<dyn TrendStore>,
        name: impl Into<String>,
        lifetime: TimeDelta,
        anchor: Option<DateTime<Utc>>,
        replay: bool,
        now: DateTime<Utc>,
    ) -> TrendResult<Self> {
        let name = name.into();
        let plan = match plan_anchors(&name, lifetime, anchor, replay, now) {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!(
                    event = TrendEvent::DeltaCreateRejected.as_str(),
                    delta = %name,
                    error = %err,
                    "delta creation rejected"
                );
                return Err(err);
            }
        };

        let delta = Self::open(store, name);
        delta.primary.init_lifetime(plan.primary_lifetime)?;
        delta.primary.update_decay_date(plan.primary_anchor)?;
        delta.secondary.init_lifetime(plan.secondary_lifetime)?;
        delta.secondary.update_decay_date(plan.secondary_anchor)?;
        tracing::debug!(
            event = TrendEvent::DeltaCreated.as_str(),
            delta = %delta.name,
            lifetime_secs = plan.primary_lifetime.num_seconds(),
            primary_anchor = %plan.primary_anchor,
            secondary_anchor = %plan.secondary_anchor,
            replay,
            "delta created"
        );
        Ok(delta)
    }

    /// Handle to an existing delta. Performs no store calls.
    pub fn open(store: Arc<dyn TrendStore>, name: impl Into<String>) -> Self {
        let name = name.into();
        let primary = CounterSet::new(name.clone(), Arc::clone(&store));
        let secondary = CounterSet::new(secondary_key_for(&name), store);
        Self {
            name,
            primary,
            secondary,
        }
    }

    /// Delta name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary set key (the delta name).
    #[must_use]
    pub fn primary_key(&self) -> &str {
        self.primary.name()
    }

    /// Secondary set key (`<name>_2t`).
    #[must_use]
    pub fn secondary_key(&self) -> &str {
        self.secondary.name()
    }

    /// Fast-decaying set.
    #[must_use]
    pub fn primary(&self) -> &CounterSet {
        &self.primary
    }

    /// Slow-decaying baseline set.
    #[must_use]
    pub fn secondary(&self) -> &CounterSet {
        &self.secondary
    }

    /// Record one observation of `bin` now.
    pub fn incr(&self, bin: &str) -> TrendResult<()> {
        self.incr_by(bin, 1.0, None)
    }

    /// Record `amount` for `bin` at `datetime` (defaults to now) in both sets.
    ///
    /// Each set applies its own stale-observation guard.
    pub fn incr_by(
        &self,
        bin: &str,
        amount: f64,
        datetime: Option<DateTime<Utc>>,
    ) -> TrendResult<()> {
        let datetime = datetime.unwrap_or_else(Utc::now);
        self.primary.incr_by(bin, amount, Some(datetime))?;
        self.secondary.incr_by(bin, amount, Some(datetime))?;
        Ok(())
    }

    /// Trend score per key: primary score over secondary score, or `0` when
    /// there is no baseline yet.
    pub fn scores(&self) -> TrendResult<HashMap<String, f64>> {
        self.scores_at(Utc::now())
    }

    /// [`Self::scores`] against an explicit clock reading.
    pub fn scores_at(&self, now: DateTime<Utc>) -> TrendResult<HashMap<String, f64>> {
        let counts = self.primary.all_scores_at(now)?;
        let norm = self.secondary.all_scores_at(now)?;
        Ok(counts
            .into_iter()
            .map(|(bin, count)| {
                let baseline = norm.get(&bin).copied().unwrap_or(0.0);
                let ratio = if baseline == 0.0 { 0.0 } else { count / baseline };
                (bin, ratio)
            })
            .collect())
    }

    /// Highest `limit` trend scores, descending, ties ordered by key.
    pub fn top_scores(&self, limit: usize) -> TrendResult<Vec<(String, f64)>> {
        self.top_scores_at(limit, Utc::now())
    }

    /// [`Self::top_scores`] against an explicit clock reading.
    pub fn top_scores_at(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> TrendResult<Vec<(String, f64)>> {
        let mut ranked: Vec<(String, f64)> = self.scores_at(now)?.into_iter().collect();
        ranked.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        ranked.truncate(limit);
        Ok(ranked)
    }
}

struct AnchorPlan {
    primary_lifetime: TimeDelta,
    primary_anchor: DateTime<Utc>,
    secondary_lifetime: TimeDelta,
    secondary_anchor: DateTime<Utc>,
}

fn plan_anchors(
    name: &str,
    lifetime: TimeDelta,
    anchor: Option<DateTime<Utc>>,
    replay: bool,
    now: DateTime<Utc>,
) -> TrendResult<AnchorPlan> {
    if name.trim().is_empty() {
        return Err(TrendError::Validation(
            "delta name must be non-empty".to_string(),
        ));
    }
    if lifetime <= TimeDelta::zero() {
        return Err(TrendError::Validation(
            "mean lifetime of an observation must be set to a positive number".to_string(),
        ));
    }
    let out_of_range =
        || TrendError::Validation(format!("anchor for delta '{name}' is out of range"));

    let primary_anchor = if replay {
        now.checked_sub_signed(lifetime).ok_or_else(out_of_range)?
    } else {
        anchor.unwrap_or(now)
    };
    // The secondary starts further in the past so it behaves as an already
    // warm, longer-window baseline for retrospective observations.
    let secondary_anchor = (now - primary_anchor)
        .checked_mul(NORM_TIME_MULT)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(out_of_range)?;
    let secondary_lifetime = lifetime
        .checked_mul(NORM_TIME_MULT)
        .ok_or_else(|| TrendError::Validation(format!("lifetime for delta '{name}' overflows")))?;

    Ok(AnchorPlan {
        primary_lifetime: lifetime,
        primary_anchor,
        secondary_lifetime,
        secondary_anchor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> TrendResult<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(1_760_000_000, 0)
            .ok_or_else(|| TrendError::Validation("bad fixture".to_string()))
    }

    #[test]
    fn secondary_key_uses_multiplier_suffix() {
        assert_eq!(secondary_key_for("favorites"), "favorites_2t");
    }

    #[test]
    fn plan_anchors_doubles_offset_for_secondary() -> TrendResult<()> {
        let now = fixed_now()?;
        let anchor = now - TimeDelta::hours(3);
        let plan = plan_anchors("d", TimeDelta::hours(1), Some(anchor), false, now)?;
        assert_eq!(plan.primary_anchor, anchor);
        assert_eq!(plan.secondary_anchor, now - TimeDelta::hours(6));
        assert_eq!(plan.secondary_lifetime, TimeDelta::hours(2));
        Ok(())
    }

    #[test]
    fn plan_anchors_defaults_to_now() -> TrendResult<()> {
        let now = fixed_now()?;
        let plan = plan_anchors("d", TimeDelta::minutes(5), None, false, now)?;
        assert_eq!(plan.primary_anchor, now);
        assert_eq!(plan.secondary_anchor, now);
        Ok(())
    }

    #[test]
    fn plan_anchors_rejects_blank_name() -> TrendResult<()> {
        let now = fixed_now()?;
        let result = plan_anchors("  ", TimeDelta::hours(1), None, false, now);
        assert!(matches!(result, Err(TrendError::Validation(_))));
        Ok(())
    }
}
