//! Shared test helpers for omni-trend.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use omni_trend::{BatchOp, LocalTrendStore, ScoreBound, TrendError, TrendResult, TrendStore};

/// Fixed clock reading used as "now" across deterministic tests.
pub fn fixed_now() -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(1_760_000_000, 0).ok_or_else(|| anyhow!("bad fixture time"))
}

/// Fresh in-process store behind the trait object the crate consumes.
pub fn local_store() -> Arc<LocalTrendStore> {
    Arc::new(LocalTrendStore::new())
}

/// Local store whose atomic batches can be switched to fail.
#[derive(Debug, Default)]
pub struct FlakyBatchStore {
    inner: LocalTrendStore,
    fail_batches: AtomicBool,
}

impl FlakyBatchStore {
    pub fn set_fail_batches(&self, fail: bool) {
        self.fail_batches.store(fail, Ordering::SeqCst);
    }
}

impl TrendStore for FlakyBatchStore {
    fn backend_name(&self) -> &'static str {
        "flaky"
    }

    fn increment_member_score(&self, key: &str, amount: f64, member: &str) -> TrendResult<f64> {
        self.inner.increment_member_score(key, amount, member)
    }

    fn set_member_score(&self, key: &str, score: f64, member: &str) -> TrendResult<()> {
        self.inner.set_member_score(key, score, member)
    }

    fn member_score(&self, key: &str, member: &str) -> TrendResult<f64> {
        self.inner.member_score(key, member)
    }

    fn top_by_score_desc(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> TrendResult<Vec<(String, f64)>> {
        self.inner.top_by_score_desc(key, start, stop)
    }

    fn remove_by_score_range(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> TrendResult<u64> {
        self.inner.remove_by_score_range(key, min, max)
    }

    fn plain_value(&self, key: &str) -> TrendResult<Option<String>> {
        self.inner.plain_value(key)
    }

    fn set_plain_value(&self, key: &str, value: &str) -> TrendResult<()> {
        self.inner.set_plain_value(key, value)
    }

    fn apply_batch(&self, ops: &[BatchOp]) -> TrendResult<()> {
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(TrendError::StoreUnavailable(
                "batch rejected by test store".to_string(),
            ));
        }
        self.inner.apply_batch(ops)
    }
}
