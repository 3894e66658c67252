//! Valkey/Redis-backed trend store.

use super::{BatchOp, ScoreBound, TrendStore};
use crate::config::TrendRuntimeConfig;
use crate::encoding::{float_pairs, format_float, parse_float};
use crate::error::{TrendError, TrendResult};

/// Valkey-backed trend store (sorted sets for scores, strings for metadata).
///
/// A connection is opened per call and dropped when the call returns.
pub struct ValkeyTrendStore {
    client: redis::Client,
    key_prefix: Option<String>,
}

impl std::fmt::Debug for ValkeyTrendStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValkeyTrendStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl ValkeyTrendStore {
    /// Create a Valkey trend store. Every key is namespaced as
    /// `<key_prefix>:<key>` when a non-empty prefix is given.
    pub fn new(valkey_url: impl AsRef<str>, key_prefix: Option<&str>) -> TrendResult<Self> {
        let valkey_url = valkey_url.as_ref().trim();
        if valkey_url.is_empty() {
            return Err(TrendError::Validation(
                "trend store valkey_url must be non-empty".to_string(),
            ));
        }
        let client = redis::Client::open(valkey_url)?;
        let key_prefix = key_prefix
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Ok(Self { client, key_prefix })
    }

    /// Create a store from resolved runtime config.
    pub fn from_config(config: &TrendRuntimeConfig) -> TrendResult<Self> {
        Self::new(&config.valkey_url, Some(&config.key_prefix))
    }

    /// Key prefix applied to every store key, if any.
    #[must_use]
    pub fn key_prefix(&self) -> Option<&str> {
        self.key_prefix.as_deref()
    }

    fn store_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}:{key}"),
            None => key.to_string(),
        }
    }

    fn connection(&self) -> TrendResult<redis::Connection> {
        Ok(self.client.get_connection()?)
    }
}

impl TrendStore for ValkeyTrendStore {
    fn backend_name(&self) -> &'static str {
        "valkey"
    }

    fn increment_member_score(&self, key: &str, amount: f64, member: &str) -> TrendResult<f64> {
        let amount = format_float(amount)?;
        let mut conn = self.connection()?;
        let raw = redis::cmd("ZINCRBY")
            .arg(self.store_key(key))
            .arg(amount)
            .arg(member)
            .query::<String>(&mut conn)?;
        parse_float(&raw)
    }

    fn set_member_score(&self, key: &str, score: f64, member: &str) -> TrendResult<()> {
        let score = format_float(score)?;
        let mut conn = self.connection()?;
        redis::cmd("ZADD")
            .arg(self.store_key(key))
            .arg(score)
            .arg(member)
            .query::<i64>(&mut conn)?;
        Ok(())
    }

    fn member_score(&self, key: &str, member: &str) -> TrendResult<f64> {
        let mut conn = self.connection()?;
        let raw = redis::cmd("ZSCORE")
            .arg(self.store_key(key))
            .arg(member)
            .query::<Option<String>>(&mut conn)?;
        let Some(raw) = raw else {
            return Err(TrendError::Decode(format!(
                "no score for member '{member}' in '{key}'"
            )));
        };
        parse_float(&raw)
    }

    fn top_by_score_desc(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> TrendResult<Vec<(String, f64)>> {
        let mut conn = self.connection()?;
        let values = redis::cmd("ZREVRANGE")
            .arg(self.store_key(key))
            .arg(start)
            .arg(stop)
            .arg("WITHSCORES")
            .query::<Vec<String>>(&mut conn)?;
        float_pairs(values)
    }

    fn remove_by_score_range(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> TrendResult<u64> {
        let min = min.encode()?;
        let max = max.encode()?;
        let mut conn = self.connection()?;
        let removed = redis::cmd("ZREMRANGEBYSCORE")
            .arg(self.store_key(key))
            .arg(min)
            .arg(max)
            .query::<u64>(&mut conn)?;
        Ok(removed)
    }

    fn plain_value(&self, key: &str) -> TrendResult<Option<String>> {
        let mut conn = self.connection()?;
        let value = redis::cmd("GET")
            .arg(self.store_key(key))
            .query::<Option<String>>(&mut conn)?;
        Ok(value)
    }

    fn set_plain_value(&self, key: &str, value: &str) -> TrendResult<()> {
        let mut conn = self.connection()?;
        redis::cmd("SET")
            .arg(self.store_key(key))
            .arg(value)
            .query::<()>(&mut conn)?;
        Ok(())
    }

    fn apply_batch(&self, ops: &[BatchOp]) -> TrendResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in ops {
            match op {
                BatchOp::SetMemberScore { key, member, score } => {
                    pipe.cmd("ZADD")
                        .arg(self.store_key(key))
                        .arg(format_float(*score)?)
                        .arg(member)
                        .ignore();
                }
                BatchOp::SetPlainValue { key, value } => {
                    pipe.cmd("SET").arg(self.store_key(key)).arg(value).ignore();
                }
            }
        }
        let mut conn = self.connection()?;
        pipe.query::<()>(&mut conn)?;
        Ok(())
    }
}
