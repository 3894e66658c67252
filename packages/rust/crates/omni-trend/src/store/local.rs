//! In-process store with Valkey sorted-set semantics.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{BatchOp, ScoreBound, TrendStore, resolve_rank_range};
use crate::encoding::format_float;
use crate::error::{TrendError, TrendResult};

#[derive(Debug, Default)]
struct LocalState {
    sorted: HashMap<String, HashMap<String, f64>>,
    plain: HashMap<String, String>,
}

/// Local in-memory trend store.
///
/// Mirrors the Valkey adapter closely enough for single-process use and
/// deterministic tests: descending ranks break ties by member name descending,
/// and plain values are stored as their string encoding.
#[derive(Debug, Default)]
pub struct LocalTrendStore {
    state: Mutex<LocalState>,
}

impl LocalTrendStore {
    /// Create an empty local store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> TrendResult<MutexGuard<'_, LocalState>> {
        self.state
            .lock()
            .map_err(|_| TrendError::StoreUnavailable("local trend store lock poisoned".to_string()))
    }
}

fn ensure_score(score: f64) -> TrendResult<()> {
    // Same rule as the wire encoding, so both adapters reject the same inputs.
    format_float(score).map(|_| ())
}

impl TrendStore for LocalTrendStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    fn increment_member_score(&self, key: &str, amount: f64, member: &str) -> TrendResult<f64> {
        ensure_score(amount)?;
        let mut state = self.lock()?;
        let entry = state
            .sorted
            .entry(key.to_string())
            .or_default()
            .entry(member.to_string())
            .or_insert(0.0);
        *entry += amount;
        Ok(*entry)
    }

    fn set_member_score(&self, key: &str, score: f64, member: &str) -> TrendResult<()> {
        ensure_score(score)?;
        let mut state = self.lock()?;
        state
            .sorted
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    fn member_score(&self, key: &str, member: &str) -> TrendResult<f64> {
        let state = self.lock()?;
        state
            .sorted
            .get(key)
            .and_then(|members| members.get(member))
            .copied()
            .ok_or_else(|| TrendError::Decode(format!("no score for member '{member}' in '{key}'")))
    }

    fn top_by_score_desc(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> TrendResult<Vec<(String, f64)>> {
        let state = self.lock()?;
        let Some(members) = state.sorted.get(key) else {
            return Ok(Vec::new());
        };
        let mut ranked: Vec<(String, f64)> = members
            .iter()
            .map(|(member, score)| (member.clone(), *score))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
        let Some((first, last)) = resolve_rank_range(ranked.len(), start, stop) else {
            return Ok(Vec::new());
        };
        ranked.truncate(last + 1);
        Ok(ranked.split_off(first))
    }

    fn remove_by_score_range(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> TrendResult<u64> {
        let mut state = self.lock()?;
        let Some(members) = state.sorted.get_mut(key) else {
            return Ok(0);
        };
        let before = members.len();
        members.retain(|_, score| !(min.admits_as_min(*score) && max.admits_as_max(*score)));
        let removed = before - members.len();
        if members.is_empty() {
            state.sorted.remove(key);
        }
        Ok(removed as u64)
    }

    fn plain_value(&self, key: &str) -> TrendResult<Option<String>> {
        Ok(self.lock()?.plain.get(key).cloned())
    }

    fn set_plain_value(&self, key: &str, value: &str) -> TrendResult<()> {
        self.lock()?
            .plain
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn apply_batch(&self, ops: &[BatchOp]) -> TrendResult<()> {
        for op in ops {
            if let BatchOp::SetMemberScore { score, .. } = op {
                ensure_score(*score)?;
            }
        }
        let mut state = self.lock()?;
        for op in ops {
            match op {
                BatchOp::SetMemberScore { key, member, score } => {
                    state
                        .sorted
                        .entry(key.clone())
                        .or_default()
                        .insert(member.clone(), *score);
                }
                BatchOp::SetPlainValue { key, value } => {
                    state.plain.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_by_score_desc_orders_and_limits() -> TrendResult<()> {
        let store = LocalTrendStore::new();
        store.increment_member_score("s", 1.0, "a")?;
        store.increment_member_score("s", 3.0, "b")?;
        store.increment_member_score("s", 2.0, "c")?;

        let top_two = store.top_by_score_desc("s", 0, 1)?;
        assert_eq!(
            top_two,
            vec![("b".to_string(), 3.0), ("c".to_string(), 2.0)]
        );
        assert_eq!(store.top_by_score_desc("s", 0, -1)?.len(), 3);
        assert!(store.top_by_score_desc("missing", 0, -1)?.is_empty());
        Ok(())
    }

    #[test]
    fn remove_by_score_range_honours_bound_kinds() -> TrendResult<()> {
        let store = LocalTrendStore::new();
        store.set_member_score("s", -2.0, "neg")?;
        store.set_member_score("s", 0.0001, "edge")?;
        store.set_member_score("s", 0.000_05, "tiny")?;
        store.set_member_score("s", 1.0, "keep")?;

        let removed = store.remove_by_score_range(
            "s",
            ScoreBound::NegInfinity,
            ScoreBound::Exclusive(0.0001),
        )?;
        assert_eq!(removed, 2);
        assert_eq!(store.member_score("s", "edge")?, 0.0001);
        assert!(store.member_score("s", "tiny").is_err());
        Ok(())
    }

    #[test]
    fn apply_batch_is_all_or_nothing_on_invalid_scores() -> TrendResult<()> {
        let store = LocalTrendStore::new();
        store.set_member_score("s", 1.0, "a")?;
        let ops = vec![
            BatchOp::SetMemberScore {
                key: "s".to_string(),
                member: "a".to_string(),
                score: 5.0,
            },
            BatchOp::SetMemberScore {
                key: "s".to_string(),
                member: "b".to_string(),
                score: f64::NAN,
            },
        ];
        assert!(store.apply_batch(&ops).is_err());
        assert_eq!(store.member_score("s", "a")?, 1.0);
        Ok(())
    }
}
