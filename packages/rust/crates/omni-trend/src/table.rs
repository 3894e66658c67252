//! Entry point owning the injected store handle.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::{DeltaSpec, TrendRuntimeConfig};
use crate::counter_set::CounterSet;
use crate::delta::Delta;
use crate::error::TrendResult;
use crate::store::{LocalTrendStore, TrendStore, ValkeyTrendStore};

/// Creates and reopens deltas over one store.
#[derive(Clone)]
pub struct TrendTable {
    store: Arc<dyn TrendStore>,
}

impl std::fmt::Debug for TrendTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrendTable")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

impl TrendTable {
    /// Table over an existing store handle.
    pub fn new(store: Arc<dyn TrendStore>) -> Self {
        Self { store }
    }

    /// Table over a fresh in-process store.
    #[must_use]
    pub fn local() -> Self {
        Self::new(Arc::new(LocalTrendStore::new()))
    }

    /// Table over Valkey using resolved runtime config.
    pub fn connect(config: &TrendRuntimeConfig) -> TrendResult<Self> {
        Ok(Self::new(Arc::new(ValkeyTrendStore::from_config(config)?)))
    }

    /// Table over Valkey configured from the environment, if `VALKEY_URL` is set.
    #[must_use]
    pub fn from_env() -> Option<TrendResult<Self>> {
        let config = TrendRuntimeConfig::from_env()?;
        Some(Self::connect(&config))
    }

    /// Underlying store handle.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TrendStore> {
        &self.store
    }

    /// Create a delta. See [`Delta::create`].
    pub fn create_delta(
        &self,
        name: &str,
        lifetime: TimeDelta,
        anchor: Option<DateTime<Utc>>,
        replay: bool,
    ) -> TrendResult<Delta> {
        Delta::create(Arc::clone(&self.store), name, lifetime, anchor, replay)
    }

    /// Create a delta against an explicit clock reading.
    pub fn create_delta_at(
        &self,
        name: &str,
        lifetime: TimeDelta,
        anchor: Option<DateTime<Utc>>,
        replay: bool,
        now: DateTime<Utc>,
    ) -> TrendResult<Delta> {
        Delta::create_at(Arc::clone(&self.store), name, lifetime, anchor, replay, now)
    }

    /// Create a delta from a declarative definition.
    pub fn create_from_spec(&self, spec: &DeltaSpec) -> TrendResult<Delta> {
        self.create_delta(&spec.name, spec.lifetime()?, spec.anchor()?, spec.replay)
    }

    /// Create every delta in `specs`, stopping at the first failure.
    pub fn create_from_specs(&self, specs: &[DeltaSpec]) -> TrendResult<Vec<Delta>> {
        specs.iter().map(|spec| self.create_from_spec(spec)).collect()
    }

    /// Handle to an existing delta.
    #[must_use]
    pub fn fetch_delta(&self, name: &str) -> Delta {
        Delta::open(Arc::clone(&self.store), name)
    }

    /// Handle to a standalone counter set.
    #[must_use]
    pub fn counter_set(&self, name: &str) -> CounterSet {
        CounterSet::new(name, Arc::clone(&self.store))
    }
}
