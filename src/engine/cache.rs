use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use moka::future::Cache;

use super::{clock::YearMonth, monthly::EmployeeMonth};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthlyKey {
    pub employee_id: u64,
    pub tenant_id: u64,
    pub month: YearMonth,
}

impl MonthlyKey {
    pub fn new(tenant_id: u64, employee_id: u64, month: YearMonth) -> Self {
        Self {
            employee_id,
            tenant_id,
            month,
        }
    }
}

/// Computed month summaries, one per `(employee, tenant, month)`.
///
/// Entries are dropped by the mutation that made them stale, never by a blanket clear.
/// Every invalidation also bumps the tenant's generation; a summary computed under an
/// older generation is never left behind in the cache.
#[derive(Clone)]
pub struct MonthlyCache {
    entries: Cache<MonthlyKey, Arc<EmployeeMonth>>,
    generations: Arc<Mutex<HashMap<u64, u64>>>,
}

impl MonthlyCache {
    pub fn new(max_capacity: u64, time_to_live: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(time_to_live)
                .build(),
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn generations(&self) -> MutexGuard<'_, HashMap<u64, u64>> {
        // The map only holds counters, a poisoned guard is still consistent.
        self.generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read before loading the data a summary is computed from.
    pub fn generation(&self, tenant_id: u64) -> u64 {
        self.generations().get(&tenant_id).copied().unwrap_or_default()
    }

    fn bump(&self, tenant_id: u64) {
        *self.generations().entry(tenant_id).or_default() += 1;
    }

    pub async fn get(&self, key: &MonthlyKey) -> Option<Arc<EmployeeMonth>> {
        self.entries.get(key).await
    }

    /// Stores a summary computed under `generation`. If the tenant was invalidated in
    /// the meantime the entry is removed again and `false` is returned.
    ///
    /// Invalidations bump before they drop entries, so either this check sees the new
    /// generation or the invalidation runs after the insert and drops it.
    pub async fn insert(
        &self,
        key: MonthlyKey,
        month: Arc<EmployeeMonth>,
        generation: u64,
    ) -> bool {
        self.entries.insert(key, month).await;
        if self.generation(key.tenant_id) == generation {
            return true;
        }
        self.entries.invalidate(&key).await;
        tracing::debug!(
            employee_id = key.employee_id,
            month = %key.month,
            "Discarded monthly summary built from superseded data"
        );
        false
    }

    /// A record of one employee-day changed.
    pub async fn invalidate(&self, key: &MonthlyKey) {
        self.bump(key.tenant_id);
        self.entries.invalidate(key).await;
    }

    /// A holiday was declared or removed. Branch-scoped holidays only touch that branch.
    pub async fn invalidate_holiday(
        &self,
        tenant_id: u64,
        branch_id: Option<u64>,
        month: YearMonth,
    ) -> usize {
        self.invalidate_where(tenant_id, |key, summary| {
            key.tenant_id == tenant_id
                && key.month == month
                && branch_id.is_none_or(|b| summary.branch_id == Some(b))
        })
        .await
    }

    /// Classification settings changed for the tenant default or one branch override.
    pub async fn invalidate_settings(&self, tenant_id: u64, branch_id: Option<u64>) -> usize {
        self.invalidate_where(tenant_id, |key, summary| {
            key.tenant_id == tenant_id && branch_id.is_none_or(|b| summary.branch_id == Some(b))
        })
        .await
    }

    async fn invalidate_where<F>(&self, tenant_id: u64, predicate: F) -> usize
    where
        F: Fn(&MonthlyKey, &EmployeeMonth) -> bool,
    {
        self.bump(tenant_id);
        let stale: Vec<MonthlyKey> = self
            .entries
            .iter()
            .filter(|(key, summary)| predicate(&**key, &**summary))
            .map(|(key, _)| *key)
            .collect();

        for key in &stale {
            self.entries.invalidate(key).await;
        }
        tracing::debug!(count = stale.len(), "Invalidated monthly summaries");
        stale.len()
    }
}
