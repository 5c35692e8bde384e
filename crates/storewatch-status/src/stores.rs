//! Shared store status collection.
//!
//! # Design
//! - One collection per dashboard host, injected into every page controller.
//! - `refresh` overwrites the whole snapshot; a response from an older request
//!   never replaces data from a newer one.
//! - Failures keep the previous snapshot and are surfaced through `last_error`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use storewatch_api_models::{MvccStats, StoreCapacity, StoreDescriptor, StoreStatus};
use tracing::{debug, warn};

use crate::client::StatusSource;
use crate::error::StatusResult;

/// Aggregate view over every known store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreTotals {
    /// Number of stores reporting.
    pub store_count: usize,
    /// Distinct nodes hosting those stores.
    pub node_count: usize,
    /// Sum of range replicas.
    pub range_count: i64,
    /// Sum of leader leases.
    pub leader_range_count: i64,
    /// Sum of fully replicated ranges.
    pub replicated_range_count: i64,
    /// Sum of ranges with quorum.
    pub available_range_count: i64,
    /// Summed MVCC stats.
    pub stats: MvccStats,
    /// Summed capacity.
    pub capacity: StoreCapacity,
}

#[derive(Default)]
struct Snapshot {
    stores: BTreeMap<i32, StoreStatus>,
    applied_seq: u64,
    refreshed_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Cache of per-store status records keyed by store id.
pub struct StoreStatuses {
    source: Arc<dyn StatusSource>,
    snapshot: RwLock<Snapshot>,
    next_seq: AtomicU64,
}

impl StoreStatuses {
    /// Create an empty collection backed by `source`.
    #[must_use]
    pub fn new(source: Arc<dyn StatusSource>) -> Self {
        Self {
            source,
            snapshot: RwLock::new(Snapshot::default()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Fetch the current store list and replace the cached snapshot.
    ///
    /// # Errors
    ///
    /// Returns the fetch error after recording it; the previous snapshot stays readable.
    pub async fn refresh(&self) -> StatusResult<()> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let fetched = self.source.fetch_stores().await;
        let mut snapshot = self.write();
        if seq < snapshot.applied_seq {
            debug!(seq, applied = snapshot.applied_seq, "dropping stale store refresh");
            return fetched.map(|_| ());
        }
        snapshot.applied_seq = seq;
        match fetched {
            Ok(stores) => {
                snapshot.stores = stores
                    .into_iter()
                    .map(|status| (status.desc.store_id, status))
                    .collect();
                snapshot.refreshed_at = Some(Utc::now());
                snapshot.last_error = None;
                debug!(stores = snapshot.stores.len(), "store statuses refreshed");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, detail = %err.detail(), "store status refresh failed");
                snapshot.last_error = Some(err.detail());
                Err(err)
            }
        }
    }

    /// Known store ids in ascending order.
    #[must_use]
    pub fn store_ids(&self) -> Vec<i32> {
        self.read().stores.keys().copied().collect()
    }

    /// Descriptor for `store_id`, if the store is known.
    #[must_use]
    pub fn desc(&self, store_id: i32) -> Option<StoreDescriptor> {
        self.read()
            .stores
            .get(&store_id)
            .map(|status| status.desc.clone())
    }

    /// Full status record for `store_id`, if the store is known.
    #[must_use]
    pub fn details(&self, store_id: i32) -> Option<StoreStatus> {
        self.read().stores.get(&store_id).cloned()
    }

    /// Descriptors of every store hosted on `node_id`.
    #[must_use]
    pub fn stores_on_node(&self, node_id: i32) -> Vec<StoreDescriptor> {
        self.read()
            .stores
            .values()
            .filter(|status| status.desc.node.node_id == node_id)
            .map(|status| status.desc.clone())
            .collect()
    }

    /// Totals across every known store.
    #[must_use]
    pub fn all_details(&self) -> StoreTotals {
        let snapshot = self.read();
        let mut totals = StoreTotals {
            store_count: snapshot.stores.len(),
            ..StoreTotals::default()
        };
        let mut nodes: Vec<i32> = Vec::with_capacity(snapshot.stores.len());
        for status in snapshot.stores.values() {
            totals.range_count += i64::from(status.range_count);
            totals.leader_range_count += i64::from(status.leader_range_count);
            totals.replicated_range_count += i64::from(status.replicated_range_count);
            totals.available_range_count += i64::from(status.available_range_count);
            totals.stats.accumulate(&status.stats);
            totals.capacity.capacity = totals
                .capacity
                .capacity
                .saturating_add(status.desc.capacity.capacity);
            totals.capacity.available = totals
                .capacity
                .available
                .saturating_add(status.desc.capacity.available);
            nodes.push(status.desc.node.node_id);
        }
        nodes.sort_unstable();
        nodes.dedup();
        totals.node_count = nodes.len();
        totals
    }

    /// True until the first successful refresh returns at least one store.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().stores.is_empty()
    }

    /// Time of the last successful refresh.
    #[must_use]
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.read().refreshed_at
    }

    /// Message from the most recent failed refresh, cleared on success.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.read().last_error.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.snapshot.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryStatusSource, store_status};
    use anyhow::Result;

    fn collection(source: &Arc<InMemoryStatusSource>) -> StoreStatuses {
        StoreStatuses::new(Arc::clone(source) as Arc<dyn StatusSource>)
    }

    #[tokio::test]
    async fn refresh_populates_sorted_ids_and_descriptors() -> Result<()> {
        let source = Arc::new(InMemoryStatusSource::new());
        source.set_stores(vec![store_status(3, 2), store_status(1, 1), store_status(2, 1)]);
        let statuses = collection(&source);
        assert!(statuses.is_empty());

        statuses.refresh().await?;
        assert_eq!(statuses.store_ids(), vec![1, 2, 3]);
        let desc = statuses
            .desc(3)
            .ok_or_else(|| anyhow::anyhow!("missing store 3"))?;
        assert_eq!(desc.node.node_id, 2);
        assert!(statuses.desc(9).is_none());
        assert!(statuses.details(9).is_none());
        assert!(statuses.last_refreshed().is_some());
        assert_eq!(statuses.stores_on_node(1).len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_overwrites_previous_snapshot() -> Result<()> {
        let source = Arc::new(InMemoryStatusSource::new());
        source.set_stores(vec![store_status(1, 1), store_status(2, 1)]);
        let statuses = collection(&source);
        statuses.refresh().await?;

        source.set_stores(vec![store_status(5, 3)]);
        statuses.refresh().await?;
        assert_eq!(statuses.store_ids(), vec![5]);
        Ok(())
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() -> Result<()> {
        let source = Arc::new(InMemoryStatusSource::new());
        source.set_stores(vec![store_status(1, 1)]);
        let statuses = collection(&source);
        statuses.refresh().await?;

        source.fail_stores(true);
        assert!(statuses.refresh().await.is_err());
        assert_eq!(statuses.store_ids(), vec![1]);
        assert!(statuses.last_error().is_some());

        source.fail_stores(false);
        statuses.refresh().await?;
        assert!(statuses.last_error().is_none());
        assert_eq!(source.store_fetches(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn totals_sum_every_store() -> Result<()> {
        let source = Arc::new(InMemoryStatusSource::new());
        let mut first = store_status(1, 1);
        first.range_count = 4;
        first.stats.key_count = 10;
        first.desc.capacity = StoreCapacity {
            capacity: 100,
            available: 40,
        };
        let mut second = store_status(2, 2);
        second.range_count = 6;
        second.stats.key_count = 5;
        second.desc.capacity = StoreCapacity {
            capacity: 100,
            available: 60,
        };
        source.set_stores(vec![first, second]);
        let statuses = collection(&source);
        assert_eq!(statuses.all_details(), StoreTotals::default());

        statuses.refresh().await?;
        let totals = statuses.all_details();
        assert_eq!(totals.store_count, 2);
        assert_eq!(totals.node_count, 2);
        assert_eq!(totals.range_count, 10);
        assert_eq!(totals.stats.key_count, 15);
        assert_eq!(totals.capacity.available, 100);
        Ok(())
    }
}
