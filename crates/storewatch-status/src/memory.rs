//! In-memory [`StatusSource`] for tests and offline rendering.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use storewatch_api_models::{
    NodeAddress, NodeDescriptor, QueryResultSet, StoreDescriptor, StoreStatus, TimeSeriesDatapoint,
    TimeSeriesQueryRequest, TimeSeriesQueryResult,
};

use crate::client::StatusSource;
use crate::error::{StatusError, StatusResult};

/// Status source backed by values set from the test.
#[derive(Default)]
pub struct InMemoryStatusSource {
    stores: Mutex<Vec<StoreStatus>>,
    series: Mutex<HashMap<String, Vec<TimeSeriesDatapoint>>>,
    requests: Mutex<Vec<TimeSeriesQueryRequest>>,
    fail_stores: AtomicBool,
    fail_queries: AtomicBool,
    store_fetches: AtomicUsize,
    queries: AtomicUsize,
}

impl InMemoryStatusSource {
    /// Empty source: no stores, no series.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the store list returned by `fetch_stores`.
    pub fn set_stores(&self, stores: Vec<StoreStatus>) {
        *self.stores.lock().unwrap_or_else(PoisonError::into_inner) = stores;
    }

    /// Set the datapoints returned for series `name`.
    pub fn set_series(&self, name: impl Into<String>, datapoints: Vec<TimeSeriesDatapoint>) {
        self.series
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), datapoints);
    }

    /// Make `fetch_stores` fail with a 503 until reset.
    pub fn fail_stores(&self, fail: bool) {
        self.fail_stores.store(fail, Ordering::SeqCst);
    }

    /// Make `query` fail with a 503 until reset.
    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Number of `fetch_stores` calls so far.
    #[must_use]
    pub fn store_fetches(&self) -> usize {
        self.store_fetches.load(Ordering::SeqCst)
    }

    /// Number of `query` calls so far.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Every query request received, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<TimeSeriesQueryRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl StatusSource for InMemoryStatusSource {
    async fn fetch_stores(&self) -> StatusResult<Vec<StoreStatus>> {
        self.store_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_stores.load(Ordering::SeqCst) {
            return Err(unavailable("status.fetch_stores", "memory://_status/stores/"));
        }
        Ok(self
            .stores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn query(&self, request: &TimeSeriesQueryRequest) -> StatusResult<QueryResultSet> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(unavailable("ts.query", "memory://ts/query"));
        }
        let series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        let results = request
            .queries
            .iter()
            .map(|query| TimeSeriesQueryResult {
                name: query.name.clone(),
                aggregator: query.aggregator,
                datapoints: series.get(&query.name).cloned().unwrap_or_default(),
            })
            .collect();
        Ok(QueryResultSet { results })
    }
}

fn unavailable(operation: &'static str, url: &str) -> StatusError {
    StatusError::HttpStatus {
        operation,
        url: url.to_string(),
        status: 503,
    }
}

/// Minimal status record for `store_id` hosted on `node_id`.
#[must_use]
pub fn store_status(store_id: i32, node_id: i32) -> StoreStatus {
    StoreStatus {
        desc: StoreDescriptor {
            store_id,
            node: NodeDescriptor {
                node_id,
                address: NodeAddress {
                    network: "tcp".to_string(),
                    address: format!("10.0.0.{node_id}:26257"),
                },
                ..NodeDescriptor::default()
            },
            ..StoreDescriptor::default()
        },
        node_id,
        ..StoreStatus::default()
    }
}
