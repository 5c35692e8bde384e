//! Time-series query builder.
//!
//! A [`Query`] names a series selection plus a display title. It is
//! immutable once built; executing it always covers the trailing window that
//! ends at execution time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use storewatch_api_models::{
    QueryAggregator, QueryResultSet, TimeSeriesQuery, TimeSeriesQueryRequest,
};

use crate::cache::{Execute, ExecuteFuture};
use crate::client::StatusSource;

/// Prefix shared by every per-store metric series.
pub const STORE_METRIC_PREFIX: &str = "cr.store.";

/// Window covered by a query unless overridden.
pub const DEFAULT_QUERY_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Series name for `metric` on `store_id`, e.g. `cr.store.keycount.1`.
#[must_use]
pub fn store_metric(store_id: &str, metric: &str) -> String {
    format!("{STORE_METRIC_PREFIX}{metric}.{store_id}")
}

/// A single aggregated series selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    name: String,
    aggregator: QueryAggregator,
}

impl Selector {
    /// Average of `name` per sample interval.
    #[must_use]
    pub fn avg(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aggregator: QueryAggregator::Avg,
        }
    }

    /// Series name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Aggregation applied to the series.
    #[must_use]
    pub const fn aggregator(&self) -> QueryAggregator {
        self.aggregator
    }
}

/// Titled time-series query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    selectors: Vec<Selector>,
    title: Option<String>,
    window: Duration,
}

impl Query {
    /// Start a query from its first selector.
    #[must_use]
    pub fn new(selector: Selector) -> Self {
        Self {
            selectors: vec![selector],
            title: None,
            window: DEFAULT_QUERY_WINDOW,
        }
    }

    /// Set the display title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Override the trailing window.
    #[must_use]
    pub const fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Display title; falls back to the first series name when unset.
    #[must_use]
    pub fn title(&self) -> &str {
        self.title
            .as_deref()
            .or_else(|| self.selectors.first().map(Selector::name))
            .unwrap_or_default()
    }

    /// Series selections in request order.
    #[must_use]
    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    /// Trailing window covered by the query.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Wire request for the window ending at `now`.
    #[must_use]
    pub fn request(&self, now: DateTime<Utc>) -> TimeSeriesQueryRequest {
        let end_nanos = now.timestamp_nanos_opt().unwrap_or(i64::MAX);
        let window_nanos = i64::try_from(self.window.as_nanos()).unwrap_or(i64::MAX);
        TimeSeriesQueryRequest {
            start_nanos: end_nanos.saturating_sub(window_nanos).max(0),
            end_nanos,
            queries: self
                .selectors
                .iter()
                .map(|selector| TimeSeriesQuery {
                    name: selector.name.clone(),
                    aggregator: selector.aggregator,
                })
                .collect(),
        }
    }

    /// Execute function that runs this query against `source` at call time.
    #[must_use]
    pub fn executor(&self, source: Arc<dyn StatusSource>) -> Execute<QueryResultSet> {
        let query = self.clone();
        Arc::new(move || -> ExecuteFuture<QueryResultSet> {
            let source = Arc::clone(&source);
            let request = query.request(Utc::now());
            Box::pin(async move { source.query(&request).await })
        })
    }
}
