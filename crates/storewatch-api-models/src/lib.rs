#![forbid(unsafe_code)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]
//! Wire DTOs for the cluster status service.
//!
//! These types mirror the JSON bodies returned by `/_status/stores/` and the
//! `/ts/query` endpoint. Every numeric field defaults to zero so partially
//! populated responses from older nodes still decode.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Network address a node listens on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeAddress {
    /// Transport family (for example `tcp`).
    #[serde(default)]
    pub network: String,
    /// Host and port.
    #[serde(default)]
    pub address: String,
}

impl NodeAddress {
    /// `network-address` label used in store listings.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}-{}", self.network, self.address)
    }
}

/// Attribute list attached to nodes and stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attributes {
    /// Free-form attribute strings (e.g. `ssd`, `us-east`).
    #[serde(default)]
    pub attrs: Vec<String>,
}

/// Identity of the node hosting a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeDescriptor {
    /// Cluster-unique node identifier.
    #[serde(default)]
    pub node_id: i32,
    /// Address the node accepts connections on.
    #[serde(default)]
    pub address: NodeAddress,
    /// Node attributes.
    #[serde(default)]
    pub attrs: Attributes,
}

/// Disk capacity reported by a store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreCapacity {
    /// Total bytes on the device.
    #[serde(default)]
    pub capacity: i64,
    /// Bytes still available.
    #[serde(default)]
    pub available: i64,
}

impl StoreCapacity {
    /// Fraction of the device in use, in the range `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn used_fraction(&self) -> f64 {
        if self.capacity <= 0 {
            return 0.0;
        }
        let used = (self.capacity - self.available).max(0);
        (used as f64 / self.capacity as f64).clamp(0.0, 1.0)
    }
}

/// Descriptor identifying a store and its owning node.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreDescriptor {
    /// Cluster-unique store identifier.
    #[serde(default)]
    pub store_id: i32,
    /// Node the store lives on.
    #[serde(default)]
    pub node: NodeDescriptor,
    /// Store attributes.
    #[serde(default)]
    pub attrs: Attributes,
    /// Capacity snapshot.
    #[serde(default)]
    pub capacity: StoreCapacity,
}

/// MVCC accounting aggregated over every range on a store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MvccStats {
    /// Bytes of live keys and values.
    #[serde(default)]
    pub live_bytes: i64,
    /// Bytes of keys.
    #[serde(default)]
    pub key_bytes: i64,
    /// Bytes of values.
    #[serde(default)]
    pub val_bytes: i64,
    /// Bytes of write intents.
    #[serde(default)]
    pub intent_bytes: i64,
    /// Number of live values.
    #[serde(default)]
    pub live_count: i64,
    /// Number of keys.
    #[serde(default)]
    pub key_count: i64,
    /// Number of values (all versions).
    #[serde(default)]
    pub val_count: i64,
    /// Number of outstanding write intents.
    #[serde(default)]
    pub intent_count: i64,
    /// Bytes of system-local data.
    #[serde(default)]
    pub sys_bytes: i64,
    /// Number of system-local keys.
    #[serde(default)]
    pub sys_count: i64,
    /// Wall time of the last stats update in nanoseconds.
    #[serde(default)]
    pub last_update_nanos: i64,
}

impl MvccStats {
    /// Add another stats block into this one, saturating on overflow.
    pub const fn accumulate(&mut self, other: &Self) {
        self.live_bytes = self.live_bytes.saturating_add(other.live_bytes);
        self.key_bytes = self.key_bytes.saturating_add(other.key_bytes);
        self.val_bytes = self.val_bytes.saturating_add(other.val_bytes);
        self.intent_bytes = self.intent_bytes.saturating_add(other.intent_bytes);
        self.live_count = self.live_count.saturating_add(other.live_count);
        self.key_count = self.key_count.saturating_add(other.key_count);
        self.val_count = self.val_count.saturating_add(other.val_count);
        self.intent_count = self.intent_count.saturating_add(other.intent_count);
        self.sys_bytes = self.sys_bytes.saturating_add(other.sys_bytes);
        self.sys_count = self.sys_count.saturating_add(other.sys_count);
        if other.last_update_nanos > self.last_update_nanos {
            self.last_update_nanos = other.last_update_nanos;
        }
    }
}

/// Status record for a single store as reported by the status service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStatus {
    /// Store descriptor.
    #[serde(default)]
    pub desc: StoreDescriptor,
    /// Owning node identifier.
    #[serde(default)]
    pub node_id: i32,
    /// Number of ranges with a replica on this store.
    #[serde(default)]
    pub range_count: i32,
    /// Store start time in nanoseconds since the epoch.
    #[serde(default)]
    pub started_at: i64,
    /// Last status update in nanoseconds since the epoch.
    #[serde(default)]
    pub updated_at: i64,
    /// Aggregated MVCC stats.
    #[serde(default)]
    pub stats: MvccStats,
    /// Ranges for which this store holds the leader lease.
    #[serde(default)]
    pub leader_range_count: i32,
    /// Ranges that are fully replicated.
    #[serde(default)]
    pub replicated_range_count: i32,
    /// Ranges that have a quorum available.
    #[serde(default)]
    pub available_range_count: i32,
}

impl StoreStatus {
    /// Start time as a UTC timestamp, if representable.
    #[must_use]
    pub fn started(&self) -> Option<DateTime<Utc>> {
        nanos_to_datetime(self.started_at)
    }

    /// Last update time as a UTC timestamp, if representable.
    #[must_use]
    pub fn updated(&self) -> Option<DateTime<Utc>> {
        nanos_to_datetime(self.updated_at)
    }
}

/// Body of `GET /_status/stores/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStatusList {
    /// Store records; `null` decodes as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub d: Vec<StoreStatus>,
}

/// Aggregation applied to a series before it is returned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryAggregator {
    /// Average of the sampled values per interval.
    Avg,
    /// Per-second rate of change of the interval average.
    AvgRate,
}

impl QueryAggregator {
    /// Wire name of the aggregator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Avg => "AVG",
            Self::AvgRate => "AVG_RATE",
        }
    }
}

/// One series selection inside a time-series request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSeriesQuery {
    /// Full metric series name.
    pub name: String,
    /// Aggregation applied server side.
    pub aggregator: QueryAggregator,
}

/// Body posted to `/ts/query`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSeriesQueryRequest {
    /// Window start in nanoseconds since the epoch.
    pub start_nanos: i64,
    /// Window end in nanoseconds since the epoch.
    pub end_nanos: i64,
    /// Series to fetch.
    pub queries: Vec<TimeSeriesQuery>,
}

/// A single sample in a returned series.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct TimeSeriesDatapoint {
    /// Sample time in nanoseconds since the epoch.
    #[serde(default)]
    pub timestamp_nanos: i64,
    /// Sample value.
    #[serde(default)]
    pub value: f64,
}

/// Series returned for one [`TimeSeriesQuery`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSeriesQueryResult {
    /// Series name echoed back by the server.
    pub name: String,
    /// Aggregator that produced the samples.
    #[serde(default = "default_aggregator")]
    pub aggregator: QueryAggregator,
    /// Samples in ascending time order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub datapoints: Vec<TimeSeriesDatapoint>,
}

/// Body returned from `/ts/query`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryResultSet {
    /// One result per requested series, in request order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<TimeSeriesQueryResult>,
}

impl QueryResultSet {
    /// True when no series carries any datapoint.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.iter().all(|result| result.datapoints.is_empty())
    }
}

const fn default_aggregator() -> QueryAggregator {
    QueryAggregator::Avg
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Convert epoch nanoseconds into a UTC timestamp. Zero means "unset".
#[must_use]
pub fn nanos_to_datetime(nanos: i64) -> Option<DateTime<Utc>> {
    if nanos <= 0 {
        return None;
    }
    Some(DateTime::from_timestamp_nanos(nanos))
}
