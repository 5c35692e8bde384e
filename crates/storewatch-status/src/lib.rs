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
#![allow(clippy::module_name_repetitions)]

//! Data collaborators behind the dashboard pages.
//!
//! Layout: `client.rs` (`StatusSource` + reqwest client), `stores.rs` (shared
//! store status collection), `timeseries.rs` (query builder), `cache.rs`
//! (query result cache), `error.rs` (status error type).

pub mod cache;
pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod stores;
pub mod timeseries;

pub use cache::{CacheRefresh, Execute, ExecuteFuture, QueryCache};
pub use client::{HttpStatusClient, StatusSource};
pub use error::{StatusError, StatusResult};
pub use stores::{StoreStatuses, StoreTotals};
pub use timeseries::{DEFAULT_QUERY_WINDOW, Query, STORE_METRIC_PREFIX, Selector, store_metric};
