//! Query result cache.
//!
//! # Design
//! - Wraps one execute function and keeps the latest successful result.
//! - A refresh issued while another is in flight is coalesced.
//! - Failed refreshes record an error but keep the previous result readable.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::StatusResult;

/// Boxed future returned by an execute function.
pub type ExecuteFuture<T> = Pin<Box<dyn Future<Output = StatusResult<T>> + Send>>;

/// Shared execute function backing a [`QueryCache`].
pub type Execute<T> = Arc<dyn Fn() -> ExecuteFuture<T> + Send + Sync>;

/// Outcome of a successful call to [`QueryCache::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheRefresh {
    /// The execute function ran and its result was stored.
    Updated,
    /// Another refresh was already running; nothing was issued.
    Coalesced,
}

struct CacheState<T> {
    result: Option<Arc<T>>,
    error: Option<String>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// Latest materialised result of an execute function.
pub struct QueryCache<T> {
    execute: Execute<T>,
    state: RwLock<CacheState<T>>,
    in_flight: AtomicBool,
    executions: AtomicU64,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T> QueryCache<T>
where
    T: Send + Sync + 'static,
{
    /// Build an empty cache around `execute`. Nothing runs until [`Self::refresh`].
    #[must_use]
    pub fn new(execute: Execute<T>) -> Self {
        Self {
            execute,
            state: RwLock::new(CacheState {
                result: None,
                error: None,
                refreshed_at: None,
            }),
            in_flight: AtomicBool::new(false),
            executions: AtomicU64::new(0),
        }
    }

    /// Build a cache from a plain async closure.
    #[must_use]
    pub fn from_fn<F, Fut>(execute: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StatusResult<T>> + Send + 'static,
    {
        Self::new(Arc::new(move || -> ExecuteFuture<T> { Box::pin(execute()) }))
    }

    /// Re-execute and store the result.
    ///
    /// # Errors
    ///
    /// Returns the execute error after recording it on the cache.
    pub async fn refresh(&self) -> StatusResult<CacheRefresh> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("query refresh already in flight");
            return Ok(CacheRefresh::Coalesced);
        }
        let _guard = InFlight(&self.in_flight);
        self.executions.fetch_add(1, Ordering::Relaxed);

        let outcome = (self.execute)().await;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(value) => {
                state.result = Some(Arc::new(value));
                state.error = None;
                state.refreshed_at = Some(Utc::now());
                Ok(CacheRefresh::Updated)
            }
            Err(err) => {
                warn!(error = %err, detail = %err.detail(), "query refresh failed");
                state.error = Some(err.detail());
                Err(err)
            }
        }
    }

    /// Latest successful result.
    #[must_use]
    pub fn result(&self) -> Option<Arc<T>> {
        self.read().result.clone()
    }

    /// Message from the last failed refresh, cleared on success.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    /// Time of the last successful refresh.
    #[must_use]
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.read().refreshed_at
    }

    /// Number of times the execute function has been invoked.
    #[must_use]
    pub fn refresh_count(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    /// True while a refresh is running.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState<T>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusError;
    use anyhow::Result;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn refresh_stores_latest_result() -> Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = QueryCache::from_fn(move || {
            let value = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok(value) }
        });
        assert!(cache.result().is_none());

        assert_eq!(cache.refresh().await?, CacheRefresh::Updated);
        assert_eq!(cache.result().as_deref(), Some(&1));
        cache.refresh().await?;
        assert_eq!(cache.result().as_deref(), Some(&2));
        assert_eq!(cache.refresh_count(), 2);
        assert!(cache.last_refreshed().is_some());
        Ok(())
    }

    #[tokio::test]
    async fn failure_keeps_previous_result() -> Result<()> {
        let fail = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fail);
        let cache = QueryCache::from_fn(move || {
            let failing = flag.load(Ordering::SeqCst);
            async move {
                if failing {
                    Err(StatusError::HttpStatus {
                        operation: "ts.query",
                        url: "memory://ts/query".to_string(),
                        status: 500,
                    })
                } else {
                    Ok("series")
                }
            }
        });

        cache.refresh().await?;
        fail.store(true, Ordering::SeqCst);
        assert!(cache.refresh().await.is_err());
        assert_eq!(cache.result().as_deref(), Some(&"series"));
        assert!(cache.error().is_some());

        fail.store(false, Ordering::SeqCst);
        cache.refresh().await?;
        assert!(cache.error().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_refresh_is_coalesced() -> Result<()> {
        let gate = Arc::new(Notify::new());
        let waiter = Arc::clone(&gate);
        let cache = Arc::new(QueryCache::from_fn(move || {
            let waiter = Arc::clone(&waiter);
            async move {
                waiter.notified().await;
                Ok(7_u32)
            }
        }));

        let first = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.refresh().await }
        });
        while !cache.is_refreshing() {
            tokio::task::yield_now().await;
        }
        assert_eq!(cache.refresh().await?, CacheRefresh::Coalesced);

        gate.notify_one();
        assert_eq!(first.await??, CacheRefresh::Updated);
        assert_eq!(cache.refresh_count(), 1);
        assert!(!cache.is_refreshing());
        Ok(())
    }
}
