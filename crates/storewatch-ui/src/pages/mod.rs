//! Page controllers and their views.
//!
//! # Design
//! - A controller is built when its route is mounted: it triggers one refresh
//!   of its collaborators and schedules exactly one repeating refresh.
//! - Views are pure reads of collaborator state and never fail; missing data
//!   renders an empty state.
//! - Refreshes are fire-and-forget; outcomes land in logs and metrics.

use std::sync::Arc;
use std::time::Duration;

use storewatch_api_models::QueryResultSet;
use storewatch_status::{DEFAULT_QUERY_WINDOW, QueryCache, StatusSource, StoreStatuses};
use storewatch_telemetry::{Metrics, RefreshOutcome, RefreshTarget};
use tokio::runtime::Handle;
use tracing::warn;

use crate::route::Route;
use crate::schedule::Scheduler;
use crate::vdom::Node;

pub mod node;
pub mod store;
pub mod stores;

pub use node::NodePage;
pub use store::{QueryHolder, STORE_CHARTS, StorePage};
pub use stores::StoresPage;

/// Period of the repeating refresh unless configured otherwise.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Collaborators shared by every page controller.
#[derive(Clone)]
pub struct PageContext {
    /// Shared store status collection.
    pub statuses: Arc<StoreStatuses>,
    /// Source used to build per-page query executors.
    pub source: Arc<dyn StatusSource>,
    /// Timer source for the repeating refresh.
    pub scheduler: Arc<dyn Scheduler>,
    /// Metrics registry for refresh outcomes.
    pub metrics: Metrics,
    /// Period of the repeating refresh.
    pub refresh_interval: Duration,
    /// Trailing window covered by chart queries.
    pub query_window: Duration,
}

impl PageContext {
    /// Context with a fresh status collection over `source` and default periods.
    #[must_use]
    pub fn new(
        source: Arc<dyn StatusSource>,
        scheduler: Arc<dyn Scheduler>,
        metrics: Metrics,
    ) -> Self {
        Self {
            statuses: Arc::new(StoreStatuses::new(Arc::clone(&source))),
            source,
            scheduler,
            metrics,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            query_window: DEFAULT_QUERY_WINDOW,
        }
    }

    /// Override the refresh period.
    #[must_use]
    pub const fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Override the chart query window.
    #[must_use]
    pub const fn with_query_window(mut self, window: Duration) -> Self {
        self.query_window = window;
        self
    }
}

/// A mounted page.
pub trait Page: Send {
    /// Route this controller was mounted for.
    fn route(&self) -> Route;
    /// Document title.
    fn title(&self) -> String;
    /// Render from current collaborator state.
    fn view(&self) -> Node;
    /// Cancel the repeating refresh. Idempotent.
    fn unload(&mut self);
}

/// Construct the controller for `route`.
#[must_use]
pub fn mount(route: &Route, ctx: &PageContext) -> Box<dyn Page> {
    match route {
        Route::Stores => Box::new(StoresPage::controller(ctx.clone())),
        Route::Store { .. } => Box::new(StorePage::controller(ctx.clone(), &route.params())),
        Route::Node { .. } => Box::new(NodePage::controller(ctx.clone(), &route.params())),
    }
}

/// Start a refresh of the shared status collection without waiting for it.
pub(crate) fn spawn_status_refresh(statuses: &Arc<StoreStatuses>, metrics: &Metrics) {
    let statuses = Arc::clone(statuses);
    let metrics = metrics.clone();
    spawn_detached(async move {
        let outcome = match statuses.refresh().await {
            Ok(()) => RefreshOutcome::Ok,
            Err(_) => RefreshOutcome::Error,
        };
        metrics.inc_refresh(RefreshTarget::Stores, outcome);
    });
}

/// Start a refresh of one chart cache without waiting for it.
pub(crate) fn spawn_chart_refresh(cache: &Arc<QueryCache<QueryResultSet>>, metrics: &Metrics) {
    let cache = Arc::clone(cache);
    let metrics = metrics.clone();
    spawn_detached(async move {
        let outcome = match cache.refresh().await {
            Ok(_) => RefreshOutcome::Ok,
            Err(_) => RefreshOutcome::Error,
        };
        metrics.inc_refresh(RefreshTarget::Chart, outcome);
    });
}

fn spawn_detached<F>(task: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
        }
        Err(err) => warn!(error = %err, "no runtime available; refresh skipped"),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::schedule::ManualScheduler;
    use anyhow::Result;
    use storewatch_status::memory::InMemoryStatusSource;

    pub(crate) struct Harness {
        pub(crate) source: Arc<InMemoryStatusSource>,
        pub(crate) scheduler: ManualScheduler,
        pub(crate) ctx: PageContext,
    }

    pub(crate) fn harness() -> Result<Harness> {
        let source = Arc::new(InMemoryStatusSource::new());
        let scheduler = ManualScheduler::new();
        let ctx = PageContext::new(
            Arc::clone(&source) as Arc<dyn StatusSource>,
            Arc::new(scheduler.clone()),
            Metrics::new()?,
        );
        Ok(Harness {
            source,
            scheduler,
            ctx,
        })
    }

    /// Yield until `done` holds, so detached refreshes get to run.
    pub(crate) async fn settle(mut done: impl FnMut() -> bool) -> Result<()> {
        for _ in 0..1_000 {
            if done() {
                return Ok(());
            }
            tokio::task::yield_now().await;
        }
        anyhow::bail!("background refresh did not settle")
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{harness, settle};
    use super::*;
    use anyhow::Result;
    use storewatch_status::memory::store_status;

    #[tokio::test]
    async fn mount_picks_the_controller_for_each_route() -> Result<()> {
        let h = harness()?;
        let routes = [
            Route::Stores,
            Route::Store {
                store_id: "1".to_string(),
            },
            Route::Node {
                node_id: "1".to_string(),
            },
        ];
        for route in routes {
            let mut page = mount(&route, &h.ctx);
            assert_eq!(page.route(), route);
            page.unload();
        }
        assert_eq!(h.scheduler.active_timers(), 0);
        assert_eq!(h.scheduler.registered_total(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_outcomes_are_counted() -> Result<()> {
        let h = harness()?;
        h.source.set_stores(vec![store_status(1, 1)]);
        spawn_status_refresh(&h.ctx.statuses, &h.ctx.metrics);
        settle(|| h.ctx.metrics.snapshot().refresh_ok_total == 1).await?;

        h.source.fail_stores(true);
        spawn_status_refresh(&h.ctx.statuses, &h.ctx.metrics);
        settle(|| h.ctx.metrics.snapshot().refresh_error_total == 1).await?;
        assert_eq!(h.ctx.statuses.store_ids(), vec![1]);
        Ok(())
    }
}
