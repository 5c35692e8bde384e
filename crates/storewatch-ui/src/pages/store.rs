//! Single store page: detail table plus one chart per store metric.

use std::sync::Arc;

use storewatch_api_models::QueryResultSet;
use storewatch_status::{Query, QueryCache, Selector, StoreStatuses, store_metric};
use tracing::debug;

use crate::components::{LineGraph, store_details};
use crate::pages::{Page, PageContext, spawn_chart_refresh, spawn_status_refresh};
use crate::route::{Route, RouteParams};
use crate::schedule::{TimerHandle, TimerTask};
use crate::vdom::{Element, Node};

/// Metric suffix and chart title for every chart on the page, in display order.
pub const STORE_CHARTS: [(&str, &str); 5] = [
    ("keycount", "Key Count"),
    ("valcount", "Value Count"),
    ("livecount", "Live Value Count"),
    ("intentcount", "Intent Count"),
    ("ranges", "Range Count"),
];

/// A chart query and the cache holding its latest result.
pub struct QueryHolder {
    query: Query,
    result: Arc<QueryCache<QueryResultSet>>,
}

impl QueryHolder {
    /// The query definition.
    #[must_use]
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Cache fed by the query.
    #[must_use]
    pub const fn result(&self) -> &Arc<QueryCache<QueryResultSet>> {
        &self.result
    }
}

/// Controller for `/stores/{store_id}`.
pub struct StorePage {
    ctx: PageContext,
    store_id: String,
    charts: Vec<QueryHolder>,
    timer: Option<TimerHandle>,
}

impl StorePage {
    /// Build the chart queries for the routed store, refresh everything once and
    /// schedule the repeating refresh.
    #[must_use]
    pub fn controller(ctx: PageContext, params: &RouteParams) -> Self {
        let store_id = params.param("store_id").unwrap_or_default().to_string();
        let charts: Vec<QueryHolder> = STORE_CHARTS
            .iter()
            .map(|(metric, title)| {
                let query = Query::new(Selector::avg(store_metric(&store_id, metric)))
                    .with_title(*title)
                    .with_window(ctx.query_window);
                let result = Arc::new(QueryCache::new(query.executor(Arc::clone(&ctx.source))));
                QueryHolder { query, result }
            })
            .collect();

        let statuses = Arc::clone(&ctx.statuses);
        let caches: Vec<Arc<QueryCache<QueryResultSet>>> = charts
            .iter()
            .map(|chart| Arc::clone(&chart.result))
            .collect();
        let metrics = ctx.metrics.clone();
        let refresh: TimerTask = Arc::new(move || {
            spawn_status_refresh(&statuses, &metrics);
            for cache in &caches {
                spawn_chart_refresh(cache, &metrics);
            }
        });
        refresh();
        let timer = ctx.scheduler.every(ctx.refresh_interval, refresh);
        debug!(store_id = %store_id, timer = timer.id(), "store page mounted");

        Self {
            ctx,
            store_id,
            charts,
            timer: Some(timer),
        }
    }

    /// Store id captured from the route at construction.
    #[must_use]
    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// Chart queries in display order.
    #[must_use]
    pub fn charts(&self) -> &[QueryHolder] {
        &self.charts
    }

    /// True while the repeating refresh is scheduled.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.timer.is_some()
    }
}

impl Page for StorePage {
    fn route(&self) -> Route {
        Route::Store {
            store_id: self.store_id.clone(),
        }
    }

    fn title(&self) -> String {
        format!("Store {}", self.store_id)
    }

    fn view(&self) -> Node {
        view(&self.ctx.statuses, &self.store_id, &self.charts)
    }

    fn unload(&mut self) {
        if let Some(timer) = self.timer.take() {
            debug!(store_id = %self.store_id, timer = timer.id(), "store page unloaded");
            timer.cancel();
        }
    }
}

/// Store heading, detail table and one floated chart block per query.
#[must_use]
pub fn view(statuses: &StoreStatuses, store_id: &str, charts: &[QueryHolder]) -> Node {
    let blocks = charts.iter().map(|chart| {
        Element::new("div")
            .class("chart")
            .style("float:left")
            .child(Element::new("h4").child(chart.query.title()))
            .child(LineGraph::create(&chart.result))
    });

    Element::new("div")
        .class("page store-page")
        .child(Element::new("h2").child("Store Status"))
        .child(Element::new("h3").child(format!("Store: {store_id}")))
        .child(store_details(statuses, store_id))
        .child(Element::new("div").class("charts").children(blocks))
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::testing::{harness, settle};
    use anyhow::Result;
    use std::time::Duration;
    use storewatch_api_models::{QueryAggregator, TimeSeriesDatapoint};
    use storewatch_status::memory::store_status;

    fn params(store_id: &str) -> RouteParams {
        RouteParams::default().with("store_id", store_id)
    }

    #[tokio::test]
    async fn builds_five_titled_queries_for_the_routed_store() -> Result<()> {
        let h = harness()?;
        let page = StorePage::controller(h.ctx.clone(), &params("3"));
        assert_eq!(page.store_id(), "3");

        let titles: Vec<&str> = page.charts().iter().map(|c| c.query().title()).collect();
        assert_eq!(
            titles,
            vec![
                "Key Count",
                "Value Count",
                "Live Value Count",
                "Intent Count",
                "Range Count"
            ]
        );
        let names: Vec<&str> = page
            .charts()
            .iter()
            .map(|c| c.query().selectors()[0].name())
            .collect();
        assert_eq!(
            names,
            vec![
                "cr.store.keycount.3",
                "cr.store.valcount.3",
                "cr.store.livecount.3",
                "cr.store.intentcount.3",
                "cr.store.ranges.3"
            ]
        );
        assert!(page.charts().iter().all(|c| {
            c.query().selectors().len() == 1
                && c.query().selectors()[0].aggregator() == QueryAggregator::Avg
        }));
        Ok(())
    }

    #[tokio::test]
    async fn each_tick_refreshes_collection_and_every_cache_once() -> Result<()> {
        let h = harness()?;
        let mut page = StorePage::controller(h.ctx.clone(), &params("1"));
        settle(|| h.source.store_fetches() == 1 && h.source.query_count() == 5).await?;
        assert_eq!(h.scheduler.periods(), vec![Duration::from_secs(10)]);
        assert!(page.charts().iter().all(|c| c.result().refresh_count() == 1));

        assert_eq!(h.scheduler.fire(), 1);
        settle(|| h.source.store_fetches() == 2 && h.source.query_count() == 10).await?;
        assert!(page.charts().iter().all(|c| c.result().refresh_count() == 2));

        page.unload();
        assert!(!page.is_active());
        assert_eq!(h.scheduler.active_timers(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn view_renders_details_and_one_chart_per_query() -> Result<()> {
        let h = harness()?;
        h.source.set_stores(vec![store_status(1, 4)]);
        h.source.set_series(
            "cr.store.keycount.1",
            vec![
                TimeSeriesDatapoint {
                    timestamp_nanos: 1,
                    value: 3.0,
                },
                TimeSeriesDatapoint {
                    timestamp_nanos: 2,
                    value: 4.0,
                },
            ],
        );
        let page = StorePage::controller(h.ctx.clone(), &params("1"));
        settle(|| {
            !h.ctx.statuses.is_empty() && page.charts().iter().all(|c| c.result().result().is_some())
        })
        .await?;

        let node = page.view();
        assert_eq!(node.find_all("h2")[0].text_content(), "Store Status");
        assert_eq!(node.find_all("h3")[0].text_content(), "Store: 1");
        assert_eq!(node.find_by_class("store-details").len(), 1);
        let charts = node.find_by_class("charts");
        assert_eq!(charts.len(), 1);
        let blocks = node.find_by_class("chart");
        assert_eq!(blocks.len(), 5);
        assert!(blocks.iter().all(|b| b.attr_value("style") == Some("float:left")));
        assert_eq!(blocks[0].child_nodes().len(), 2);
        assert_eq!(node.find_all("h4")[4].text_content(), "Range Count");
        assert_eq!(node.find_all("polyline").len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_store_renders_empty_state_with_charts() -> Result<()> {
        let h = harness()?;
        h.source.set_stores(vec![store_status(1, 1)]);
        let page = StorePage::controller(h.ctx.clone(), &params("42"));
        settle(|| !h.ctx.statuses.is_empty()).await?;

        let node = page.view();
        assert_eq!(node.find_all("h3")[0].text_content(), "Store: 42");
        assert!(node.find_all("table").is_empty());
        let details = node.find_by_class("store-details");
        assert!(details.len() == 1 && details[0].has_class("empty"));
        assert_eq!(node.find_by_class("chart").len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn route_reflects_the_captured_store_id() -> Result<()> {
        let h = harness()?;
        let page = StorePage::controller(h.ctx.clone(), &params("8"));
        assert_eq!(
            page.route(),
            Route::Store {
                store_id: "8".to_string()
            }
        );
        assert_eq!(page.title(), "Store 8");
        Ok(())
    }
}
