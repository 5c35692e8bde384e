//! Node page: the stores a node hosts.

use std::sync::Arc;

use storewatch_status::StoreStatuses;
use tracing::debug;

use crate::components::format::{format_bytes, format_percent};
use crate::pages::{Page, PageContext, spawn_status_refresh};
use crate::route::{Route, RouteParams, parse_id, store_href};
use crate::schedule::{TimerHandle, TimerTask};
use crate::vdom::{Element, Node, trust};

/// Controller for `/nodes/{node_id}`.
pub struct NodePage {
    ctx: PageContext,
    node_id: String,
    timer: Option<TimerHandle>,
}

impl NodePage {
    /// Refresh the status collection now and every refresh interval after.
    #[must_use]
    pub fn controller(ctx: PageContext, params: &RouteParams) -> Self {
        let node_id = params.param("node_id").unwrap_or_default().to_string();
        let statuses = Arc::clone(&ctx.statuses);
        let metrics = ctx.metrics.clone();
        let refresh: TimerTask = Arc::new(move || spawn_status_refresh(&statuses, &metrics));
        refresh();
        let timer = ctx.scheduler.every(ctx.refresh_interval, refresh);
        debug!(node_id = %node_id, timer = timer.id(), "node page mounted");
        Self {
            ctx,
            node_id,
            timer: Some(timer),
        }
    }

    /// Node id captured from the route at construction.
    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

impl Page for NodePage {
    fn route(&self) -> Route {
        Route::Node {
            node_id: self.node_id.clone(),
        }
    }

    fn title(&self) -> String {
        format!("Node {}", self.node_id)
    }

    fn view(&self) -> Node {
        view(&self.ctx.statuses, &self.node_id)
    }

    fn unload(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

/// Heading plus one bullet per hosted store.
#[must_use]
pub fn view(statuses: &StoreStatuses, node_id: &str) -> Node {
    let stores = parse_id(node_id)
        .map(|id| statuses.stores_on_node(id))
        .unwrap_or_default();

    let mut page = Element::new("div")
        .class("page node-page")
        .child(Element::new("h2").child("Node Status"))
        .child(Element::new("h3").child(format!("Node: {node_id}")));
    if stores.is_empty() {
        return page
            .child(
                Element::new("div")
                    .class("node-stores empty")
                    .child(Element::new("p").child(format!(
                        "No stores are reported for node {node_id}."
                    ))),
            )
            .into();
    }

    let items = stores.iter().map(|desc| {
        Element::new("li")
            .key(desc.store_id.to_string())
            .child(trust("&nbsp;&bull;&nbsp;"))
            .child(
                Element::new("a")
                    .attr("href", store_href(desc.store_id))
                    .child(format!("Store:{}", desc.store_id)),
            )
            .child(format!(
                " using {} of {}",
                format_percent(desc.capacity.used_fraction()),
                format_bytes(desc.capacity.capacity)
            ))
    });
    page = page.child(Element::new("ul").class("node-stores").children(items));
    page.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::testing::{harness, settle};
    use anyhow::Result;
    use storewatch_status::memory::store_status;

    #[tokio::test]
    async fn lists_only_stores_on_the_node() -> Result<()> {
        let h = harness()?;
        h.source
            .set_stores(vec![store_status(1, 1), store_status(2, 2), store_status(3, 1)]);
        let params = RouteParams::default().with("node_id", "1");
        let mut page = NodePage::controller(h.ctx.clone(), &params);
        settle(|| h.ctx.statuses.store_ids().len() == 3).await?;

        let node = page.view();
        assert_eq!(node.find_all("h3")[0].text_content(), "Node: 1");
        let hrefs: Vec<Option<&str>> = node
            .find_all("a")
            .into_iter()
            .map(|link| link.attr_value("href"))
            .collect();
        assert_eq!(hrefs, vec![Some("/stores/1"), Some("/stores/3")]);

        page.unload();
        assert_eq!(h.scheduler.active_timers(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_node_renders_empty_state() -> Result<()> {
        let h = harness()?;
        h.source.set_stores(vec![store_status(1, 1)]);
        let page = NodePage::controller(h.ctx.clone(), &RouteParams::default().with("node_id", "x"));
        settle(|| !h.ctx.statuses.is_empty()).await?;

        let node = page.view();
        assert!(node.find_all("li").is_empty());
        assert!(node.text_content().contains("No stores are reported for node x."));
        Ok(())
    }
}
