//! Stores list page.

use std::sync::Arc;

use storewatch_status::StoreStatuses;
use tracing::debug;

use crate::components::all_details;
use crate::pages::{Page, PageContext, spawn_status_refresh};
use crate::route::{Route, node_href, store_href};
use crate::schedule::{TimerHandle, TimerTask};
use crate::vdom::{Element, Node, trust};

/// Controller for `/stores`.
pub struct StoresPage {
    ctx: PageContext,
    timer: Option<TimerHandle>,
}

impl StoresPage {
    /// Refresh the status collection now and every refresh interval after.
    #[must_use]
    pub fn controller(ctx: PageContext) -> Self {
        let statuses = Arc::clone(&ctx.statuses);
        let metrics = ctx.metrics.clone();
        let refresh: TimerTask = Arc::new(move || spawn_status_refresh(&statuses, &metrics));
        refresh();
        let timer = ctx.scheduler.every(ctx.refresh_interval, refresh);
        debug!(timer = timer.id(), "stores page mounted");
        Self {
            ctx,
            timer: Some(timer),
        }
    }

    /// True while the repeating refresh is scheduled.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.timer.is_some()
    }
}

impl Page for StoresPage {
    fn route(&self) -> Route {
        Route::Stores
    }

    fn title(&self) -> String {
        "Stores".to_string()
    }

    fn view(&self) -> Node {
        view(&self.ctx.statuses)
    }

    fn unload(&mut self) {
        if let Some(timer) = self.timer.take() {
            debug!(timer = timer.id(), "stores page unloaded");
            timer.cancel();
        }
    }
}

/// One bullet per known store, then the cluster totals.
#[must_use]
pub fn view(statuses: &StoreStatuses) -> Node {
    let items = statuses.store_ids().into_iter().filter_map(|store_id| {
        let desc = statuses.desc(store_id)?;
        let node_id = desc.node.node_id;
        Some(
            Element::new("li")
                .key(store_id.to_string())
                .child(trust("&nbsp;&bull;&nbsp;"))
                .child(
                    Element::new("a")
                        .attr("href", store_href(store_id))
                        .child(format!("Store:{store_id}")),
                )
                .child(" on ")
                .child(
                    Element::new("a")
                        .attr("href", node_href(node_id))
                        .child(format!("Node:{node_id}")),
                )
                .child(format!(" with Address:{}", desc.node.address.label())),
        )
    });

    Element::new("div")
        .class("page stores-page")
        .child(Element::new("h2").child("Stores List"))
        .child(Element::new("ul").class("stores-list").children(items))
        .child(all_details(statuses))
        .into()
}
