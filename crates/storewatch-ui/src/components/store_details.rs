//! Detail tables built from the shared status collection.

use storewatch_api_models::{MvccStats, StoreStatus};
use storewatch_status::{StoreStatuses, StoreTotals};

use crate::components::format::{format_bytes, format_count, format_percent, format_time};
use crate::route::{node_href, parse_id};
use crate::vdom::{Element, Node};

/// Detail table for one store, or an empty state when it is unknown.
///
/// `store_id` is taken as it appears in the route; ids that are not in
/// canonical decimal form are treated as unknown.
#[must_use]
pub fn store_details(statuses: &StoreStatuses, store_id: &str) -> Node {
    let status = parse_id(store_id).and_then(|id| statuses.details(id));
    let Some(status) = status else {
        return empty_state(
            "store-details",
            &format!("No status is available for store {store_id}."),
            statuses.last_error(),
        );
    };

    let mut rows = vec![
        row_link(
            "Node",
            format!("Node:{}", status.desc.node.node_id),
            node_href(status.desc.node.node_id),
        ),
        row("Address", status.desc.node.address.label()),
        row("Attributes", attributes(&status)),
        row("Started", format_time(status.started())),
        row("Updated", format_time(status.updated())),
        row("Ranges", format_count(i64::from(status.range_count))),
        row("Leader Ranges", format_count(i64::from(status.leader_range_count))),
        row(
            "Replicated Ranges",
            format_count(i64::from(status.replicated_range_count)),
        ),
        row(
            "Available Ranges",
            format_count(i64::from(status.available_range_count)),
        ),
    ];
    rows.extend(stats_rows(&status.stats));
    rows.extend([
        row("Capacity", format_bytes(status.desc.capacity.capacity)),
        row("Available", format_bytes(status.desc.capacity.available)),
        row("Used", format_percent(status.desc.capacity.used_fraction())),
    ]);

    Element::new("div")
        .class("store-details")
        .child(Element::new("table").children(rows))
        .into()
}

/// Totals across every known store, or an empty state before the first load.
#[must_use]
pub fn all_details(statuses: &StoreStatuses) -> Node {
    let totals: StoreTotals = statuses.all_details();
    if totals.store_count == 0 {
        return empty_state(
            "all-details",
            "No stores have reported yet.",
            statuses.last_error(),
        );
    }

    let mut rows = vec![
        row("Stores", format_count(count(totals.store_count))),
        row("Nodes", format_count(count(totals.node_count))),
        row("Ranges", format_count(totals.range_count)),
        row("Leader Ranges", format_count(totals.leader_range_count)),
        row("Replicated Ranges", format_count(totals.replicated_range_count)),
        row("Available Ranges", format_count(totals.available_range_count)),
    ];
    rows.extend(stats_rows(&totals.stats));
    rows.extend([
        row("Capacity", format_bytes(totals.capacity.capacity)),
        row("Available", format_bytes(totals.capacity.available)),
        row("Used", format_percent(totals.capacity.used_fraction())),
    ]);

    Element::new("div")
        .class("all-details")
        .child(Element::new("h3").child("Totals"))
        .child(Element::new("table").children(rows))
        .into()
}

fn stats_rows(stats: &MvccStats) -> Vec<Element> {
    vec![
        row("Live Bytes", format_bytes(stats.live_bytes)),
        row("Key Bytes", format_bytes(stats.key_bytes)),
        row("Value Bytes", format_bytes(stats.val_bytes)),
        row("Intent Bytes", format_bytes(stats.intent_bytes)),
        row("System Bytes", format_bytes(stats.sys_bytes)),
        row("Key Count", format_count(stats.key_count)),
        row("Value Count", format_count(stats.val_count)),
        row("Live Count", format_count(stats.live_count)),
        row("Intent Count", format_count(stats.intent_count)),
        row("System Count", format_count(stats.sys_count)),
    ]
}

fn attributes(status: &StoreStatus) -> String {
    let attrs: Vec<&str> = status
        .desc
        .node
        .attrs
        .attrs
        .iter()
        .chain(status.desc.attrs.attrs.iter())
        .map(String::as_str)
        .collect();
    if attrs.is_empty() {
        "-".to_string()
    } else {
        attrs.join(", ")
    }
}

fn count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn row(label: &str, value: impl Into<Node>) -> Element {
    Element::new("tr")
        .child(Element::new("th").child(label))
        .child(Element::new("td").child(value))
}

fn row_link(label: &str, text: String, href: String) -> Element {
    row(label, Element::new("a").attr("href", href).child(text))
}

fn empty_state(class: &str, message: &str, error: Option<String>) -> Node {
    let mut block = Element::new("div")
        .class(format!("{class} empty"))
        .child(Element::new("p").child(message));
    if let Some(error) = error {
        block = block.child(
            Element::new("p")
                .class("refresh-error")
                .child(format!("Last refresh failed: {error}")),
        );
    }
    block.into()
}
