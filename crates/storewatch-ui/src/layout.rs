//! HTML document shell around a page view.

use std::time::Duration;

use crate::route::STORES_PATH;
use crate::vdom::{Element, Node};

const STYLE: &str = "
body { font-family: sans-serif; margin: 0; color: #222; background: #fafafa; }
header { background: #2d3e50; color: #fff; padding: 8px 16px; }
header a { color: #fff; text-decoration: none; margin-right: 12px; }
main { padding: 16px; }
table { border-collapse: collapse; margin: 8px 0; }
th { text-align: left; padding: 2px 12px 2px 0; font-weight: normal; color: #666; }
td { padding: 2px 0; }
.stores-list, .node-stores { list-style: none; padding: 0; }
.charts::after { content: \"\"; display: block; clear: both; }
.chart { margin: 0 16px 16px 0; }
.linegraph-plot { background: #fff; border: 1px solid #ddd; }
.linegraph-plot polyline { stroke: #1f77b4; stroke-width: 1.5; }
.linegraph-plot .series-1 { stroke: #ff7f0e; }
.axis-label { font-size: 10px; fill: #666; }
.empty, .linegraph-stale, .refresh-error { color: #a33; }
";

/// Full HTML document for `body`, reloading itself every `refresh`.
#[must_use]
pub fn document(title: &str, body: Node, refresh: Duration) -> String {
    let refresh_secs = refresh.as_secs().max(1);
    let html = Element::new("html")
        .attr("lang", "en")
        .child(
            Element::new("head")
                .child(Element::new("meta").attr("charset", "utf-8"))
                .child(
                    Element::new("meta")
                        .attr("http-equiv", "refresh")
                        .attr("content", refresh_secs.to_string()),
                )
                .child(Element::new("title").child(format!("{title} - Storewatch")))
                .child(Element::new("style").child(crate::vdom::trust(STYLE))),
        )
        .child(
            Element::new("body")
                .child(
                    Element::new("header").child(
                        Element::new("a")
                            .attr("href", STORES_PATH)
                            .child("Storewatch"),
                    ),
                )
                .child(Element::new("main").child(body)),
        );
    format!("<!DOCTYPE html>{}", Node::from(html).render_html())
}
