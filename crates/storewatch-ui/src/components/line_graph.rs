//! Line graph over a cached time-series result.
//!
//! # Design
//! - Reads whatever the cache holds right now; never triggers a query.
//! - Every series shares one time axis and one value axis so lines compare.
//! - The value axis starts at zero unless a series goes negative.

use std::fmt::Write as _;

use storewatch_api_models::{QueryResultSet, TimeSeriesDatapoint};
use storewatch_status::QueryCache;

use crate::components::format::format_axis;
use crate::vdom::{Element, Node};

/// Horizontal size of the plot in SVG user units.
pub const WIDTH: u32 = 320;
/// Vertical size of the plot in SVG user units.
pub const HEIGHT: u32 = 160;
const PAD: f64 = 14.0;

/// Renders one cached query as an SVG line chart.
pub struct LineGraph;

impl LineGraph {
    /// Build the graph for `cache`'s latest result, or a placeholder.
    #[must_use]
    pub fn create(cache: &QueryCache<QueryResultSet>) -> Node {
        let error = cache.error();
        let Some(result) = cache.result() else {
            return match error {
                Some(error) => placeholder("error", &format!("Unable to load data: {error}")),
                None => placeholder("loading", "Loading..."),
            };
        };
        let Some(bounds) = Bounds::of(&result) else {
            return placeholder("empty", "No data");
        };

        let mut plot = Element::new("svg")
            .class("linegraph-plot")
            .attr("width", WIDTH.to_string())
            .attr("height", HEIGHT.to_string())
            .attr("viewBox", format!("0 0 {WIDTH} {HEIGHT}"))
            .child(axis_label("max", PAD, PAD - 4.0, bounds.v_max))
            .child(axis_label("min", PAD, f64::from(HEIGHT) - 2.0, bounds.v_min));
        for (index, series) in result.results.iter().enumerate() {
            if series.datapoints.is_empty() {
                continue;
            }
            plot = plot.child(
                Element::new("polyline")
                    .class(format!("series series-{index}"))
                    .attr("fill", "none")
                    .attr("points", bounds.points(&series.datapoints))
                    .child(Element::new("title").child(series.name.as_str())),
            );
        }

        let mut graph = Element::new("div").class("linegraph").child(plot);
        if let Some(error) = error {
            graph = graph.child(
                Element::new("p")
                    .class("linegraph-stale")
                    .child(format!("Showing last good data: {error}")),
            );
        }
        graph.into()
    }
}

fn placeholder(state: &str, message: &str) -> Node {
    Element::new("div")
        .class(format!("linegraph {state}"))
        .child(Element::new("p").child(message))
        .into()
}

fn axis_label(which: &str, x: f64, y: f64, value: f64) -> Element {
    Element::new("text")
        .class(format!("axis-label {which}"))
        .attr("x", format!("{x:.1}"))
        .attr("y", format!("{y:.1}"))
        .child(format_axis(value))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    t_min: i64,
    t_max: i64,
    v_min: f64,
    v_max: f64,
}

impl Bounds {
    fn of(result: &QueryResultSet) -> Option<Self> {
        let mut points = result
            .results
            .iter()
            .flat_map(|series| series.datapoints.iter())
            .filter(|point| point.value.is_finite());
        let first = points.next()?;
        let mut bounds = Self {
            t_min: first.timestamp_nanos,
            t_max: first.timestamp_nanos,
            v_min: first.value.min(0.0),
            v_max: first.value,
        };
        for point in points {
            bounds.t_min = bounds.t_min.min(point.timestamp_nanos);
            bounds.t_max = bounds.t_max.max(point.timestamp_nanos);
            bounds.v_min = bounds.v_min.min(point.value);
            bounds.v_max = bounds.v_max.max(point.value);
        }
        if bounds.v_max <= bounds.v_min {
            bounds.v_max = bounds.v_min + 1.0;
        }
        Some(bounds)
    }

    #[allow(clippy::cast_precision_loss)]
    fn x(&self, timestamp_nanos: i64) -> f64 {
        let width = f64::from(WIDTH) - 2.0 * PAD;
        let span = self.t_max.saturating_sub(self.t_min);
        if span == 0 {
            return PAD + width / 2.0;
        }
        let offset = timestamp_nanos.saturating_sub(self.t_min) as f64;
        PAD + offset / span as f64 * width
    }

    fn y(&self, value: f64) -> f64 {
        let height = f64::from(HEIGHT) - 2.0 * PAD;
        let share = (value - self.v_min) / (self.v_max - self.v_min);
        f64::from(HEIGHT) - PAD - share * height
    }

    fn points(&self, datapoints: &[TimeSeriesDatapoint]) -> String {
        let mut out = String::new();
        for point in datapoints.iter().filter(|point| point.value.is_finite()) {
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = write!(
                out,
                "{:.1},{:.1}",
                self.x(point.timestamp_nanos),
                self.y(point.value)
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use storewatch_api_models::{QueryAggregator, TimeSeriesQueryResult};
    use storewatch_status::StatusError;

    fn series(name: &str, points: &[(i64, f64)]) -> TimeSeriesQueryResult {
        TimeSeriesQueryResult {
            name: name.to_string(),
            aggregator: QueryAggregator::Avg,
            datapoints: points
                .iter()
                .map(|&(timestamp_nanos, value)| TimeSeriesDatapoint {
                    timestamp_nanos,
                    value,
                })
                .collect(),
        }
    }

    fn cache_with(
        results: Vec<TimeSeriesQueryResult>,
        fail: Arc<AtomicBool>,
    ) -> QueryCache<QueryResultSet> {
        QueryCache::from_fn(move || {
            let failing = fail.load(Ordering::SeqCst);
            let results = results.clone();
            async move {
                if failing {
                    Err(StatusError::HttpStatus {
                        operation: "ts.query",
                        url: "memory://ts/query".to_string(),
                        status: 503,
                    })
                } else {
                    Ok(QueryResultSet { results })
                }
            }
        })
    }

    #[test]
    fn placeholder_before_first_result() {
        let cache = cache_with(Vec::new(), Arc::new(AtomicBool::new(false)));
        let node = LineGraph::create(&cache);
        assert!(node.find_all("svg").is_empty());
        assert_eq!(node.text_content(), "Loading...");
    }

    #[tokio::test]
    async fn error_without_result_renders_error_text() {
        let cache = cache_with(Vec::new(), Arc::new(AtomicBool::new(true)));
        assert!(cache.refresh().await.is_err());
        let node = LineGraph::create(&cache);
        assert!(node.text_content().starts_with("Unable to load data"));
        assert_eq!(node.find_by_class("error").len(), 1);
    }

    #[tokio::test]
    async fn empty_series_render_no_data() -> Result<()> {
        let cache = cache_with(
            vec![series("cr.store.keycount.1", &[])],
            Arc::new(AtomicBool::new(false)),
        );
        cache.refresh().await?;
        assert_eq!(LineGraph::create(&cache).text_content(), "No data");
        Ok(())
    }

    #[tokio::test]
    async fn plots_one_polyline_per_series_with_scaled_points() -> Result<()> {
        let cache = cache_with(
            vec![
                series("a", &[(0, 0.0), (100, 10.0)]),
                series("b", &[(50, 5.0)]),
            ],
            Arc::new(AtomicBool::new(false)),
        );
        cache.refresh().await?;
        let node = LineGraph::create(&cache);

        let lines = node.find_all("polyline");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].attr_value("points"), Some("14.0,146.0 306.0,14.0"));
        assert_eq!(lines[1].attr_value("points"), Some("160.0,80.0"));
        let labels: Vec<String> = node
            .find_all("text")
            .into_iter()
            .map(Element::text_content)
            .collect();
        assert_eq!(labels, vec!["10", "0"]);
        Ok(())
    }

    #[tokio::test]
    async fn failed_refresh_keeps_plot_and_flags_staleness() -> Result<()> {
        let fail = Arc::new(AtomicBool::new(false));
        let cache = cache_with(vec![series("a", &[(0, 1.0), (10, 2.0)])], Arc::clone(&fail));
        cache.refresh().await?;
        fail.store(true, Ordering::SeqCst);
        assert!(cache.refresh().await.is_err());

        let node = LineGraph::create(&cache);
        assert_eq!(node.find_all("polyline").len(), 1);
        assert_eq!(node.find_by_class("linegraph-stale").len(), 1);
        Ok(())
    }
}
