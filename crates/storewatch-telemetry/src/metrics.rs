//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counts page mounts, refresh outcomes and live timers so leaks show up on `/metrics`.

use std::sync::Arc;

use prometheus::{IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{CollectorStage, Result, TelemetryError};

/// Prometheus-backed metrics registry shared across the dashboard.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    status_refresh_total: IntCounterVec,
    page_mounts_total: IntCounterVec,
    active_timers: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Repeating refresh timers currently scheduled.
    pub active_timers: i64,
    /// Successful refreshes across every target.
    pub refresh_ok_total: u64,
    /// Failed refreshes across every target.
    pub refresh_error_total: u64,
}

/// Outcome label recorded for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The refresh applied new data.
    Ok,
    /// The refresh failed and left the previous data in place.
    Error,
}

impl RefreshOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// What a refresh was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTarget {
    /// The shared store status collection.
    Stores,
    /// A chart's query result cache.
    Chart,
}

impl RefreshTarget {
    const ALL: [Self; 2] = [Self::Stores, Self::Chart];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Stores => "stores",
            Self::Chart => "chart",
        }
    }
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests received"),
            &["route", "code"],
        )
        .map_err(|source| setup_failed("http_requests_total", CollectorStage::Build, source))?;
        let status_refresh_total = IntCounterVec::new(
            Opts::new(
                "status_refresh_total",
                "Status collection and chart refreshes by target and outcome",
            ),
            &["target", "outcome"],
        )
        .map_err(|source| setup_failed("status_refresh_total", CollectorStage::Build, source))?;
        let page_mounts_total = IntCounterVec::new(
            Opts::new("page_mounts_total", "Page controllers constructed by page"),
            &["page"],
        )
        .map_err(|source| setup_failed("page_mounts_total", CollectorStage::Build, source))?;
        let active_timers = IntGauge::with_opts(Opts::new(
            "active_timers",
            "Repeating refresh timers currently scheduled",
        ))
        .map_err(|source| setup_failed("active_timers", CollectorStage::Build, source))?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "status_refresh_total", &status_refresh_total)?;
        register(&registry, "page_mounts_total", &page_mounts_total)?;
        register(&registry, "active_timers", &active_timers)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                status_refresh_total,
                page_mounts_total,
                active_timers,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Record the outcome of a refresh.
    pub fn inc_refresh(&self, target: RefreshTarget, outcome: RefreshOutcome) {
        self.inner
            .status_refresh_total
            .with_label_values(&[target.as_str(), outcome.as_str()])
            .inc();
    }

    /// Record a page controller construction.
    pub fn inc_page_mount(&self, page: &str) {
        self.inner.page_mounts_total.with_label_values(&[page]).inc();
    }

    /// Note that a repeating timer was scheduled.
    pub fn timer_started(&self) {
        self.inner.active_timers.inc();
    }

    /// Note that a repeating timer was cancelled.
    pub fn timer_stopped(&self) {
        self.inner.active_timers.dec();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded.
    pub fn render(&self) -> Result<String> {
        TextEncoder::new()
            .encode_to_string(&self.inner.registry.gather())
            .map_err(|source| TelemetryError::Exposition { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = |outcome: RefreshOutcome| -> u64 {
            RefreshTarget::ALL
                .iter()
                .map(|target| {
                    self.inner
                        .status_refresh_total
                        .with_label_values(&[target.as_str(), outcome.as_str()])
                        .get()
                })
                .sum()
        };
        MetricsSnapshot {
            active_timers: self.inner.active_timers.get(),
            refresh_ok_total: total(RefreshOutcome::Ok),
            refresh_error_total: total(RefreshOutcome::Error),
        }
    }
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| setup_failed(name, CollectorStage::Register, source))
}

const fn setup_failed(
    metric: &'static str,
    stage: CollectorStage,
    source: prometheus::Error,
) -> TelemetryError {
    TelemetryError::MetricSetup {
        metric,
        stage,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_http_request("/stores", 200);
        metrics.inc_refresh(RefreshTarget::Stores, RefreshOutcome::Ok);
        metrics.inc_refresh(RefreshTarget::Chart, RefreshOutcome::Ok);
        metrics.inc_refresh(RefreshTarget::Stores, RefreshOutcome::Error);
        metrics.inc_page_mount("store");
        metrics.timer_started();
        metrics.timer_started();
        metrics.timer_stopped();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.active_timers, 1);
        assert_eq!(snapshot.refresh_ok_total, 2);
        assert_eq!(snapshot.refresh_error_total, 1);

        let rendered = metrics.render()?;
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("page_mounts_total"));
        assert!(rendered.contains("active_timers 1"));
        Ok(())
    }

    #[test]
    fn duplicate_registration_names_the_metric() -> Result<()> {
        let registry = Registry::new();
        let mounts = IntCounterVec::new(Opts::new("page_mounts_total", "mounts"), &["page"])
            .map_err(|source| setup_failed("page_mounts_total", CollectorStage::Build, source))?;
        register(&registry, "page_mounts_total", &mounts)?;

        let err = register(&registry, "page_mounts_total", &mounts);
        assert!(matches!(
            err,
            Err(TelemetryError::MetricSetup {
                metric: "page_mounts_total",
                stage: CollectorStage::Register,
                ..
            })
        ));
        Ok(())
    }
}
