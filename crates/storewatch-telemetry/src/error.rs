//! Failures raised while wiring up dashboard logging and metrics.

use thiserror::Error;
use tracing_subscriber::util::TryInitError;

use crate::init::LogFormat;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Step of collector setup that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorStage {
    /// Constructing the collector from its options.
    Build,
    /// Adding the collector to the dashboard registry.
    Register,
}

/// Errors raised by telemetry helpers.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log subscriber could not be installed; another one is already global.
    #[error("dashboard log subscriber could not be installed")]
    LogSubscriber {
        /// Format that was being installed.
        format: LogFormat,
        /// Underlying subscriber error.
        source: TryInitError,
    },
    /// A dashboard metric could not be built or registered.
    #[error("dashboard metric could not be set up")]
    MetricSetup {
        /// Metric name.
        metric: &'static str,
        /// Setup step that failed.
        stage: CollectorStage,
        /// Underlying Prometheus error.
        source: prometheus::Error,
    },
    /// The `/metrics` exposition could not be encoded.
    #[error("metrics exposition could not be encoded")]
    Exposition {
        /// Underlying Prometheus error.
        source: prometheus::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn metric_failures_keep_the_prometheus_cause() {
        let setup = TelemetryError::MetricSetup {
            metric: "page_mounts_total",
            stage: CollectorStage::Build,
            source: prometheus::Error::Msg("bad label".to_string()),
        };
        assert_eq!(setup.to_string(), "dashboard metric could not be set up");
        assert_eq!(
            setup.source().map(ToString::to_string).as_deref(),
            Some("bad label")
        );

        let exposition = TelemetryError::Exposition {
            source: prometheus::Error::Msg("truncated".to_string()),
        };
        assert_eq!(
            exposition.to_string(),
            "metrics exposition could not be encoded"
        );
        assert!(exposition.source().is_some());
    }
}
