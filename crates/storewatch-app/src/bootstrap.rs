use std::sync::Arc;

use storewatch_status::{HttpStatusClient, StatusSource};
use storewatch_telemetry::{DEFAULT_LOG_LEVEL, GlobalContextGuard, LoggingConfig, Metrics};
use storewatch_ui::{PageContext, TokioScheduler};
use tracing::info;

use crate::config::DashboardConfig;
use crate::error::{AppError, AppResult};
use crate::host::PageHost;
use crate::server::DashboardServer;

/// Dependencies required to bootstrap the dashboard.
pub(crate) struct BootstrapDependencies {
    logging: LoggingConfig<'static>,
    config: DashboardConfig,
    source: Arc<dyn StatusSource>,
    telemetry: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        Self::from_config(DashboardConfig::from_env()?)
    }

    /// Construct dependencies for an already resolved configuration.
    pub(crate) fn from_config(config: DashboardConfig) -> AppResult<Self> {
        let logging = LoggingConfig {
            level: DEFAULT_LOG_LEVEL,
            format: config.log_format,
            ..LoggingConfig::default()
        };
        let client = HttpStatusClient::new(&config.status_url, config.request_timeout)
            .map_err(|err| AppError::status("status_client.new", err))?;
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self {
            logging,
            config,
            source: Arc::new(client),
            telemetry,
        })
    }

    /// Page host wired to these dependencies and a tokio-backed scheduler.
    pub(crate) fn page_host(&self) -> PageHost {
        let scheduler = TokioScheduler::with_metrics(self.telemetry.clone());
        let ctx = PageContext::new(
            Arc::clone(&self.source),
            Arc::new(scheduler),
            self.telemetry.clone(),
        )
        .with_refresh_interval(self.config.refresh_interval)
        .with_query_window(self.config.query_window);
        PageHost::new(ctx)
    }
}

/// Load configuration from the environment, then serve the dashboard until shutdown.
///
/// # Errors
///
/// Returns an error when configuration is invalid, logging cannot be installed,
/// or the listener fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    storewatch_telemetry::init_logging(&dependencies.logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("dashboard");

    let config = &dependencies.config;
    info!(
        status_url = %config.status_url,
        refresh_secs = config.refresh_interval.as_secs(),
        query_window_secs = config.query_window.as_secs(),
        "Storewatch dashboard starting"
    );

    let host = Arc::new(dependencies.page_host());
    let sweep = config.idle_unmount.map(|idle| host.spawn_idle_sweep(idle));
    let server = DashboardServer::new(Arc::clone(&host));

    let serve_result = server.serve(config.socket_addr()).await;

    if let Some(sweep) = sweep {
        sweep.abort();
    }
    host.unmount_all();
    serve_result?;
    info!("dashboard shutdown complete");
    Ok(())
}
