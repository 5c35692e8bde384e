//! Router construction and server host for the dashboard.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::{MatchedPath, Path, State},
    http::{Request, StatusCode, header::CONTENT_TYPE},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Serialize;
use storewatch_telemetry::{HEADER_REQUEST_ID, Metrics, MetricsSnapshot, build_sha};
use storewatch_ui::route::STORES_PATH;
use storewatch_ui::vdom::Element;
use storewatch_ui::{Route, document};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{Span, error, info};

use crate::error::{AppError, AppResult};
use crate::host::PageHost;

/// Axum router wrapper that serves the dashboard pages.
pub struct DashboardServer {
    router: Router,
}

impl DashboardServer {
    /// Build the router around `host`.
    #[must_use]
    pub fn new(host: Arc<PageHost>) -> Self {
        let telemetry = host.context().metrics.clone();
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(|response: &Response, latency: Duration, span: &Span| {
                span.record("status_code", response.status().as_u16());
                let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                span.record("latency_ms", latency_ms);
            });
        let layered = ServiceBuilder::new()
            .layer(storewatch_telemetry::propagate_request_id_layer())
            .layer(storewatch_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(middleware::from_fn_with_state(telemetry, count_requests));

        let router = Router::new()
            .route("/", get(root))
            .route("/stores", get(stores_page))
            .route("/stores/{store_id}", get(store_page))
            .route("/nodes/{node_id}", get(node_page))
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route_layer(layered)
            .fallback(not_found)
            .with_state(host);
        Self { router }
    }

    /// Serve on `addr` until ctrl-c.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> AppResult<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| AppError::io("listener.bind", err))?;
        info!(addr = %addr, "dashboard listening");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|err| AppError::io("server.serve", err))
    }

    /// Router for in-process requests.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Count each routed request under its route template; every store page
/// shares the `/stores/{store_id}` series.
async fn count_requests(
    State(metrics): State<Metrics>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |matched| matched.as_str().to_string());
    let response = next.run(request).await;
    metrics.inc_http_request(&route, response.status().as_u16());
    response
}

async fn root() -> Redirect {
    Redirect::to(STORES_PATH)
}

async fn stores_page(State(host): State<Arc<PageHost>>) -> Html<String> {
    page_response(&host, &Route::Stores)
}

async fn store_page(
    State(host): State<Arc<PageHost>>,
    Path(store_id): Path<String>,
) -> Html<String> {
    page_response(&host, &Route::Store { store_id })
}

async fn node_page(
    State(host): State<Arc<PageHost>>,
    Path(node_id): Path<String>,
) -> Html<String> {
    page_response(&host, &Route::Node { node_id })
}

fn page_response(host: &PageHost, route: &Route) -> Html<String> {
    let page = host.render(route);
    Html(document(
        &page.title,
        page.body,
        host.context().refresh_interval,
    ))
}

async fn not_found() -> impl IntoResponse {
    let body = Element::new("div")
        .class("page not-found")
        .child(Element::new("h2").child("Not Found"))
        .child(
            Element::new("p").child(
                Element::new("a")
                    .attr("href", STORES_PATH)
                    .child("Back to the stores list"),
            ),
        );
    (
        StatusCode::NOT_FOUND,
        Html(document("Not Found", body.into(), Duration::from_secs(3600))),
    )
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) build: String,
    pub(crate) mounted: Vec<String>,
    pub(crate) stores: usize,
    pub(crate) last_refresh: Option<String>,
    pub(crate) last_error: Option<String>,
    pub(crate) metrics: MetricsSnapshot,
}

async fn health(State(host): State<Arc<PageHost>>) -> Json<HealthResponse> {
    let statuses = &host.context().statuses;
    let last_error = statuses.last_error();
    Json(HealthResponse {
        status: if last_error.is_some() { "degraded" } else { "ok" },
        build: build_sha().to_string(),
        mounted: host
            .mounted_routes()
            .iter()
            .map(Route::path)
            .collect(),
        stores: statuses.store_ids().len(),
        last_refresh: statuses.last_refreshed().map(|time| time.to_rfc3339()),
        last_error,
        metrics: host.context().metrics.snapshot(),
    })
}

async fn metrics(State(host): State<Arc<PageHost>>) -> Response {
    match host.context().metrics.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(Body::from(body))
            .unwrap_or_else(|err| {
                error!(error = %err, "failed to build metrics response");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::body::to_bytes;
    use axum::http::header::LOCATION;
    use storewatch_status::StatusSource;
    use storewatch_status::memory::{InMemoryStatusSource, store_status};
    use storewatch_telemetry::Metrics;
    use storewatch_ui::{ManualScheduler, PageContext};
    use tower::ServiceExt;

    struct Fixture {
        host: Arc<PageHost>,
        scheduler: ManualScheduler,
        source: Arc<InMemoryStatusSource>,
        router: Router,
    }

    fn fixture() -> Result<Fixture> {
        let source = Arc::new(InMemoryStatusSource::new());
        let scheduler = ManualScheduler::new();
        let ctx = PageContext::new(
            Arc::clone(&source) as Arc<dyn StatusSource>,
            Arc::new(scheduler.clone()),
            Metrics::new()?,
        );
        let host = Arc::new(PageHost::new(ctx));
        let router = DashboardServer::new(Arc::clone(&host)).router();
        Ok(Fixture {
            host,
            scheduler,
            source,
            router,
        })
    }

    async fn fetch(router: &Router, path: &str) -> Result<(StatusCode, String)> {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty())?)
            .await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, String::from_utf8(bytes.to_vec())?))
    }

    #[tokio::test]
    async fn root_redirects_to_stores() -> Result<()> {
        let f = fixture()?;
        let response = f
            .router
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty())?)
            .await?;
        assert!(response.status().is_redirection());
        assert_eq!(
            response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("/stores")
        );
        Ok(())
    }

    #[tokio::test]
    async fn stores_page_renders_document_with_refresh() -> Result<()> {
        let f = fixture()?;
        f.source.set_stores(vec![store_status(1, 1)]);
        f.host.context().statuses.refresh().await?;

        let (status, body) = fetch(&f.router, "/stores").await?;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<meta http-equiv=\"refresh\" content=\"10\">"));
        assert!(body.contains("<h2>Stores List</h2>"));
        assert!(body.contains("<a href=\"/stores/1\">Store:1</a>"));
        assert_eq!(f.host.mounted_routes(), vec![Route::Stores]);
        assert_eq!(f.scheduler.active_timers(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn viewers_of_different_routes_share_nothing() -> Result<()> {
        let f = fixture()?;
        fetch(&f.router, "/stores").await?;
        let (status, body) = fetch(&f.router, "/stores/7").await?;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h3>Store: 7</h3>"));
        assert!(body.contains("<h4>Live Value Count</h4>"));
        fetch(&f.router, "/stores").await?;
        fetch(&f.router, "/stores/7").await?;
        assert_eq!(f.scheduler.active_timers(), 2);
        assert_eq!(f.scheduler.registered_total(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn padded_store_ids_render_empty_details() -> Result<()> {
        let f = fixture()?;
        f.source.set_stores(vec![store_status(1, 1)]);
        f.host.context().statuses.refresh().await?;

        let (status, body) = fetch(&f.router, "/stores/01").await?;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("No status is available for store 01."));
        let (_, body) = fetch(&f.router, "/stores/1").await?;
        assert!(!body.contains("No status is available"));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_ids_render_empty_states() -> Result<()> {
        let f = fixture()?;
        let (status, body) = fetch(&f.router, "/stores/999").await?;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("No status is available for store 999."));

        let (status, body) = fetch(&f.router, "/nodes/abc").await?;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("No stores are reported for node abc."));
        Ok(())
    }

    #[tokio::test]
    async fn unparsable_paths_are_not_found() -> Result<()> {
        let f = fixture()?;
        let (status, _) = fetch(&f.router, "/stores/1/extra").await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = fetch(&f.router, "/ranges").await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(f.host.mounted_routes().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn health_reports_collection_state() -> Result<()> {
        let f = fixture()?;
        f.source.set_stores(vec![store_status(1, 1), store_status(2, 1)]);
        f.host.context().statuses.refresh().await?;

        let (status, body) = fetch(&f.router, "/health").await?;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body)?;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["stores"], 2);
        assert_eq!(json["mounted"], serde_json::json!([]));

        fetch(&f.router, "/stores/2").await?;
        fetch(&f.router, "/stores").await?;
        let (_, body) = fetch(&f.router, "/health").await?;
        let json: serde_json::Value = serde_json::from_str(&body)?;
        assert_eq!(json["mounted"], serde_json::json!(["/stores", "/stores/2"]));
        Ok(())
    }

    #[tokio::test]
    async fn metrics_count_requests_by_route_template() -> Result<()> {
        let f = fixture()?;
        fetch(&f.router, "/stores/1").await?;
        fetch(&f.router, "/stores/2").await?;
        fetch(&f.router, "/").await?;
        fetch(&f.router, "/ranges").await?;

        let (status, body) = fetch(&f.router, "/metrics").await?;
        assert_eq!(status, StatusCode::OK);
        assert!(body.lines().any(|line| {
            line.starts_with("http_requests_total{")
                && line.contains("route=\"/stores/{store_id}\"")
                && line.contains("code=\"200\"")
                && line.ends_with(" 2")
        }));
        assert!(body.lines().any(|line| {
            line.contains("route=\"/\"") && line.contains("code=\"303\"")
        }));
        assert!(!body.contains("/ranges"));
        assert!(body.contains("page_mounts_total{page=\"store\"} 2"));
        Ok(())
    }
}
