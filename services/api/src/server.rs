use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use ngo_nearby::config::AppConfig;
use ngo_nearby::error::AppError;
use ngo_nearby::telemetry;
use ngo_nearby::workflows::nearby::http_orchestrator;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let categories: Vec<&str> = config.search.categories.keys().collect();
    info!(
        ?categories,
        concurrency = config.search.concurrency,
        limit = config.search.limit,
        "nearby search configured"
    );

    let orchestrator = Arc::new(http_orchestrator(&config.provider, config.search.clone())?);

    let app = with_service_routes(orchestrator)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "nearby search service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
