use crate::cli::ServeArgs;
use crate::infra::{
    default_scheduling_config, AppState, InMemoryCoordinationStore, InMemoryNotificationPublisher,
};
use crate::routes::with_scheduling_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hireline::config::AppConfig;
use hireline::error::AppError;
use hireline::telemetry;
use hireline::workflows::interview::scheduling::CoordinationService;
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

    let store = Arc::new(InMemoryCoordinationStore::default());
    let notifier = Arc::new(InMemoryNotificationPublisher::default());
    let coordination_service = Arc::new(CoordinationService::new(
        store,
        notifier,
        default_scheduling_config(),
    ));

    let app = with_scheduling_routes(coordination_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "interview scheduling coordinator ready");

    axum::serve(listener, app).await?;
    Ok(())
}
