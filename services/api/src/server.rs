use crate::cli::ServeArgs;
use crate::infra::{
    build_pipeline, load_catalog, AppState, ConfiguredNotifier, InMemorySubmissionRepository,
};
use crate::routes::with_selection_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use cellar_select::config::AppConfig;
use cellar_select::error::AppError;
use cellar_select::selection::SelectionService;
use cellar_select::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = load_catalog(config.catalog.path.as_deref())?;
    let pipeline = Arc::new(build_pipeline(&config, catalog));
    let notifier = ConfiguredNotifier::from_config(&config.mail);
    info!(mail = notifier.label(), "mail backend configured");

    let service = Arc::new(SelectionService::new(
        pipeline,
        Arc::new(InMemorySubmissionRepository::default()),
        Arc::new(notifier),
    ));

    let app = with_selection_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "wine selection service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
