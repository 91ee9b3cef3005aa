use crate::cli::ServeArgs;
use crate::infra::{seed_form_repository, AppState};
use crate::routes::with_form_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use form_runner::config::AppConfig;
use form_runner::error::AppError;
use form_runner::forms::{
    FormRunnerService, HandlerRegistry, InMemoryApplicationRepository, LogPublisher,
};
use form_runner::telemetry;
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
    if let Some(forms_dir) = args.forms_dir.take() {
        config.store.forms_dir = Some(forms_dir);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let registry = HandlerRegistry::standard();
    let forms = Arc::new(seed_form_repository(
        config.store.forms_dir.as_deref(),
        &registry,
    )?);
    let applications = Arc::new(InMemoryApplicationRepository::default());
    let service =
        FormRunnerService::with_registry(forms, applications, Arc::new(LogPublisher), registry);
    service.ensure_ready()?;

    let app = with_form_routes(Arc::new(service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "form runner ready");

    axum::serve(listener, app).await?;
    Ok(())
}
