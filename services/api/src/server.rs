use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryAssessmentRepository, InMemoryQuestionCatalog, InMemoryUserRepository,
    LoggingMailer, OutboundMailer,
};
use crate::routes::with_api_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use botpsych::access::{AccessService, ResendMailer};
use botpsych::chat::{GeminiRelay, SharedRelay, UnconfiguredRelay};
use botpsych::config::AppConfig;
use botpsych::error::AppError;
use botpsych::screening::{CatalogSeed, ScreeningService};
use botpsych::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let catalog = Arc::new(InMemoryQuestionCatalog::default());
    match &config.catalog.seed_path {
        Some(path) => {
            let seeded = CatalogSeed::from_path(path)?.load_into(catalog.as_ref())?;
            info!(questions = seeded, path = %path.display(), "question catalog seeded");
        }
        None => warn!("QUESTION_SEED_PATH not set; question catalog starts empty"),
    }

    let mailer = match ResendMailer::from_config(&config.mail)? {
        Some(mailer) => OutboundMailer::Resend(mailer),
        None => {
            warn!("RESEND_API_KEY not set; verification links are only logged");
            OutboundMailer::Log(LoggingMailer)
        }
    };
    if !config.auth.admin_emails.is_empty() {
        info!(
            count = config.auth.admin_emails.len(),
            "admin accounts bootstrapped from ADMIN_EMAILS"
        );
    }

    let access_service = Arc::new(AccessService::new(
        Arc::new(InMemoryUserRepository::default()),
        Arc::new(mailer),
        &config.auth,
    ));
    let screening_service = Arc::new(ScreeningService::new(
        catalog,
        Arc::new(InMemoryAssessmentRepository::default()),
    ));
    let relay: SharedRelay = match GeminiRelay::from_config(&config.chat)? {
        Some(relay) => Arc::new(relay),
        None => {
            warn!("GEMINI_API_KEY not set; chat assistant disabled");
            Arc::new(UnconfiguredRelay)
        }
    };

    let app = with_api_routes(access_service, screening_service, relay)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "botpsych screening service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
