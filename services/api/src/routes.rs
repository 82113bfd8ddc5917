use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json, Router};
use botpsych::access::{
    access_router, AccessService, SharedAuthenticator, UserRepository, VerificationMailer,
};
use botpsych::chat::{chat_router, SharedRelay};
use botpsych::screening::{
    screening_router, AssessmentRepository, QuestionCatalog, ScreeningService,
};
use serde_json::json;
use std::sync::Arc;

/// Every API surface plus the operational endpoints, with the bearer-token
/// authenticator available to extractors.
pub(crate) fn with_api_routes<U, M, C, R>(
    access: Arc<AccessService<U, M>>,
    screening: Arc<ScreeningService<C, R>>,
    relay: SharedRelay,
) -> Router
where
    U: UserRepository + 'static,
    M: VerificationMailer + 'static,
    C: QuestionCatalog + 'static,
    R: AssessmentRepository + 'static,
{
    let authenticator: SharedAuthenticator = access.clone();

    access_router(access)
        .merge(screening_router(screening))
        .merge(chat_router(relay))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .layer(Extension(authenticator))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
