use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::catalog::{CatalogError, QuestionCatalog};
use super::domain::{AssessmentId, AssessmentSubmission, QuestionDraft, QuestionId, QuestionPatch};
use super::repository::{AssessmentRepository, RepositoryError};
use super::service::{ScreeningError, ScreeningService};
use super::validation::ValidationError;
use crate::access::Principal;

/// Router builder exposing the question bank and assessment endpoints.
pub fn screening_router<C, R>(service: Arc<ScreeningService<C, R>>) -> Router
where
    C: QuestionCatalog + 'static,
    R: AssessmentRepository + 'static,
{
    Router::new()
        .route(
            "/api/questions/assessment",
            get(assessment_questions_handler::<C, R>),
        )
        .route(
            "/api/questions",
            get(list_questions_handler::<C, R>).post(create_question_handler::<C, R>),
        )
        .route(
            "/api/questions/:question_id",
            put(update_question_handler::<C, R>).delete(delete_question_handler::<C, R>),
        )
        .route(
            "/api/assessments",
            get(history_handler::<C, R>).post(submit_handler::<C, R>),
        )
        .route("/api/assessments/latest", get(latest_handler::<C, R>))
        .route(
            "/api/assessments/:assessment_id",
            get(assessment_handler::<C, R>),
        )
        .with_state(service)
}

impl IntoResponse for ScreeningError {
    fn into_response(self) -> Response {
        let status = match self {
            ScreeningError::Access(error) => return error.into_response(),
            ScreeningError::Validation(_) => StatusCode::BAD_REQUEST,
            ScreeningError::NotFound(_)
            | ScreeningError::Catalog(CatalogError::NotFound)
            | ScreeningError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            ScreeningError::Catalog(CatalogError::Conflict(_))
            | ScreeningError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            ScreeningError::Dependency(_)
            | ScreeningError::Catalog(CatalogError::Unavailable(_))
            | ScreeningError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::BAD_GATEWAY
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionSetQuery {
    #[serde(default)]
    age_group: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

pub(crate) async fn assessment_questions_handler<C, R>(
    State(service): State<Arc<ScreeningService<C, R>>>,
    Query(query): Query<QuestionSetQuery>,
) -> Response
where
    C: QuestionCatalog + 'static,
    R: AssessmentRepository + 'static,
{
    let age_group = query.age_group.unwrap_or_default();
    let language = query.language.unwrap_or_default();

    match service.questions_for(&age_group, &language) {
        Ok(questions) => (StatusCode::OK, Json(questions)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn list_questions_handler<C, R>(
    State(service): State<Arc<ScreeningService<C, R>>>,
    principal: Principal,
) -> Response
where
    C: QuestionCatalog + 'static,
    R: AssessmentRepository + 'static,
{
    match service.list_questions(&principal) {
        Ok(questions) => (StatusCode::OK, Json(questions)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn create_question_handler<C, R>(
    State(service): State<Arc<ScreeningService<C, R>>>,
    principal: Principal,
    payload: Result<Json<QuestionDraft>, JsonRejection>,
) -> Response
where
    C: QuestionCatalog + 'static,
    R: AssessmentRepository + 'static,
{
    let draft = match payload {
        Ok(Json(draft)) => draft,
        Err(rejection) => return malformed(rejection),
    };

    match service.create_question(&principal, draft) {
        Ok(question) => (StatusCode::CREATED, Json(question)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn update_question_handler<C, R>(
    State(service): State<Arc<ScreeningService<C, R>>>,
    principal: Principal,
    Path(question_id): Path<String>,
    payload: Result<Json<QuestionPatch>, JsonRejection>,
) -> Response
where
    C: QuestionCatalog + 'static,
    R: AssessmentRepository + 'static,
{
    let Some(id) = parse_question_id(&question_id) else {
        return question_not_found();
    };
    let patch = match payload {
        Ok(Json(patch)) => patch,
        Err(rejection) => return malformed(rejection),
    };

    match service.update_question(&principal, id, patch) {
        Ok(question) => (StatusCode::OK, Json(question)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn delete_question_handler<C, R>(
    State(service): State<Arc<ScreeningService<C, R>>>,
    principal: Principal,
    Path(question_id): Path<String>,
) -> Response
where
    C: QuestionCatalog + 'static,
    R: AssessmentRepository + 'static,
{
    let Some(id) = parse_question_id(&question_id) else {
        return question_not_found();
    };

    match service.delete_question(&principal, id) {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Question removed" }))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn submit_handler<C, R>(
    State(service): State<Arc<ScreeningService<C, R>>>,
    principal: Principal,
    payload: Result<Json<AssessmentSubmission>, JsonRejection>,
) -> Response
where
    C: QuestionCatalog + 'static,
    R: AssessmentRepository + 'static,
{
    let submission = match payload {
        Ok(Json(submission)) => submission,
        Err(rejection) => return malformed(rejection),
    };

    match service.submit(principal.user_id, submission) {
        Ok(detail) => (StatusCode::CREATED, Json(detail)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn history_handler<C, R>(
    State(service): State<Arc<ScreeningService<C, R>>>,
    principal: Principal,
) -> Response
where
    C: QuestionCatalog + 'static,
    R: AssessmentRepository + 'static,
{
    match service.history(&principal.user_id) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn latest_handler<C, R>(
    State(service): State<Arc<ScreeningService<C, R>>>,
    principal: Principal,
) -> Response
where
    C: QuestionCatalog + 'static,
    R: AssessmentRepository + 'static,
{
    match service.latest(&principal.user_id) {
        Ok(latest) => (StatusCode::OK, Json(latest)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn assessment_handler<C, R>(
    State(service): State<Arc<ScreeningService<C, R>>>,
    principal: Principal,
    Path(assessment_id): Path<String>,
) -> Response
where
    C: QuestionCatalog + 'static,
    R: AssessmentRepository + 'static,
{
    let Ok(id) = uuid::Uuid::parse_str(assessment_id.trim()) else {
        return ScreeningError::NotFound("Assessment not found".to_string()).into_response();
    };

    match service.assessment(&principal, &AssessmentId(id)) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(error) => error.into_response(),
    }
}

fn parse_question_id(raw: &str) -> Option<QuestionId> {
    raw.trim().parse().ok().map(QuestionId)
}

fn question_not_found() -> Response {
    ScreeningError::NotFound("Question not found".to_string()).into_response()
}

/// Schema failures surface as validation errors with the usual error body.
fn malformed(rejection: JsonRejection) -> Response {
    ScreeningError::Validation(ValidationError::Malformed(rejection.body_text())).into_response()
}
