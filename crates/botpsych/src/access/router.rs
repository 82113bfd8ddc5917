use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{Credentials, Principal, Registration, UserId, UserPatch};
use super::repository::{UserRepository, UserRepositoryError, VerificationMailer};
use super::service::{AccessError, AccessService};

/// Router builder exposing registration, login and account administration.
pub fn access_router<U, M>(service: Arc<AccessService<U, M>>) -> Router
where
    U: UserRepository + 'static,
    M: VerificationMailer + 'static,
{
    Router::new()
        .route("/api/auth/register", post(register_handler::<U, M>))
        .route("/api/auth/login", post(login_handler::<U, M>))
        .route("/api/auth/verify-email", get(verify_email_handler::<U, M>))
        .route("/api/auth/me", get(me_handler::<U, M>))
        .route("/api/users", get(list_users_handler::<U, M>))
        .route(
            "/api/users/:user_id",
            put(update_user_handler::<U, M>).delete(delete_user_handler::<U, M>),
        )
        .with_state(service)
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let status = match &self {
            AccessError::Validation(_) => StatusCode::BAD_REQUEST,
            AccessError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AccessError::Forbidden(_) => StatusCode::FORBIDDEN,
            AccessError::NotFound => StatusCode::NOT_FOUND,
            AccessError::Repository(UserRepositoryError::Conflict) => StatusCode::CONFLICT,
            AccessError::Repository(UserRepositoryError::NotFound) => StatusCode::NOT_FOUND,
            AccessError::Mail(_) => StatusCode::BAD_GATEWAY,
            AccessError::Repository(UserRepositoryError::Unavailable(_))
            | AccessError::Password(_)
            | AccessError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyEmailQuery {
    #[serde(default)]
    token: Option<String>,
}

pub(crate) async fn register_handler<U, M>(
    State(service): State<Arc<AccessService<U, M>>>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Response
where
    U: UserRepository + 'static,
    M: VerificationMailer + 'static,
{
    let registration = match payload {
        Ok(Json(registration)) => registration,
        Err(rejection) => return malformed(rejection),
    };

    match service.register(registration).await {
        Ok(_) => {
            let payload = json!({
                "message": "Registration successful! Please check your email to verify your account.",
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn login_handler<U, M>(
    State(service): State<Arc<AccessService<U, M>>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Response
where
    U: UserRepository + 'static,
    M: VerificationMailer + 'static,
{
    let credentials = match payload {
        Ok(Json(credentials)) => credentials,
        Err(rejection) => return malformed(rejection),
    };

    match service.login(credentials).await {
        Ok(login) => (StatusCode::OK, Json(login)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn verify_email_handler<U, M>(
    State(service): State<Arc<AccessService<U, M>>>,
    Query(query): Query<VerifyEmailQuery>,
) -> Response
where
    U: UserRepository + 'static,
    M: VerificationMailer + 'static,
{
    match service.verify_email(query.token.as_deref().unwrap_or_default()) {
        Ok(_) => {
            let payload = json!({
                "message": "Email verified successfully! You can now log in.",
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn me_handler<U, M>(
    State(service): State<Arc<AccessService<U, M>>>,
    principal: Principal,
) -> Response
where
    U: UserRepository + 'static,
    M: VerificationMailer + 'static,
{
    match service.me(&principal) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn list_users_handler<U, M>(
    State(service): State<Arc<AccessService<U, M>>>,
    principal: Principal,
) -> Response
where
    U: UserRepository + 'static,
    M: VerificationMailer + 'static,
{
    match service.list_users(&principal) {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn update_user_handler<U, M>(
    State(service): State<Arc<AccessService<U, M>>>,
    principal: Principal,
    Path(user_id): Path<String>,
    payload: Result<Json<UserPatch>, JsonRejection>,
) -> Response
where
    U: UserRepository + 'static,
    M: VerificationMailer + 'static,
{
    let Some(id) = UserId::parse(&user_id) else {
        return AccessError::NotFound.into_response();
    };
    let patch = match payload {
        Ok(Json(patch)) => patch,
        Err(rejection) => return malformed(rejection),
    };

    match service.update_user(&principal, &id, patch) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn delete_user_handler<U, M>(
    State(service): State<Arc<AccessService<U, M>>>,
    principal: Principal,
    Path(user_id): Path<String>,
) -> Response
where
    U: UserRepository + 'static,
    M: VerificationMailer + 'static,
{
    let Some(id) = UserId::parse(&user_id) else {
        return AccessError::NotFound.into_response();
    };

    match service.delete_user(&principal, &id) {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "User removed" }))).into_response(),
        Err(error) => error.into_response(),
    }
}

fn malformed(rejection: JsonRejection) -> Response {
    AccessError::Validation(rejection.body_text()).into_response()
}
