use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use tracing::info;

use super::{validate_prompt, ChatError, ChatRelay, ChatReply, ChatRequest};
use crate::access::Principal;

pub type SharedRelay = Arc<dyn ChatRelay>;

pub fn chat_router(relay: SharedRelay) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .with_state(relay)
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match self {
            ChatError::Validation(_) => StatusCode::BAD_REQUEST,
            ChatError::Unconfigured => StatusCode::SERVICE_UNAVAILABLE,
            ChatError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub(crate) async fn chat_handler(
    State(relay): State<SharedRelay>,
    principal: Principal,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return ChatError::Validation(rejection.body_text()).into_response(),
    };
    let prompt = match validate_prompt(&request.prompt) {
        Ok(prompt) => prompt,
        Err(error) => return error.into_response(),
    };

    info!(user = %principal.user_id, turns = request.history.len(), "chat relayed");
    match relay.reply(prompt, &request.history).await {
        Ok(reply) => (StatusCode::OK, Json(ChatReply { reply })).into_response(),
        Err(error) => error.into_response(),
    }
}
