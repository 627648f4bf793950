use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::chat::ChatError;
use crate::error::{AppError, AppResult};
use crate::handlers::non_blank;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserInput {
    session_id: Option<String>,
    user_input: String,
}

pub async fn chat(state: web::Data<AppState>, body: web::Json<UserInput>) -> AppResult<HttpResponse> {
    let input = body.into_inner();
    if input.user_input.trim().is_empty() {
        return Err(AppError::BadRequest("user_input must not be empty".into()));
    }
    let session_id = non_blank(input.session_id).unwrap_or_else(|| Uuid::new_v4().to_string());

    let reply = state
        .chat
        .reply(&session_id, &input.user_input)
        .await
        .map_err(|e| match e {
            ChatError::NotConfigured => {
                AppError::Unavailable("chatbot responder is not configured".into())
            }
            ChatError::Upstream { status, body } => {
                warn!(status, "chatbot responder returned an error");
                AppError::Upstream(body)
            }
            other => {
                warn!(error = %other, "chatbot responder unreachable");
                AppError::Upstream(other.to_string())
            }
        })?;

    Ok(HttpResponse::Ok().json(json!({
        "response": reply,
        "session_id": session_id,
    })))
}
