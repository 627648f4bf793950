use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::handlers::non_blank;
use crate::models::NewFeedback;
use crate::session::SessionUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    rating: i32,
    comment: String,
    timestamp: Option<String>,
}

pub async fn submit_feedback(
    state: web::Data<AppState>,
    user: SessionUser,
    body: web::Json<FeedbackRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    if !(1..=5).contains(&body.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }
    let comment = body.comment.trim().to_string();
    if comment.is_empty() {
        return Err(AppError::BadRequest("comment must not be empty".into()));
    }

    let entry = NewFeedback {
        user_email: user.email,
        rating: body.rating,
        comment,
        timestamp: non_blank(body.timestamp).unwrap_or_else(|| Utc::now().to_rfc3339()),
    };

    let store = state.store.clone();
    let id = web::block(move || store.save_feedback(&entry)).await??;
    info!(feedback_id = id, rating = body.rating, "feedback saved");

    Ok(HttpResponse::Created().json(json!({ "ok": true, "id": id })))
}

pub async fn list_feedback(state: web::Data<AppState>, user: SessionUser) -> AppResult<HttpResponse> {
    let store = state.store.clone();
    let entries = web::block(move || store.get_feedback(Some(user.email.as_str()))).await??;
    Ok(HttpResponse::Ok().json(entries))
}
