use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::handlers::non_blank;
use crate::nursing;
use crate::state::AppState;

/// Date-by-date change summary of the configured sample record.
pub async fn analyze_pdf(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let path = state.config.records.analyze_pdf_path.clone();
    if !path.is_file() {
        return Err(AppError::NotFound(format!("PDF not found: {}", path.display())));
    }

    let result = web::block(move || {
        nursing::extract_text_from_pdf(&path)
            .map(|text| nursing::compare_changes_with_text(&nursing::parse_by_date(&text)))
    })
    .await?
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok().json(json!({ "result": result })))
}

#[derive(Debug, Deserialize)]
pub struct NotesQuery {
    target_date: Option<String>,
}

pub async fn nursing_notes(
    state: web::Data<AppState>,
    patient_id: web::Path<String>,
    query: web::Query<NotesQuery>,
) -> AppResult<HttpResponse> {
    let patient_id = patient_id.into_inner();
    let raw_date = non_blank(query.into_inner().target_date);
    let target_date = raw_date
        .as_deref()
        .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| AppError::BadRequest("target_date must be YYYY-MM-DD".into()))?;

    let Some(path) = state.pdfs.select(&patient_id, target_date) else {
        return Err(AppError::NotFound(format!(
            "No PDF found for patient {patient_id} (target_date={})",
            raw_date.as_deref().unwrap_or("None")
        )));
    };
    info!(%patient_id, path = %path.display(), "reading nursing record");

    let notes = web::block(move || {
        nursing::extract_text_from_pdf(&path).map(|text| nursing::build_nursing_notes(&text))
    })
    .await?
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok().json(notes))
}

/// Parses an uploaded PDF sent as the raw request body.
pub async fn parse_notes(body: web::Bytes) -> AppResult<HttpResponse> {
    if body.is_empty() {
        return Err(AppError::BadRequest("request body must be a PDF document".into()));
    }

    let notes = web::block(move || {
        nursing::extract_text_from_bytes(&body).map(|text| nursing::build_nursing_notes(&text))
    })
    .await
    .map_err(|_| AppError::BadRequest("could not read PDF".into()))?
    .map_err(|e| {
        warn!(error = %e, "rejected uploaded PDF");
        AppError::BadRequest(e.to_string())
    })?;

    Ok(HttpResponse::Ok().json(notes))
}
