use actix_web::{HttpResponse, Responder, web};
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

pub mod auth;
pub mod chat;
pub mod feedback;
pub mod patients;
pub mod records;

/// Upper bound for uploaded nursing-record PDFs.
const MAX_PDF_BYTES: usize = 20 * 1024 * 1024;

/// Registers every route. Shared by `main` and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .route("/", web::get().to(root))
        .route("/health", web::get().to(health))
        .route("/chat", web::post().to(chat::chat))
        .route("/analyze-pdf", web::get().to(records::analyze_pdf))
        .service(
            web::resource("/nursing-notes/parse")
                .app_data(web::PayloadConfig::new(MAX_PDF_BYTES))
                .route(web::post().to(records::parse_notes)),
        )
        .route("/auth/session", web::get().to(auth::session))
        .service(
            web::scope("/auth/kakao")
                .route("/login", web::get().to(auth::login))
                .route("/callback", web::get().to(auth::callback))
                .route("/profile", web::get().to(auth::profile))
                .route("/whoami", web::get().to(auth::whoami))
                .route("/logout", web::post().to(auth::logout))
                .route("/logout", web::get().to(auth::logout))
                .route("/unlink", web::post().to(auth::unlink))
                .route("/unlink", web::get().to(auth::unlink)),
        )
        .service(
            web::scope("/patients")
                .route("", web::post().to(patients::create_patient))
                .route("/{patient_id}", web::get().to(patients::get_patient))
                .route(
                    "/{patient_id}/nursing-notes",
                    web::get().to(records::nursing_notes),
                ),
        )
        .service(
            web::scope("/user")
                .route("/patients", web::get().to(patients::list_user_patients))
                .route("/patients", web::post().to(patients::add_user_patient)),
        )
        .route("/feedback", web::post().to(feedback::submit_feedback))
        .route("/feedback", web::get().to(feedback::list_feedback));
}

// Malformed bodies and query strings get the same `{"detail"}` envelope as handler errors.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

async fn root() -> impl Responder {
    HttpResponse::Ok().json(json!({ "message": "carebot API is running" }))
}

async fn health(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "redirect_uri": state.config.kakao.redirect_uri,
        "frontend_base": state.frontend.base(),
        "database": state.store.backend(),
        "chatbot_configured": state.chat.is_configured(),
    }))
}

/// Treats a blank optional field as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
