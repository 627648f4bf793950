use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::handlers::non_blank;
use crate::models::{NewPatient, NewUserPatient, Patient};
use crate::session::SessionUser;
use crate::state::AppState;
use crate::store::StoreError;

pub async fn create_patient(
    state: web::Data<AppState>,
    new_patient: web::Json<NewPatient>,
) -> AppResult<HttpResponse> {
    let new_patient = new_patient.into_inner();
    if let Some(problem) = new_patient.validate() {
        return Err(AppError::BadRequest(problem.into()));
    }

    let store = state.store.clone();
    let created = web::block(move || -> Result<Option<Patient>, StoreError> {
        if !store.create_patient(&new_patient)? {
            return Ok(None);
        }
        store.get_patient(&new_patient.patient_id)
    })
    .await??;

    match created {
        Some(patient) => {
            info!(patient_id = %patient.patient_id, "patient created");
            Ok(HttpResponse::Created().json(patient))
        }
        None => Err(AppError::Conflict("Patient already exists".into())),
    }
}

pub async fn get_patient(
    state: web::Data<AppState>,
    patient_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let store = state.store.clone();
    let patient = web::block(move || store.get_patient(&patient_id)).await??;

    patient
        .map(|p| HttpResponse::Ok().json(p))
        .ok_or_else(|| AppError::NotFound("Patient not found".into()))
}

pub async fn list_user_patients(
    state: web::Data<AppState>,
    user: SessionUser,
) -> AppResult<HttpResponse> {
    let store = state.store.clone();
    let patients = web::block(move || store.get_user_patients(&user.email)).await??;
    Ok(HttpResponse::Ok().json(patients))
}

#[derive(Debug, Deserialize)]
pub struct AddUserPatient {
    patient_id: String,
    patient_name: Option<String>,
    relationship: Option<String>,
}

enum Linked {
    Created,
    Duplicate,
    UnknownPatient,
}

pub async fn add_user_patient(
    state: web::Data<AppState>,
    user: SessionUser,
    body: web::Json<AddUserPatient>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    let patient_id = body.patient_id.trim().to_string();
    if patient_id.is_empty() {
        return Err(AppError::BadRequest("patient_id must not be empty".into()));
    }
    let given_name = non_blank(body.patient_name);
    let relationship = non_blank(body.relationship);
    let user_email = user.email;

    let store = state.store.clone();
    let log_patient_id = patient_id.clone();
    let outcome = web::block(move || -> Result<Linked, StoreError> {
        let patient_name = match given_name {
            Some(name) => name,
            None => match store.get_patient(&patient_id)? {
                Some(patient) => patient.name,
                None => return Ok(Linked::UnknownPatient),
            },
        };
        let relation = NewUserPatient {
            user_email,
            patient_id,
            patient_name,
            relationship,
        };
        Ok(if store.add_user_patient(&relation)? {
            Linked::Created
        } else {
            Linked::Duplicate
        })
    })
    .await??;

    match outcome {
        Linked::Created => {
            info!(patient_id = %log_patient_id, "patient linked to user");
            Ok(HttpResponse::Created().json(json!({ "ok": true })))
        }
        Linked::Duplicate => Err(AppError::Conflict(
            "patient is already linked to this user".into(),
        )),
        Linked::UnknownPatient => Err(AppError::NotFound("Patient not found".into())),
    }
}
