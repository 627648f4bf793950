use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{feedback, patients, user_patient_relations};

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = patients)]
pub struct Patient {
    pub patient_id: String,
    pub name: String,
    pub birth_date: Option<String>,
    pub room_number: Option<String>,
    pub admission_date: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize, Insertable)]
#[diesel(table_name = patients)]
pub struct NewPatient {
    pub patient_id: String,
    pub name: String,
    pub birth_date: Option<String>,
    pub room_number: Option<String>,
    pub admission_date: Option<String>,
}

impl NewPatient {
    /// Returns the first problem with the payload, if any.
    pub fn validate(&self) -> Option<&'static str> {
        if self.patient_id.trim().is_empty() {
            return Some("patient_id must not be empty");
        }
        if self.name.trim().is_empty() {
            return Some("name must not be empty");
        }
        None
    }
}

/// A relation row joined with whatever the patients table knows about the patient.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Serialize)]
pub struct UserPatient {
    pub patient_id: String,
    pub patient_name: String,
    pub relationship: Option<String>,
    pub birth_date: Option<String>,
    pub room_number: Option<String>,
    pub admission_date: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_patient_relations)]
pub struct NewUserPatient {
    pub user_email: String,
    pub patient_id: String,
    pub patient_name: String,
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = feedback)]
pub struct Feedback {
    pub id: i32,
    pub user_email: String,
    pub rating: i32,
    pub comment: String,
    pub timestamp: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = feedback)]
pub struct NewFeedback {
    pub user_email: String,
    pub rating: i32,
    pub comment: String,
    pub timestamp: String,
}
