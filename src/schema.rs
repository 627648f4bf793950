// Kept in sync with migrations/postgres and migrations/sqlite.

diesel::table! {
    feedback (id) {
        id -> Integer,
        user_email -> Text,
        rating -> Integer,
        comment -> Text,
        timestamp -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    patients (patient_id) {
        patient_id -> Text,
        name -> Text,
        birth_date -> Nullable<Text>,
        room_number -> Nullable<Text>,
        admission_date -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    user_patient_relations (id) {
        id -> Integer,
        user_email -> Text,
        patient_id -> Text,
        patient_name -> Text,
        relationship -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::joinable!(user_patient_relations -> patients (patient_id));

diesel::allow_tables_to_appear_in_same_query!(
    feedback,
    patients,
    user_patient_relations,
);
