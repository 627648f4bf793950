use std::path::Path;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use thiserror::Error;

use crate::config::DatabaseConfig;
use crate::models::{
    Feedback, NewFeedback, NewPatient, NewUserPatient, Patient, UserPatient,
};
use crate::schema::{feedback, patients, user_patient_relations};

pub const PG_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/postgres");
pub const SQLITE_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::PoolError),

    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("cannot prepare database path: {0}")]
    Path(#[from] std::io::Error),
}

/// Relational store for patients, user/patient relations and feedback.
///
/// Postgres in production, SQLite for local runs and tests. Every method is
/// blocking; handlers call them through `web::block`.
#[derive(Clone)]
pub enum Store {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

// Expands the body once per backend so diesel can type-check it against each connection.
macro_rules! with_conn {
    ($store:expr, |$conn:ident| $body:expr) => {
        match $store {
            Store::Postgres(pool) => {
                let mut pooled = pool.get()?;
                let $conn: &mut PgConnection = &mut *pooled;
                $body
            }
            Store::Sqlite(pool) => {
                let mut pooled = pool.get()?;
                let $conn: &mut SqliteConnection = &mut *pooled;
                $body
            }
        }
    };
}

#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA journal_mode = WAL;")
            .map_err(r2d2::Error::QueryError)
    }
}

impl Store {
    /// `postgres://` and `postgresql://` URLs open Postgres; anything else is a SQLite file path.
    pub fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config.url.trim();

        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            let manager = ConnectionManager::<PgConnection>::new(url);
            let pool = Pool::builder().max_size(config.pool_size).build(manager)?;
            return Ok(Self::Postgres(pool));
        }

        let path = url.strip_prefix("sqlite://").unwrap_or(url);
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let manager = ConnectionManager::<SqliteConnection>::new(path);
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_customizer(Box::new(SqlitePragmas))
            .build(manager)?;
        Ok(Self::Sqlite(pool))
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Sqlite(_) => "sqlite",
        }
    }

    /// Applies pending embedded migrations and returns how many ran.
    pub fn run_migrations(&self) -> Result<usize, StoreError> {
        let applied = match self {
            Self::Postgres(pool) => {
                let mut pooled = pool.get()?;
                let conn: &mut PgConnection = &mut *pooled;
                conn.run_pending_migrations(PG_MIGRATIONS)
                    .map_err(|e| StoreError::Migration(e.to_string()))?
                    .len()
            }
            Self::Sqlite(pool) => {
                let mut pooled = pool.get()?;
                let conn: &mut SqliteConnection = &mut *pooled;
                conn.run_pending_migrations(SQLITE_MIGRATIONS)
                    .map_err(|e| StoreError::Migration(e.to_string()))?
                    .len()
            }
        };
        Ok(applied)
    }

    /// Inserts the demo patient and its sample guardian. Safe to call repeatedly.
    pub fn seed_sample_data(&self) -> Result<(), StoreError> {
        self.create_patient(&NewPatient {
            patient_id: "25-0000032".to_string(),
            name: "김x애".to_string(),
            birth_date: Some("1935-03-15".to_string()),
            room_number: Some("301".to_string()),
            admission_date: Some("2024-01-15".to_string()),
        })?;
        self.add_user_patient(&NewUserPatient {
            user_email: "sample@sample.com".to_string(),
            patient_id: "25-0000032".to_string(),
            patient_name: "김x애".to_string(),
            relationship: Some("딸".to_string()),
        })?;
        Ok(())
    }

    /// Returns `false` when a patient with the same id already exists.
    pub fn create_patient(&self, new_patient: &NewPatient) -> Result<bool, StoreError> {
        with_conn!(self, |conn| {
            let inserted = diesel::insert_into(patients::table)
                .values(new_patient)
                .on_conflict_do_nothing()
                .execute(conn)?;
            Ok(inserted == 1)
        })
    }

    pub fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>, StoreError> {
        with_conn!(self, |conn| {
            let patient = patients::table
                .find(patient_id)
                .select(Patient::as_select())
                .first(conn)
                .optional()?;
            Ok(patient)
        })
    }

    /// Relations for one user, newest first, enriched with patient details when known.
    pub fn get_user_patients(&self, user_email: &str) -> Result<Vec<UserPatient>, StoreError> {
        with_conn!(self, |conn| {
            let rows = user_patient_relations::table
                .left_join(patients::table)
                .filter(user_patient_relations::user_email.eq(user_email))
                .order((
                    user_patient_relations::created_at.desc(),
                    user_patient_relations::id.desc(),
                ))
                .select((
                    user_patient_relations::patient_id,
                    user_patient_relations::patient_name,
                    user_patient_relations::relationship,
                    patients::birth_date.nullable(),
                    patients::room_number.nullable(),
                    patients::admission_date.nullable(),
                ))
                .load::<UserPatient>(conn)?;
            Ok(rows)
        })
    }

    /// Returns `false` when the (user_email, patient_id) pair already exists.
    pub fn add_user_patient(&self, relation: &NewUserPatient) -> Result<bool, StoreError> {
        with_conn!(self, |conn| {
            let inserted = diesel::insert_into(user_patient_relations::table)
                .values(relation)
                .on_conflict_do_nothing()
                .execute(conn)?;
            Ok(inserted == 1)
        })
    }

    pub fn save_feedback(&self, entry: &NewFeedback) -> Result<i32, StoreError> {
        with_conn!(self, |conn| {
            let id = diesel::insert_into(feedback::table)
                .values(entry)
                .returning(feedback::id)
                .get_result::<i32>(conn)?;
            Ok(id)
        })
    }

    /// Newest first. `None` lists every user's feedback.
    pub fn get_feedback(&self, user_email: Option<&str>) -> Result<Vec<Feedback>, StoreError> {
        with_conn!(self, |conn| {
            let newest_first = (feedback::created_at.desc(), feedback::id.desc());
            let rows = match user_email {
                Some(email) => feedback::table
                    .filter(feedback::user_email.eq(email))
                    .order(newest_first)
                    .select(Feedback::as_select())
                    .load(conn)?,
                None => feedback::table
                    .order(newest_first)
                    .select(Feedback::as_select())
                    .load(conn)?,
            };
            Ok(rows)
        })
    }
}
