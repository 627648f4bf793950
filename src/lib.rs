pub mod chat;
pub mod config;
pub mod crypto;
pub mod error;
pub mod frontend;
pub mod handlers;
pub mod kakao;
pub mod logging;
pub mod models;
pub mod nursing;
pub mod records;
pub mod schema;
pub mod session;
pub mod state;
pub mod store;

use actix_cors::Cors;

use crate::config::FrontendConfig;

pub use crate::state::AppState;

/// Credentialed CORS for the frontend origins.
pub fn cors(config: &FrontendConfig) -> Cors {
    let mut cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(3600);

    let origins = std::iter::once(&config.base).chain(&config.allowed_origins);
    for url in origins {
        match frontend::origin_of(url) {
            Some(origin) => cors = cors.allowed_origin(&origin),
            None => tracing::warn!(%url, "skipping CORS origin that is not an absolute URL"),
        }
    }
    cors
}
