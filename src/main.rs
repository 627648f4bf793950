use actix_web::{App, HttpServer, middleware, web};
use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;

use carebot::config::AppConfig;
use carebot::store::Store;
use carebot::{AppState, handlers, logging};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = AppConfig::from_env()?;
    logging::init_tracing(&config)?;

    let store = Store::connect(&config.database).context("connecting to the database")?;
    let applied = store.run_migrations()?;
    info!(backend = store.backend(), applied, "database ready");
    if config.database.seed_sample_data {
        store.seed_sample_data()?;
        info!("sample data seeded");
    }

    let bind = (config.http.host.clone(), config.http.port);
    info!(
        host = %bind.0,
        port = bind.1,
        redirect_uri = %config.kakao.redirect_uri,
        "starting carebot"
    );

    let state = web::Data::new(AppState::new(config, store)?);

    HttpServer::new(move || {
        App::new()
            .wrap(carebot::cors(&state.config.frontend))
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
