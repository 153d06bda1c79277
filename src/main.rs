use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use fieldtask::auth::AuthMiddleware;
use fieldtask::config::Config;
use fieldtask::mail::LogMailer;
use fieldtask::routes;
use fieldtask::state::AppState;
use fieldtask::store::{MemoryStore, PgStore, Store};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            let store = match PgStore::connect(database_url).await {
                Ok(store) => store,
                Err(err) => {
                    log::error!("failed to connect to database: {}", err);
                    std::process::exit(1);
                }
            };
            if let Err(err) = store.migrate().await {
                log::error!("failed to run migrations: {}", err);
                std::process::exit(1);
            }
            Arc::new(store)
        }
        None => {
            log::warn!("DATABASE_URL is not set, data is kept in memory and lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    std::fs::create_dir_all(&config.upload_dir)?;

    let state = web::Data::new(AppState::new(store, Arc::new(LogMailer), &config));
    let client_url = config.client_url.clone();

    log::info!("Starting FieldTask server at {}", config.server_url());
    HttpServer::new(move || {
        let cors = match &client_url {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header()
                .supports_credentials()
                .max_age(3600),
            None => Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600),
        };

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(routes::public)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
