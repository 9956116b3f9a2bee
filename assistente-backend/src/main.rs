use actix_cors::Cors;
use actix_files::Files;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

mod ai;
mod channels;
mod config;
mod controllers;
mod db;
mod models;

use ai::{GeminiClient, ReplyGenerator};
use config::Config;
use db::Database;

pub struct AppState {
    pub db: Arc<Database>,
    pub generator: Arc<ReplyGenerator>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url).expect("Failed to initialize database");
    let db = Arc::new(db);

    let model = Arc::new(GeminiClient::new(
        &config.gemini_api_key,
        &config.gemini_model,
        config.gemini_thinking_budget,
    ));
    let generator = Arc::new(ReplyGenerator::new(db.clone(), model));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    match config.telegram_bot_token.clone() {
        Some(token) => {
            let telegram_db = db.clone();
            let telegram_generator = generator.clone();
            tokio::spawn(async move {
                if let Err(e) = channels::telegram::start_telegram_listener(
                    token,
                    telegram_db,
                    telegram_generator,
                    shutdown_rx,
                )
                .await
                {
                    log::error!("Telegram listener failed: {}", e);
                }
            });
        }
        None => {
            log::warn!("TELEGRAM_BOT_TOKEN not set - Telegram channel disabled");
        }
    }

    // Static chat front-end (check both run locations)
    let static_dir = if std::path::Path::new("./static").exists() {
        "./static"
    } else if std::path::Path::new("./assistente-backend/static").exists() {
        "./assistente-backend/static"
    } else {
        log::warn!("Static directory not found - front-end serving disabled");
        ""
    };

    log::info!("Starting assistente-backend on port {}", port);
    if !static_dir.is_empty() {
        log::info!("Serving front-end from: {}", static_dir);
    }

    let state_db = db.clone();
    let state_generator = generator.clone();
    let static_dir = static_dir.to_string();

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let mut app = App::new()
            .app_data(web::Data::new(AppState {
                db: Arc::clone(&state_db),
                generator: Arc::clone(&state_generator),
            }))
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::users::config)
            .configure(controllers::conversations::config)
            .configure(controllers::chat::config);

        if !static_dir.is_empty() {
            app = app.service(Files::new("/", static_dir.clone()).index_file("index.html"));
        }

        app
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    // Best-effort: stop the long-poll listener; failure means it never ran
    let _ = shutdown_tx.send(());

    Ok(())
}
