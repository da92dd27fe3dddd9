//! Spindle - A lightweight, self-hosted audio fetcher and playlist server.
//!
//! Spindle lets registered users hand in a media URL, pulls the audio
//! track with yt-dlp in a background job, and files the result into
//! named per-user playlists served over a small JSON API.

mod api;
mod auth;
mod config;
mod error;
mod fetch;
mod jobs;
mod models;
mod playlists;

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::{JsonUserRepository, SharedUserRepository};
use crate::config::LogFormat;
use crate::fetch::YtDlpFetcher;
use crate::jobs::JobRegistry;
use crate::models::AppState;
use crate::playlists::{ConvertService, JsonPlaylistRepository, SharedPlaylistRepository};

/// Initialize the tracing/logging subsystem.
fn init_tracing(config: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.log_format {
        LogFormat::Json => {
            subscriber
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

/// Configure CORS based on application config.
fn configure_cors(config: &config::Config) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .max_age(3600);

    if config.cors_origins.len() == 1 && config.cors_origins[0] == "*" {
        cors = cors.allow_any_origin();
    } else {
        for origin in &config.cors_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

/// Graceful shutdown handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize configuration
    let config = config::init();

    // Initialize logging
    init_tracing(config);

    // Validate configuration
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Configuration validation failed");
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }

    // Initialize repositories
    let users: SharedUserRepository = Arc::new(
        JsonUserRepository::new(&config.users_file).map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize user repository");
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
        })?,
    );

    let playlists: SharedPlaylistRepository = Arc::new(
        JsonPlaylistRepository::new(&config.playlists_file).map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize playlist repository");
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
        })?,
    );

    let jobs = Arc::new(JobRegistry::new());
    let convert = Arc::new(ConvertService::new(
        config.audio_folder.clone(),
        playlists.clone(),
        Arc::new(YtDlpFetcher::new(&config.ytdlp_bin)),
        jobs.clone(),
    ));

    // Create application state
    let app_state = AppState {
        audio_folder: config.audio_folder.clone(),
        users,
        playlists,
        jobs,
        convert,
    };

    let bind_address = config.bind_address();

    tracing::info!(
        address = %bind_address,
        audio_folder = %config.audio_folder.display(),
        ytdlp = %config.ytdlp_bin.display(),
        "Starting Spindle server"
    );

    // Create and start server
    let server = HttpServer::new(move || {
        App::new()
            // Middleware (order matters - outermost first)
            .wrap(TracingLogger::default())
            .wrap(configure_cors(config))
            // Shared state
            .app_data(web::Data::new(app_state.clone()))
            // Health endpoints (no auth required)
            .configure(api::health::configure)
            // Register/login (no auth required), /me (auth required)
            .configure(api::auth::configure)
            // Conversion endpoints (auth required)
            .configure(api::convert::configure)
            // Playlist listing (auth required)
            .configure(api::playlists::configure)
            // Home page and audio files (no auth required)
            .configure(api::files::configure)
    })
    .bind(&bind_address)?
    .shutdown_timeout(30)
    .run();

    // Run server with graceful shutdown
    tokio::select! {
        result = server => {
            result
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown complete");
            Ok(())
        }
    }
}
