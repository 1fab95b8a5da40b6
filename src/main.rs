//! # Video Caption Backend - Main Entry Point
//!
//! HTTP service that turns a TikTok URL into a transcript by coordinating
//! three outside collaborators: a metadata extraction provider, the media
//! CDN, and a speech-to-text worker.
//!
//! ## Architecture Overview:
//! - **Web Server**: actix-web with CORS, request tracing and metrics middleware
//! - **Pipeline**: validate → resolve metadata → fetch or reuse media → transcribe
//! - **Cache**: downloaded media bytes on disk, keyed by the SHA-256 of the URL
//! - **Configuration**: config.toml + environment variables
//!
//! ## Startup Order:
//! 1. Load `.env` and initialize logging
//! 2. Load and validate configuration
//! 3. Build the caption pipeline once (provider, downloader, cache, worker client)
//! 4. Start the HTTP server and wait for either exit or a shutdown signal

mod config;
mod error;
mod handlers;
mod health;
mod media;
mod middleware;
mod pipeline;
mod state;
mod transcription;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use crate::config::{AppConfig, PROVIDER_YTDLP};
use media::{
    HttpDownloader, MediaCache, MediaResolver, MetadataProvider, TikwmProvider, YtDlpProvider,
};
use pipeline::CaptionPipeline;
use state::AppState;
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transcription::WorkerClient;

#[actix_web::main]
async fn main() -> Result<()> {
    // Missing .env is fine; real deployments use plain environment variables.
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!(
        provider = %config.extraction.provider,
        worker_url = %config.transcription.worker_url,
        cache_dir = %config.cache.dir,
        "Configuration loaded: {}:{}",
        config.server.host,
        config.server.port
    );

    let pipeline = Arc::new(build_pipeline(&config)?);
    let app_state = AppState::new(config.clone(), pipeline);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        // Middleware runs in reverse order of registration.
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .wrap(TracingLogger::default())
            .configure(handlers::configure_routes)
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, stopping server...");
            // In-flight captions are allowed to finish before workers exit.
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Wire the long-lived pipeline collaborators from configuration.
fn build_pipeline(config: &AppConfig) -> Result<CaptionPipeline> {
    let provider: Arc<dyn MetadataProvider> = if config.extraction.provider == PROVIDER_YTDLP {
        Arc::new(YtDlpProvider::new(
            config.extraction.ytdlp_path.clone(),
            config.extraction_timeout(),
        ))
    } else {
        Arc::new(TikwmProvider::new(
            config.extraction.api_url.clone(),
            config.extraction_timeout(),
        )?)
    };

    let downloader = Arc::new(HttpDownloader::new(
        config.download_timeout(),
        &config.download.user_agent,
    )?);
    let cache = MediaCache::new(config.cache.dir.clone());
    let worker = WorkerClient::new(
        &config.transcription.worker_url,
        config.transcription_timeout(),
    )?;

    info!(
        provider = provider.id(),
        endpoint = worker.endpoint(),
        "Caption pipeline ready"
    );

    let resolver = MediaResolver::new(provider, downloader, cache);
    Ok(CaptionPipeline::new(resolver, Arc::new(worker)))
}

/// Initialize structured logging.
///
/// `RUST_LOG` wins when set, e.g. `RUST_LOG=video_caption_backend=trace`.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "video_caption_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM from the container runtime.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received SIGINT");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
