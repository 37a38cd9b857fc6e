//! # VoiceGuard Backend - Main Application Entry Point
//!
//! HTTP server that accepts an audio clip, extracts a fixed MFCC feature
//! vector and runs two pre-trained classifiers over it: one for voice
//! authenticity (human vs. AI-generated) and one for spoken language.
//!
//! ## Application Architecture:
//! - **config**: Application configuration (TOML files + environment variables)
//! - **state**: Shared application state and metrics
//! - **audio**: Decode, resample and validate incoming clips
//! - **features**: MFCC feature extraction producing the 384-element vector
//! - **detection**: Classifier loading and verdict generation
//! - **device**: Inference device selection (CPU / CUDA / Metal)
//! - **health**: System health monitoring endpoints
//! - **middleware**: Custom request processing (logging, metrics)
//! - **handlers**: HTTP request handlers for the API endpoints
//! - **error**: Custom error types and HTTP error responses

mod audio;
mod config;
mod detection;
mod device;
mod error;
mod features;
mod handlers;
mod health;
mod middleware;
mod state;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use config::AppConfig;
use detection::DetectionEngine;
use features::MfccExtractor;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown flag set by the signal handler task and polled by main.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// The main application entry point.
///
/// ## Startup sequence:
/// 1. Load and validate configuration
/// 2. Build the MFCC extraction pipeline (FFT plan, mel filterbank, DCT basis)
/// 3. Load both classifier artifacts — a missing or misshaped artifact
///    aborts startup here rather than failing every request later
/// 4. Start the HTTP server with middleware and routes
/// 5. Run until a shutdown signal arrives, then stop gracefully
#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting voiceguard-backend v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: {}:{}",
        config.server.host, config.server.port
    );

    // The extractor is pure computation; building it precomputes the FFT
    // plan, window, filterbank and DCT basis once for the process lifetime.
    let extractor = MfccExtractor::new();

    // Both classifiers load before the server binds. If either artifact is
    // missing the process exits with a clear error instead of serving 500s.
    let engine = DetectionEngine::load(&config.models)
        .context("Failed to load classifier artifacts; check [models] paths in config.toml")?;

    let app_state = AppState::new(config.clone(), extractor, engine);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics))
                    .route("/config", web::get().to(handlers::get_config))
                    .route("/config", web::put().to(handlers::update_config))
                    .route("/detect", web::post().to(handlers::detect_upload))
                    .route("/detect/base64", web::post().to(handlers::detect_base64))
                    .route("/detect/url", web::post().to(handlers::detect_url)),
            )
            // Root and bare /health stay available for load balancers and
            // quick manual checks
            .route("/", web::get().to(handlers::service_info))
            .route("/health", web::get().to(health::health_check))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    // Race the server against the shutdown flag; whichever finishes first
    // decides how we exit.
    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize the tracing (logging) system.
///
/// `RUST_LOG` controls the filter; without it the default keeps our own
/// crate at debug and actix at info.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voiceguard_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Listen for SIGTERM and SIGINT and raise the global shutdown flag.
///
/// Graceful shutdown lets in-flight detection requests finish before the
/// process exits.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Poll the shutdown flag every 100ms until it is set.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
