//! Axum API server binary.

use std::net::SocketAddr;

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use capclip_api::{create_router, metrics, ApiConfig, AppState};
use capclip_media::{check_ffmpeg, check_ffprobe};
use capclip_pipeline::PipelineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    // Install rustls crypto provider (required for rustls 0.23+)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting capclip-api");

    let config = ApiConfig::from_env();
    let pipeline = PipelineConfig::from_env()?;
    info!(
        "API config: host={}, port={}, timeout={}s",
        config.host,
        config.port,
        config.request_timeout.as_secs()
    );
    info!(
        "Pipeline config: cut_mode={}, caption_style={}, word_time_unit={}, pts_correction={}",
        pipeline.encoding.cut_mode,
        pipeline.defaults.caption_style,
        pipeline.defaults.word_time_unit,
        pipeline.pts_correction
    );
    match &pipeline.default_store {
        Some(store) => info!(
            "Default store: {} (input={}, output={})",
            store.config.endpoint_url, store.input_bucket, store.output_bucket
        ),
        None => warn!("No default store configured; video_url requests will fail"),
    }

    for check in [check_ffmpeg(), check_ffprobe()] {
        match check {
            Ok(path) => info!("Found {}", path.display()),
            Err(e) => warn!("{}; processing requests will fail", e),
        }
    }

    let metrics_handle = if config.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    let state = AppState::new(config.clone(), pipeline)?;
    let app = create_router(state, metrics_handle);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
