//! Leafscan Server
//!
//! HTTP API for plant leaf disease diagnosis. Accepts image uploads,
//! runs them through the validity-guarded classification pipeline, and
//! returns an enriched top-K diagnosis.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

mod config;
mod routes;
mod state;

use config::{GuardStrategy, ServerConfig};
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "leafscan-server")]
#[command(about = "Plant leaf disease diagnosis API", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "leafscan.yaml", env = "LEAFSCAN_CONFIG")]
    config: String,

    /// Listen address
    #[arg(short, long, env = "LEAFSCAN_LISTEN")]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long, env = "LEAFSCAN_PORT")]
    port: Option<u16>,

    /// Classifier weights path (overrides the config file source)
    #[arg(short, long, env = "LEAFSCAN_MODEL")]
    model: Option<String>,

    /// Validity guard strategy
    #[arg(short, long, value_enum, env = "LEAFSCAN_GUARD")]
    guard: Option<GuardStrategy>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting Leafscan Server");

    let config = ServerConfig::load(&cli.config, &cli)?;
    info!("Configuration loaded successfully");
    info!("Backbone: {}", config.model.backbone.as_str());
    info!("Guard strategy: {:?}", config.guard.strategy);
    info!("Classes: {}", leafscan_vision::num_classes());

    let metrics_handle = init_metrics()?;

    info!("Initializing application state...");
    let state = AppState::from_config(&config, metrics_handle)?;

    // Probe the weights once so a misconfigured path shows up in the logs
    // at startup instead of on the first request. The load itself stays
    // lazy and a failed probe does not prevent serving.
    if let Err(e) = leafscan_vision::resolve_weights(&config.model.source) {
        warn!(error = %e, "classifier weights not available yet; predictions will return 503 until they are");
    }

    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let app = routes::create_router(state, config.cors_allow_any, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown signal received, stopping server...");
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "leafscan_requests_total",
        "Total number of prediction requests received"
    );
    metrics::describe_counter!(
        "leafscan_predictions_total",
        "Prediction outcomes by result (success, rejected, error)"
    );
    metrics::describe_histogram!(
        "leafscan_predict_latency_ms",
        metrics::Unit::Milliseconds,
        "End-to-end prediction latency in milliseconds"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
