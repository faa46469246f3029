//! Playcaller Server
//!
//! Serves offensive and defensive play-calling recommendations over HTTP.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};

use playcaller_models::ModelRegistry;
use playcaller_server::{create_router, AppConfig, AppState, ConfigOverrides};

#[derive(Parser, Debug)]
#[command(name = "playcaller-server")]
#[command(about = "Play-calling recommendation service", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "playcaller.yaml")]
    config: PathBuf,

    /// Listen address
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Directory holding the model artifacts
    #[arg(short, long)]
    models_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        listen: cli.listen.clone(),
        port: cli.port,
        models_dir: cli.models_dir.clone(),
    };
    let config = AppConfig::load(&cli.config, &overrides)?;

    if cli.print_config {
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    init_tracing(cli.verbose, config.logging.json);

    info!("Starting Playcaller Server");
    info!("Models directory: {}", config.models.dir.display());
    info!("User database: {}", config.database.url);
    if config.uses_dev_secret() {
        warn!("auth.secret is the development default; set PLAYCALLER__AUTH__SECRET in production");
    }

    let metrics_handle = init_metrics()?;

    let registry = ModelRegistry::from_config(&config.models)?;
    for status in registry.status().iter().filter(|s| !s.available) {
        warn!(
            model = %status.name,
            "Model unavailable, dependent routes will answer 503: {}",
            status.reason.as_deref().unwrap_or("unknown")
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.server.listen, config.server.port).parse()?;
    let state = AppState::new(config, registry)?.with_metrics(metrics_handle);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("playcaller=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("playcaller=info,tower_http=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "playcaller_requests_total",
        "Total number of prediction requests by route"
    );
    metrics::describe_counter!(
        "playcaller_access_total",
        "Access gate decisions by outcome"
    );
    metrics::describe_counter!("playcaller_errors_total", "Total number of error responses by category");
    metrics::describe_histogram!(
        "playcaller_inference_latency_us",
        metrics::Unit::Microseconds,
        "Model inference latency in microseconds by route"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
