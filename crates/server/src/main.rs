use anyhow::Result;
use axum::serve;
use poolwatch_core::{
    anchor::AnchorResolver,
    config::AppConfig,
    metrics::MetricsCollector,
    retention::RetentionStore,
    upstream::{ExplorerClient, HeadSource, HttpClient, NodeEndpoint, TipsetSource},
    win::{ClassifierConfig, WinClassifier, WinIntake},
};
use server::{create_app, AppState};
use std::sync::Arc;
use tokio::{signal, sync::broadcast};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &AppConfig) {
    let default_filter = format!(
        "warn,poolwatch_core={level},server={level}",
        level = config.logging.level
    );
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn,poolwatch_core=info,server=info"));

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

struct CoreServices {
    state: AppState,
    classifier: Arc<WinClassifier>,
}

fn init_core_services(config: &AppConfig) -> Result<CoreServices> {
    let http_client = Arc::new(
        HttpClient::new().map_err(|e| anyhow::anyhow!("HTTP client initialization failed: {e}"))?,
    );

    let sources: Vec<Arc<dyn HeadSource>> = config
        .anchors
        .endpoints
        .iter()
        .map(|endpoint| {
            Arc::new(NodeEndpoint::new(endpoint, http_client.clone())) as Arc<dyn HeadSource>
        })
        .collect();
    info!(endpoints_count = sources.len(), "anchor endpoints configured");

    let resolver = Arc::new(AnchorResolver::new(sources, config.settle_delay()));

    let store = Arc::new(RetentionStore::new(config.win.history_capacity));
    let intake = Arc::new(WinIntake::new(store.clone()));

    let explorer: Arc<dyn TipsetSource> =
        Arc::new(ExplorerClient::new(&config.explorer, http_client));
    let classifier = Arc::new(WinClassifier::new(
        store.clone(),
        explorer,
        ClassifierConfig::from(&config.win),
    ));

    let metrics = config.metrics.enabled.then(MetricsCollector::new);

    Ok(CoreServices { state: AppState { resolver, intake, store, metrics }, classifier })
}

#[tokio::main]
async fn main() -> Result<()> {
    let config =
        AppConfig::load().map_err(|e| anyhow::anyhow!("Configuration loading failed: {e}"))?;
    config.validate().map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config);
    info!("Starting pool watch server");
    debug!(
        endpoints = config.anchors.endpoints.len(),
        explorer = %config.explorer.base_url,
        tick_interval_seconds = config.win.tick_interval_seconds,
        cutoff_seconds = config.win.cutoff_seconds,
        "Configuration loaded"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let services = init_core_services(&config)?;
    let classifier_handle = services.classifier.clone().start_with_shutdown(shutdown_tx.subscribe());

    let app = create_app(services.state, &config);
    let addr = config.socket_addr().map_err(|e| anyhow::anyhow!(e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP server listening");

    if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "Server error occurred");
    }

    let _ = shutdown_tx.send(());
    if let Err(e) = classifier_handle.await {
        error!(error = %e, "win classifier task ended abnormally");
    }
    info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, stopping");
}
