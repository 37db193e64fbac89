//! hotel-orchestrator: serves the hotel comparison API.
//!
//! Usage: `hotel-orchestrator [config.json]`. `PORT` and `BASE_URL` override the file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use hotel_offer_orchestrator::cache::spawn_sweeper;
use hotel_offer_orchestrator::{api, mock, AppConfig, AppState, OfferCache};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hotel_offer_orchestrator=info,hotel_orchestrator=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        suppliers = config.suppliers.len(),
        cache_ttl_secs = config.cache.ttl_seconds,
        "Starting hotel offer orchestrator"
    );

    let (state, cache) = AppState::from_config(&config).context("Failed to build suppliers")?;

    let sweeper = (config.cache.cleanup_interval_seconds > 0).then(|| {
        spawn_sweeper(
            cache.clone(),
            Duration::from_secs(config.cache.cleanup_interval_seconds),
        )
    });

    let mut app = api::router(state);
    if config.mock_suppliers {
        let upstreams = mock::demo_upstreams();
        for (prefix, _) in &upstreams {
            tracing::info!(prefix = *prefix, "Serving mock supplier");
        }
        app = mock::mount(app, &upstreams);
    }
    let app = api::with_layers(app);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    let stats = cache.stats();
    cache.clear();
    tracing::info!(
        hits = stats.hit_count,
        misses = stats.miss_count,
        stored = stats.store_count,
        "Shut down"
    );

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}
