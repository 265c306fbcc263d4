use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use directbook::api::{self, ApiSettings, AppState};
use directbook::catalog::{self, MOCK_ICAL_SOURCE};
use directbook::config::Config;
use directbook::engine::Engine;
use directbook::payment::TestModeGateway;
use directbook::reaper::Reaper;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "directbook=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    directbook::observability::init(config.metrics_port)?;

    let engine = Arc::new(Engine::with_system_clock(catalog::default_listings()));

    // Stand-in for the imported channel calendars.
    let today = engine.clock().today();
    for listing in engine.listings() {
        for stay in catalog::mock_external_blocks(today) {
            if let Err(e) = engine.add_external_block(&listing.id, stay, MOCK_ICAL_SOURCE).await {
                warn!("could not seed block on {}: {e}", listing.id);
            }
        }
    }

    let reaper = Reaper::spawn(engine.clone(), config.sweep_interval);
    let gateway = Arc::new(TestModeGateway::new(&config.site_url, config.webhook_secret.clone()));
    let settings = ApiSettings::from_config(&config);
    let state = AppState {
        engine: engine.clone(),
        gateway,
        settings: Arc::new(settings),
    };
    let app = api::router(state);

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("directbook listening on {addr}");
    info!("  listings: {}", engine.listings().len());
    info!("  hold ttl: {} min, sweep every {:?}", config.hold_minutes, config.sweep_interval);
    info!(
        "  payment webhook: {}",
        if config.webhook_secret.is_some() { "enabled" } else { "disabled" }
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown signal received, stopping hold sweep");
    reaper.shutdown().await?;
    info!("directbook stopped");
    Ok(())
}

/// Resolves on ctrl-c, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("ctrl-c handler failed: {e}");
        }
    };

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("failed to register SIGTERM handler: {e}");
                ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
}
