use std::{net::SocketAddr, sync::Arc};

use tokio::signal;
use tracing::{error, info};

use cakeshop_api as api;
use cakeshop_api::{checkout::SessionStore, services::SeaOrmOrderStore, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db = Arc::new(api::db::connect(&cfg.database_url).await.map_err(|e| {
        error!("Failed to open order database: {}", e);
        e
    })?);

    let (event_sender, event_rx) = api::events::channel(cfg.event_channel_capacity);
    tokio::spawn(api::events::process_events(event_rx));

    let store = Arc::new(SeaOrmOrderStore::new(db.clone()));
    let orchestrator = api::build_orchestrator(&cfg, store, event_sender)?;
    info!(
        program = %cfg.simulator_program,
        price_service = %cfg.price_service_url,
        "Checkout services initialized"
    );

    let sessions = Arc::new(SessionStore::with_idle_ttl(cfg.session_idle_ttl()));
    tokio::spawn(sessions.clone().run_eviction(cfg.session_sweep_interval()));

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        sessions,
        db: Some(db),
    };

    if let Some(dir) = &cfg.static_dir {
        info!("Serving storefront pages from {}", dir);
    }
    let app = api::build_router(state, cfg.static_dir.as_deref());

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
