//! `bookvoted serve` — directory bootstrap, state store and HTTP server.

use std::net::SocketAddr;

use tokio::signal;
use tracing::{info, warn};

use bookvote_core::BookvoteConfig;
use bookvote_state::StateStore;
use bookvote_web::{AppState, build_router};

pub async fn run(config: BookvoteConfig) -> anyhow::Result<()> {
    info!("bookvote daemon starting");

    for dir in config.storage.directories() {
        std::fs::create_dir_all(dir)?;
    }

    let db_path = config.storage.database_path();
    let store = StateStore::open_or_repair(&db_path)?;
    info!(
        path = ?db_path,
        epoch = store.vote_epoch()?,
        books = store.load_books()?.len(),
        "state store opened"
    );

    if config.uses_default_password() {
        warn!("admin password is the built-in default; set ADMIN_PASSWORD");
    }

    let addr = SocketAddr::new(config.server.bind, config.server.port);
    let router = build_router(AppState::new(store, config));

    info!(%addr, "HTTP server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("bookvote daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
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
