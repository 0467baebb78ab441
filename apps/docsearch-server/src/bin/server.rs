use anyhow::{Context, Result};
use tracing::{info, warn};

use docsearch_core::config::Config;
use docsearch_server::{create_router, init_tracing, AppState, Services};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::load().context("loading configuration")?;
    let settings = config.settings()?;
    let services = Services::open(&settings).await?;

    let app = create_router(AppState::new(services.service.clone(), settings.search.clone()));
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding {}", addr))?;
    info!(%addr, "HTTP API listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    services.close().await?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(%err, "cannot listen for SIGTERM");
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
    info!("received shutdown signal, gracefully shutting down");
}
