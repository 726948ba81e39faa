use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::db::{Lifespan, ProductStore};
use crate::{build_router, AppState};

/// Run the application between the lifespan hooks.
///
/// `startup` runs exactly once before the first connection is accepted. Once
/// it has succeeded, `shutdown` runs exactly once after serving ends, whether
/// `signal` resolved or serving failed. A failed startup returns without
/// serving or calling `shutdown`.
pub async fn serve<F>(listener: TcpListener, lifespan: &dyn Lifespan, signal: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let products = lifespan.startup().await?;
    let served = run(listener, products, signal).await;

    let closed = lifespan.shutdown().await;
    if let Err(e) = &closed {
        error!(error = %e, "Shutdown hook failed");
    }

    served?;
    closed?;
    Ok(())
}

async fn run<F>(listener: TcpListener, products: Arc<dyn ProductStore>, signal: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let count = products.count().await?;
    info!(products = count, "Product store ready");

    let app = build_router(AppState { products });

    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await?;
    info!("Server stopped accepting requests.");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received.");
}
