//! HTTP control surface
//!
//! JSON endpoints for starting a user's feed and reading their live prices.

pub mod routes;

pub use routes::{router, DataResponse, SubscriptionResponse};

use livefeed::{FeedRegistry, ShutdownManager};
use tokio::net::TcpListener;
use tracing::info;

/// Serve `router(registry)` on `listener` until `shutdown` triggers
pub async fn serve(
    listener: TcpListener,
    registry: FeedRegistry,
    shutdown: ShutdownManager,
) -> anyhow::Result<()> {
    let app = router(registry);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
