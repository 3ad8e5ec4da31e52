//! Serve command implementation.

use crate::app::Server;
use tracing::info;

/// Starts the watcher and runs until Ctrl-C.
pub async fn run(server: &Server) -> Result<(), Box<dyn std::error::Error>> {
    let reply = server.start_watcher();
    info!(
        interval_secs = server.watcher().interval().as_secs(),
        "{}",
        reply.body
    );

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    server.shutdown().await;
    Ok(())
}
