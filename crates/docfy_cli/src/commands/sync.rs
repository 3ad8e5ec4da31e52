//! Sync command implementation.

use crate::app::Server;

/// Runs one reconciliation and prints its outcome.
pub async fn run(server: &Server) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = server.watcher().force_now().await;
    println!("{outcome}");
    if outcome.is_failure() {
        return Err("reconciliation failed".into());
    }
    Ok(())
}
