//! Wiring of the store, Google client and server from settings.

use crate::settings::Settings;
use docfy_server::DocfyServer;
use docfy_storage::FileStore;
use docfy_sync_engine::GoogleContactsClient;
use std::sync::Arc;
use tracing::{debug, warn};

/// Google client persisting refreshed tokens to the file store.
pub type Client = GoogleContactsClient<FileStore>;

/// The fully wired back office.
pub type Server = DocfyServer<Client, Client, FileStore>;

/// Opens the store and builds the server.
pub fn build(settings: &Settings) -> Result<Server, Box<dyn std::error::Error>> {
    let store = Arc::new(FileStore::open(&settings.storage.path)?);
    debug!(path = %settings.storage.path.display(), "store opened");

    let client = Arc::new(GoogleContactsClient::new(
        settings.google_config(),
        Arc::clone(&store),
    )?);

    if settings.server.token_secret.is_empty() {
        warn!("server.token_secret is empty; issued tokens are trivially forgeable");
    }

    Ok(DocfyServer::new(
        settings.server_config(),
        settings.sync_config(),
        store,
        Arc::clone(&client),
        client,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builds_against_temp_store() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::default()
            .with_data_path_override(Some(dir.path().join("nested/docfy.json").display().to_string()));

        let server = build(&settings).unwrap();
        assert!(server.health().body.contains("alive"));
        assert!(server.google_login().body.consent_url.contains("access_type=offline"));
    }
}
