//! The back-office server facade.

use crate::config::ServerConfig;
use crate::handler::{BackOfficeStore, BackOfficeWatcher, HandlerContext, RequestHandler};
use docfy_sync_engine::{AccountAuthorizer, ContactsClient, Reconciler, SyncConfig};
use std::ops::Deref;
use std::sync::Arc;
use tracing::info;

/// The Docfy back-office server.
///
/// Owns the handler context and exposes every handler through `Deref` to
/// [`RequestHandler`]. It binds no socket: a routing layer maps requests to
/// the handler methods and their `Reply`/`ServerError` back to responses.
///
/// # Example
///
/// ```
/// use docfy_server::{Credentials, DocfyServer, ServerConfig};
/// use docfy_storage::InMemoryStore;
/// use docfy_sync_engine::{MockAuthorizer, MockContactsClient, SyncConfig};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let server = DocfyServer::new(
///     ServerConfig::new(b"secret".to_vec()),
///     SyncConfig::new("main@docfy.com"),
///     Arc::new(InMemoryStore::in_memory()),
///     Arc::new(MockContactsClient::new()),
///     Arc::new(MockAuthorizer::new()),
/// );
///
/// let reply = server.register(Credentials::new("ana", "pw")).await.unwrap();
/// assert_eq!(reply.status, 200);
/// # }
/// ```
pub struct DocfyServer<C, A, S>
where
    C: ContactsClient + 'static,
    A: AccountAuthorizer,
    S: BackOfficeStore,
{
    handler: RequestHandler<C, A, S>,
    context: Arc<HandlerContext<C, A, S>>,
}

impl<C, A, S> DocfyServer<C, A, S>
where
    C: ContactsClient + 'static,
    A: AccountAuthorizer,
    S: BackOfficeStore,
{
    /// Creates a server, building the reconciler and an idle watcher.
    pub fn new(
        config: ServerConfig,
        sync: SyncConfig,
        store: Arc<S>,
        client: Arc<C>,
        authorizer: Arc<A>,
    ) -> Self {
        let reconciler = Arc::new(Reconciler::new(
            sync,
            client,
            Arc::clone(&store),
            Arc::clone(&store),
        ));
        let watcher = Arc::new(BackOfficeWatcher::new(reconciler));
        Self::with_watcher(config, store, authorizer, watcher)
    }

    /// Creates a server around an existing watcher.
    pub fn with_watcher(
        config: ServerConfig,
        store: Arc<S>,
        authorizer: Arc<A>,
        watcher: Arc<BackOfficeWatcher<C, S>>,
    ) -> Self {
        let context = Arc::new(HandlerContext::new(config, store, authorizer, watcher));
        let handler = RequestHandler::new(Arc::clone(&context));
        Self { handler, context }
    }

    /// Gets the watcher.
    pub fn watcher(&self) -> &Arc<BackOfficeWatcher<C, S>> {
        &self.context.watcher
    }

    /// Gets the store.
    pub fn store(&self) -> &Arc<S> {
        &self.context.store
    }

    /// Stops the watcher and waits for an in-flight run to finish.
    pub async fn shutdown(&self) {
        self.context.watcher.shutdown().await;
        info!("server shut down");
    }
}

impl<C, A, S> Deref for DocfyServer<C, A, S>
where
    C: ContactsClient + 'static,
    A: AccountAuthorizer,
    S: BackOfficeStore,
{
    type Target = RequestHandler<C, A, S>;

    fn deref(&self) -> &Self::Target {
        &self.handler
    }
}
