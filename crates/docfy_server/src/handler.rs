//! Request context and reply types shared by every handler.

use crate::auth::{bearer_token, Claims, TokenValidator};
use crate::config::ServerConfig;
use crate::error::ServerResult;
use docfy_storage::{ContactBoxRegistry, ContactStore, CustomerStore, UserStore};
use docfy_sync_engine::{AccountAuthorizer, ContactsClient, Watcher};
use serde::Serialize;
use std::sync::Arc;

/// Every collection the back office reads and writes.
pub trait BackOfficeStore:
    ContactStore + ContactBoxRegistry + CustomerStore + UserStore + 'static
{
}

impl<T> BackOfficeStore for T where
    T: ContactStore + ContactBoxRegistry + CustomerStore + UserStore + 'static
{
}

/// The watcher type driven by the handlers.
pub type BackOfficeWatcher<C, S> = Watcher<C, S, S>;

/// A successful handler response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply<T> {
    /// HTTP status code.
    #[serde(skip)]
    pub status: u16,
    /// Response payload.
    pub body: T,
}

impl<T> Reply<T> {
    /// 200 OK.
    pub fn ok(body: T) -> Self {
        Self { status: 200, body }
    }

    /// 201 Created.
    pub fn created(body: T) -> Self {
        Self { status: 201, body }
    }
}

impl<T> Reply<Option<T>> {
    /// 200 with the value, or 204 when there is none.
    pub fn found(body: Option<T>) -> Self {
        let status = if body.is_some() { 200 } else { 204 };
        Self { status, body }
    }
}

/// Context for request handling.
pub struct HandlerContext<C, A, S>
where
    C: ContactsClient + 'static,
    A: AccountAuthorizer,
    S: BackOfficeStore,
{
    /// Server configuration.
    pub config: ServerConfig,
    /// Issues and checks bearer tokens.
    pub tokens: TokenValidator,
    /// Local collections.
    pub store: Arc<S>,
    /// OAuth consent flow for new contact boxes.
    pub authorizer: Arc<A>,
    /// Scheduled reconciliation.
    pub watcher: Arc<BackOfficeWatcher<C, S>>,
}

impl<C, A, S> HandlerContext<C, A, S>
where
    C: ContactsClient + 'static,
    A: AccountAuthorizer,
    S: BackOfficeStore,
{
    /// Creates a new handler context.
    pub fn new(
        config: ServerConfig,
        store: Arc<S>,
        authorizer: Arc<A>,
        watcher: Arc<BackOfficeWatcher<C, S>>,
    ) -> Self {
        let tokens = TokenValidator::new(config.auth.clone());
        Self {
            config,
            tokens,
            store,
            authorizer,
            watcher,
        }
    }
}

/// Handler for back-office requests.
///
/// Methods are grouped by area in the `health`, `security`, `customers`
/// and `contacts` modules.
pub struct RequestHandler<C, A, S>
where
    C: ContactsClient + 'static,
    A: AccountAuthorizer,
    S: BackOfficeStore,
{
    pub(crate) context: Arc<HandlerContext<C, A, S>>,
}

impl<C, A, S> RequestHandler<C, A, S>
where
    C: ContactsClient + 'static,
    A: AccountAuthorizer,
    S: BackOfficeStore,
{
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext<C, A, S>>) -> Self {
        Self { context }
    }

    /// Validates the `Authorization` header value and returns its claims.
    pub fn authorize(&self, authorization: Option<&str>) -> ServerResult<Claims> {
        let token = bearer_token(authorization)?;
        self.context.tokens.validate(token)
    }

    /// Liveness check.
    pub fn health(&self) -> Reply<String> {
        Reply::ok("Docfy server alive!".to_string())
    }

    /// Liveness check behind authorization.
    pub fn health_safe(&self, authorization: Option<&str>) -> ServerResult<Reply<String>> {
        self.authorize(authorization)?;
        Ok(Reply::ok("Docfy server alive and safe.".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_statuses() {
        assert_eq!(Reply::ok(1).status, 200);
        assert_eq!(Reply::created(1).status, 201);
        assert_eq!(Reply::found(Some(1)).status, 200);
        assert_eq!(Reply::<Option<i32>>::found(None).status, 204);
    }

    #[test]
    fn reply_serializes_body_only() {
        let json = serde_json::to_value(Reply::created("x")).unwrap();
        assert_eq!(json, serde_json::json!({ "body": "x" }));
    }
}
