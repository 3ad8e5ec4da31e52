//! Registration, login and token renewal.

use crate::error::{ServerError, ServerResult};
use crate::handler::{BackOfficeStore, Reply, RequestHandler};
use crate::password::{hash_password, verify_password};
use docfy_model::User;
use docfy_sync_engine::{AccountAuthorizer, ContactsClient};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Username and password, as posted by a client. Either may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    /// Login name.
    #[serde(default)]
    pub username: Option<String>,
    /// Clear-text password.
    #[serde(default)]
    pub password: Option<String>,
}

impl Credentials {
    /// Creates a complete credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    fn filled(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().filter(|u| !u.trim().is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some((username.trim(), password))
    }
}

/// A freshly issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenReply {
    /// Signed bearer token.
    pub token: String,
}

impl<C, A, S> RequestHandler<C, A, S>
where
    C: ContactsClient + 'static,
    A: AccountAuthorizer,
    S: BackOfficeStore,
{
    /// Creates a user and signs them in.
    pub async fn register(&self, credentials: Credentials) -> ServerResult<Reply<TokenReply>> {
        let (username, password) = credentials.filled().ok_or_else(|| {
            ServerError::InvalidRequest("Register: not all fields filled".into())
        })?;
        if password.chars().count() < self.context.config.min_password_length {
            return Err(ServerError::InvalidRequest(format!(
                "Password must have at least {} characters",
                self.context.config.min_password_length
            )));
        }

        let user = User::new(username, hash_password(password)?);
        let user = self.context.store.insert_user(user).await?;
        debug!(username = %user.username, "new user registered");

        let token = self.context.tokens.create_token(&user)?;
        Ok(Reply::ok(TokenReply { token }))
    }

    /// Checks credentials and issues a token.
    pub async fn login(&self, credentials: Credentials) -> ServerResult<Reply<TokenReply>> {
        let (username, password) = credentials
            .filled()
            .ok_or_else(|| ServerError::InvalidRequest("Login: not all fields filled".into()))?;

        let Some(user) = self.context.store.find_user(&username.to_lowercase()).await? else {
            warn!(%username, "failed login: unknown user");
            return Err(ServerError::AuthenticationFailed("Incorrect username.".into()));
        };
        if !verify_password(password, &user.password_hash)? {
            warn!(%username, "failed login: wrong password");
            return Err(ServerError::AuthenticationFailed("Incorrect password.".into()));
        }

        debug!(username = %user.username, "logged in");
        let token = self.context.tokens.create_token(&user)?;
        Ok(Reply::ok(TokenReply { token }))
    }

    /// Re-issues a valid token with a fresh expiry.
    pub fn renew_token(&self, token: &str) -> ServerResult<Reply<TokenReply>> {
        let token = self.context.tokens.renew(token)?;
        debug!("token renewed");
        Ok(Reply::ok(TokenReply { token }))
    }
}
