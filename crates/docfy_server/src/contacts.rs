//! Contact box registration and reconciliation triggers.

use crate::error::{ServerError, ServerResult};
use crate::handler::{BackOfficeStore, Reply, RequestHandler};
use docfy_model::{ContactBox, OAuthTokens};
use docfy_storage::ContactBoxRegistry;
use docfy_sync_engine::{AccountAuthorizer, ContactsClient, ReconcileStats, WatcherState};
use serde::Serialize;
use tracing::info;

/// Consent URL for registering a new box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentUrl {
    /// URL the user must open.
    pub consent_url: String,
}

/// Snapshot of the watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatcherStatus {
    /// `idle`, `running` or `stopping`.
    pub state: String,
    /// Whether a reconciliation is in flight right now.
    pub reconciling: bool,
    /// Seconds between scheduled runs.
    pub interval_secs: u64,
    /// Accumulated reconciliation statistics.
    pub stats: ReconcileStats,
}

fn state_name(state: WatcherState) -> &'static str {
    match state {
        WatcherState::Idle => "idle",
        WatcherState::Running => "running",
        WatcherState::Stopping => "stopping",
    }
}

/// Result of linking a box to stored contacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkReply {
    /// Box email.
    pub box_email: String,
    /// Stored contacts that received the box's id.
    pub linked: usize,
}

impl<C, A, S> RequestHandler<C, A, S>
where
    C: ContactsClient + 'static,
    A: AccountAuthorizer,
    S: BackOfficeStore,
{
    /// Saves a new contact box. A registered email is a conflict.
    pub async fn register_contact_box(
        &self,
        email: &str,
        tokens: OAuthTokens,
    ) -> ServerResult<ContactBox> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ServerError::InvalidRequest("Contact box email is empty".into()));
        }
        let saved = ContactBoxRegistry::save(
            self.context.store.as_ref(),
            ContactBox::new(email, tokens),
        )
        .await?;
        info!(box_email = %saved.email, "contact box registered");
        Ok(saved)
    }

    /// Returns the URL that starts the consent flow.
    pub fn google_login(&self) -> Reply<ConsentUrl> {
        Reply::ok(ConsentUrl {
            consent_url: self.context.authorizer.generate_auth_url(),
        })
    }

    /// Completes the consent flow and registers the granted account.
    pub async fn google_callback(&self, code: Option<&str>) -> ServerResult<Reply<String>> {
        let code = code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ServerError::InvalidRequest("Missing authorization code".into()))?;

        let account = self.context.authorizer.authenticate(code).await?;
        let saved = self.register_contact_box(&account.email, account.tokens).await?;
        Ok(Reply::created(format!("{} registered.", saved.email)))
    }

    /// Starts the scheduled reconciliation.
    pub fn start_watcher(&self) -> Reply<String> {
        let message = if self.context.watcher.start() {
            "Job started."
        } else {
            "Job already running."
        };
        Reply::ok(message.to_string())
    }

    /// Fires one reconciliation in the background and answers at once.
    pub fn force_watcher(&self) -> Reply<String> {
        // The outcome is logged by the reconciler.
        drop(self.context.watcher.trigger_now());
        Reply::ok("Job fired.".to_string())
    }

    /// Stops the scheduled reconciliation. An in-flight run completes.
    pub fn stop_watcher(&self) -> Reply<String> {
        let message = if self.context.watcher.stop() {
            "Job stopped."
        } else {
            "Job not running."
        };
        Reply::ok(message.to_string())
    }

    /// Reports the watcher state and statistics.
    pub fn watcher_status(&self) -> Reply<WatcherStatus> {
        let watcher = &self.context.watcher;
        Reply::ok(WatcherStatus {
            state: state_name(watcher.state()).to_string(),
            reconciling: watcher.reconciler().is_running(),
            interval_secs: watcher.interval().as_secs(),
            stats: watcher.stats(),
        })
    }

    /// Stamps a box's existing record ids onto matching stored contacts.
    pub async fn link_box(&self, box_email: &str) -> ServerResult<Reply<LinkReply>> {
        let linked = self
            .context
            .watcher
            .reconciler()
            .link_existing_ids(box_email)
            .await?;
        Ok(Reply::ok(LinkReply {
            box_email: box_email.to_string(),
            linked,
        }))
    }
}
