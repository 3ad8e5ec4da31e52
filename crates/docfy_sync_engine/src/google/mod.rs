//! Google contacts client.
//!
//! Talks to the GData v3 contacts feed over `reqwest`: JSON feed pages for
//! reads, Atom batch documents for writes. Expired access tokens are
//! refreshed before a request and the new bundle is persisted through the
//! contact box registry.

mod batch;
mod feed;
mod oauth;

use crate::config::GoogleConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::{AccountAuthorizer, AuthorizedAccount, ContactsClient};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use docfy_model::{BatchItem, BatchOperation, BatchResult, ContactBox, ContactChanges};
use docfy_storage::ContactBoxRegistry;
use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

const GDATA_VERSION: &str = "3.0";

/// [`ContactsClient`] and [`AccountAuthorizer`] backed by Google.
pub struct GoogleContactsClient<R: ContactBoxRegistry> {
    config: GoogleConfig,
    consent_endpoint: Url,
    http: Client,
    registry: Arc<R>,
}

impl<R: ContactBoxRegistry + 'static> GoogleContactsClient<R> {
    /// Creates a client. Refreshed credentials are saved to `registry`.
    pub fn new(config: GoogleConfig, registry: Arc<R>) -> SyncResult<Self> {
        let consent_endpoint = Url::parse(&config.auth_url)
            .map_err(|e| SyncError::transport_fatal(format!("invalid auth url: {e}")))?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SyncError::transport_fatal(e.to_string()))?;
        Ok(Self {
            config,
            consent_endpoint,
            http,
            registry,
        })
    }

    /// Gets the configuration.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    async fn ensure_fresh(&self, contact_box: &ContactBox) -> SyncResult<ContactBox> {
        if contact_box.tokens.is_expired(Utc::now()) {
            self.refresh_credentials(contact_box).await
        } else {
            Ok(contact_box.clone())
        }
    }

    async fn fetch_page(
        &self,
        contact_box: &ContactBox,
        since: Option<DateTime<Utc>>,
        start_index: usize,
    ) -> SyncResult<feed::FeedPage> {
        let mut query = vec![
            ("alt", "json".to_string()),
            ("start-index", start_index.to_string()),
            ("max-results", self.config.page_size.max(1).to_string()),
        ];
        if let Some(since) = since {
            query.push((
                "updated-min",
                since.to_rfc3339_opts(SecondsFormat::Millis, true),
            ));
            query.push(("showdeleted", "true".to_string()));
        }

        let response = self
            .http
            .get(&self.config.contacts_url)
            .bearer_auth(&contact_box.tokens.access_token)
            .header("GData-Version", GDATA_VERSION)
            .query(&query)
            .send()
            .await?;
        let body = oauth::check_status(response).await?.text().await?;
        feed::parse_page(&body)
    }

    async fn send_chunk(
        &self,
        contact_box: &ContactBox,
        items: &[BatchItem],
        operation: BatchOperation,
    ) -> SyncResult<Vec<BatchResult>> {
        let body = batch::build_request(&self.config.contacts_url, items, operation)?;
        let response = self
            .http
            .post(self.config.batch_url())
            .bearer_auth(&contact_box.tokens.access_token)
            .header("GData-Version", GDATA_VERSION)
            .header(reqwest::header::CONTENT_TYPE, "application/atom+xml")
            .body(body)
            .send()
            .await?;
        let xml = oauth::check_status(response).await?.text().await?;
        batch::parse_response(&xml, items, operation)
    }
}

#[async_trait]
impl<R: ContactBoxRegistry + 'static> ContactsClient for GoogleContactsClient<R> {
    async fn fetch_changes(
        &self,
        contact_box: &ContactBox,
        since: Option<DateTime<Utc>>,
    ) -> SyncResult<ContactChanges> {
        let contact_box = self.ensure_fresh(contact_box).await?;
        let page_size = self.config.page_size.max(1);

        let mut changes = ContactChanges::default();
        let mut start_index = 1;
        loop {
            let page = self.fetch_page(&contact_box, since, start_index).await?;
            let entries = page.entries;
            changes.contacts.extend(page.contacts);
            changes.deleted.extend(page.deleted);
            if entries < page_size {
                break;
            }
            start_index += entries;
        }

        debug!(
            box_email = %contact_box.email,
            changed = changes.contacts.len(),
            deleted = changes.deleted.len(),
            "fetched contact changes"
        );
        Ok(changes)
    }

    async fn apply_operation(
        &self,
        contact_box: &ContactBox,
        items: Vec<BatchItem>,
        operation: BatchOperation,
    ) -> SyncResult<Vec<BatchResult>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let contact_box = self.ensure_fresh(contact_box).await?;

        let chunks = items.chunks(self.config.effective_batch_size());
        let responses = join_all(
            chunks.map(|chunk| self.send_chunk(&contact_box, chunk, operation)),
        )
        .await;

        let mut results = Vec::with_capacity(items.len());
        for response in responses {
            results.extend(response?);
        }
        Ok(results)
    }

    async fn refresh_credentials(&self, contact_box: &ContactBox) -> SyncResult<ContactBox> {
        let tokens = oauth::refresh(&self.http, &self.config, &contact_box.tokens).await?;
        self.registry
            .update_tokens(&contact_box.email, tokens.clone())
            .await?;
        info!(box_email = %contact_box.email, "refreshed contact box credentials");

        let mut refreshed = contact_box.clone();
        refreshed.tokens = tokens;
        Ok(refreshed)
    }
}

#[async_trait]
impl<R: ContactBoxRegistry + 'static> AccountAuthorizer for GoogleContactsClient<R> {
    fn generate_auth_url(&self) -> String {
        oauth::consent_url(&self.consent_endpoint, &self.config)
    }

    async fn authenticate(&self, code: &str) -> SyncResult<AuthorizedAccount> {
        let tokens = oauth::exchange_code(&self.http, &self.config, code).await?;
        let email = oauth::fetch_email(&self.http, &self.config, &tokens).await?;
        info!(%email, "account authorized");
        Ok(AuthorizedAccount { email, tokens })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfy_storage::InMemoryStore;

    #[test]
    fn rejects_malformed_auth_url() {
        let mut config = GoogleConfig::new("id", "secret", "http://localhost/cb");
        config.auth_url = "not a url".to_string();

        let result = GoogleContactsClient::new(config, Arc::new(InMemoryStore::in_memory()));
        assert!(matches!(result, Err(SyncError::Transport { retryable: false, .. })));
    }

    #[test]
    fn auth_url_targets_configured_endpoint() {
        let config = GoogleConfig::new("id", "secret", "http://localhost/cb")
            .with_base_url("http://127.0.0.1:9000");
        let client =
            GoogleContactsClient::new(config, Arc::new(InMemoryStore::in_memory())).unwrap();

        let url = client.generate_auth_url();
        assert!(url.starts_with("http://127.0.0.1:9000/o/oauth2/v2/auth?"));
        assert!(url.contains("access_type=offline"));
    }

    #[tokio::test]
    async fn fresh_credentials_are_used_as_is() {
        let config = GoogleConfig::new("id", "secret", "http://localhost/cb")
            .with_base_url("http://127.0.0.1:9");
        let client =
            GoogleContactsClient::new(config, Arc::new(InMemoryStore::in_memory())).unwrap();
        let contact_box = ContactBox::new("a@x.com", docfy_model::OAuthTokens::new("t"));

        let fresh = client.ensure_fresh(&contact_box).await.unwrap();
        assert_eq!(fresh, contact_box);
    }

    #[tokio::test]
    async fn empty_batch_makes_no_request() {
        // Port 9 (discard) is never contacted for an empty batch.
        let config = GoogleConfig::new("id", "secret", "http://localhost/cb")
            .with_base_url("http://127.0.0.1:9");
        let client =
            GoogleContactsClient::new(config, Arc::new(InMemoryStore::in_memory())).unwrap();
        let contact_box = ContactBox::new("a@x.com", docfy_model::OAuthTokens::new("t"));

        let results = client
            .apply_operation(&contact_box, Vec::new(), BatchOperation::Create)
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
