//! Seams between the engine and the remote contacts provider.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docfy_model::{BatchItem, BatchOperation, BatchResult, ContactBox, ContactChanges, OAuthTokens};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

/// A contacts client talks to the remote account behind a contact box.
///
/// This trait abstracts the provider API, allowing for different
/// implementations (Google, scripted mock for testing, etc.). Implementations
/// refresh expired credentials themselves before any request.
#[async_trait]
pub trait ContactsClient: Send + Sync {
    /// Returns contacts changed and deleted since `since`.
    ///
    /// Without a watermark the full current set is returned and `deleted`
    /// is empty.
    async fn fetch_changes(
        &self,
        contact_box: &ContactBox,
        since: Option<DateTime<Utc>>,
    ) -> SyncResult<ContactChanges>;

    /// Executes one batched mutation and reports every entry's outcome.
    ///
    /// For creates, successful results carry the assigned remote id.
    async fn apply_operation(
        &self,
        contact_box: &ContactBox,
        items: Vec<BatchItem>,
        operation: BatchOperation,
    ) -> SyncResult<Vec<BatchResult>>;

    /// Exchanges the refresh token for a new access token and persists the
    /// new bundle, returning the updated box.
    async fn refresh_credentials(&self, contact_box: &ContactBox) -> SyncResult<ContactBox>;
}

/// An account that completed the consent flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedAccount {
    /// Account email.
    pub email: String,
    /// Granted credentials.
    pub tokens: OAuthTokens,
}

/// The OAuth consent flow used to register new contact boxes.
#[async_trait]
pub trait AccountAuthorizer: Send + Sync {
    /// Returns the URL the user must visit to grant access.
    fn generate_auth_url(&self) -> String;

    /// Exchanges an authorization code for credentials and resolves the
    /// account email.
    async fn authenticate(&self, code: &str) -> SyncResult<AuthorizedAccount>;
}

/// One batch call observed by [`MockContactsClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBatch {
    /// Target box.
    pub box_email: String,
    /// Operation.
    pub operation: BatchOperation,
    /// Entries sent.
    pub items: Vec<BatchItem>,
}

#[derive(Debug, Default)]
struct MockState {
    changes: HashMap<String, VecDeque<ContactChanges>>,
    fetch_failures: HashMap<String, String>,
    operation_failures: HashSet<(String, BatchOperation)>,
    rejected: HashSet<String>,
    fetch_delay: Option<Duration>,
    fetches: Vec<(String, Option<DateTime<Utc>>)>,
    batches: Vec<RecordedBatch>,
    refreshes: Vec<String>,
}

/// A scripted contacts client for testing.
///
/// Fetches pop queued change sets per box (empty once the queue drains).
/// Creates are answered with the remote id `"<box email>/<contact id>"`.
#[derive(Debug, Default)]
pub struct MockContactsClient {
    state: Mutex<MockState>,
}

impl MockContactsClient {
    /// Creates a new mock client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the change set returned by the next fetch for `box_email`.
    pub fn push_changes(&self, box_email: &str, changes: ContactChanges) {
        self.state
            .lock()
            .changes
            .entry(box_email.to_string())
            .or_default()
            .push_back(changes);
    }

    /// Makes every fetch for `box_email` fail until cleared.
    pub fn fail_fetch(&self, box_email: &str, message: impl Into<String>) {
        self.state
            .lock()
            .fetch_failures
            .insert(box_email.to_string(), message.into());
    }

    /// Makes every `operation` batch against `box_email` fail until cleared.
    pub fn fail_operation(&self, box_email: &str, operation: BatchOperation) {
        self.state
            .lock()
            .operation_failures
            .insert((box_email.to_string(), operation));
    }

    /// Makes entries for the contact with main-account id `contact_id` come
    /// back with status 500 inside otherwise successful batches.
    pub fn reject_contact(&self, contact_id: &str) {
        self.state.lock().rejected.insert(contact_id.to_string());
    }

    /// Removes every scripted failure.
    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.fetch_failures.clear();
        state.operation_failures.clear();
        state.rejected.clear();
    }

    /// Delays every fetch, to keep a reconciliation in flight.
    pub fn set_fetch_delay(&self, delay: Duration) {
        self.state.lock().fetch_delay = Some(delay);
    }

    /// Returns every fetch made, as `(box email, watermark)`.
    pub fn fetches(&self) -> Vec<(String, Option<DateTime<Utc>>)> {
        self.state.lock().fetches.clone()
    }

    /// Returns every batch call made.
    pub fn batches(&self) -> Vec<RecordedBatch> {
        self.state.lock().batches.clone()
    }

    /// Returns the batch calls made against one box.
    pub fn batches_for(&self, box_email: &str) -> Vec<RecordedBatch> {
        self.state
            .lock()
            .batches
            .iter()
            .filter(|b| b.box_email == box_email)
            .cloned()
            .collect()
    }

    /// Returns the emails of boxes whose credentials were refreshed.
    pub fn refreshes(&self) -> Vec<String> {
        self.state.lock().refreshes.clone()
    }

    /// Returns the remote id the mock assigns on create.
    pub fn assigned_id(box_email: &str, contact_id: &str) -> String {
        format!("{box_email}/{contact_id}")
    }
}

#[async_trait]
impl ContactsClient for MockContactsClient {
    async fn fetch_changes(
        &self,
        contact_box: &ContactBox,
        since: Option<DateTime<Utc>>,
    ) -> SyncResult<ContactChanges> {
        let delay = {
            let mut state = self.state.lock();
            state.fetches.push((contact_box.email.clone(), since));
            state.fetch_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if let Some(message) = state.fetch_failures.get(&contact_box.email) {
            return Err(SyncError::RemoteStatus {
                status: 500,
                body: message.clone(),
            });
        }
        Ok(state
            .changes
            .get_mut(&contact_box.email)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default())
    }

    async fn apply_operation(
        &self,
        contact_box: &ContactBox,
        items: Vec<BatchItem>,
        operation: BatchOperation,
    ) -> SyncResult<Vec<BatchResult>> {
        let mut state = self.state.lock();
        state.batches.push(RecordedBatch {
            box_email: contact_box.email.clone(),
            operation,
            items: items.clone(),
        });

        if state
            .operation_failures
            .contains(&(contact_box.email.clone(), operation))
        {
            return Err(SyncError::RemoteStatus {
                status: 500,
                body: format!("scripted {operation} failure"),
            });
        }

        let results = items
            .into_iter()
            .map(|item| {
                let contact_id = item.contact.id;
                if state.rejected.contains(&contact_id) {
                    return BatchResult::new(contact_id, None, 500);
                }
                match operation {
                    BatchOperation::Create => {
                        let remote_id = Self::assigned_id(&contact_box.email, &contact_id);
                        BatchResult::new(contact_id, Some(remote_id), 201)
                    }
                    BatchOperation::Update | BatchOperation::Delete => {
                        BatchResult::new(contact_id, item.remote_id, 200)
                    }
                }
            })
            .collect();
        Ok(results)
    }

    async fn refresh_credentials(&self, contact_box: &ContactBox) -> SyncResult<ContactBox> {
        self.state.lock().refreshes.push(contact_box.email.clone());
        let mut refreshed = contact_box.clone();
        refreshed.tokens.access_token = format!("refreshed-{}", contact_box.tokens.access_token);
        refreshed.tokens.expiry_date = Some(Utc::now() + chrono::Duration::hours(1));
        Ok(refreshed)
    }
}

/// A scripted consent flow for testing.
#[derive(Debug, Default)]
pub struct MockAuthorizer {
    accounts: Mutex<HashMap<String, AuthorizedAccount>>,
}

impl MockAuthorizer {
    /// Creates a new mock authorizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `code` authenticate as `email` with `tokens`.
    pub fn grant(&self, code: &str, email: &str, tokens: OAuthTokens) {
        self.accounts.lock().insert(
            code.to_string(),
            AuthorizedAccount {
                email: email.to_string(),
                tokens,
            },
        );
    }
}

#[async_trait]
impl AccountAuthorizer for MockAuthorizer {
    fn generate_auth_url(&self) -> String {
        "https://accounts.example.com/consent?access_type=offline".to_string()
    }

    async fn authenticate(&self, code: &str) -> SyncResult<AuthorizedAccount> {
        self.accounts
            .lock()
            .get(code)
            .cloned()
            .ok_or_else(|| SyncError::AuthenticationFailed(format!("unknown code {code}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfy_model::Contact;

    fn contact_box(email: &str) -> ContactBox {
        ContactBox::new(email, OAuthTokens::new("access"))
    }

    #[tokio::test]
    async fn mock_fetch_pops_queued_changes() {
        let client = MockContactsClient::new();
        let main = contact_box("main@x.com");
        client.push_changes(
            "main@x.com",
            ContactChanges::new(vec![Contact::new("1")], Vec::new()),
        );

        let first = client.fetch_changes(&main, None).await.unwrap();
        assert_eq!(first.contacts.len(), 1);

        let second = client.fetch_changes(&main, None).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(client.fetches().len(), 2);
    }

    #[tokio::test]
    async fn mock_fetch_failure() {
        let client = MockContactsClient::new();
        client.fail_fetch("main@x.com", "boom");

        let result = client.fetch_changes(&contact_box("main@x.com"), None).await;
        assert!(matches!(result, Err(SyncError::RemoteStatus { status: 500, .. })));

        client.clear_failures();
        assert!(client
            .fetch_changes(&contact_box("main@x.com"), None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn mock_create_assigns_ids() {
        let client = MockContactsClient::new();
        let target = contact_box("a@x.com");
        client.reject_contact("2");

        let results = client
            .apply_operation(
                &target,
                vec![
                    BatchItem::create(Contact::new("1")),
                    BatchItem::create(Contact::new("2")),
                ],
                BatchOperation::Create,
            )
            .await
            .unwrap();

        assert_eq!(results[0].remote_id.as_deref(), Some("a@x.com/1"));
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert_eq!(client.batches_for("a@x.com").len(), 1);
    }

    #[tokio::test]
    async fn mock_operation_failure_is_per_box() {
        let client = MockContactsClient::new();
        client.fail_operation("a@x.com", BatchOperation::Delete);

        let items = vec![BatchItem::targeting("rem-1", Contact::new("1"))];
        assert!(client
            .apply_operation(&contact_box("a@x.com"), items.clone(), BatchOperation::Delete)
            .await
            .is_err());
        assert!(client
            .apply_operation(&contact_box("b@x.com"), items, BatchOperation::Delete)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn mock_authorizer() {
        let authorizer = MockAuthorizer::new();
        authorizer.grant("code-1", "a@x.com", OAuthTokens::new("access"));

        let account = authorizer.authenticate("code-1").await.unwrap();
        assert_eq!(account.email, "a@x.com");
        assert!(matches!(
            authorizer.authenticate("nope").await,
            Err(SyncError::AuthenticationFailed(_))
        ));
        assert!(authorizer.generate_auth_url().contains("offline"));
    }
}
