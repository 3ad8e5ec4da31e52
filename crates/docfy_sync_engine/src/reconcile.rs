//! The reconciliation engine.

use crate::config::SyncConfig;
use crate::diff::{BoxPlan, ContactDiff};
use crate::error::{SyncError, SyncResult};
use crate::transport::ContactsClient;
use chrono::{DateTime, Utc};
use docfy_model::{BatchItem, BatchOperation, BatchResult, Contact, ContactBox};
use docfy_storage::{ContactBoxRegistry, ContactStore};
use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Why a reconciliation did nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Another reconciliation was in flight.
    AlreadyRunning,
    /// No main box email is configured.
    MainEmailNotConfigured,
    /// The configured main box is not registered.
    MainBoxNotRegistered(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyRunning => f.write_str("a reconciliation is already running"),
            SkipReason::MainEmailNotConfigured => f.write_str("main email not configured"),
            SkipReason::MainBoxNotRegistered(email) => {
                write!(f, "{email} (main email) not registered")
            }
        }
    }
}

/// What an applied reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Contacts inserted locally.
    pub created: usize,
    /// Stored contacts updated.
    pub updated: usize,
    /// Stored contacts removed.
    pub deleted: usize,
    /// Satellite boxes the diff was propagated to.
    pub satellites: usize,
    /// Batch entries a box rejected inside a successful call.
    pub rejected_entries: usize,
}

/// Result of one `reconcile()` call.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// Nothing was attempted.
    Skipped(SkipReason),
    /// Upstream reported no changes; only the watermark moved.
    Unchanged,
    /// The diff was propagated and committed.
    Applied(ReconcileReport),
    /// The cycle failed.
    Failed {
        /// The first error encountered.
        error: SyncError,
        /// True when the main box watermark ended at its pre-cycle value.
        watermark_restored: bool,
    },
}

impl ReconcileOutcome {
    /// Returns true for `Unchanged` and `Applied`.
    pub fn is_success(&self) -> bool {
        matches!(self, ReconcileOutcome::Unchanged | ReconcileOutcome::Applied(_))
    }

    /// Returns true for `Failed`.
    pub fn is_failure(&self) -> bool {
        matches!(self, ReconcileOutcome::Failed { .. })
    }

    /// Returns the report of an applied cycle.
    pub fn report(&self) -> Option<&ReconcileReport> {
        match self {
            ReconcileOutcome::Applied(report) => Some(report),
            _ => None,
        }
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOutcome::Skipped(reason) => write!(f, "skipped: {reason}"),
            ReconcileOutcome::Unchanged => f.write_str("no upstream changes"),
            ReconcileOutcome::Applied(r) => write!(
                f,
                "applied: {} created, {} updated, {} deleted across {} boxes",
                r.created, r.updated, r.deleted, r.satellites
            ),
            ReconcileOutcome::Failed {
                error,
                watermark_restored,
            } => write!(f, "failed: {error} (watermark restored: {watermark_restored})"),
        }
    }
}

/// Statistics about reconciliations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    /// Total `reconcile()` calls.
    pub runs: u64,
    /// Runs that applied a diff.
    pub applied: u64,
    /// Runs that found nothing to do.
    pub unchanged: u64,
    /// Runs skipped.
    pub skipped: u64,
    /// Runs that failed.
    pub failures: u64,
    /// Contacts inserted locally.
    pub contacts_created: u64,
    /// Stored contacts updated.
    pub contacts_updated: u64,
    /// Stored contacts removed.
    pub contacts_deleted: u64,
    /// When the last run finished.
    pub last_run_at: Option<DateTime<Utc>>,
    /// Duration of the last run in milliseconds.
    pub last_duration_ms: Option<u64>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// The three diff categories, committed independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Create,
    Update,
    Delete,
}

impl Category {
    fn as_str(self) -> &'static str {
        match self {
            Category::Create => "create",
            Category::Update => "update",
            Category::Delete => "delete",
        }
    }

    fn batches(self, plan: &BoxPlan) -> Vec<(BatchOperation, Vec<BatchItem>)> {
        let batches = match self {
            Category::Create => vec![(BatchOperation::Create, plan.creates.clone())],
            Category::Update => vec![
                (BatchOperation::Create, plan.backfills.clone()),
                (BatchOperation::Update, plan.updates.clone()),
            ],
            Category::Delete => vec![(BatchOperation::Delete, plan.deletes.clone())],
        };
        batches
            .into_iter()
            .filter(|(_, items)| !items.is_empty())
            .collect()
    }
}

/// A remote id a box assigned to a contact.
#[derive(Debug)]
struct Stamp {
    box_email: String,
    contact_id: String,
    remote_id: String,
}

#[derive(Debug, Default)]
struct Propagated {
    stamps: Vec<Stamp>,
    rejected: usize,
}

/// Reconciles the main contact box into the local store and every satellite
/// box.
///
/// # Cycle
///
/// 1. Load the main box (skip if unconfigured or unregistered)
/// 2. Fetch upstream changes since its watermark, load the store, diff
/// 3. Persist the watermark captured before the fetch
/// 4. Per category, propagate to every satellite concurrently, then commit
/// 5. On any failure after step 3, restore the previous watermark
///
/// Only one cycle runs at a time; overlapping calls are skipped.
pub struct Reconciler<C, R, S>
where
    C: ContactsClient,
    R: ContactBoxRegistry,
    S: ContactStore,
{
    config: SyncConfig,
    client: Arc<C>,
    registry: Arc<R>,
    store: Arc<S>,
    gate: tokio::sync::Mutex<()>,
    stats: RwLock<ReconcileStats>,
}

impl<C, R, S> Reconciler<C, R, S>
where
    C: ContactsClient,
    R: ContactBoxRegistry,
    S: ContactStore,
{
    /// Creates a new reconciler.
    pub fn new(config: SyncConfig, client: Arc<C>, registry: Arc<R>, store: Arc<S>) -> Self {
        Self {
            config,
            client,
            registry,
            store,
            gate: tokio::sync::Mutex::new(()),
            stats: RwLock::new(ReconcileStats::default()),
        }
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the current stats.
    pub fn stats(&self) -> ReconcileStats {
        self.stats.read().clone()
    }

    /// Returns true while a cycle is in flight.
    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Runs one reconciliation cycle.
    ///
    /// Never returns an error: failures are logged and reported in the
    /// outcome, and the next cycle retries the same delta.
    pub async fn reconcile(&self) -> ReconcileOutcome {
        let Ok(_guard) = self.gate.try_lock() else {
            let outcome = ReconcileOutcome::Skipped(SkipReason::AlreadyRunning);
            self.finish(&outcome, None);
            return outcome;
        };

        let start = Instant::now();
        let outcome = self.run().await;
        self.finish(&outcome, Some(start));
        outcome
    }

    async fn run(&self) -> ReconcileOutcome {
        let Some(main_email) = self.config.main_email.as_deref() else {
            return ReconcileOutcome::Skipped(SkipReason::MainEmailNotConfigured);
        };

        let main_box = match self.registry.find_by_email(main_email).await {
            Ok(Some(found)) => found,
            Ok(None) => {
                return ReconcileOutcome::Skipped(SkipReason::MainBoxNotRegistered(
                    main_email.to_string(),
                ))
            }
            Err(e) => {
                return ReconcileOutcome::Failed {
                    error: e.into(),
                    watermark_restored: true,
                }
            }
        };

        let rollback = main_box.last_check;
        let checked_at = Utc::now();

        let diff = match self.fetch_diff(&main_box).await {
            Ok(diff) => diff,
            Err(error) => {
                return ReconcileOutcome::Failed {
                    error,
                    watermark_restored: true,
                }
            }
        };

        if let Err(e) = self
            .registry
            .update_watermark(&main_box.email, Some(checked_at))
            .await
        {
            return ReconcileOutcome::Failed {
                error: e.into(),
                watermark_restored: true,
            };
        }

        if diff.is_empty() {
            return ReconcileOutcome::Unchanged;
        }

        match self.propagate_and_commit(&main_box, &diff).await {
            Ok(report) => ReconcileOutcome::Applied(report),
            Err(error) => {
                let watermark_restored = self.restore_watermark(&main_box.email, rollback).await;
                ReconcileOutcome::Failed {
                    error,
                    watermark_restored,
                }
            }
        }
    }

    async fn fetch_diff(&self, main_box: &ContactBox) -> SyncResult<ContactDiff> {
        let changes = self
            .client
            .fetch_changes(main_box, main_box.last_check)
            .await?;
        debug!(
            box_email = %main_box.email,
            changed = changes.contacts.len(),
            deleted = changes.deleted.len(),
            "fetched upstream changes"
        );
        if changes.is_empty() {
            return Ok(ContactDiff::default());
        }

        let stored = self.store.find_all().await?;
        Ok(ContactDiff::compute(&changes, &stored))
    }

    async fn restore_watermark(&self, email: &str, rollback: Option<DateTime<Utc>>) -> bool {
        match self.registry.update_watermark(email, rollback).await {
            Ok(()) => true,
            Err(e) => {
                error!(box_email = %email, error = %e, "failed to restore watermark");
                false
            }
        }
    }

    async fn propagate_and_commit(
        &self,
        main_box: &ContactBox,
        diff: &ContactDiff,
    ) -> SyncResult<ReconcileReport> {
        let satellites: Vec<ContactBox> = self
            .registry
            .find_all()
            .await?
            .into_iter()
            .filter(|b| b.email != main_box.email)
            .collect();
        let plans: Vec<(ContactBox, BoxPlan)> = self
            .refresh_expired(satellites)
            .await?
            .into_iter()
            .map(|b| {
                let plan = diff.plan_for_box(&b.email);
                (b, plan)
            })
            .collect();

        let (created, updated, deleted) = tokio::join!(
            self.run_category(Category::Create, diff, &plans),
            self.run_category(Category::Update, diff, &plans),
            self.run_category(Category::Delete, diff, &plans),
        );

        let mut report = ReconcileReport {
            satellites: plans.len(),
            ..ReconcileReport::default()
        };
        let mut first_error = None;
        for (result, slot) in [
            (created, &mut report.created),
            (updated, &mut report.updated),
            (deleted, &mut report.deleted),
        ] {
            match result {
                Ok((committed, rejected)) => {
                    *slot = committed;
                    report.rejected_entries += rejected;
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Refreshes expired credentials once per box, before the categories
    /// fan out and each send to the same box.
    async fn refresh_expired(&self, boxes: Vec<ContactBox>) -> SyncResult<Vec<ContactBox>> {
        let now = Utc::now();
        let results = join_all(boxes.into_iter().map(|contact_box| async move {
            if contact_box.tokens.is_expired(now) {
                self.client.refresh_credentials(&contact_box).await
            } else {
                Ok(contact_box)
            }
        }))
        .await;

        let mut refreshed = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(contact_box) => refreshed.push(contact_box),
                Err(e) => {
                    error!(error = %e, "failed to refresh contact box credentials");
                    return Err(e);
                }
            }
        }
        Ok(refreshed)
    }

    async fn run_category(
        &self,
        category: Category,
        diff: &ContactDiff,
        plans: &[(ContactBox, BoxPlan)],
    ) -> SyncResult<(usize, usize)> {
        let pending = match category {
            Category::Create => diff.to_create.len(),
            Category::Update => diff.to_update.len(),
            Category::Delete => diff.to_delete.len(),
        };
        if pending == 0 {
            return Ok((0, 0));
        }

        let propagated = self.propagate(category, plans).await?;

        let committed = match category {
            Category::Create => {
                let mut contacts = diff.to_create.clone();
                self.apply_stamps(&mut contacts, &propagated.stamps);
                self.store.insert_many(contacts).await?.len()
            }
            Category::Update => {
                let mut contacts = diff.to_update.clone();
                self.apply_stamps(&mut contacts, &propagated.stamps);
                self.store.bulk_update_by_remote_id(contacts).await?
            }
            Category::Delete => {
                let ids = diff.to_delete.iter().filter_map(|c| c.local_id).collect();
                self.store.delete_by_local_ids(ids).await?
            }
        };

        debug!(category = category.as_str(), committed, "category committed");
        Ok((committed, propagated.rejected))
    }

    async fn propagate(
        &self,
        category: Category,
        plans: &[(ContactBox, BoxPlan)],
    ) -> SyncResult<Propagated> {
        let calls = plans.iter().filter_map(|(contact_box, plan)| {
            let batches = category.batches(plan);
            if batches.is_empty() {
                None
            } else {
                Some(self.send_to_box(contact_box, batches))
            }
        });
        let results = join_all(calls).await;

        let mut propagated = Propagated::default();
        let mut first_error = None;
        for (box_email, result) in results {
            match result {
                Ok(batches) => {
                    for (operation, entries) in batches {
                        self.collect_results(&box_email, operation, entries, &mut propagated);
                    }
                }
                Err(e) => {
                    error!(
                        box_email = %box_email,
                        category = category.as_str(),
                        error = %e,
                        "propagation to contact box failed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(propagated),
        }
    }

    async fn send_to_box(
        &self,
        contact_box: &ContactBox,
        batches: Vec<(BatchOperation, Vec<BatchItem>)>,
    ) -> (String, SyncResult<Vec<(BatchOperation, Vec<BatchResult>)>>) {
        let calls = batches.into_iter().map(|(operation, items)| async move {
            let result = self
                .client
                .apply_operation(contact_box, items, operation)
                .await
                .map_err(|e| SyncError::propagation(&contact_box.email, operation, e));
            result.map(|entries| (operation, entries))
        });
        let results: SyncResult<Vec<_>> = join_all(calls).await.into_iter().collect();
        (contact_box.email.clone(), results)
    }

    fn collect_results(
        &self,
        box_email: &str,
        operation: BatchOperation,
        entries: Vec<BatchResult>,
        propagated: &mut Propagated,
    ) {
        for entry in entries {
            if !entry.is_success() {
                warn!(
                    box_email = %box_email,
                    operation = %operation,
                    contact_id = %entry.contact_id,
                    status = entry.status,
                    "contact box rejected batch entry"
                );
                propagated.rejected += 1;
                continue;
            }
            if operation == BatchOperation::Create {
                if let Some(remote_id) = entry.remote_id {
                    propagated.stamps.push(Stamp {
                        box_email: box_email.to_string(),
                        contact_id: entry.contact_id,
                        remote_id,
                    });
                }
            }
        }
    }

    fn apply_stamps(&self, contacts: &mut [Contact], stamps: &[Stamp]) {
        let mut by_id: HashMap<&str, usize> = HashMap::with_capacity(contacts.len());
        for (i, contact) in contacts.iter().enumerate() {
            by_id.insert(contact.id.as_str(), i);
        }
        let positions: Vec<(usize, &Stamp)> = stamps
            .iter()
            .filter_map(|s| by_id.get(s.contact_id.as_str()).map(|&i| (i, s)))
            .collect();

        let domain_email = self.config.domain_email.as_deref();
        for (i, stamp) in positions {
            let contact = &mut contacts[i];
            contact.stamp_remote_id(&stamp.box_email, &stamp.remote_id);
            if domain_email == Some(stamp.box_email.as_str()) {
                contact.domain_id = Some(stamp.remote_id.clone());
            }
        }
    }

    /// Links stored contacts to records that already exist in a box.
    ///
    /// Fetches every contact of `box_email` and stamps its id onto the stored
    /// contacts with the same name and email. Waits for any in-flight cycle.
    /// Returns the number of stored contacts updated.
    pub async fn link_existing_ids(&self, box_email: &str) -> SyncResult<usize> {
        let _guard = self.gate.lock().await;

        let contact_box = self
            .registry
            .find_by_email(box_email)
            .await?
            .ok_or_else(|| SyncError::UnknownBox(box_email.to_string()))?;
        let remote = self.client.fetch_changes(&contact_box, None).await?;
        let mut stored = self.store.find_all().await?;

        let domain_email = self.config.domain_email.as_deref();
        let mut linked: HashMap<String, Contact> = HashMap::new();
        for remote_contact in &remote.contacts {
            if remote_contact.email.is_none() && remote_contact.name.is_none() {
                continue;
            }
            let Some(local) = stored
                .iter_mut()
                .find(|c| c.email == remote_contact.email && c.name == remote_contact.name)
            else {
                continue;
            };
            if local.remote_id_in(box_email) == Some(remote_contact.id.as_str()) {
                continue;
            }
            local.stamp_remote_id(box_email, &remote_contact.id);
            if domain_email == Some(box_email) {
                local.domain_id = Some(remote_contact.id.clone());
            }
            linked.insert(local.id.clone(), local.clone());
        }

        let updated = self
            .store
            .bulk_update_by_remote_id(linked.into_values().collect())
            .await?;
        info!(box_email = %box_email, linked = updated, "linked existing box ids");
        Ok(updated)
    }

    fn finish(&self, outcome: &ReconcileOutcome, start: Option<Instant>) {
        {
            let mut stats = self.stats.write();
            stats.runs += 1;
            match outcome {
                ReconcileOutcome::Skipped(_) => stats.skipped += 1,
                ReconcileOutcome::Unchanged => {
                    stats.unchanged += 1;
                    stats.last_error = None;
                }
                ReconcileOutcome::Applied(report) => {
                    stats.applied += 1;
                    stats.contacts_created += report.created as u64;
                    stats.contacts_updated += report.updated as u64;
                    stats.contacts_deleted += report.deleted as u64;
                    stats.last_error = None;
                }
                ReconcileOutcome::Failed { error, .. } => {
                    stats.failures += 1;
                    stats.last_error = Some(error.to_string());
                }
            }
            if let Some(start) = start {
                stats.last_run_at = Some(Utc::now());
                stats.last_duration_ms = Some(start.elapsed().as_millis() as u64);
            }
        }

        match outcome {
            ReconcileOutcome::Skipped(reason) => {
                warn!(reason = %reason, "reconciliation skipped");
            }
            ReconcileOutcome::Unchanged => {
                info!("reconciliation found no upstream changes");
            }
            ReconcileOutcome::Applied(report) => {
                info!(
                    created = report.created,
                    updated = report.updated,
                    deleted = report.deleted,
                    satellites = report.satellites,
                    rejected = report.rejected_entries,
                    "reconciliation applied"
                );
            }
            ReconcileOutcome::Failed {
                error,
                watermark_restored,
            } => {
                error!(
                    error = %error,
                    retryable = error.is_retryable(),
                    watermark_restored = *watermark_restored,
                    "reconciliation failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockContactsClient;
    use docfy_model::{ContactChanges, OAuthTokens};
    use docfy_storage::InMemoryStore;

    const MAIN: &str = "main@x.com";

    async fn setup(
        satellites: &[&str],
    ) -> (
        Reconciler<MockContactsClient, InMemoryStore, InMemoryStore>,
        Arc<MockContactsClient>,
        Arc<InMemoryStore>,
    ) {
        let client = Arc::new(MockContactsClient::new());
        let store = Arc::new(InMemoryStore::in_memory());
        store
            .save(ContactBox::new(MAIN, OAuthTokens::new("main-token")))
            .await
            .unwrap();
        for email in satellites {
            store
                .save(ContactBox::new(*email, OAuthTokens::new("token")))
                .await
                .unwrap();
        }
        let reconciler = Reconciler::new(
            SyncConfig::new(MAIN),
            Arc::clone(&client),
            Arc::clone(&store),
            Arc::clone(&store),
        );
        (reconciler, client, store)
    }

    #[tokio::test]
    async fn expired_satellite_is_refreshed_once_per_cycle() {
        let (reconciler, client, store) = setup(&[]).await;
        let expired =
            OAuthTokens::new("stale").with_expiry(Utc::now() - chrono::Duration::minutes(5));
        store.save(ContactBox::new("a@x.com", expired)).await.unwrap();

        let mut updated = Contact::new("6");
        updated.stamp_remote_id("a@x.com", "rem-6");
        let mut deleted = Contact::new("5");
        deleted.stamp_remote_id("a@x.com", "rem-5");
        store.insert_many(vec![updated, deleted]).await.unwrap();

        client.push_changes(
            MAIN,
            ContactChanges::new(
                vec![Contact::new("1"), Contact::new("6")],
                vec![Contact::new("5")],
            ),
        );

        let outcome = reconciler.reconcile().await;
        let report = outcome.report().cloned().unwrap();
        assert_eq!((report.created, report.updated, report.deleted), (1, 1, 1));
        assert_eq!(client.refreshes(), vec!["a@x.com".to_string()]);
        assert_eq!(client.batches_for("a@x.com").len(), 3);
    }

    #[tokio::test]
    async fn unconfigured_main_email_is_skipped() {
        let client = Arc::new(MockContactsClient::new());
        let store = Arc::new(InMemoryStore::in_memory());
        let reconciler = Reconciler::new(
            SyncConfig::default(),
            Arc::clone(&client),
            Arc::clone(&store),
            store,
        );

        let outcome = reconciler.reconcile().await;
        assert!(matches!(
            outcome,
            ReconcileOutcome::Skipped(SkipReason::MainEmailNotConfigured)
        ));
        assert!(client.fetches().is_empty());
        assert_eq!(reconciler.stats().skipped, 1);
    }

    #[tokio::test]
    async fn unregistered_main_box_is_skipped() {
        let client = Arc::new(MockContactsClient::new());
        let store = Arc::new(InMemoryStore::in_memory());
        let reconciler =
            Reconciler::new(SyncConfig::new(MAIN), Arc::clone(&client), Arc::clone(&store), store);

        let outcome = reconciler.reconcile().await;
        assert!(matches!(
            outcome,
            ReconcileOutcome::Skipped(SkipReason::MainBoxNotRegistered(ref e)) if e == MAIN
        ));
        assert!(client.fetches().is_empty());
    }

    #[tokio::test]
    async fn first_run_fetches_without_watermark() {
        let (reconciler, client, store) = setup(&[]).await;

        let outcome = reconciler.reconcile().await;
        assert!(matches!(outcome, ReconcileOutcome::Unchanged));
        assert_eq!(client.fetches(), vec![(MAIN.to_string(), None)]);

        let main = store.find_by_email(MAIN).await.unwrap().unwrap();
        assert!(main.last_check.is_some());

        reconciler.reconcile().await;
        assert_eq!(client.fetches()[1].1, main.last_check);
    }

    #[tokio::test]
    async fn domain_box_ids_fill_domain_id() {
        let client = Arc::new(MockContactsClient::new());
        let store = Arc::new(InMemoryStore::in_memory());
        for email in [MAIN, "office@docfy.com"] {
            store
                .save(ContactBox::new(email, OAuthTokens::new("t")))
                .await
                .unwrap();
        }
        let reconciler = Reconciler::new(
            SyncConfig::new(MAIN).with_domain_email("office@docfy.com"),
            Arc::clone(&client),
            Arc::clone(&store),
            Arc::clone(&store),
        );
        client.push_changes(MAIN, ContactChanges::new(vec![Contact::new("1")], Vec::new()));

        let outcome = reconciler.reconcile().await;
        assert!(outcome.is_success());

        let stored = ContactStore::find_all(store.as_ref()).await.unwrap();
        assert_eq!(stored[0].domain_id.as_deref(), Some("office@docfy.com/1"));
        assert_eq!(
            stored[0].remote_id_in("office@docfy.com"),
            Some("office@docfy.com/1")
        );
    }

    #[tokio::test]
    async fn rejected_entries_are_not_stamped() {
        let (reconciler, client, store) = setup(&["a@x.com"]).await;
        client.reject_contact("2");
        client.push_changes(
            MAIN,
            ContactChanges::new(vec![Contact::new("1"), Contact::new("2")], Vec::new()),
        );

        let outcome = reconciler.reconcile().await;
        let report = outcome.report().cloned().unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.rejected_entries, 1);

        let stored = ContactStore::find_all(store.as_ref()).await.unwrap();
        let two = stored.iter().find(|c| c.id == "2").unwrap();
        assert!(two.remote_id_in("a@x.com").is_none());
        let one = stored.iter().find(|c| c.id == "1").unwrap();
        assert_eq!(one.remote_id_in("a@x.com"), Some("a@x.com/1"));
    }

    #[tokio::test]
    async fn link_existing_ids_matches_name_and_email() {
        let (reconciler, client, store) = setup(&["a@x.com"]).await;
        store
            .insert_many(vec![
                Contact::new("1").with_name("Ana").with_email("ana@x.com"),
                Contact::new("2").with_name("Bia"),
            ])
            .await
            .unwrap();
        client.push_changes(
            "a@x.com",
            ContactChanges::new(
                vec![
                    Contact::new("box-9").with_name("Ana").with_email("ana@x.com"),
                    Contact::new("box-10").with_name("Carla"),
                ],
                Vec::new(),
            ),
        );

        let linked = reconciler.link_existing_ids("a@x.com").await.unwrap();
        assert_eq!(linked, 1);

        let stored = ContactStore::find_all(store.as_ref()).await.unwrap();
        let ana = stored.iter().find(|c| c.id == "1").unwrap();
        assert_eq!(ana.remote_id_in("a@x.com"), Some("box-9"));

        let err = reconciler.link_existing_ids("nobody@x.com").await.unwrap_err();
        assert!(matches!(err, SyncError::UnknownBox(_)));
    }

    #[tokio::test]
    async fn stats_track_outcomes() {
        let (reconciler, client, _store) = setup(&["a@x.com"]).await;
        client.push_changes(MAIN, ContactChanges::new(vec![Contact::new("1")], Vec::new()));
        reconciler.reconcile().await;

        client.fail_fetch(MAIN, "down");
        reconciler.reconcile().await;

        let stats = reconciler.stats();
        assert_eq!(stats.runs, 2);
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.contacts_created, 1);
        assert!(stats.last_error.unwrap().contains("down"));
        assert!(stats.last_run_at.is_some());
    }
}
