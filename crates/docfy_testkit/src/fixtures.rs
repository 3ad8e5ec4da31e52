//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up stores and the contact
//! boxes most scenarios start from.

use docfy_model::{Contact, ContactBox, Customer, LocalId, OAuthTokens};
use docfy_storage::{ContactBoxRegistry, ContactStore, DocumentStore, FileStore, InMemoryStore};
use docfy_storage::{
    EphemeralSink, JsonFileSink, Snapshot, SnapshotSink, StorageError, StorageResult,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A test store with automatic cleanup.
pub struct TestStore<S: SnapshotSink> {
    /// The store instance.
    pub store: DocumentStore<S>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore<EphemeralSink> {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self {
            store: InMemoryStore::in_memory(),
            _temp_dir: None,
        }
    }
}

impl TestStore<JsonFileSink> {
    /// Creates a new file-backed test store in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::open(&temp_dir.path().join("docfy.json"))
            .expect("Failed to open file store");
        Self {
            store,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Reopens the same file, as a restarted process would.
    pub fn reopen(&self) -> FileStore {
        FileStore::open(self.store.sink().path()).expect("Failed to reopen file store")
    }
}

impl<S: SnapshotSink> TestStore<S> {
    /// Returns the data file path if file-backed, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir.as_ref().map(|d| d.path().join("docfy.json"))
    }
}

impl<S: SnapshotSink> std::ops::Deref for TestStore<S> {
    type Target = DocumentStore<S>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// A sink whose upcoming writes can be scripted to fail.
///
/// Writes succeed unless a queued outcome says otherwise. Clones share the
/// same script, so a test can keep a handle after moving the sink into a
/// store.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSink {
    script: Arc<Mutex<VecDeque<bool>>>,
}

impl ScriptedSink {
    /// Creates a sink that accepts every write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the outcomes of the next writes, `true` meaning success.
    pub fn script(&self, outcomes: &[bool]) {
        self.script.lock().extend(outcomes.iter().copied());
    }

    /// Returns how many scripted outcomes are still pending.
    pub fn pending(&self) -> usize {
        self.script.lock().len()
    }
}

impl SnapshotSink for ScriptedSink {
    fn load(&self) -> StorageResult<Option<Snapshot>> {
        Ok(None)
    }

    fn persist(&self, _snapshot: &Snapshot) -> StorageResult<()> {
        match self.script.lock().pop_front() {
            Some(false) => Err(StorageError::Io(io::Error::other("scripted write failure"))),
            _ => Ok(()),
        }
    }

    fn is_blocking(&self) -> bool {
        false
    }
}

/// A store whose writes fail on demand.
pub type ScriptedStore = DocumentStore<ScriptedSink>;

/// Creates an empty [`ScriptedStore`] and a handle on its script.
pub fn scripted_store() -> (ScriptedStore, ScriptedSink) {
    let sink = ScriptedSink::new();
    let store = DocumentStore::with_sink(sink.clone()).expect("Failed to open scripted store");
    (store, sink)
}

/// A contact box with a never-expiring token.
pub fn contact_box(email: &str) -> ContactBox {
    ContactBox::new(email, OAuthTokens::new(format!("token-{email}")))
}

/// Registers one box per email.
pub async fn register_boxes<R: ContactBoxRegistry>(registry: &R, emails: &[&str]) {
    for email in emails {
        registry
            .save(contact_box(email))
            .await
            .expect("Failed to register contact box");
    }
}

/// A fully populated main-account contact.
pub fn contact(id: &str) -> Contact {
    Contact::new(id)
        .with_name(format!("Contact {id}"))
        .with_email(format!("contact{id}@example.com"))
        .with_phone_number(format!("555-01{id:0>2}"))
}

/// A contact as it sits in the store: with a local id and the given box ids.
pub fn stored_contact(id: &str, box_ids: &[(&str, &str)]) -> Contact {
    let mut stored = contact(id);
    stored.local_id = Some(LocalId::generate());
    for (box_email, remote_id) in box_ids {
        stored.stamp_remote_id(*box_email, *remote_id);
    }
    stored
}

/// Inserts contacts and returns them with their assigned local ids.
pub async fn seed_contacts<S: ContactStore>(store: &S, contacts: Vec<Contact>) -> Vec<Contact> {
    store
        .insert_many(contacts)
        .await
        .expect("Failed to seed contacts")
}

/// An active customer.
pub fn customer(number: u64, name: &str) -> Customer {
    Customer::new(number, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let test_store = TestStore::file();
        register_boxes(&*test_store, &["main@x.com"]).await;

        let reopened = test_store.reopen();
        let found = reopened.find_by_email("main@x.com").await.unwrap();
        assert!(found.is_some());
        assert!(test_store.path().is_some());
    }

    #[tokio::test]
    async fn scripted_sink_fails_queued_writes_only() {
        let (store, sink) = scripted_store();
        sink.script(&[true, false]);

        assert!(store.save(contact_box("a@x.com")).await.is_ok());
        assert!(store.save(contact_box("b@x.com")).await.is_err());
        assert!(store.save(contact_box("c@x.com")).await.is_ok());
        assert_eq!(sink.pending(), 0);
        assert_eq!(ContactBoxRegistry::find_all(&store).await.unwrap().len(), 2);
    }

    #[test]
    fn stored_contact_has_box_ids() {
        let stored = stored_contact("5", &[("a@x.com", "rem-5")]);
        assert!(stored.local_id.is_some());
        assert_eq!(stored.remote_id_in("a@x.com"), Some("rem-5"));
        assert_eq!(stored.phone_number.as_deref(), Some("555-0105"));
    }
}
