//! The document store implementing every store contract.

use crate::error::{StorageError, StorageResult};
use crate::file::JsonFileSink;
use crate::memory::EphemeralSink;
use crate::sink::SnapshotSink;
use crate::traits::{ContactBoxRegistry, ContactStore, CustomerStore, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docfy_model::{Contact, ContactBox, Customer, LocalId, OAuthTokens, User};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Every collection, as persisted by a [`SnapshotSink`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Locally known contacts.
    #[serde(default)]
    pub contacts: Vec<Contact>,
    /// Registered contact boxes.
    #[serde(default)]
    pub contact_boxes: Vec<ContactBox>,
    /// Customer records.
    #[serde(default)]
    pub customers: Vec<Customer>,
    /// API users.
    #[serde(default)]
    pub users: Vec<User>,
}

/// A store holding every collection in memory, persisted through a sink.
///
/// # Atomicity
///
/// Each mutation runs against a copy of the current snapshot. The copy is
/// handed to the sink and only swapped in once the sink accepted it, so a
/// failed write leaves the store unchanged.
///
/// # Thread Safety
///
/// Mutations are serialized by an async writer lock. Reads share a
/// `parking_lot::RwLock` that is only taken for the copy and the final
/// swap, never across a sink write. Sinks that block are driven on the
/// blocking thread pool.
#[derive(Debug)]
pub struct DocumentStore<S: SnapshotSink> {
    sink: Arc<S>,
    state: RwLock<Snapshot>,
    writer: tokio::sync::Mutex<()>,
}

/// Store that keeps nothing on disk.
pub type InMemoryStore = DocumentStore<EphemeralSink>;

/// Store persisted to a JSON file.
pub type FileStore = DocumentStore<JsonFileSink>;

impl<S: SnapshotSink> DocumentStore<S> {
    /// Opens a store over `sink`, starting from its last persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted snapshot cannot be read.
    pub fn with_sink(sink: S) -> StorageResult<Self> {
        let state = sink.load()?.unwrap_or_default();
        tracing::debug!(
            contacts = state.contacts.len(),
            contact_boxes = state.contact_boxes.len(),
            customers = state.customers.len(),
            users = state.users.len(),
            "document store opened"
        );
        Ok(Self {
            sink: Arc::new(sink),
            state: RwLock::new(state),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.state.read().clone()
    }

    /// Returns the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> T {
        f(&self.state.read())
    }

    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Snapshot) -> StorageResult<T> + Send,
    ) -> StorageResult<T> {
        let _writer = self.writer.lock().await;
        let mut next = self.state.read().clone();
        let out = f(&mut next)?;
        let next = self.persist(next).await?;
        *self.state.write() = next;
        Ok(out)
    }

    async fn persist(&self, next: Snapshot) -> StorageResult<Snapshot> {
        if !self.sink.is_blocking() {
            self.sink.persist(&next)?;
            return Ok(next);
        }
        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || sink.persist(&next).map(|()| next))
            .await
            .map_err(|e| StorageError::Io(io::Error::other(e)))?
    }
}

impl InMemoryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_snapshot(Snapshot::default())
    }

    /// Creates an in-memory store seeded with `snapshot`.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            sink: Arc::new(EphemeralSink),
            state: RwLock::new(snapshot),
            writer: tokio::sync::Mutex::new(()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl FileStore {
    /// Opens or creates a file-backed store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or an existing file
    /// cannot be parsed.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::with_sink(JsonFileSink::open(path)?)
    }
}

#[async_trait]
impl<S: SnapshotSink> ContactStore for DocumentStore<S> {
    async fn find_all(&self) -> StorageResult<Vec<Contact>> {
        Ok(self.read(|s| s.contacts.clone()))
    }

    async fn insert_many(&self, contacts: Vec<Contact>) -> StorageResult<Vec<Contact>> {
        if contacts.is_empty() {
            return Ok(Vec::new());
        }
        self.mutate(|state| {
            let mut taken: HashSet<LocalId> =
                state.contacts.iter().filter_map(|c| c.local_id).collect();
            let mut inserted = Vec::with_capacity(contacts.len());
            for mut contact in contacts {
                let local_id = match contact.local_id {
                    Some(id) => id,
                    None => LocalId::generate(),
                };
                if !taken.insert(local_id) {
                    return Err(StorageError::Duplicate {
                        collection: "contact",
                        key: local_id.to_string(),
                    });
                }
                contact.local_id = Some(local_id);
                inserted.push(contact);
            }
            state.contacts.extend(inserted.iter().cloned());
            Ok(inserted)
        })
        .await
    }

    async fn bulk_update_by_remote_id(&self, updates: Vec<Contact>) -> StorageResult<usize> {
        if updates.is_empty() {
            return Ok(0);
        }
        self.mutate(|state| {
            let mut matched = 0;
            for update in updates {
                for stored in state.contacts.iter_mut().filter(|c| c.id == update.id) {
                    stored.name = update.name.clone();
                    stored.email = update.email.clone();
                    stored.phone_number = update.phone_number.clone();
                    stored.domain_id = update.domain_id.clone();
                    stored.other_ids = update.other_ids.clone();
                    matched += 1;
                }
            }
            Ok(matched)
        })
        .await
    }

    async fn delete_by_local_ids(&self, ids: Vec<LocalId>) -> StorageResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: HashSet<LocalId> = ids.into_iter().collect();
        self.mutate(|state| {
            let before = state.contacts.len();
            state
                .contacts
                .retain(|c| c.local_id.map_or(true, |id| !ids.contains(&id)));
            Ok(before - state.contacts.len())
        })
        .await
    }
}

#[async_trait]
impl<S: SnapshotSink> ContactBoxRegistry for DocumentStore<S> {
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<ContactBox>> {
        Ok(self.read(|s| s.contact_boxes.iter().find(|b| b.email == email).cloned()))
    }

    async fn find_all(&self) -> StorageResult<Vec<ContactBox>> {
        Ok(self.read(|s| s.contact_boxes.clone()))
    }

    async fn save(&self, contact_box: ContactBox) -> StorageResult<ContactBox> {
        self.mutate(|state| {
            if state.contact_boxes.iter().any(|b| b.email == contact_box.email) {
                return Err(StorageError::Duplicate {
                    collection: "contact box",
                    key: contact_box.email.clone(),
                });
            }
            state.contact_boxes.push(contact_box.clone());
            Ok(contact_box)
        })
        .await
    }

    async fn update_watermark(
        &self,
        email: &str,
        last_check: Option<DateTime<Utc>>,
    ) -> StorageResult<()> {
        self.mutate(|state| {
            let found = find_box_mut(state, email)?;
            found.last_check = last_check;
            Ok(())
        })
        .await
    }

    async fn update_tokens(&self, email: &str, tokens: OAuthTokens) -> StorageResult<()> {
        self.mutate(|state| {
            let found = find_box_mut(state, email)?;
            found.tokens = tokens;
            Ok(())
        })
        .await
    }
}

fn find_box_mut<'a>(state: &'a mut Snapshot, email: &str) -> StorageResult<&'a mut ContactBox> {
    state
        .contact_boxes
        .iter_mut()
        .find(|b| b.email == email)
        .ok_or_else(|| StorageError::NotFound {
            collection: "contact box",
            key: email.to_string(),
        })
}

#[async_trait]
impl<S: SnapshotSink> CustomerStore for DocumentStore<S> {
    async fn insert_customer(&self, mut customer: Customer) -> StorageResult<Customer> {
        customer.id = Some(LocalId::generate());
        self.mutate(|state| {
            state.customers.push(customer.clone());
            Ok(customer)
        })
        .await
    }

    async fn find_customer(&self, id: LocalId) -> StorageResult<Option<Customer>> {
        Ok(self.read(|s| s.customers.iter().find(|c| c.id == Some(id)).cloned()))
    }

    async fn find_active_by_number(&self, number: u64) -> StorageResult<Option<Customer>> {
        Ok(self.read(|s| {
            s.customers
                .iter()
                .find(|c| c.is_active() && c.number == Some(number))
                .cloned()
        }))
    }

    async fn find_active_customers(&self) -> StorageResult<Vec<Customer>> {
        let mut active: Vec<Customer> = self.read(|s| {
            s.customers
                .iter()
                .filter(|c| c.is_active())
                .cloned()
                .collect()
        });
        active.sort_by_key(|c| c.number);
        Ok(active)
    }

    async fn replace_customer(&self, id: LocalId, mut customer: Customer) -> StorageResult<Customer> {
        customer.id = Some(id);
        self.mutate(|state| {
            let slot = state
                .customers
                .iter_mut()
                .find(|c| c.id == Some(id))
                .ok_or_else(|| StorageError::NotFound {
                    collection: "customer",
                    key: id.to_string(),
                })?;
            *slot = customer.clone();
            Ok(customer)
        })
        .await
    }
}

#[async_trait]
impl<S: SnapshotSink> UserStore for DocumentStore<S> {
    async fn insert_user(&self, mut user: User) -> StorageResult<User> {
        user.id = Some(LocalId::generate());
        self.mutate(|state| {
            if state.users.iter().any(|u| u.username == user.username) {
                return Err(StorageError::Duplicate {
                    collection: "user",
                    key: user.username.clone(),
                });
            }
            state.users.push(user.clone());
            Ok(user)
        })
        .await
    }

    async fn find_user(&self, username: &str) -> StorageResult<Option<User>> {
        let username = username.to_lowercase();
        Ok(self.read(|s| s.users.iter().find(|u| u.username == username).cloned()))
    }
}
