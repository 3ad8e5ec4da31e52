//! Store contracts.
//!
//! The sync engine and the request handlers are written against these traits
//! only. Each method is a single atomic operation on the backing store.

use crate::error::StorageResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docfy_model::{Contact, ContactBox, Customer, LocalId, OAuthTokens, User};

/// Locally known contacts.
///
/// # Invariants
///
/// - `insert_many` assigns a fresh `local_id` to every contact lacking one
/// - `bulk_update_by_remote_id` matches on `Contact::id` and never inserts
/// - `delete_by_local_ids` silently skips ids that are not present
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Returns every stored contact.
    async fn find_all(&self) -> StorageResult<Vec<Contact>>;

    /// Inserts contacts, returning them with their assigned local ids.
    ///
    /// # Errors
    ///
    /// Fails with `Duplicate` if a given local id is already stored.
    async fn insert_many(&self, contacts: Vec<Contact>) -> StorageResult<Vec<Contact>>;

    /// Overwrites name, email, phone number, domain id and other ids of the
    /// stored contacts whose `id` matches. Returns how many matched.
    async fn bulk_update_by_remote_id(&self, updates: Vec<Contact>) -> StorageResult<usize>;

    /// Removes contacts by local id. Returns how many were removed.
    async fn delete_by_local_ids(&self, ids: Vec<LocalId>) -> StorageResult<usize>;
}

/// Registered contact boxes and their watermarks.
#[async_trait]
pub trait ContactBoxRegistry: Send + Sync {
    /// Looks a box up by its account email.
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<ContactBox>>;

    /// Returns every registered box.
    async fn find_all(&self) -> StorageResult<Vec<ContactBox>>;

    /// Registers a new box.
    ///
    /// # Errors
    ///
    /// Fails with `Duplicate` if the email is already registered.
    async fn save(&self, contact_box: ContactBox) -> StorageResult<ContactBox>;

    /// Sets (or clears) a box's watermark.
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` if the email is not registered.
    async fn update_watermark(
        &self,
        email: &str,
        last_check: Option<DateTime<Utc>>,
    ) -> StorageResult<()>;

    /// Replaces a box's credentials in place.
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` if the email is not registered.
    async fn update_tokens(&self, email: &str, tokens: OAuthTokens) -> StorageResult<()>;
}

/// Customer records.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Stores a new customer under a fresh id and returns it.
    async fn insert_customer(&self, customer: Customer) -> StorageResult<Customer>;

    /// Looks a customer up by id.
    async fn find_customer(&self, id: LocalId) -> StorageResult<Option<Customer>>;

    /// Returns the active customer using `number`, if any.
    async fn find_active_by_number(&self, number: u64) -> StorageResult<Option<Customer>>;

    /// Returns active customers ordered by number.
    async fn find_active_customers(&self) -> StorageResult<Vec<Customer>>;

    /// Replaces the customer stored under `id`, keeping the id.
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` if no customer has that id.
    async fn replace_customer(&self, id: LocalId, customer: Customer) -> StorageResult<Customer>;
}

/// API users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Stores a new user under a fresh id and returns it.
    ///
    /// # Errors
    ///
    /// Fails with `Duplicate` if the username is taken.
    async fn insert_user(&self, user: User) -> StorageResult<User>;

    /// Looks a user up by (lower-cased) username.
    async fn find_user(&self, username: &str) -> StorageResult<Option<User>>;
}
