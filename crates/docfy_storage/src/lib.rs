//! # Docfy Storage
//!
//! Persistent collections for the Docfy back office.
//!
//! This crate provides the store contracts the rest of the workspace is
//! written against, plus one document store implementing all of them.
//!
//! ## Design Principles
//!
//! - Stores are traits so the sync engine and server can be tested with any backend
//! - Every trait call is atomic: it either applies completely or not at all
//! - Must be `Send + Sync` for use across async tasks
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral deployments
//! - [`FileStore`] - Persists a JSON snapshot after every mutation
//!
//! ## Example
//!
//! ```rust
//! use docfy_model::Contact;
//! use docfy_storage::{ContactStore, InMemoryStore, StorageResult};
//!
//! # async fn demo() -> StorageResult<()> {
//! let store = InMemoryStore::in_memory();
//! let inserted = store.insert_many(vec![Contact::new("c1")]).await?;
//! assert!(inserted[0].local_id.is_some());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod file;
mod memory;
mod sink;
mod traits;

pub use document::{DocumentStore, FileStore, InMemoryStore, Snapshot};
pub use error::{StorageError, StorageResult};
pub use file::JsonFileSink;
pub use memory::EphemeralSink;
pub use sink::SnapshotSink;
pub use traits::{ContactBoxRegistry, ContactStore, CustomerStore, UserStore};
