//! # Docfy Sync Engine
//!
//! Contact reconciliation between the main Google account and its satellite
//! contact boxes.
//!
//! This crate provides:
//! - One-directional diff of upstream changes against the local store
//! - Per-box batch plans (create, update, delete, creation backfill)
//! - The single-flight reconciler with watermark rollback
//! - An interval watcher with start/stop/force controls
//! - The Google contacts client (OAuth, JSON feed, Atom batches)
//!
//! ## Architecture
//!
//! A reconciliation runs **fetch, diff, propagate, commit**:
//! 1. Fetch the main box's changes since its watermark
//! 2. Partition them into creates, updates and deletes against the store
//! 3. Send every category to every satellite box concurrently
//! 4. Commit a category locally only once every box accepted it
//!
//! ## Key Invariants
//!
//! - The main box is authoritative; satellites never feed back
//! - At most one reconciliation is in flight
//! - A failed cycle leaves the watermark at its pre-cycle value
//! - Box ids are stamped only for entries the box confirmed

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod diff;
mod error;
mod google;
mod reconcile;
mod transport;
mod watcher;

pub use config::{
    GoogleConfig, SyncConfig, GOOGLE_AUTH_URL, GOOGLE_CONTACTS_URL, GOOGLE_TOKEN_URL,
    GOOGLE_USERINFO_URL, MAX_BATCH_SIZE,
};
pub use diff::{BoxPlan, ContactDiff};
pub use error::{SyncError, SyncResult};
pub use google::GoogleContactsClient;
pub use reconcile::{ReconcileOutcome, ReconcileReport, ReconcileStats, Reconciler, SkipReason};
pub use transport::{
    AccountAuthorizer, AuthorizedAccount, ContactsClient, MockAuthorizer, MockContactsClient,
    RecordedBatch,
};
pub use watcher::{Watcher, WatcherState};
