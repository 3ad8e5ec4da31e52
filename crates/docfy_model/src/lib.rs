//! # Docfy Model
//!
//! Data types shared by the Docfy back-office crates.
//!
//! This crate provides:
//! - `Contact` and `ContactChanges` for contact reconciliation
//! - `ContactBox` and `OAuthTokens` for registered external accounts
//! - `BatchOperation`, `BatchItem` and `BatchResult` for remote batch writes
//! - `Customer` records and their summaries
//! - `User` accounts for the authenticated API
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod contact;
mod contact_box;
mod customer;
mod error;
mod ids;
mod user;

pub use batch::{BatchItem, BatchOperation, BatchResult};
pub use contact::{Contact, ContactChanges};
pub use contact_box::{ContactBox, OAuthTokens};
pub use customer::{
    AccessoryObligation, Customer, CustomerContact, CustomerStatus, CustomerSummary, Partner,
    Syndic,
};
pub use error::{ModelError, ModelResult};
pub use ids::LocalId;
pub use user::User;
