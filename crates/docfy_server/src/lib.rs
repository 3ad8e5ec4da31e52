//! # Docfy Server
//!
//! Transport-agnostic request handlers for the Docfy back office.
//!
//! This crate provides:
//! - Registration, login and token renewal with HMAC-signed bearer tokens
//! - Argon2 password hashing
//! - Customer records with active-number validation
//! - Contact box registration through the OAuth consent flow
//! - Start, stop, force and status triggers for the reconciliation watcher
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐  request   ┌──────────────────┐
//! │ routing layer │ ─────────► │  DocfyServer      │
//! │ (any HTTP)    │ ◄───────── │  RequestHandler   │
//! └───────────────┘  Reply /   └────────┬─────────┘
//!                    ServerError        │
//!                          ┌────────────┼─────────────┐
//!                          ▼            ▼             ▼
//!                    TokenValidator   store      Watcher/Reconciler
//! ```
//!
//! Handlers return [`Reply`] with the status to answer, or a
//! [`ServerError`] whose `status_code()` and `body()` render the error.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod config;
mod contacts;
mod customers;
mod error;
mod handler;
mod password;
mod security;
mod server;

pub use auth::{bearer_token, AuthConfig, Claims, TokenValidator, DEFAULT_TOKEN_LIFETIME};
pub use config::ServerConfig;
pub use contacts::{ConsentUrl, LinkReply, WatcherStatus};
pub use error::{ErrorBody, ServerError, ServerResult};
pub use handler::{BackOfficeStore, BackOfficeWatcher, HandlerContext, Reply, RequestHandler};
pub use password::{hash_password, verify_password};
pub use security::{Credentials, TokenReply};
pub use server::DocfyServer;
