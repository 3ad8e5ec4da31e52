//! # Docfy Testkit
//!
//! Test utilities for Docfy.
//!
//! This crate provides:
//! - Store fixtures (in-memory and temp-dir backed)
//! - Contact, contact box and customer builders
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docfy_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn test_with_store() {
//!     let store = TestStore::memory();
//!     register_boxes(&*store, &["main@x.com", "a@x.com"]).await;
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
