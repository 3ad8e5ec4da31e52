//! CLI command implementations.

pub mod auth;
pub mod boxes;
pub mod contacts;
pub mod link;
pub mod serve;
pub mod sync;
pub mod users;
