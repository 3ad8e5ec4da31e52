//! Password hashing with Argon2id.
//!
//! Hashes are stored as PHC strings, which embed the algorithm, parameters
//! and salt next to the digest.

use crate::error::{ServerError, ServerResult};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;

/// Hashes `password` with a fresh random salt.
pub fn hash_password(password: &str) -> ServerResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServerError::Internal(format!("password hashing failed: {e}")))
}

/// Returns true when `password` matches the stored PHC string.
///
/// A stored value that does not parse is an internal error, not a mismatch.
pub fn verify_password(password: &str, stored: &str) -> ServerResult<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| ServerError::Internal(format!("stored password hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
