//! API users.

use crate::ids::LocalId;
use serde::{Deserialize, Serialize};

/// A user allowed to call the authenticated handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Storage identifier, assigned on save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LocalId>,
    /// Lower-cased unique login name.
    pub username: String,
    /// Password hash in PHC string format.
    pub password_hash: String,
}

impl User {
    /// Creates a user, normalising the username to lower case.
    pub fn new(username: &str, password_hash: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.to_lowercase(),
            password_hash: password_hash.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_lowercased() {
        let user = User::new("MariaS", "$argon2id$...");
        assert_eq!(user.username, "marias");
        assert!(user.id.is_none());
    }
}
