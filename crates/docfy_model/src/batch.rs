//! Batched writes against a remote contact box.

use crate::contact::Contact;
use crate::error::{ModelError, ModelResult};
use std::fmt;
use std::str::FromStr;

/// Kind of remote batch write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchOperation {
    /// Create new contacts in the box.
    Create,
    /// Update contacts already mirrored in the box.
    Update,
    /// Delete contacts mirrored in the box.
    Delete,
}

impl BatchOperation {
    /// Returns the lowercase operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchOperation::Create => "create",
            BatchOperation::Update => "update",
            BatchOperation::Delete => "delete",
        }
    }
}

impl fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchOperation {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        match s {
            "create" => Ok(BatchOperation::Create),
            "update" => Ok(BatchOperation::Update),
            "delete" => Ok(BatchOperation::Delete),
            other => Err(ModelError::UnknownOperation(other.to_string())),
        }
    }
}

/// One entry of a batch sent to a contact box.
///
/// Creates carry no remote id. Updates and deletes carry the identifier the
/// target box assigned to the contact. The full contact travels with every
/// entry, deletes included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    /// Identifier inside the target box.
    pub remote_id: Option<String>,
    /// The contact as known to the main account.
    pub contact: Contact,
}

impl BatchItem {
    /// Creates an entry for a contact the box has never seen.
    pub fn create(contact: Contact) -> Self {
        Self {
            remote_id: None,
            contact,
        }
    }

    /// Creates an entry addressing an existing record in the box.
    pub fn targeting(remote_id: impl Into<String>, contact: Contact) -> Self {
        Self {
            remote_id: Some(remote_id.into()),
            contact,
        }
    }
}

/// Outcome of one batch entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// Main-account identifier of the contact the entry was for.
    pub contact_id: String,
    /// Identifier inside the target box (assigned one, for creates).
    pub remote_id: Option<String>,
    /// HTTP-style status reported for the entry.
    pub status: u16,
}

impl BatchResult {
    /// Creates a result.
    pub fn new(contact_id: impl Into<String>, remote_id: Option<String>, status: u16) -> Self {
        Self {
            contact_id: contact_id.into(),
            remote_id,
            status,
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
