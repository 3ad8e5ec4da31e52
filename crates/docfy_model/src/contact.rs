//! Contacts mirrored from the main account.

use crate::ids::LocalId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A person known to the main contact box.
///
/// # Fields
///
/// - `local_id`: Assigned by the local store on insert; `None` until then
/// - `id`: Remote identifier in the main account (the matching key)
/// - `domain_id`: Remote identifier inside the internal-domain account
/// - `other_ids`: Box email -> that box's remote identifier for this person
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Local storage identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<LocalId>,
    /// Remote identifier in the main account.
    pub id: String,
    /// Full name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Primary email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Primary phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Remote identifier in the internal-domain account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
    /// Remote identifiers keyed by satellite box email.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub other_ids: BTreeMap<String, String>,
}

impl Contact {
    /// Creates a contact with only its main-account identifier set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the phone number.
    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }

    /// Records the contact's identifier inside another box.
    pub fn with_remote_id(mut self, box_email: impl Into<String>, remote_id: impl Into<String>) -> Self {
        self.stamp_remote_id(box_email, remote_id);
        self
    }

    /// Returns this contact's identifier inside the given box, if mirrored there.
    pub fn remote_id_in(&self, box_email: &str) -> Option<&str> {
        self.other_ids.get(box_email).map(String::as_str)
    }

    /// Stores the identifier a box assigned to this contact.
    pub fn stamp_remote_id(&mut self, box_email: impl Into<String>, remote_id: impl Into<String>) {
        self.other_ids.insert(box_email.into(), remote_id.into());
    }

    /// Takes the locally derived fields (`local_id`, `domain_id`, `other_ids`)
    /// from the stored record this upstream contact replaces.
    pub fn carry_forward(mut self, stored: &Contact) -> Self {
        self.local_id = stored.local_id;
        self.domain_id = stored.domain_id.clone();
        self.other_ids = stored.other_ids.clone();
        self
    }
}

/// Contacts changed and deleted in the main account since a watermark.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactChanges {
    /// Contacts created or modified upstream.
    pub contacts: Vec<Contact>,
    /// Contacts deleted upstream (only `id` is meaningful).
    pub deleted: Vec<Contact>,
}

impl ContactChanges {
    /// Creates a change set.
    pub fn new(contacts: Vec<Contact>, deleted: Vec<Contact>) -> Self {
        Self { contacts, deleted }
    }

    /// Returns true when nothing changed upstream.
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty() && self.deleted.is_empty()
    }

    /// Total number of changed and deleted entries.
    pub fn len(&self) -> usize {
        self.contacts.len() + self.deleted.len()
    }
}
