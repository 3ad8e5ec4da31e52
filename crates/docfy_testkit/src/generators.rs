//! Property-based test generators using proptest.
//!
//! Ids are drawn from a small pool so generated change sets overlap the
//! generated store, exercising every diff category.

use docfy_model::{Contact, ContactChanges, LocalId};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Size of the id pool shared by every generator.
pub const ID_POOL: u32 = 24;

/// Strategy for generating main-account contact ids.
pub fn contact_id_strategy() -> impl Strategy<Value = String> {
    (0..ID_POOL).prop_map(|n| n.to_string())
}

/// Strategy for generating upstream contacts.
pub fn contact_strategy() -> impl Strategy<Value = Contact> {
    (
        contact_id_strategy(),
        proptest::option::of("[A-Z][a-z]{1,8}"),
        proptest::option::of("[a-z]{1,8}@[a-z]{1,5}\\.com"),
        proptest::option::of("[0-9]{3}-[0-9]{4}"),
    )
        .prop_map(|(id, name, email, phone_number)| {
            let mut contact = Contact::new(id);
            contact.name = name;
            contact.email = email;
            contact.phone_number = phone_number;
            contact
        })
}

/// Strategy for generating upstream change sets, duplicates included.
pub fn changes_strategy() -> impl Strategy<Value = ContactChanges> {
    (
        prop::collection::vec(contact_strategy(), 0..16),
        prop::collection::vec(contact_id_strategy().prop_map(Contact::new), 0..8),
    )
        .prop_map(|(contacts, deleted)| ContactChanges::new(contacts, deleted))
}

/// Strategy for generating a local store: unique ids, each with a local id
/// and ids in a random subset of `boxes`.
pub fn stored_contacts_strategy(
    boxes: &'static [&'static str],
) -> impl Strategy<Value = Vec<Contact>> {
    prop::collection::btree_map(
        contact_id_strategy(),
        prop::collection::vec(any::<bool>(), boxes.len()),
        0..16,
    )
    .prop_map(move |entries: BTreeMap<String, Vec<bool>>| {
        entries
            .into_iter()
            .map(|(id, mirrored)| {
                let mut contact = Contact::new(id.clone()).with_name(format!("stored {id}"));
                contact.local_id = Some(LocalId::generate());
                for (box_email, present) in boxes.iter().zip(mirrored) {
                    if present {
                        contact.stamp_remote_id(*box_email, format!("{box_email}/{id}"));
                    }
                }
                contact
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    proptest! {
        #[test]
        fn stored_ids_are_unique(stored in stored_contacts_strategy(&["a@x.com"])) {
            let ids: HashSet<_> = stored.iter().map(|c| c.id.clone()).collect();
            prop_assert_eq!(ids.len(), stored.len());
            prop_assert!(stored.iter().all(|c| c.local_id.is_some()));
        }

        #[test]
        fn ids_come_from_pool(changes in changes_strategy()) {
            for contact in changes.contacts.iter().chain(&changes.deleted) {
                let n: u32 = contact.id.parse().unwrap();
                prop_assert!(n < ID_POOL);
            }
        }
    }
}
