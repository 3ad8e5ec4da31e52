//! Partitioning upstream changes against the local store.

use docfy_model::{BatchItem, BatchOperation, Contact, ContactChanges};
use std::collections::{HashMap, HashSet};

/// The one-directional diff of one reconciliation.
///
/// # Invariants
///
/// - Every upstream changed contact lands in exactly one of `to_create` and
///   `to_update`, unless it is also reported deleted
/// - `to_delete` holds stored contacts only, with their local ids
/// - Contacts in `to_update` carry the stored `local_id`, `domain_id` and
///   `other_ids` forward
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDiff {
    /// Upstream contacts with no stored match.
    pub to_create: Vec<Contact>,
    /// Upstream contacts matching a stored contact.
    pub to_update: Vec<Contact>,
    /// Stored contacts reported deleted upstream.
    pub to_delete: Vec<Contact>,
}

impl ContactDiff {
    /// Partitions `changes` against the stored contacts by main-account id.
    ///
    /// Changed contacts are de-duplicated by id, the last occurrence winning.
    /// An id reported both changed and deleted is treated as deleted. Deleted
    /// ids with no stored match are ignored.
    pub fn compute(changes: &ContactChanges, stored: &[Contact]) -> Self {
        let deleted_ids: HashSet<&str> = changes.deleted.iter().map(|c| c.id.as_str()).collect();

        let mut by_id: HashMap<&str, &Contact> = HashMap::with_capacity(stored.len());
        for contact in stored {
            by_id.entry(contact.id.as_str()).or_insert(contact);
        }

        let mut order: Vec<&str> = Vec::new();
        let mut latest: HashMap<&str, &Contact> = HashMap::new();
        for contact in &changes.contacts {
            if deleted_ids.contains(contact.id.as_str()) {
                continue;
            }
            if latest.insert(contact.id.as_str(), contact).is_none() {
                order.push(contact.id.as_str());
            }
        }

        let mut diff = ContactDiff::default();
        for id in order {
            let Some(upstream) = latest.get(id) else {
                continue;
            };
            match by_id.get(id) {
                Some(local) => diff.to_update.push((*upstream).clone().carry_forward(local)),
                None => {
                    let mut fresh = (*upstream).clone();
                    fresh.local_id = None;
                    diff.to_create.push(fresh);
                }
            }
        }

        let mut seen = HashSet::new();
        for deleted in &changes.deleted {
            if !seen.insert(deleted.id.as_str()) {
                continue;
            }
            if let Some(local) = by_id.get(deleted.id.as_str()) {
                diff.to_delete.push((*local).clone());
            }
        }

        diff
    }

    /// Returns true when there is nothing to propagate or commit.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Total number of contacts in the diff.
    pub fn len(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_delete.len()
    }

    /// Derives the batches one satellite box needs.
    pub fn plan_for_box(&self, box_email: &str) -> BoxPlan {
        let mut plan = BoxPlan {
            box_email: box_email.to_string(),
            ..BoxPlan::default()
        };

        plan.creates = self.to_create.iter().cloned().map(BatchItem::create).collect();

        for contact in &self.to_update {
            match contact.remote_id_in(box_email) {
                Some(remote_id) => plan
                    .updates
                    .push(BatchItem::targeting(remote_id, contact.clone())),
                None => plan.backfills.push(BatchItem::create(contact.clone())),
            }
        }

        plan.deletes = self
            .to_delete
            .iter()
            .filter_map(|contact| {
                contact
                    .remote_id_in(box_email)
                    .map(|remote_id| BatchItem::targeting(remote_id, contact.clone()))
            })
            .collect();

        plan
    }
}

/// Batches destined for one satellite box.
///
/// `creates` and `backfills` are both sent with [`BatchOperation::Create`];
/// backfills are updated contacts the box has never received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoxPlan {
    /// Target box.
    pub box_email: String,
    /// New contacts.
    pub creates: Vec<BatchItem>,
    /// Updated contacts unknown to this box.
    pub backfills: Vec<BatchItem>,
    /// Updated contacts the box already mirrors.
    pub updates: Vec<BatchItem>,
    /// Deleted contacts the box mirrors.
    pub deletes: Vec<BatchItem>,
}

impl BoxPlan {
    /// Returns true when the box needs no calls.
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty()
            && self.backfills.is_empty()
            && self.updates.is_empty()
            && self.deletes.is_empty()
    }

    /// Returns every non-empty batch as `(operation, items)`.
    pub fn batches(&self) -> Vec<(BatchOperation, Vec<BatchItem>)> {
        let mut creates = self.creates.clone();
        creates.extend(self.backfills.iter().cloned());
        [
            (BatchOperation::Create, creates),
            (BatchOperation::Update, self.updates.clone()),
            (BatchOperation::Delete, self.deletes.clone()),
        ]
        .into_iter()
        .filter(|(_, items)| !items.is_empty())
        .collect()
    }
}
