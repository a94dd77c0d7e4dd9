//! Thread recipients.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::RecipientId;

/// Members of a thread resolved at enqueue time, excluding the local account.
///
/// Duplicates are dropped; first occurrence order is kept.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecipientSet {
    members: Vec<RecipientId>,
}

impl RecipientSet {
    pub fn new(members: impl IntoIterator<Item = RecipientId>) -> Self {
        let mut unique: Vec<RecipientId> = Vec::new();
        for member in members {
            if !unique.contains(&member) {
                unique.push(member);
            }
        }
        Self { members: unique }
    }

    pub fn single(recipient: RecipientId) -> Self {
        Self {
            members: vec![recipient],
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// A send fans out as a group send when more than one member is targeted.
    pub fn is_group(&self) -> bool {
        self.members.len() > 1
    }

    pub fn contains(&self, recipient: &RecipientId) -> bool {
        self.members.contains(recipient)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecipientId> {
        self.members.iter()
    }
}

impl FromIterator<RecipientId> for RecipientSet {
    fn from_iter<I: IntoIterator<Item = RecipientId>>(iter: I) -> Self {
        Self::new(iter)
    }
}
