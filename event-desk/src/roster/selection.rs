use std::collections::BTreeSet;

use super::types::ApplicantId;

/// Ids picked for the next bulk action. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    ids: BTreeSet<ApplicantId>,
}

impl SelectionSet {
    /// Adds `id` if absent, removes it otherwise. Returns whether it is now selected.
    pub fn toggle(&mut self, id: ApplicantId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn replace_with(&mut self, ids: impl IntoIterator<Item = ApplicantId>) {
        self.ids = ids.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Empties the set, handing back what was selected.
    pub fn take(&mut self) -> BTreeSet<ApplicantId> {
        std::mem::take(&mut self.ids)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> Vec<ApplicantId> {
        self.ids.iter().copied().collect()
    }
}
