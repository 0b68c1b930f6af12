use std::collections::{HashMap, HashSet};

use tracing::warn;

use super::types::{Applicant, ApplicantId, Status, StatusCounts, StatusUpdate};

/// In-memory applicant list for one event.
///
/// Alongside the current statuses the roster keeps a baseline: the statuses
/// the server is known to hold, as of the last load or successful save.
/// Applicants whose current status differs from the baseline are dirty.
/// `generation` counts loads, so a save can tell whether it still applies.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    applicants: Vec<Applicant>,
    baseline: HashMap<ApplicantId, Status>,
    generation: u64,
}

/// A save captured from the roster, detached so it can be sent without
/// holding the roster.
#[derive(Debug, Clone)]
pub struct PendingSave {
    pub payload: Vec<StatusUpdate>,
    pub baseline: HashMap<ApplicantId, Status>,
    pub generation: u64,
}

impl PendingSave {
    /// Ids whose server status moved away from the baseline, or that
    /// disappeared from the server roster.
    pub fn conflicts_with(&self, server: &[Applicant]) -> Vec<ApplicantId> {
        let server_status: HashMap<ApplicantId, Status> =
            server.iter().map(|a| (a.id, a.status)).collect();

        let mut conflicts: Vec<ApplicantId> = self
            .baseline
            .iter()
            .filter(|(id, known)| server_status.get(*id) != Some(*known))
            .map(|(id, _)| *id)
            .collect();
        conflicts.sort();
        conflicts
    }
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole roster. Later duplicates of an id are dropped.
    pub fn replace(&mut self, applicants: Vec<Applicant>) {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(applicants.len());
        for applicant in applicants {
            if seen.insert(applicant.id) {
                kept.push(applicant);
            } else {
                warn!(id = %applicant.id, "duplicate applicant id in roster, keeping first");
            }
        }

        self.baseline = kept.iter().map(|a| (a.id, a.status)).collect();
        self.applicants = kept;
        self.generation += 1;
    }

    pub fn applicants(&self) -> &[Applicant] {
        &self.applicants
    }

    pub fn get(&self, id: ApplicantId) -> Option<&Applicant> {
        self.applicants.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.applicants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applicants.is_empty()
    }

    /// Overwrites the status of the applicant with `id`. Returns the updated
    /// applicant, or `None` if the id is not on the roster.
    pub fn set_status(&mut self, id: ApplicantId, status: Status) -> Option<&Applicant> {
        let applicant = self.applicants.iter_mut().find(|a| a.id == id)?;
        applicant.status = status;
        Some(applicant)
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts {
            total: self.applicants.len(),
            ..StatusCounts::default()
        };
        for applicant in &self.applicants {
            match applicant.status {
                Status::Pending => counts.pending += 1,
                Status::Approved => counts.approved += 1,
                Status::Rejected => counts.rejected += 1,
            }
        }
        counts
    }

    /// One `{id, status}` per applicant, in roster order.
    pub fn save_payload(&self) -> Vec<StatusUpdate> {
        self.applicants
            .iter()
            .map(|a| StatusUpdate {
                id: a.id,
                status: a.status,
            })
            .collect()
    }

    pub fn dirty_ids(&self) -> Vec<ApplicantId> {
        self.applicants
            .iter()
            .filter(|a| self.baseline.get(&a.id) != Some(&a.status))
            .map(|a| a.id)
            .collect()
    }

    pub fn prepare_save(&self) -> PendingSave {
        PendingSave {
            payload: self.save_payload(),
            baseline: self.baseline.clone(),
            generation: self.generation,
        }
    }

    /// Records that the server accepted `pending`. Changes made after the
    /// payload was captured stay dirty. Returns false, and touches nothing,
    /// when the roster was reloaded after the capture.
    pub fn mark_saved(&mut self, pending: &PendingSave) -> bool {
        if pending.generation != self.generation {
            return false;
        }
        for update in &pending.payload {
            if self.baseline.contains_key(&update.id) {
                self.baseline.insert(update.id, update.status);
            }
        }
        true
    }
}
