use serde::{Deserialize, Serialize};

use super::list::Roster;
use super::types::{Applicant, ApplicantId, Status};

/// Status tab of the approvals page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusView {
    Pending,
    Approved,
    Rejected,
    #[default]
    All,
}

impl StatusView {
    pub fn admits(&self, status: Status) -> bool {
        match self {
            StatusView::All => true,
            StatusView::Pending => status == Status::Pending,
            StatusView::Approved => status == Status::Approved,
            StatusView::Rejected => status == Status::Rejected,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub view: StatusView,
    #[serde(default)]
    pub search: String,
}

/// Applicants in `view` whose name, email, university or degree contains
/// `search`, ignoring case. Roster order is preserved.
pub fn filter<'a>(roster: &'a Roster, view: StatusView, search: &str) -> Vec<&'a Applicant> {
    let needle = search.trim().to_lowercase();
    roster
        .applicants()
        .iter()
        .filter(|a| view.admits(a.status) && a.matches_search(&needle))
        .collect()
}

pub fn filtered_ids(roster: &Roster, view: StatusView, search: &str) -> Vec<ApplicantId> {
    filter(roster, view, search).into_iter().map(|a| a.id).collect()
}
