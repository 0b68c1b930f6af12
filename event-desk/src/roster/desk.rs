use serde::Serialize;
use tracing::warn;

use super::list::{PendingSave, Roster};
use super::selection::SelectionSet;
use super::types::{Applicant, ApplicantId, EventSummary, RosterSnapshot, Status, StatusCounts};
use super::view::{self, StatusView};
use crate::error::AppError;
use crate::notify::Notification;

/// One manager's working copy of one event's roster
#[derive(Debug, Default)]
pub struct Desk {
    pub event: Option<EventSummary>,
    pub roster: Roster,
    pub selection: SelectionSet,
}

#[derive(Debug, Serialize)]
pub struct DeskView<'a> {
    pub event: Option<&'a EventSummary>,
    pub counts: StatusCounts,
    pub dirty: Vec<ApplicantId>,
    pub selection: Vec<ApplicantId>,
    pub applicants: Vec<&'a Applicant>,
}

impl Desk {
    pub fn new() -> Self {
        Self::default()
    }

    fn event_title(&self) -> &str {
        self.event.as_ref().map(|e| e.title.as_str()).unwrap_or("this event")
    }

    /// Installs a freshly fetched roster. Unsaved changes and the selection are dropped.
    pub fn load(&mut self, snapshot: RosterSnapshot) -> Notification {
        let discarded = self.roster.dirty_ids().len();
        self.roster.replace(snapshot.applicants);
        self.event = Some(snapshot.event);
        self.selection.clear();

        let mut message = format!(
            "Loaded {} applicants for {}",
            self.roster.len(),
            self.event_title()
        );
        if discarded > 0 {
            message.push_str(&format!(" ({discarded} unsaved changes discarded)"));
        }
        Notification::success(message)
    }

    pub fn set_status(&mut self, id: ApplicantId, status: Status) -> Notification {
        let title = self.event_title().to_string();
        match self.roster.set_status(id, status) {
            Some(applicant) => Notification::success(format!(
                "{} has been {} for {}",
                applicant.name,
                status.outcome(),
                title
            )),
            None => Notification::error(format!("No applicant with id {id} on this roster")),
        }
    }

    /// Applies `status` to every selected applicant, then clears the selection.
    /// An empty selection changes nothing.
    pub fn set_status_bulk(&mut self, status: Status) -> Notification {
        if self.selection.is_empty() {
            return Notification::error("Please select students to perform bulk action");
        }

        let mut updated = 0;
        for id in self.selection.take() {
            if self.roster.set_status(id, status).is_some() {
                updated += 1;
            }
        }
        Notification::success(format!(
            "{updated} students have been {} for {}",
            status.outcome(),
            self.event_title()
        ))
    }

    pub fn toggle(&mut self, id: ApplicantId) -> Result<bool, AppError> {
        if self.roster.get(id).is_none() {
            return Err(AppError::NotFound(format!(
                "No applicant with id {id} on this roster"
            )));
        }
        Ok(self.selection.toggle(id))
    }

    /// Selects exactly the applicants visible in the given view.
    pub fn select_all(&mut self, view: StatusView, search: &str) -> usize {
        self.selection
            .replace_with(view::filtered_ids(&self.roster, view, search));
        self.selection.len()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn view(&self, status_view: StatusView, search: &str) -> DeskView<'_> {
        DeskView {
            event: self.event.as_ref(),
            counts: self.roster.counts(),
            dirty: self.roster.dirty_ids(),
            selection: self.selection.ids(),
            applicants: view::filter(&self.roster, status_view, search),
        }
    }

    pub fn prepare_save(&self) -> PendingSave {
        self.roster.prepare_save()
    }

    /// Applies the outcome of a save. Local statuses are never rolled back.
    pub fn finish_save(
        &mut self,
        pending: &PendingSave,
        outcome: &Result<(), AppError>,
    ) -> Notification {
        match outcome {
            Ok(()) if self.roster.mark_saved(pending) => Notification::success(format!(
                "Saved {} applicant statuses for {}",
                pending.payload.len(),
                self.event_title()
            )),
            Ok(()) => {
                warn!("roster reloaded while a save was in flight, baseline left as loaded");
                Notification::success(format!(
                    "Saved {} applicant statuses for {}; the roster was reloaded meanwhile, reload again to see them",
                    pending.payload.len(),
                    self.event_title()
                ))
            }
            Err(AppError::Conflict { ids }) => Notification::error(format!(
                "{} applicants changed on the server since the roster was loaded; reload or force the save",
                ids.len()
            )),
            Err(e) => Notification::error(format!("Failed to save statuses: {e}")),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::notify::Level;
    use crate::roster::list::tests::applicant;

    pub(crate) fn event(id: u64, title: &str) -> EventSummary {
        EventSummary {
            id,
            title: title.to_string(),
            description: String::new(),
            location: "Main Hall".to_string(),
            start_at: None,
            end_at: None,
            required_volunteer: "10".to_string(),
            status: "UPCOMING".to_string(),
            category: String::new(),
        }
    }

    fn loaded() -> Desk {
        let mut desk = Desk::new();
        desk.load(RosterSnapshot {
            event: event(7, "Spring Fair"),
            applicants: vec![
                applicant(1, "Alice Moreau", Status::Pending),
                applicant(2, "Bo Lindqvist", Status::Pending),
            ],
        });
        desk
    }

    #[test]
    fn bulk_approve_updates_selection_and_clears_it() {
        let mut desk = loaded();
        desk.toggle(ApplicantId(1)).unwrap();

        let note = desk.set_status_bulk(Status::Approved);

        assert_eq!(note.level, Level::Success);
        assert_eq!(note.message, "1 students have been approved for Spring Fair");
        assert_eq!(desk.roster.get(ApplicantId(1)).unwrap().status, Status::Approved);
        assert_eq!(desk.roster.get(ApplicantId(2)).unwrap().status, Status::Pending);
        assert!(desk.selection.is_empty());
    }

    #[test]
    fn bulk_with_empty_selection_is_an_error_and_changes_nothing() {
        let mut desk = loaded();
        let before = desk.roster.save_payload();

        let note = desk.set_status_bulk(Status::Rejected);

        assert!(note.is_error());
        assert_eq!(desk.roster.save_payload(), before);
    }

    #[test]
    fn single_update_names_applicant_and_event() {
        let mut desk = loaded();
        let note = desk.set_status(ApplicantId(2), Status::Rejected);
        assert_eq!(note.message, "Bo Lindqvist has been rejected for Spring Fair");

        let missing = desk.set_status(ApplicantId(99), Status::Rejected);
        assert!(missing.is_error());
    }

    #[test]
    fn select_all_takes_only_the_current_view() {
        let mut desk = loaded();
        desk.set_status(ApplicantId(2), Status::Approved);

        assert_eq!(desk.select_all(StatusView::Pending, ""), 1);
        assert_eq!(desk.selection.ids(), vec![ApplicantId(1)]);

        assert_eq!(desk.select_all(StatusView::All, "zzz"), 0);
        assert!(desk.selection.is_empty());
    }

    #[test]
    fn toggle_rejects_ids_off_the_roster() {
        let mut desk = loaded();
        assert!(matches!(desk.toggle(ApplicantId(42)), Err(AppError::NotFound(_))));
        assert!(desk.toggle(ApplicantId(1)).unwrap());
        assert!(!desk.toggle(ApplicantId(1)).unwrap());
    }

    #[test]
    fn failed_save_keeps_local_statuses_and_dirty_set() {
        let mut desk = loaded();
        desk.set_status(ApplicantId(1), Status::Approved);
        let pending = desk.prepare_save();

        let outcome = Err(AppError::BackendStatus { status: 500, body: String::new() });
        let note = desk.finish_save(&pending, &outcome);

        assert!(note.is_error());
        assert_eq!(desk.roster.get(ApplicantId(1)).unwrap().status, Status::Approved);
        assert_eq!(desk.roster.dirty_ids(), vec![ApplicantId(1)]);

        let note = desk.finish_save(&pending, &Ok(()));
        assert_eq!(note.message, "Saved 2 applicant statuses for Spring Fair");
        assert!(desk.roster.dirty_ids().is_empty());
    }

    #[test]
    fn reload_reports_discarded_changes() {
        let mut desk = loaded();
        desk.set_status(ApplicantId(1), Status::Rejected);
        desk.toggle(ApplicantId(2)).unwrap();

        let note = desk.load(RosterSnapshot {
            event: event(7, "Spring Fair"),
            applicants: vec![applicant(1, "Alice Moreau", Status::Pending)],
        });

        assert!(note.message.ends_with("(1 unsaved changes discarded)"));
        assert!(desk.selection.is_empty());
        assert_eq!(desk.roster.len(), 1);
    }

    #[test]
    fn save_finishing_after_a_reload_keeps_the_reloaded_baseline() {
        let mut desk = loaded();
        desk.set_status(ApplicantId(1), Status::Approved);
        let pending = desk.prepare_save();

        desk.load(RosterSnapshot {
            event: event(7, "Spring Fair"),
            applicants: vec![applicant(1, "Alice Moreau", Status::Pending)],
        });
        let note = desk.finish_save(&pending, &Ok(()));

        assert!(!note.is_error());
        assert!(note.message.contains("reload again"));
        assert!(desk.roster.dirty_ids().is_empty());
    }
}
