pub mod types;
pub mod list;
pub mod view;
pub mod selection;
pub mod desk;
pub mod reconcile;
pub mod export;

pub use types::{
    Applicant, ApplicantId, EventId, EventSummary, ManagedEvent, RosterSnapshot, Status,
    StatusUpdate,
};
pub use list::Roster;
pub use view::ViewQuery;
pub use desk::Desk;
pub use export::roster_csv;
