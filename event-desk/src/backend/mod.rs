pub mod dto;
pub mod http;
#[cfg(test)]
pub mod fake;

use async_trait::async_trait;

use crate::eligibility::EligibilityFacts;
use crate::error::AppError;
use crate::roster::{EventId, ManagedEvent, RosterSnapshot, StatusUpdate};
use crate::session::UserSession;

pub use dto::{LoginResponse, RegisterEventRequest};
pub use http::HttpBackend;

/// The external REST service that owns users, events and registrations.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AppError>;

    async fn eligibility(
        &self,
        session: &UserSession,
        event_id: EventId,
    ) -> Result<EligibilityFacts, AppError>;

    async fn register(
        &self,
        session: &UserSession,
        request: &RegisterEventRequest,
    ) -> Result<(), AppError>;

    async fn event_roster(
        &self,
        session: &UserSession,
        event_id: EventId,
    ) -> Result<RosterSnapshot, AppError>;

    async fn managed_events(&self, session: &UserSession) -> Result<Vec<ManagedEvent>, AppError>;

    async fn save_statuses(
        &self,
        session: &UserSession,
        event_id: EventId,
        updates: &[StatusUpdate],
    ) -> Result<(), AppError>;
}
