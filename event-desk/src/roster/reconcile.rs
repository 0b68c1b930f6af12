use tracing::{info, warn};

use super::list::PendingSave;
use super::types::EventId;
use crate::backend::Backend;
use crate::error::AppError;
use crate::session::UserSession;

/// Sends a captured roster to the backend in one batched write.
///
/// Unless `force` is set, the server roster is read first and compared to
/// the baseline the capture was taken against. If any applicant moved on
/// the server in the meantime nothing is written and `AppError::Conflict`
/// names them. With `force` the write is last-write-wins.
pub async fn push(
    backend: &dyn Backend,
    session: &UserSession,
    event_id: EventId,
    pending: &PendingSave,
    force: bool,
) -> Result<(), AppError> {
    if !force {
        let server = backend.event_roster(session, event_id).await?;
        let ids = pending.conflicts_with(&server.applicants);
        if !ids.is_empty() {
            warn!(event_id, conflicts = ids.len(), "roster save refused, server state moved");
            return Err(AppError::Conflict { ids });
        }
    }

    backend
        .save_statuses(session, event_id, &pending.payload)
        .await?;
    info!(event_id, entries = pending.payload.len(), forced = force, "roster saved");
    Ok(())
}
