use std::sync::Mutex;

use async_trait::async_trait;

use super::dto::{LoginResponse, RegisterEventRequest};
use super::Backend;
use crate::eligibility::EligibilityFacts;
use crate::error::AppError;
use crate::roster::{EventId, ManagedEvent, RosterSnapshot, StatusUpdate};
use crate::session::UserSession;

fn outage() -> AppError {
    AppError::BackendStatus {
        status: 503,
        body: "fake outage".to_string(),
    }
}

/// In-memory backend for tests. Unset answers behave as an outage.
#[derive(Default)]
pub struct FakeBackend {
    users: Vec<(String, String, LoginUser)>,
    facts: Option<EligibilityFacts>,
    roster: Mutex<Option<RosterSnapshot>>,
    managed: Vec<ManagedEvent>,
    fail_saves: bool,
    saved: Mutex<Vec<(EventId, Vec<StatusUpdate>)>>,
    registrations: Mutex<Vec<RegisterEventRequest>>,
}

#[derive(Clone)]
struct LoginUser {
    id: u64,
    name: String,
    role: String,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, username: &str, password: &str, id: u64, role: &str) -> Self {
        self.users.push((
            username.to_string(),
            password.to_string(),
            LoginUser {
                id,
                name: format!("User {id}"),
                role: role.to_string(),
            },
        ));
        self
    }

    pub fn with_facts(mut self, profile_completion_percent: u8, already_applied: bool) -> Self {
        self.facts = Some(EligibilityFacts {
            profile_completion_percent,
            already_applied,
        });
        self
    }

    pub fn with_roster(self, snapshot: RosterSnapshot) -> Self {
        *self.roster.lock().unwrap() = Some(snapshot);
        self
    }

    pub fn with_managed(mut self, events: Vec<ManagedEvent>) -> Self {
        self.managed = events;
        self
    }

    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    /// Replaces the server-side roster, as another manager's save would.
    pub fn set_roster(&self, snapshot: RosterSnapshot) {
        *self.roster.lock().unwrap() = Some(snapshot);
    }

    pub fn saved(&self) -> Vec<(EventId, Vec<StatusUpdate>)> {
        self.saved.lock().unwrap().clone()
    }

    pub fn registrations(&self) -> Vec<RegisterEventRequest> {
        self.registrations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AppError> {
        let (_, _, user) = self
            .users
            .iter()
            .find(|(u, p, _)| u == username && p == password)
            .ok_or(AppError::Unauthorized)?;
        Ok(LoginResponse {
            jwt: format!("jwt-{}", user.id),
            userid: user.id,
            name: user.name.clone(),
            username: username.to_string(),
            role: user.role.clone(),
        })
    }

    async fn eligibility(
        &self,
        _session: &UserSession,
        _event_id: EventId,
    ) -> Result<EligibilityFacts, AppError> {
        self.facts.ok_or_else(outage)
    }

    async fn register(
        &self,
        _session: &UserSession,
        request: &RegisterEventRequest,
    ) -> Result<(), AppError> {
        self.registrations.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn event_roster(
        &self,
        _session: &UserSession,
        _event_id: EventId,
    ) -> Result<RosterSnapshot, AppError> {
        self.roster.lock().unwrap().clone().ok_or_else(outage)
    }

    async fn managed_events(&self, _session: &UserSession) -> Result<Vec<ManagedEvent>, AppError> {
        Ok(self.managed.clone())
    }

    async fn save_statuses(
        &self,
        _session: &UserSession,
        event_id: EventId,
        updates: &[StatusUpdate],
    ) -> Result<(), AppError> {
        if self.fail_saves {
            return Err(outage());
        }
        if let Some(snapshot) = self.roster.lock().unwrap().as_mut() {
            for update in updates {
                if let Some(a) = snapshot.applicants.iter_mut().find(|a| a.id == update.id) {
                    a.status = update.status;
                }
            }
        }
        self.saved
            .lock()
            .unwrap()
            .push((event_id, updates.to_vec()));
        Ok(())
    }
}
