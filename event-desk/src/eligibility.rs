use std::str::FromStr;

use serde::Serialize;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::AppError;
use crate::form::{validate_registration, RegistrationRequest};
use crate::notify::Notification;
use crate::roster::EventId;
use crate::session::UserSession;

/// Server-computed facts for one (user, event) pair. Never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EligibilityFacts {
    pub profile_completion_percent: u8,
    pub already_applied: bool,
}

/// What the registration page shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum GateView {
    AlreadyRegistered,
    CompleteProfile { percent: u8 },
    RegistrationForm,
    /// The facts could not be fetched and the gate fails closed
    CheckUnavailable,
}

impl GateView {
    pub fn allows_registration(&self) -> bool {
        matches!(self, GateView::RegistrationForm)
    }
}

/// What the gate shows when the eligibility read fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Show the form as if both checks passed
    Open,
    #[default]
    Closed,
}

impl FailurePolicy {
    fn on_failure(&self) -> GateView {
        match self {
            FailurePolicy::Open => GateView::RegistrationForm,
            FailurePolicy::Closed => GateView::CheckUnavailable,
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(FailurePolicy::Open),
            "closed" => Ok(FailurePolicy::Closed),
            other => Err(format!("expected 'open' or 'closed', got '{other}'")),
        }
    }
}

/// A prior application wins over an incomplete profile.
pub fn decide(facts: EligibilityFacts) -> GateView {
    if facts.already_applied {
        GateView::AlreadyRegistered
    } else if facts.profile_completion_percent != 100 {
        GateView::CompleteProfile {
            percent: facts.profile_completion_percent,
        }
    } else {
        GateView::RegistrationForm
    }
}

pub async fn check_eligibility(
    backend: &dyn Backend,
    session: &UserSession,
    event_id: EventId,
    policy: FailurePolicy,
) -> GateView {
    match backend.eligibility(session, event_id).await {
        Ok(facts) => decide(facts),
        Err(e) => {
            let view = policy.on_failure();
            warn!(user_id = session.user_id, event_id, error = %e, ?view, "eligibility check failed");
            view
        }
    }
}

/// Runs the gate again, validates the form, and posts the registration.
pub async fn register(
    backend: &dyn Backend,
    session: &UserSession,
    event_id: EventId,
    form: &RegistrationRequest,
    policy: FailurePolicy,
) -> Result<Notification, AppError> {
    let gate = check_eligibility(backend, session, event_id, policy).await;
    if !gate.allows_registration() {
        let reason = match gate {
            GateView::AlreadyRegistered => {
                "You have already registered for this event".to_string()
            }
            GateView::CompleteProfile { percent } => {
                format!("Your profile is {percent}% complete; complete it before registering")
            }
            _ => "Eligibility could not be verified, try again later".to_string(),
        };
        return Err(AppError::Forbidden(reason));
    }

    validate_registration(form).map_err(AppError::Validation)?;
    backend
        .register(session, &form.to_request(session.user_id, event_id))
        .await?;

    info!(user_id = session.user_id, event_id, "registration submitted");
    Ok(Notification::success("Registration submitted"))
}
