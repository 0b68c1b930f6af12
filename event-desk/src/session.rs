use std::fmt;
use std::str::FromStr;

use actix_session::Session;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const SESSION_KEY: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Student,
    Organizer,
    Manager,
    Vendor,
    Admin,
}

impl Role {
    pub fn reviews_applicants(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STUDENT" => Ok(Role::Student),
            "ORGANIZER" => Ok(Role::Organizer),
            "MANAGER" => Ok(Role::Manager),
            "VENDOR" => Ok(Role::Vendor),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Student => "student",
            Role::Organizer => "organizer",
            Role::Manager => "manager",
            Role::Vendor => "vendor",
            Role::Admin => "admin",
        };
        f.write_str(s)
    }
}

/// The signed-in user. Created by login, destroyed by logout, and passed
/// explicitly to everything that talks to the backend on the user's behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: u64,
    pub name: String,
    pub username: String,
    pub role: Role,
    pub token: String,
    /// Keys this session's roster desks in server memory
    pub desk_id: String,
}

impl UserSession {
    pub fn new(user_id: u64, name: String, username: String, role: Role, token: String) -> Self {
        Self {
            user_id,
            name,
            username,
            role,
            token,
            desk_id: new_desk_id(),
        }
    }

    pub fn require_role(&self, allowed: impl Fn(Role) -> bool) -> Result<(), AppError> {
        if allowed(self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "This action is not available to a {}",
                self.role
            )))
        }
    }
}

fn new_desk_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}

pub fn sign_in(session: &Session, user: &UserSession) -> Result<(), AppError> {
    session.renew();
    session.insert(SESSION_KEY, user)?;
    Ok(())
}

pub fn current(session: &Session) -> Result<UserSession, AppError> {
    session
        .get::<UserSession>(SESSION_KEY)?
        .ok_or(AppError::Unauthorized)
}

/// Drops the cookie state and hands back the user that was signed in, if any.
pub fn sign_out(session: &Session) -> Option<UserSession> {
    let user = session.get::<UserSession>(SESSION_KEY).ok().flatten();
    session.purge();
    user
}
