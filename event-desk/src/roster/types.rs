use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type EventId = u64;

/// Registration row id, unique within one event's roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(pub u64);

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Review status of an applicant. Any status may move to any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pending, Status::Approved, Status::Rejected];

    /// Upper-case form the backend stores
    pub fn as_wire(&self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::Approved => "APPROVED",
            Status::Rejected => "REJECTED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
        }
    }

    /// Past-tense phrase used in notifications
    pub fn outcome(&self) -> &'static str {
        match self {
            Status::Pending => "moved back to pending",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
        }
    }

    pub fn serialize_wire<S: Serializer>(status: &Status, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(status.as_wire())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        Status::ALL
            .into_iter()
            .find(|status| status.as_wire().eq_ignore_ascii_case(raw))
            .ok_or_else(|| format!("unknown applicant status '{raw}'"))
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(de)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub status: Status,
    pub name: String,
    pub email: String,
    pub university: String,
    pub degree: String,
    pub current_year: String,
    pub skills: String,
    pub availability: String,
    pub marks: String,
    pub bio: String,
}

impl Applicant {
    /// `needle` must already be lower-cased.
    pub fn matches_search(&self, needle: &str) -> bool {
        needle.is_empty()
            || [&self.name, &self.email, &self.university, &self.degree]
                .iter()
                .any(|field| field.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_at: Option<NaiveDateTime>,
    pub end_at: Option<NaiveDateTime>,
    pub required_volunteer: String,
    pub status: String,
    pub category: String,
}

/// Result of one roster fetch
#[derive(Debug, Clone)]
pub struct RosterSnapshot {
    pub event: EventSummary,
    pub applicants: Vec<Applicant>,
}

/// One entry of the batched reconciliation write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub id: ApplicantId,
    #[serde(serialize_with = "Status::serialize_wire")]
    pub status: Status,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub total: usize,
}

/// An event the signed-in manager reviews, with server-side counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagedEvent {
    pub event_id: EventId,
    pub title: String,
    pub location: String,
    pub start_at: Option<chrono::NaiveDate>,
    pub required_volunteer: String,
    pub total_students: u64,
    pub pending_count: u64,
    pub approved_count: u64,
    pub rejected_count: u64,
}
