//! Wire shapes of the external REST backend.
//!
//! Every row is decoded by field name into typed fields. Values that do not
//! fit (an unknown status, a completion percentage over 100) fail the decode
//! instead of being carried through.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::eligibility::EligibilityFacts;
use crate::roster::{Applicant, ApplicantId, EventSummary, ManagedEvent, RosterSnapshot, Status};

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub jwt: String,
    pub userid: u64,
    #[serde(default, deserialize_with = "text")]
    pub name: String,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCompletedResponse {
    #[serde(default, deserialize_with = "percent")]
    pub profile_completed: u8,
    pub already_applied: bool,
}

impl From<ProfileCompletedResponse> for EligibilityFacts {
    fn from(r: ProfileCompletedResponse) -> Self {
        EligibilityFacts {
            profile_completion_percent: r.profile_completed,
            already_applied: r.already_applied,
        }
    }
}

/// Flattened registration DTO posted to `/Student/RegisterEvent`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterEventRequest {
    pub eventid: String,
    pub userid: String,
    #[serde(rename = "prevExp")]
    pub prev_exp: String,
    pub reasonforevent: String,
    pub skills: String,
    pub notes: String,
    pub availability: String,
    #[serde(rename = "haveBike")]
    pub have_bike: String,
    #[serde(rename = "transportMedium")]
    pub transport_medium: String,
    #[serde(rename = "dietaryRestrictions")]
    pub dietary_restrictions: String,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct EventStatsResponse {
    pub event: EventRow,
    #[serde(default)]
    pub students: Vec<StudentRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRow {
    pub id: u64,
    #[serde(default, alias = "Title", deserialize_with = "text")]
    pub title: String,
    #[serde(default, deserialize_with = "text")]
    pub description: String,
    #[serde(default, deserialize_with = "text")]
    pub location: String,
    #[serde(default)]
    pub start_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub end_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "text")]
    pub required_volunteer: String,
    #[serde(default, deserialize_with = "text")]
    pub status: String,
    #[serde(default, deserialize_with = "text")]
    pub category: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    pub id: u64,
    #[serde(default, deserialize_with = "text")]
    pub name: String,
    #[serde(default, deserialize_with = "text")]
    pub username: String,
    #[serde(default, deserialize_with = "text")]
    pub university: String,
    #[serde(default, deserialize_with = "text")]
    pub degree: String,
    #[serde(default, deserialize_with = "text")]
    pub current_year: String,
    #[serde(default, deserialize_with = "text")]
    pub skills: String,
    #[serde(default, deserialize_with = "status")]
    pub status: Status,
    #[serde(default, deserialize_with = "text")]
    pub availability: String,
    #[serde(default, deserialize_with = "text")]
    pub marks: String,
    #[serde(default, deserialize_with = "text")]
    pub bio: String,
}

impl From<StudentRow> for Applicant {
    fn from(row: StudentRow) -> Self {
        Applicant {
            id: ApplicantId(row.id),
            status: row.status,
            name: row.name,
            email: row.username,
            university: row.university,
            degree: row.degree,
            current_year: row.current_year,
            skills: row.skills,
            availability: row.availability,
            marks: row.marks,
            bio: row.bio,
        }
    }
}

impl From<EventStatsResponse> for RosterSnapshot {
    fn from(r: EventStatsResponse) -> Self {
        let e = r.event;
        RosterSnapshot {
            event: EventSummary {
                id: e.id,
                title: e.title,
                description: e.description,
                location: e.location,
                start_at: e.start_at,
                end_at: e.end_at,
                required_volunteer: e.required_volunteer,
                status: e.status,
                category: e.category,
            },
            applicants: r.students.into_iter().map(Applicant::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedEventRow {
    pub event_id: u64,
    #[serde(default, deserialize_with = "text")]
    pub title: String,
    #[serde(default, deserialize_with = "text")]
    pub location: String,
    #[serde(default)]
    pub start_at: Option<NaiveDate>,
    #[serde(default, rename = "required_volunteer", deserialize_with = "text")]
    pub required_volunteer: String,
    #[serde(default)]
    pub total_students: u64,
    #[serde(default)]
    pub pending_count: u64,
    #[serde(default)]
    pub approved_count: u64,
    #[serde(default)]
    pub rejected_count: u64,
}

impl From<ManagedEventRow> for ManagedEvent {
    fn from(r: ManagedEventRow) -> Self {
        ManagedEvent {
            event_id: r.event_id,
            title: r.title,
            location: r.location,
            start_at: r.start_at,
            required_volunteer: r.required_volunteer,
            total_students: r.total_students,
            pending_count: r.pending_count,
            approved_count: r.approved_count,
            rejected_count: r.rejected_count,
        }
    }
}

/// Accepts a string, a number or null; null becomes an empty string.
fn text<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(de::Error::custom(format!("expected text, got {other}"))),
    }
}

/// Profile completion arrives as a number, a numeric string, or null (0).
fn percent<'de, D: Deserializer<'de>>(de: D) -> Result<u8, D::Error> {
    let raw = match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => return Ok(0),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| de::Error::custom(format!("profileCompleted {n} is not a whole percentage")))?,
        Some(Value::String(s)) => {
            let trimmed = s.trim().trim_end_matches('%').trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            trimmed
                .parse::<u64>()
                .map_err(|_| de::Error::custom(format!("profileCompleted '{s}' is not a number")))?
        }
        Some(other) => {
            return Err(de::Error::custom(format!(
                "profileCompleted has unexpected type: {other}"
            )))
        }
    };

    if raw > 100 {
        return Err(de::Error::custom(format!("profileCompleted {raw} exceeds 100")));
    }
    Ok(raw as u8)
}

/// Unset or blank statuses are pending; anything unknown is an error.
fn status<'de, D: Deserializer<'de>>(de: D) -> Result<Status, D::Error> {
    match Option::<String>::deserialize(de)? {
        None => Ok(Status::Pending),
        Some(s) if s.trim().is_empty() => Ok(Status::Pending),
        Some(s) => s.parse().map_err(de::Error::custom),
    }
}
