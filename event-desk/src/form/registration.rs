use chrono::Weekday;
use serde::Deserialize;

use crate::backend::RegisterEventRequest;
use crate::roster::EventId;

/// Registration form as submitted by the student
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationRequest {
    pub motivation: String,
    #[serde(default)]
    pub availability: Vec<String>,
    pub has_bike: Option<bool>,
    pub transport_medium: Option<String>,
    pub previous_experience: Option<String>,
    pub skills: Option<String>,
    pub notes: Option<String>,
    pub dietary_restrictions: Option<String>,
    #[serde(default)]
    pub accepts_terms: bool,
    #[serde(default)]
    pub accepts_code_of_conduct: bool,
}

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parses availability entries into weekdays, dropping repeats, in the order given
fn parse_days(raw: &[String]) -> Result<Vec<Weekday>, String> {
    let mut days = Vec::new();
    for entry in raw {
        let day: Weekday = entry
            .trim()
            .parse()
            .map_err(|_| format!("Unknown availability day: {}", entry.trim()))?;
        if !days.contains(&day) {
            days.push(day);
        }
    }
    Ok(days)
}

/// Checks that every required field is present
pub fn validate_registration(req: &RegistrationRequest) -> Result<(), String> {
    if req.motivation.trim().is_empty() {
        return Err("Tell us why you want to join this event".to_string());
    }

    if parse_days(&req.availability)?.is_empty() {
        return Err("Select at least one day you are available".to_string());
    }

    if req.has_bike.is_none() {
        return Err("Let us know whether you have a bike".to_string());
    }

    if req
        .transport_medium
        .as_ref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true)
    {
        return Err("Transportation selection is required".to_string());
    }

    if !req.accepts_terms {
        return Err("You must accept the terms and conditions".to_string());
    }
    if !req.accepts_code_of_conduct {
        return Err("You must accept the volunteer code of conduct".to_string());
    }

    Ok(())
}

impl RegistrationRequest {
    /// Flattens the form into the backend DTO. Registrations always start pending.
    pub fn to_request(&self, user_id: u64, event_id: EventId) -> RegisterEventRequest {
        let availability = parse_days(&self.availability)
            .unwrap_or_default()
            .into_iter()
            .map(day_name)
            .collect::<Vec<_>>()
            .join(", ");

        let have_bike = match self.has_bike {
            Some(true) => "Yes",
            Some(false) => "No",
            None => "",
        };

        RegisterEventRequest {
            eventid: event_id.to_string(),
            userid: user_id.to_string(),
            prev_exp: self.previous_experience.clone().unwrap_or_default(),
            reasonforevent: self.motivation.trim().to_string(),
            skills: self.skills.clone().unwrap_or_default(),
            notes: self.notes.clone().unwrap_or_default(),
            availability,
            have_bike: have_bike.to_string(),
            transport_medium: self.transport_medium.clone().unwrap_or_default(),
            dietary_restrictions: self.dietary_restrictions.clone().unwrap_or_default(),
            status: "PENDING",
        }
    }
}
