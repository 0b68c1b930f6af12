use crate::eligibility::GateView;
use crate::roster::{Applicant, EventSummary, Roster};

pub fn describe_gate(view: &GateView) -> String {
    match view {
        GateView::AlreadyRegistered => {
            "Already registered: you have applied for this event".to_string()
        }
        GateView::CompleteProfile { percent } => format!(
            "Complete your profile: {}% done, 100% needed to register",
            percent
        ),
        GateView::RegistrationForm => "Eligible: registration form available".to_string(),
        GateView::CheckUnavailable => {
            "Eligibility could not be verified, registration is closed for now".to_string()
        }
    }
}

/// One roster row; the name carries a `[University]` tag when one is known.
fn applicant_line(applicant: &Applicant) -> String {
    let mut line = format!("  {:>6}  {:<9} ", applicant.id, applicant.status.label());
    if !applicant.university.is_empty() {
        line.push_str(&format!("[{}] ", applicant.university));
    }
    line.push_str(&format!("{} <{}>", applicant.name, applicant.email));
    line
}

/// Prints an event roster in a readable format
pub fn print_roster(event: &EventSummary, roster: &Roster) {
    let counts = roster.counts();

    println!("\n=== {} ===", event.title);
    if !event.location.is_empty() {
        println!("Location: {}", event.location);
    }
    if let Some(start) = event.start_at {
        println!("Starts: {}", start.format("%Y-%m-%d %H:%M"));
    }
    println!(
        "Applicants: {} (pending {}, approved {}, rejected {})",
        counts.total, counts.pending, counts.approved, counts.rejected
    );

    if roster.is_empty() {
        println!("  No applicants yet");
        return;
    }
    for applicant in roster.applicants() {
        println!("{}", applicant_line(applicant));
    }
}
