use std::io::Write;

use csv::WriterBuilder;

use super::list::Roster;
use crate::error::AppError;

const HEADER: [&str; 8] = [
    "id",
    "name",
    "email",
    "university",
    "degree",
    "current_year",
    "skills",
    "status",
];

/// Writes the roster, with its current local statuses, as CSV.
pub fn write_roster_csv<W: Write>(roster: &Roster, out: W) -> Result<(), AppError> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(out);
    wtr.write_record(HEADER)?;

    for a in roster.applicants() {
        let id = a.id.to_string();
        wtr.write_record([
            id.as_str(),
            a.name.as_str(),
            a.email.as_str(),
            a.university.as_str(),
            a.degree.as_str(),
            a.current_year.as_str(),
            a.skills.as_str(),
            a.status.as_wire(),
        ])?;
    }

    wtr.flush()
        .map_err(|e| AppError::Internal(format!("flush csv: {e}")))?;
    Ok(())
}

pub fn roster_csv(roster: &Roster) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();
    write_roster_csv(roster, &mut buf)?;
    Ok(buf)
}
