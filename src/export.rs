//! CSV export of a stored seating batch, one line per seat.

use crate::data::SeatAssignment;
use crate::error::ServiceResult;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Subject")]
    subject: &'a str,
    #[serde(rename = "Registration Number")]
    registration_number: &'a str,
    #[serde(rename = "Classroom")]
    classroom: &'a str,
    #[serde(rename = "Row")]
    row: u32,
    #[serde(rename = "Column")]
    column: u32,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Time")]
    time: String,
}

impl<'a> From<&'a SeatAssignment> for CsvRow<'a> {
    fn from(a: &'a SeatAssignment) -> Self {
        Self {
            subject: &a.subject,
            registration_number: &a.candidate_id,
            classroom: &a.classroom,
            row: a.row,
            column: a.column,
            date: a.date.format("%Y-%m-%d").to_string(),
            time: a.time.map(|t| t.format("%H:%M").to_string()).unwrap_or_default(),
        }
    }
}

/// Renders assignments in production order with a header line.
pub fn to_csv(batch: &[SeatAssignment]) -> ServiceResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for assignment in batch {
        writer.serialize(CsvRow::from(assignment))?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// Download name for a batch, e.g. `Seating_22CSE1001_2026-11-02.csv`.
pub fn file_name(batch: &[SeatAssignment]) -> String {
    match batch.first() {
        Some(a) => format!("Seating_{}_{}.csv", a.subject, a.date.format("%Y-%m-%d")),
        None => "Seating.csv".to_string(),
    }
}
