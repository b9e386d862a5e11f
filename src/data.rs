use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// Type aliases for clarity
pub type CandidateId = String;
pub type ClassroomName = String;

/// A classroom as the allocator sees it: a name and a rows x cols grid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClassroomSpec {
    pub name: ClassroomName,
    pub rows: u32,
    pub cols: u32,
}

impl ClassroomSpec {
    pub fn new(name: impl Into<ClassroomName>, rows: u32, cols: u32) -> Self {
        Self {
            name: name.into(),
            rows,
            cols,
        }
    }

    pub fn capacity(&self) -> usize {
        (self.rows as usize).saturating_mul(self.cols as usize)
    }

    pub fn is_usable(&self) -> bool {
        self.rows >= 1 && self.cols >= 1
    }

    /// Label written into every assignment for this room.
    pub fn label(&self) -> String {
        format!("Room - {}", self.name)
    }
}

/// Subject and sitting an allocation run is performed for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExamMeta {
    pub subject: String,
    pub date: NaiveDate,
    #[serde(default, with = "hh_mm")]
    pub time: Option<NaiveTime>,
}

impl ExamMeta {
    pub fn new(subject: impl Into<String>, date: NaiveDate, time: Option<NaiveTime>) -> Self {
        Self {
            subject: subject.into(),
            date,
            time,
        }
    }

    /// Subject as written into records and logs: trimmed, uppercased.
    pub fn subject_code(&self) -> String {
        self.subject.trim().to_uppercase()
    }
}

/// Key a batch of assignments is stored under, e.g. `22CSE1001_2026-10-18`.
pub fn batch_key(subject: &str, date: NaiveDate) -> String {
    format!("{}_{}", subject.trim().to_uppercase(), date.format("%Y-%m-%d"))
}

/// One candidate bound to one seat for one sitting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatAssignment {
    pub subject: String,
    pub candidate_id: CandidateId,
    pub classroom: String,
    pub row: u32,
    pub column: u32,
    pub date: NaiveDate,
    #[serde(default, with = "hh_mm")]
    pub time: Option<NaiveTime>,
}

/// Result of a planning run, including whatever could not be placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationOutcome {
    pub assignments: Vec<SeatAssignment>,
    pub unassigned: Vec<CandidateId>,
    pub skipped_classrooms: Vec<String>,
    pub total_capacity: usize,
}

/// One roster row: a registration number plus one cell per subject column.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub registration_number: String,
    #[serde(default)]
    pub subjects: BTreeMap<String, Value>,
}

/// Body of `POST /v1/seating/allocate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRequest {
    pub subject: String,
    pub date: NaiveDate,
    #[serde(default, with = "hh_mm")]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub candidates: Option<Vec<String>>,
    #[serde(default)]
    pub roster: Option<Vec<RosterEntry>>,
    #[serde(default)]
    pub classrooms: Option<Vec<ClassroomSpec>>,
    #[serde(default)]
    pub dry_run: bool,
}

impl AllocationRequest {
    pub fn exam(&self) -> ExamMeta {
        ExamMeta::new(self.subject.clone(), self.date, self.time)
    }
}

/// Exam times travel as `HH:MM`; an absent time is the empty string.
pub mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(t) => serializer.serialize_str(&t.format(FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map(Some)
            .map_err(D::Error::custom)
    }
}
