use crate::data::{CandidateId, RosterEntry};
use itertools::Itertools;
use log::debug;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

// course codes look like 22CSE1001
static SUBJECT_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{2}[a-z]{3,5}\d{4}").expect("subject code pattern is valid")
});

/// Returns the roster columns that name a subject, in their original order.
pub fn detect_subject_columns<S: AsRef<str>>(columns: &[S]) -> Vec<String> {
    columns
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| SUBJECT_CODE.is_match(c.trim()))
        .map(str::to_string)
        .collect()
}

/// Canonical form of a registration number: trimmed, uppercased.
pub fn normalize_id(raw: &str) -> CandidateId {
    raw.trim().to_uppercase()
}

/// Normalizes, drops blanks, deduplicates and sorts, which is exactly the
/// ordering the allocator expects.
pub fn prepare_candidates<I, S>(raw: I) -> Vec<CandidateId>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|id| normalize_id(id.as_ref()))
        .filter(|id| !id.is_empty())
        .sorted()
        .dedup()
        .collect()
}

/// Candidates registered for `subject`. A roster cell marks registration
/// unless it is blank or `NA`; the subject column is matched ignoring case
/// and surrounding whitespace.
pub fn eligible_candidates(roster: &[RosterEntry], subject: &str) -> Vec<CandidateId> {
    let wanted = subject.trim().to_lowercase();
    let eligible = roster.iter().filter(|entry| {
        entry
            .subjects
            .iter()
            .find(|(column, _)| column.trim().to_lowercase() == wanted)
            .is_some_and(|(_, cell)| is_registered(cell))
    });
    let candidates = prepare_candidates(eligible.map(|entry| entry.registration_number.as_str()));
    debug!(
        "{} of {} roster rows eligible for {}",
        candidates.len(),
        roster.len(),
        subject
    );
    candidates
}

/// All distinct subject columns seen across the roster, in sorted order.
pub fn roster_columns(roster: &[RosterEntry]) -> Vec<String> {
    roster
        .iter()
        .flat_map(|entry| entry.subjects.keys())
        .map(|c| c.trim().to_lowercase())
        .unique()
        .sorted()
        .collect()
}

fn is_registered(cell: &Value) -> bool {
    let text = match cell {
        Value::Null => return false,
        Value::String(s) => s.trim().to_uppercase(),
        other => other.to_string(),
    };
    !text.is_empty() && text != "NA"
}
