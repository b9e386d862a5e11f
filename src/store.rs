use crate::data::{CandidateId, SeatAssignment, batch_key};
use crate::roster::normalize_id;
use chrono::NaiveDate;
use log::{debug, info};
use std::collections::BTreeMap;

/// Where finished allocations go: one batch per subject and date for
/// administrators, plus a running list per candidate.
pub trait SeatingSink: Send + Sync {
    /// Stores a run's assignments. A batch already stored for the same
    /// subject and date is replaced, including its per-candidate records.
    fn record(&mut self, batch: &[SeatAssignment]);

    fn batches(&self) -> Vec<(String, Vec<SeatAssignment>)>;

    fn batch(&self, subject: &str, date: NaiveDate) -> Option<Vec<SeatAssignment>>;

    fn for_candidate(&self, candidate: &str) -> Vec<SeatAssignment>;

    /// Removes a batch and the matching records from each candidate.
    /// Returns the number of assignments removed.
    fn delete_batch(&mut self, subject: &str, date: NaiveDate) -> usize;

    fn clear(&mut self);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    batches: BTreeMap<String, Vec<SeatAssignment>>,
    by_candidate: BTreeMap<CandidateId, Vec<SeatAssignment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SeatingSink for MemoryStore {
    fn record(&mut self, batch: &[SeatAssignment]) {
        let Some(first) = batch.first() else {
            return;
        };
        let subject = first.subject.clone();
        let date = first.date;
        let replaced = self.delete_batch(&subject, date);
        if replaced > 0 {
            debug!("Replacing {} earlier assignments for {} on {}", replaced, subject, date);
        }

        for assignment in batch {
            self.by_candidate
                .entry(assignment.candidate_id.clone())
                .or_default()
                .push(assignment.clone());
        }
        self.batches.insert(batch_key(&subject, date), batch.to_vec());
        info!("Stored {} assignments for {} on {}", batch.len(), subject, date);
    }

    fn batches(&self) -> Vec<(String, Vec<SeatAssignment>)> {
        self.batches
            .iter()
            .map(|(key, records)| (key.clone(), records.clone()))
            .collect()
    }

    fn batch(&self, subject: &str, date: NaiveDate) -> Option<Vec<SeatAssignment>> {
        self.batches.get(&batch_key(subject, date)).cloned()
    }

    fn for_candidate(&self, candidate: &str) -> Vec<SeatAssignment> {
        let mut records = self
            .by_candidate
            .get(&normalize_id(candidate))
            .cloned()
            .unwrap_or_default();
        records.sort_by(|a, b| (a.date, a.time, &a.subject).cmp(&(b.date, b.time, &b.subject)));
        records
    }

    fn delete_batch(&mut self, subject: &str, date: NaiveDate) -> usize {
        let Some(removed) = self.batches.remove(&batch_key(subject, date)) else {
            return 0;
        };
        let subject = subject.trim().to_uppercase();
        for assignment in &removed {
            let id = &assignment.candidate_id;
            if let Some(records) = self.by_candidate.get_mut(id) {
                records.retain(|r| !(r.subject == subject && r.date == date));
                if records.is_empty() {
                    self.by_candidate.remove(id);
                }
            }
        }
        removed.len()
    }

    fn clear(&mut self) {
        self.batches.clear();
        self.by_candidate.clear();
        info!("Cleared all seating data");
    }
}
