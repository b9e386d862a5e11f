use crate::data::{AllocationOutcome, CandidateId, ClassroomSpec, ExamMeta, SeatAssignment};
use crate::error::AllocationError;
use itertools::Either;
use log::{info, trace, warn};
use std::time::Instant;

/// Packs candidates into classrooms, filling rooms in the given order and
/// each room column by column, alternating direction (serpentine).
///
/// `candidates` must already be normalized, deduplicated and sorted; the
/// order is consumed as-is. Classrooms with a zero dimension are skipped.
pub fn allocate(
    candidates: &[CandidateId],
    classrooms: &[ClassroomSpec],
    exam: &ExamMeta,
) -> Vec<SeatAssignment> {
    fill(candidates, classrooms, exam).0
}

/// Runs the same fill as [`allocate`] and reports what was left over:
/// candidates beyond the total capacity, and the invalid classrooms the
/// fill reached before every candidate was seated.
pub fn plan(
    candidates: &[CandidateId],
    classrooms: &[ClassroomSpec],
    exam: &ExamMeta,
) -> AllocationOutcome {
    let start_time = Instant::now();
    let subject = exam.subject_code();
    let usable = classrooms.iter().filter(|room| room.is_usable()).count();

    if candidates.is_empty() || usable == 0 {
        info!(
            "{}",
            AllocationError::EmptyInput {
                candidates: candidates.len(),
                classrooms: usable,
            }
        );
    }

    let (assignments, skipped) = fill(candidates, classrooms, exam);
    let unassigned = candidates[assignments.len()..].to_vec();
    if !unassigned.is_empty() {
        warn!(
            "{} candidates for {} could not be seated; capacity exhausted",
            unassigned.len(),
            subject
        );
    }

    info!(
        "Seated {} of {} candidates for {} across {} classrooms in {:.2?}",
        assignments.len(),
        candidates.len(),
        subject,
        usable,
        start_time.elapsed()
    );

    AllocationOutcome {
        assignments,
        unassigned,
        skipped_classrooms: skipped.iter().map(ToString::to_string).collect(),
        total_capacity: total_capacity(classrooms),
    }
}

fn fill(
    candidates: &[CandidateId],
    classrooms: &[ClassroomSpec],
    exam: &ExamMeta,
) -> (Vec<SeatAssignment>, Vec<AllocationError>) {
    let subject = exam.subject_code();
    let total = candidates.len();
    let mut seating = Vec::with_capacity(total.min(total_capacity(classrooms)));
    let mut skipped = Vec::new();
    let mut idx = 0;

    for room in classrooms {
        if idx >= total {
            break;
        }
        if !room.is_usable() {
            let err = invalid(room);
            warn!("{}", err);
            skipped.push(err);
            continue;
        }

        let batch = &candidates[idx..total.min(idx.saturating_add(room.capacity()))];
        let label = room.label();
        let before = seating.len();

        let mut students = batch.iter();
        'columns: for c in 0..room.cols {
            for r in serpentine_rows(room.rows, c) {
                let Some(student) = students.next() else {
                    break 'columns;
                };
                seating.push(SeatAssignment {
                    subject: subject.clone(),
                    candidate_id: student.clone(),
                    classroom: label.clone(),
                    row: r + 1,
                    column: c + 1,
                    date: exam.date,
                    time: exam.time,
                });
            }
        }

        let assigned = seating.len() - before;
        trace!(
            "{}: {} of {} seats filled ({}x{})",
            label,
            assigned,
            room.capacity(),
            room.rows,
            room.cols
        );
        idx += assigned;
    }

    (seating, skipped)
}

/// Seats across all classrooms, saturating at `usize::MAX`.
pub fn total_capacity(classrooms: &[ClassroomSpec]) -> usize {
    classrooms
        .iter()
        .fold(0usize, |acc, room| acc.saturating_add(room.capacity()))
}

// even columns run front to back, odd columns back to front
fn serpentine_rows(rows: u32, column: u32) -> impl Iterator<Item = u32> {
    if column % 2 == 0 {
        Either::Left(0..rows)
    } else {
        Either::Right((0..rows).rev())
    }
}

fn invalid(room: &ClassroomSpec) -> AllocationError {
    AllocationError::InvalidClassroomSpec {
        name: room.name.clone(),
        rows: room.rows,
        cols: room.cols,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn exam() -> ExamMeta {
        ExamMeta::new(
            "22cse1001",
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0),
        )
    }

    fn ids(n: usize) -> Vec<CandidateId> {
        (1..=n).map(|i| format!("A{i}")).collect()
    }

    fn seats(out: &[SeatAssignment]) -> Vec<(&str, &str, u32, u32)> {
        out.iter()
            .map(|a| (a.candidate_id.as_str(), a.classroom.as_str(), a.row, a.column))
            .collect()
    }

    #[test]
    fn five_candidates_snake_through_two_by_three() {
        let out = allocate(&ids(5), &[ClassroomSpec::new("101", 2, 3)], &exam());
        assert_eq!(
            seats(&out),
            vec![
                ("A1", "Room - 101", 1, 1),
                ("A2", "Room - 101", 2, 1),
                ("A3", "Room - 101", 2, 2),
                ("A4", "Room - 101", 1, 2),
                ("A5", "Room - 101", 1, 3),
            ]
        );
        assert!(out.iter().all(|a| a.subject == "22CSE1001"));
        assert!(!out.iter().any(|a| a.row == 2 && a.column == 3));
    }

    #[test]
    fn overflow_leaves_tail_unassigned() {
        let candidates = ids(7);
        let rooms = [ClassroomSpec::new("101", 2, 3)];
        let outcome = plan(&candidates, &rooms, &exam());

        assert_eq!(outcome.assignments.len(), 6);
        assert_eq!(outcome.unassigned, vec!["A7".to_string()]);
        assert_eq!(outcome.total_capacity, 6);
        let last = outcome.assignments.last().unwrap();
        assert_eq!((last.candidate_id.as_str(), last.row, last.column), ("A6", 2, 3));
    }

    #[test]
    fn second_room_takes_the_remainder() {
        let rooms = [ClassroomSpec::new("A", 1, 2), ClassroomSpec::new("B", 2, 5)];
        let out = allocate(&ids(3), &rooms, &exam());
        assert_eq!(
            seats(&out),
            vec![
                ("A1", "Room - A", 1, 1),
                ("A2", "Room - A", 1, 2),
                ("A3", "Room - B", 1, 1),
            ]
        );
    }

    #[test]
    fn empty_inputs_yield_nothing() {
        assert!(allocate(&[], &[ClassroomSpec::new("101", 2, 3)], &exam()).is_empty());
        assert!(allocate(&ids(3), &[], &exam()).is_empty());

        let outcome = plan(&ids(2), &[], &exam());
        assert!(outcome.assignments.is_empty());
        assert_eq!(outcome.unassigned.len(), 2);
    }

    #[test]
    fn single_seat_room() {
        let out = allocate(&ids(3), &[ClassroomSpec::new("tiny", 1, 1)], &exam());
        assert_eq!(seats(&out), vec![("A1", "Room - tiny", 1, 1)]);
    }

    #[test]
    fn zero_sized_rooms_are_skipped_and_reported() {
        let rooms = [
            ClassroomSpec::new("broken", 0, 4),
            ClassroomSpec::new("ok", 1, 2),
        ];
        let outcome = plan(&ids(2), &rooms, &exam());
        assert_eq!(outcome.assignments.len(), 2);
        assert!(outcome.assignments.iter().all(|a| a.classroom == "Room - ok"));
        assert_eq!(outcome.skipped_classrooms.len(), 1);
        assert!(outcome.skipped_classrooms[0].contains("broken"));
    }

    #[test]
    fn duplicate_room_names_are_independent_slots() {
        let rooms = [ClassroomSpec::new("X", 1, 1), ClassroomSpec::new("X", 1, 1)];
        let out = allocate(&ids(2), &rooms, &exam());
        assert_eq!(
            seats(&out),
            vec![("A1", "Room - X", 1, 1), ("A2", "Room - X", 1, 1)]
        );
    }

    #[test]
    fn three_rows_reverse_on_odd_columns() {
        let out = allocate(&ids(7), &[ClassroomSpec::new("r", 3, 3)], &exam());
        let rows: Vec<(u32, u32)> = out.iter().map(|a| (a.row, a.column)).collect();
        assert_eq!(
            rows,
            vec![(1, 1), (2, 1), (3, 1), (3, 2), (2, 2), (1, 2), (1, 3)]
        );
    }

    #[test]
    fn huge_rooms_do_not_overflow_capacity() {
        let rooms = [
            ClassroomSpec::new("a", u32::MAX, u32::MAX),
            ClassroomSpec::new("b", u32::MAX, u32::MAX),
        ];
        assert_eq!(total_capacity(&rooms), usize::MAX);

        let outcome = plan(&ids(1), &rooms, &exam());
        assert_eq!(seats(&outcome.assignments), vec![("A1", "Room - a", 1, 1)]);
        assert_eq!(outcome.total_capacity, usize::MAX);
        assert!(outcome.unassigned.is_empty());
    }

    #[test]
    fn only_reached_invalid_rooms_are_reported() {
        let rooms = [
            ClassroomSpec::new("front", 1, 0),
            ClassroomSpec::new("ok", 1, 2),
            ClassroomSpec::new("never-reached", 0, 3),
        ];
        let outcome = plan(&ids(2), &rooms, &exam());
        assert_eq!(outcome.assignments.len(), 2);
        assert_eq!(outcome.skipped_classrooms.len(), 1);
        assert!(outcome.skipped_classrooms[0].contains("front"));
    }

    fn rooms_strategy() -> impl Strategy<Value = Vec<ClassroomSpec>> {
        prop::collection::vec((0u32..6, 0u32..6), 0..5).prop_map(|dims| {
            dims.into_iter()
                .enumerate()
                .map(|(i, (rows, cols))| ClassroomSpec::new(format!("R{i}"), rows, cols))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn assigns_min_of_candidates_and_capacity(n in 0usize..80, rooms in rooms_strategy()) {
            let out = allocate(&ids(n), &rooms, &exam());
            prop_assert_eq!(out.len(), n.min(total_capacity(&rooms)));
        }

        #[test]
        fn seats_are_never_shared(n in 0usize..80, rooms in rooms_strategy()) {
            let out = allocate(&ids(n), &rooms, &exam());
            let distinct: HashSet<_> =
                out.iter().map(|a| (&a.classroom, a.row, a.column)).collect();
            prop_assert_eq!(distinct.len(), out.len());
        }

        #[test]
        fn candidates_consumed_in_order(n in 0usize..80, rooms in rooms_strategy()) {
            let candidates = ids(n);
            let out = allocate(&candidates, &rooms, &exam());
            let placed: Vec<&CandidateId> = out.iter().map(|a| &a.candidate_id).collect();
            let expected: Vec<&CandidateId> = candidates.iter().take(out.len()).collect();
            prop_assert_eq!(placed, expected);
        }

        #[test]
        fn reruns_are_identical(n in 0usize..80, rooms in rooms_strategy()) {
            let candidates = ids(n);
            let first = serde_json::to_vec(&allocate(&candidates, &rooms, &exam())).unwrap();
            let second = serde_json::to_vec(&allocate(&candidates, &rooms, &exam())).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
