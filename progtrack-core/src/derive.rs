//! Status / completion-rate derivation.
//!
//! Resolves a requested change against an item's current progress into one consistent
//! `(status, completion_rate)` pair. First matching rule wins:
//! 1) explicit DONE -> rate 100
//! 2) explicit TODO -> rate 0
//! 3) explicit rate -> status from rate (>= 100 DONE, 0 TODO, else IN_PROGRESS)
//! 4) equipment-only change -> rate from actual/planned, then as 3,
//!    except that a DONE item stays DONE at 100.
//!
//! Pure: no I/O, no clock.

use crate::model::{Progress, Status};

/// Requested progress fields, already validated. `None` = not part of the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressChange {
    pub equipment_count: Option<u32>,
    pub actual_equipment_count: Option<u32>,
    pub status: Option<Status>,
    pub completion_rate: Option<u8>,
}

impl ProgressChange {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn completion(rate: u8) -> Self {
        Self {
            completion_rate: Some(rate),
            ..Self::default()
        }
    }

    pub fn actual_equipment(count: u32) -> Self {
        Self {
            actual_equipment_count: Some(count),
            ..Self::default()
        }
    }

    pub fn touches_equipment(&self) -> bool {
        self.equipment_count.is_some() || self.actual_equipment_count.is_some()
    }
}

/// `round(actual / planned * 100)` clamped to 0..=100; 0 when either side is 0.
pub fn equipment_rate(actual: u32, planned: u32) -> u8 {
    if planned == 0 || actual == 0 {
        return 0;
    }
    let planned = u64::from(planned);
    let rate = (u64::from(actual) * 100 + planned / 2) / planned;
    rate.min(100) as u8
}

pub fn derive(current: &Progress, change: &ProgressChange) -> Progress {
    let mut out = *current;
    if let Some(planned) = change.equipment_count {
        out.equipment_count = planned;
    }
    if let Some(actual) = change.actual_equipment_count {
        out.actual_equipment_count = actual;
    }

    match (change.status, change.completion_rate) {
        (Some(Status::Done), _) => {
            out.status = Status::Done;
            out.completion_rate = 100;
        }
        (Some(Status::Todo), _) => {
            out.status = Status::Todo;
            out.completion_rate = 0;
        }
        (_, Some(rate)) => {
            let rate = rate.min(100);
            out.completion_rate = rate;
            out.status = Status::from_rate(rate);
        }
        (Some(Status::InProgress), None) => {
            out.status = Status::InProgress;
            // Reopening a finished item: fall back to the equipment ratio, short of 100.
            if current.completion_rate >= 100 {
                out.completion_rate =
                    equipment_rate(out.actual_equipment_count, out.equipment_count).min(99);
            }
        }
        (None, None) if change.touches_equipment() => {
            if current.status == Status::Done {
                out.status = Status::Done;
                out.completion_rate = 100;
            } else {
                let rate = equipment_rate(out.actual_equipment_count, out.equipment_count);
                out.completion_rate = rate;
                out.status = Status::from_rate(rate);
            }
        }
        (None, None) => {}
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(planned: u32, actual: u32, status: Status, rate: u8) -> Progress {
        Progress {
            equipment_count: planned,
            actual_equipment_count: actual,
            status,
            completion_rate: rate,
        }
    }

    #[test]
    fn done_forces_full_rate() {
        let cur = progress(10, 3, Status::InProgress, 30);
        let out = derive(&cur, &ProgressChange::status(Status::Done));
        assert_eq!(out.status, Status::Done);
        assert_eq!(out.completion_rate, 100);
        // equipment untouched
        assert_eq!(out.actual_equipment_count, 3);
    }

    #[test]
    fn done_wins_over_explicit_rate() {
        let cur = progress(10, 3, Status::InProgress, 30);
        let change = ProgressChange {
            status: Some(Status::Done),
            completion_rate: Some(40),
            ..ProgressChange::default()
        };
        assert_eq!(derive(&cur, &change).completion_rate, 100);
    }

    #[test]
    fn todo_resets_rate() {
        let cur = progress(10, 10, Status::Done, 100);
        let out = derive(&cur, &ProgressChange::status(Status::Todo));
        assert_eq!(out.status, Status::Todo);
        assert_eq!(out.completion_rate, 0);
    }

    #[test]
    fn rate_drives_status() {
        let cur = progress(10, 0, Status::Todo, 0);
        assert_eq!(derive(&cur, &ProgressChange::completion(0)).status, Status::Todo);
        assert_eq!(derive(&cur, &ProgressChange::completion(1)).status, Status::InProgress);
        assert_eq!(derive(&cur, &ProgressChange::completion(99)).status, Status::InProgress);

        let full = derive(&cur, &ProgressChange::completion(100));
        assert_eq!(full.status, Status::Done);
        assert_eq!(full.completion_rate, 100);
    }

    #[test]
    fn in_progress_with_rate_defers_to_rate() {
        let cur = progress(10, 0, Status::Todo, 0);
        let change = ProgressChange {
            status: Some(Status::InProgress),
            completion_rate: Some(0),
            ..ProgressChange::default()
        };
        assert_eq!(derive(&cur, &change).status, Status::Todo);
    }

    #[test]
    fn in_progress_keeps_partial_rate() {
        let cur = progress(10, 4, Status::InProgress, 45);
        let out = derive(&cur, &ProgressChange::status(Status::InProgress));
        assert_eq!(out.completion_rate, 45);
    }

    #[test]
    fn reopening_done_item_caps_rate_below_full() {
        let cur = progress(10, 10, Status::Done, 100);
        let out = derive(&cur, &ProgressChange::status(Status::InProgress));
        assert_eq!(out.status, Status::InProgress);
        assert_eq!(out.completion_rate, 99);

        let partial = progress(10, 6, Status::Done, 100);
        assert_eq!(derive(&partial, &ProgressChange::status(Status::InProgress)).completion_rate, 60);
    }

    #[test]
    fn equipment_change_computes_rate() {
        let cur = progress(10, 0, Status::Todo, 0);
        let out = derive(&cur, &ProgressChange::actual_equipment(4));
        assert_eq!(out.completion_rate, 40);
        assert_eq!(out.status, Status::InProgress);

        let done = derive(&cur, &ProgressChange::actual_equipment(10));
        assert_eq!(done.completion_rate, 100);
        assert_eq!(done.status, Status::Done);

        let none = derive(&out, &ProgressChange::actual_equipment(0));
        assert_eq!(none.completion_rate, 0);
        assert_eq!(none.status, Status::Todo);
    }

    #[test]
    fn planned_change_alone_recomputes_rate() {
        let cur = progress(10, 5, Status::InProgress, 50);
        let change = ProgressChange {
            equipment_count: Some(20),
            ..ProgressChange::default()
        };
        assert_eq!(derive(&cur, &change).completion_rate, 25);
    }

    #[test]
    fn equipment_change_never_uncompletes_done() {
        let cur = progress(10, 10, Status::Done, 100);
        let out = derive(&cur, &ProgressChange::actual_equipment(2));
        assert_eq!(out.status, Status::Done);
        assert_eq!(out.completion_rate, 100);
        assert_eq!(out.actual_equipment_count, 2);
    }

    #[test]
    fn zero_planned_yields_zero_rate() {
        let cur = progress(0, 0, Status::Todo, 0);
        let out = derive(&cur, &ProgressChange::actual_equipment(5));
        assert_eq!(out.completion_rate, 0);
        assert_eq!(out.status, Status::Todo);
    }

    #[test]
    fn equipment_rate_rounds_half_up_and_clamps() {
        assert_eq!(equipment_rate(1, 3), 33);
        assert_eq!(equipment_rate(2, 3), 67);
        assert_eq!(equipment_rate(1, 200), 1);
        assert_eq!(equipment_rate(1, 201), 0);
        assert_eq!(equipment_rate(15, 10), 100);
        assert_eq!(equipment_rate(u32::MAX, 1), 100);
    }

    #[test]
    fn empty_change_is_identity() {
        let cur = progress(10, 4, Status::InProgress, 40);
        assert_eq!(derive(&cur, &ProgressChange::default()), cur);
    }
}
