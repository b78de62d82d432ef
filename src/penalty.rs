//! Penalty engine.
//!
//! The objective is the sum of four parts:
//!
//! * capacity: students above the hall capacity, per occupied slot,
//! * evening: a flat [`EVENING_PENALTY`] per occupied evening slot,
//! * conflict: per student and day, every activity sharing its timeslot with
//!   another activity of that student,
//! * gap: per student and day, the number of free timeslots between the first
//!   and last activity, mapped through [`GAP_PENALTY_TABLE`].
//!
//! [`Model`] keeps these incrementally. [`evaluate`] recomputes them from
//! scratch and is the reference the incremental state is tested against.

use crate::data::StudentId;
use crate::grid::{DAYS, SLOT_COUNT, TIMESLOTS, Timeslot, translate_index};
use crate::model::Model;
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;

pub const EVENING_PENALTY: u32 = 5;

/// Penalty for 0, 1, 2 and 3-or-more gap timeslots in one day.
pub const GAP_PENALTY_TABLE: [u32; 4] = [0, 1, 3, 5];

/// Number of activities a student has in each timeslot of one day.
pub type DayLoad = [u16; TIMESLOTS];

/// Conflict and gap penalty of one student on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct DayPenalty {
    pub conflicts: u32,
    pub gaps: u32,
}

/// Selects one of the two student penalty types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PenaltyKind {
    Conflict,
    Gap,
}

impl DayPenalty {
    #[inline]
    pub fn get(&self, kind: PenaltyKind) -> u32 {
        match kind {
            PenaltyKind::Conflict => self.conflicts,
            PenaltyKind::Gap => self.gaps,
        }
    }
}

/// The four penalty components of a schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyBreakdown {
    pub capacity: u64,
    pub evening: u64,
    pub conflict: u64,
    pub gap: u64,
}

impl PenaltyBreakdown {
    #[inline]
    pub fn total(&self) -> u64 {
        self.capacity + self.evening + self.conflict + self.gap
    }
}

/// Students above capacity, zero when the hall is large enough.
#[inline]
pub fn capacity_penalty(enrolled: usize, hall_capacity: u32) -> u32 {
    (enrolled as u64).saturating_sub(hall_capacity as u64) as u32
}

/// Number of entries whose timeslot occurs more than once.
///
/// `[1, 1, 2]` yields 2, `[3, 3, 3]` yields 3.
pub fn conflict_penalty(timeslots: &[Timeslot]) -> u32 {
    let counts = timeslots.iter().counts();
    timeslots.iter().filter(|t| counts[t] > 1).count() as u32
}

/// Gap penalty of one day, looked up in [`GAP_PENALTY_TABLE`].
pub fn gap_penalty(timeslots: &[Timeslot]) -> u32 {
    let gaps: usize = timeslots
        .iter()
        .copied()
        .sorted_unstable()
        .dedup()
        .tuple_windows()
        .map(|(a, b)| b - a - 1)
        .sum();
    gap_table(gaps)
}

#[inline]
fn gap_table(gaps: usize) -> u32 {
    GAP_PENALTY_TABLE[gaps.min(GAP_PENALTY_TABLE.len() - 1)]
}

/// Same result as [`conflict_penalty`] and [`gap_penalty`], computed from
/// per-timeslot counts.
pub fn day_penalty(load: &DayLoad) -> DayPenalty {
    let conflicts = load.iter().filter(|&&c| c > 1).map(|&c| c as u32).sum();
    let occupied = load.iter().filter(|&&c| c > 0).count();
    let gaps = match (
        load.iter().position(|&c| c > 0),
        load.iter().rposition(|&c| c > 0),
    ) {
        (Some(first), Some(last)) => last - first + 1 - occupied,
        _ => 0,
    };
    DayPenalty {
        conflicts,
        gaps: gap_table(gaps),
    }
}

/// Recomputes every penalty component of `model` from scratch.
pub fn evaluate(model: &Model) -> PenaltyBreakdown {
    let catalog = model.catalog();
    let mut breakdown = PenaltyBreakdown::default();
    let mut schedules: HashMap<StudentId, [Vec<Timeslot>; DAYS]> = HashMap::new();

    for index in 0..SLOT_COUNT {
        let Some(activity) = model.activity_at(index) else {
            continue;
        };
        let info = translate_index(index);
        let enrolled = model.enrollments(activity);
        breakdown.capacity +=
            capacity_penalty(enrolled.len(), catalog.hall_capacity(info.hall)) as u64;
        if info.is_evening() {
            breakdown.evening += EVENING_PENALTY as u64;
        }
        for &student in enrolled {
            schedules.entry(student).or_default()[info.day].push(info.timeslot);
        }
    }

    for days in schedules.values() {
        for timeslots in days.iter().filter(|t| !t.is_empty()) {
            breakdown.conflict += conflict_penalty(timeslots) as u64;
            breakdown.gap += gap_penalty(timeslots) as u64;
        }
    }
    breakdown
}
