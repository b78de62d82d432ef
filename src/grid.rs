//! The fixed weekly grid.
//!
//! Every day has 29 slots: four daytime timeslots with seven halls each,
//! followed by a single evening slot that always lives in hall 5 (the
//! largest hall). Five days give 145 slot indices in total.

use serde::Serialize;

pub type SlotIndex = usize;
pub type Day = usize;
pub type Timeslot = usize;
pub type HallIndex = usize;

pub const DAYS: usize = 5;
pub const TIMESLOTS: usize = 5;
pub const DAYTIME_TIMESLOTS: usize = 4;
pub const HALLS_PER_TIMESLOT: usize = 7;
pub const SLOTS_PER_DAY: usize = DAYTIME_TIMESLOTS * HALLS_PER_TIMESLOT + 1;
pub const SLOT_COUNT: usize = SLOTS_PER_DAY * DAYS;

/// Hall used by the evening slot of every day.
pub const EVENING_HALL: HallIndex = 5;
/// Timeslot value of the evening slot.
pub const EVENING_TIMESLOT: Timeslot = DAYTIME_TIMESLOTS;
/// The two central timeslots of a day (11:00 and 13:00).
pub const MIDDLE_TIMESLOTS: [Timeslot; 2] = [1, 2];

/// Start hour of each timeslot, for renderers.
pub const TIMESLOT_START_HOURS: [u32; TIMESLOTS] = [9, 11, 13, 15, 17];
pub const DAY_NAMES: [&str; DAYS] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

/// The (day, timeslot, hall) triple behind a slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SlotInfo {
    pub day: Day,
    pub timeslot: Timeslot,
    pub hall: HallIndex,
}

impl SlotInfo {
    #[inline]
    pub fn is_evening(&self) -> bool {
        self.timeslot == EVENING_TIMESLOT
    }
}

/// Translates a slot index into its day, timeslot and hall.
///
/// # Panics
///
/// Panics if `index >= SLOT_COUNT`.
#[inline]
pub fn translate_index(index: SlotIndex) -> SlotInfo {
    assert!(
        index < SLOT_COUNT,
        "slot index {} out of range 0..{}",
        index,
        SLOT_COUNT
    );
    let within_day = index % SLOTS_PER_DAY;
    let hall = if within_day == SLOTS_PER_DAY - 1 {
        EVENING_HALL
    } else {
        within_day % HALLS_PER_TIMESLOT
    };
    SlotInfo {
        day: index / SLOTS_PER_DAY,
        timeslot: within_day / HALLS_PER_TIMESLOT,
        hall,
    }
}

/// Inverse of [`translate_index`].
///
/// Returns `None` for triples that are not on the grid, which includes every
/// evening triple whose hall is not [`EVENING_HALL`].
pub fn slot_index(day: Day, timeslot: Timeslot, hall: HallIndex) -> Option<SlotIndex> {
    if day >= DAYS || timeslot >= TIMESLOTS || hall >= HALLS_PER_TIMESLOT {
        return None;
    }
    if timeslot == EVENING_TIMESLOT {
        return (hall == EVENING_HALL).then_some(day * SLOTS_PER_DAY + SLOTS_PER_DAY - 1);
    }
    Some(day * SLOTS_PER_DAY + timeslot * HALLS_PER_TIMESLOT + hall)
}

/// All indices of one day.
#[inline]
pub fn day_indices(day: Day) -> std::ops::Range<SlotIndex> {
    assert!(day < DAYS, "day {} out of range 0..{}", day, DAYS);
    day * SLOTS_PER_DAY..(day + 1) * SLOTS_PER_DAY
}
