//! The schedule model.
//!
//! A [`Model`] maps each of the [`SLOT_COUNT`] slot indices to at most one
//! activity and owns the enrollment sets of every activity. Penalties are kept
//! incrementally: every placement and removal updates the per-index penalty,
//! the per-student per-day timeslot counts and the running component totals in
//! time proportional to the enrollment of the touched activity.
//!
//! The cached scalar [`Model::penalty_points`] is only refreshed by
//! [`Model::calc_total_penalty`]. Until then it is `None`, which orders after
//! every evaluated model, so an empty model never beats a real candidate.

use crate::data::{ActivityId, Catalog, PlacedActivity, StudentId};
use crate::grid::{
    DAY_NAMES, DAYS, Day, SLOT_COUNT, SlotIndex, TIMESLOT_START_HOURS, translate_index,
};
use crate::penalty::{
    DayLoad, DayPenalty, EVENING_PENALTY, PenaltyBreakdown, PenaltyKind, capacity_penalty,
    day_penalty,
};
use log::warn;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::seq::SliceRandom;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

/// Conflict and gap totals over all students and days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StudentPenalties {
    pub conflicts: u64,
    pub gaps: u64,
}

/// Days carrying the largest aggregate student penalties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorstDays {
    pub conflict_day: Day,
    pub gap_day: Day,
}

#[derive(Debug, Clone)]
pub struct Model {
    catalog: Arc<Catalog>,
    solution: Vec<Option<ActivityId>>,
    activity_enrollments: Vec<BTreeSet<StudentId>>,
    activity_order: Vec<ActivityId>,
    placements: Vec<u16>,
    penalty_per_index: Vec<u32>,
    penalties_per_student: Vec<[DayPenalty; DAYS]>,
    student_load: Vec<[DayLoad; DAYS]>,
    totals: PenaltyBreakdown,
    penalty_points: Option<u64>,
}

impl Model {
    /// Creates an empty model with every student enrolled in every activity
    /// of the courses they take.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let mut model = Self::without_enrollments(catalog);
        let catalog = Arc::clone(&model.catalog);
        for (id, activity) in catalog.activities().iter().enumerate() {
            model.activity_enrollments[id] = catalog
                .students_of_course(activity.course_id)
                .iter()
                .copied()
                .collect();
        }
        model
    }

    /// Creates an empty model whose activities have no students yet.
    pub fn without_enrollments(catalog: Arc<Catalog>) -> Self {
        let activities = catalog.activity_count();
        let students = catalog.students().len();
        Self {
            solution: vec![None; SLOT_COUNT],
            activity_enrollments: vec![BTreeSet::new(); activities],
            activity_order: catalog.activity_ids().collect(),
            placements: vec![0; activities],
            penalty_per_index: vec![0; SLOT_COUNT],
            penalties_per_student: vec![[DayPenalty::default(); DAYS]; students],
            student_load: vec![[DayLoad::default(); DAYS]; students],
            totals: PenaltyBreakdown::default(),
            penalty_points: None,
            catalog,
        }
    }

    #[inline]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The assignment, indexed by slot.
    #[inline]
    pub fn solution(&self) -> &[Option<ActivityId>] {
        &self.solution
    }

    /// Independent copy sharing only the catalog.
    #[inline]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    // ------------------------------------------------------------------
    // Slot queries
    // ------------------------------------------------------------------

    #[inline]
    pub fn is_empty(&self, index: SlotIndex) -> bool {
        self.slot(index).is_none()
    }

    #[inline]
    pub fn activity_at(&self, index: SlotIndex) -> Option<ActivityId> {
        self.slot(index)
    }

    /// First index holding `activity`, by linear scan.
    pub fn index_of_activity(&self, activity: ActivityId) -> Option<SlotIndex> {
        self.solution.iter().position(|&s| s == Some(activity))
    }

    pub fn empty_indices(&self) -> Vec<SlotIndex> {
        (0..SLOT_COUNT).filter(|&i| self.solution[i].is_none()).collect()
    }

    #[inline]
    pub fn hall_capacity(&self, index: SlotIndex) -> u32 {
        self.catalog.hall_capacity(translate_index(index).hall)
    }

    /// Empty index with the largest hall, the first one on ties.
    pub fn high_capacity_empty_index(&self) -> Option<SlotIndex> {
        let mut best: Option<(SlotIndex, u32)> = None;
        for index in (0..SLOT_COUNT).filter(|&i| self.solution[i].is_none()) {
            let capacity = self.hall_capacity(index);
            if best.is_none_or(|(_, c)| capacity > c) {
                best = Some((index, capacity));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Samples a slot index, uniformly or proportionally to `weights`.
    ///
    /// With `empty` set, only empty slots are returned. Returns `None` when no
    /// eligible slot has positive weight.
    ///
    /// # Panics
    ///
    /// Panics if `weights` is not of length [`SLOT_COUNT`].
    pub fn get_random_index<R: Rng>(
        &self,
        rng: &mut R,
        empty: bool,
        weights: Option<&[f64]>,
    ) -> Option<SlotIndex> {
        let eligible = |i: SlotIndex| !empty || self.solution[i].is_none();

        if let Some(weights) = weights {
            assert_eq!(
                weights.len(),
                SLOT_COUNT,
                "weight map must cover every slot index"
            );
            if !(0..SLOT_COUNT).any(|i| eligible(i) && weights[i] > 0.0) {
                return None;
            }
            match WeightedIndex::new(weights.iter().copied()) {
                Ok(distribution) => loop {
                    let index = distribution.sample(rng);
                    if eligible(index) {
                        return Some(index);
                    }
                },
                Err(e) => warn!("Invalid weight map ({}), sampling uniformly.", e),
            }
        }

        if !(0..SLOT_COUNT).any(|i| eligible(i)) {
            return None;
        }
        loop {
            let index = rng.random_range(0..SLOT_COUNT);
            if eligible(index) {
                return Some(index);
            }
        }
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Places `activity` at `index` if the slot is empty.
    ///
    /// Capacity is not checked; overbooking only costs penalty points.
    pub fn add_activity(&mut self, index: SlotIndex, activity: ActivityId) -> bool {
        if !self.is_empty(index) {
            return false;
        }
        self.solution[index] = Some(activity);
        self.apply(index, activity, true);
        true
    }

    /// Removes an activity by index, by activity, or by both.
    ///
    /// With both given the activity must be stored at that index. With only
    /// an activity its first index is used. Returns `false` when nothing was
    /// removed.
    pub fn remove_activity(
        &mut self,
        activity: Option<ActivityId>,
        index: Option<SlotIndex>,
    ) -> bool {
        let index = match (activity, index) {
            (Some(activity), Some(index)) => {
                if self.slot(index) != Some(activity) {
                    return false;
                }
                index
            }
            (Some(activity), None) => match self.index_of_activity(activity) {
                Some(index) => index,
                None => return false,
            },
            (None, Some(index)) => index,
            (None, None) => return false,
        };
        match self.solution[index].take() {
            Some(removed) => {
                self.apply(index, removed, false);
                true
            }
            None => false,
        }
    }

    /// Exchanges the contents of two slots, either of which may be empty.
    pub fn swap_activities(&mut self, first: SlotIndex, second: SlotIndex) {
        let a = self.slot(first);
        let b = self.slot(second);
        if first == second || a == b {
            return;
        }
        if let Some(a) = a {
            self.apply(first, a, false);
        }
        if let Some(b) = b {
            self.apply(second, b, false);
        }
        self.solution.swap(first, second);
        if let Some(b) = b {
            self.apply(first, b, true);
        }
        if let Some(a) = a {
            self.apply(second, a, true);
        }
    }

    /// Enrolls `student` in `activity` if they take its course.
    ///
    /// Returns `false` if the student is already enrolled or does not take the
    /// course.
    pub fn add_student_to_activity(&mut self, student: StudentId, activity: ActivityId) -> bool {
        let course = self.catalog.activity(activity).course_id;
        if !self.catalog.courses_of_student(student).contains(&course)
            || self.activity_enrollments[activity.0].contains(&student)
        {
            return false;
        }
        let placed: Vec<SlotIndex> = (0..SLOT_COUNT)
            .filter(|&i| self.solution[i] == Some(activity))
            .collect();
        for &index in &placed {
            self.apply(index, activity, false);
        }
        self.activity_enrollments[activity.0].insert(student);
        for &index in &placed {
            self.apply(index, activity, true);
        }
        true
    }

    /// Adds (`adding`) or retracts the penalty contribution of `activity`
    /// sitting at `index`. The slot contents are not touched.
    fn apply(&mut self, index: SlotIndex, activity: ActivityId, adding: bool) {
        let info = translate_index(index);
        let Self {
            catalog,
            activity_enrollments,
            placements,
            penalty_per_index,
            penalties_per_student,
            student_load,
            totals,
            ..
        } = self;
        let enrolled = &activity_enrollments[activity.0];

        let capacity = capacity_penalty(enrolled.len(), catalog.hall_capacity(info.hall));
        let evening = if info.is_evening() { EVENING_PENALTY } else { 0 };
        if adding {
            totals.capacity += capacity as u64;
            totals.evening += evening as u64;
            penalty_per_index[index] = capacity + evening;
            placements[activity.0] += 1;
        } else {
            totals.capacity -= capacity as u64;
            totals.evening -= evening as u64;
            penalty_per_index[index] = 0;
            placements[activity.0] -= 1;
        }

        for &student in enrolled {
            let load = &mut student_load[student][info.day];
            if adding {
                load[info.timeslot] += 1;
            } else {
                load[info.timeslot] -= 1;
            }
            let updated = day_penalty(load);
            let previous = std::mem::replace(
                &mut penalties_per_student[student][info.day],
                updated,
            );
            totals.conflict = totals.conflict - previous.conflicts as u64 + updated.conflicts as u64;
            totals.gap = totals.gap - previous.gaps as u64 + updated.gaps as u64;
        }
    }

    #[inline]
    fn slot(&self, index: SlotIndex) -> Option<ActivityId> {
        assert!(
            index < SLOT_COUNT,
            "slot index {} out of range 0..{}",
            index,
            SLOT_COUNT
        );
        self.solution[index]
    }

    // ------------------------------------------------------------------
    // Enrollment
    // ------------------------------------------------------------------

    #[inline]
    pub fn enrollments(&self, activity: ActivityId) -> &BTreeSet<StudentId> {
        &self.activity_enrollments[activity.0]
    }

    #[inline]
    pub fn student_count_in_activity(&self, activity: ActivityId) -> usize {
        self.activity_enrollments[activity.0].len()
    }

    /// Slots holding an activity the student is enrolled in.
    pub fn student_schedule(&self, student: StudentId) -> BTreeMap<SlotIndex, ActivityId> {
        self.solution
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.map(|a| (index, a)))
            .filter(|(_, a)| self.activity_enrollments[a.0].contains(&student))
            .collect()
    }

    /// Number of overlapping students, or 1/0 for any overlap when
    /// `count_students` is false.
    pub fn activity_overlap(&self, a: ActivityId, b: ActivityId, count_students: bool) -> usize {
        let overlap = self.activity_enrollments[a.0]
            .intersection(&self.activity_enrollments[b.0])
            .count();
        if count_students {
            overlap
        } else {
            usize::from(overlap > 0)
        }
    }

    // ------------------------------------------------------------------
    // Activity ordering
    // ------------------------------------------------------------------

    /// The order in which constructive algorithms insert activities.
    #[inline]
    pub fn activity_order(&self) -> &[ActivityId] {
        &self.activity_order
    }

    /// Activities of [`Model::activity_order`] that are not placed anywhere.
    pub fn unassigned_activities(&self) -> Vec<ActivityId> {
        self.activity_order
            .iter()
            .copied()
            .filter(|a| self.placements[a.0] == 0)
            .collect()
    }

    /// Sorts the activity order by enrollment size. The sort is stable.
    pub fn sort_activities_on_enrollments(&mut self, descending: bool) {
        let enrollments = &self.activity_enrollments;
        self.activity_order.sort_by(|a, b| {
            let ordering = enrollments[a.0].len().cmp(&enrollments[b.0].len());
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    /// Sorts the activity order by descending overlap with the activities of
    /// other courses.
    pub fn sort_activities_on_overlap(&mut self, count_students: bool) {
        let ids: Vec<ActivityId> = self.catalog.activity_ids().collect();
        let overlap: Vec<usize> = ids
            .iter()
            .map(|&a| {
                let course = self.catalog.activity(a).course_id;
                ids.iter()
                    .filter(|&&b| self.catalog.activity(b).course_id != course)
                    .map(|&b| self.activity_overlap(a, b, count_students))
                    .sum()
            })
            .collect();
        self.activity_order
            .sort_by(|a, b| overlap[b.0].cmp(&overlap[a.0]));
    }

    pub fn shuffle_activities<R: Rng>(&mut self, rng: &mut R) {
        self.activity_order.shuffle(rng);
    }

    // ------------------------------------------------------------------
    // Penalties
    // ------------------------------------------------------------------

    #[inline]
    pub fn calc_capacity_penalty_at(&self, index: SlotIndex) -> u32 {
        self.slot(index).map_or(0, |a| {
            capacity_penalty(self.student_count_in_activity(a), self.hall_capacity(index))
        })
    }

    #[inline]
    pub fn calc_total_capacity_penalty(&self) -> u64 {
        self.totals.capacity
    }

    #[inline]
    pub fn calc_evening_penalty(&self) -> u64 {
        self.totals.evening
    }

    #[inline]
    pub fn calc_student_schedule_penalties(&self) -> StudentPenalties {
        StudentPenalties {
            conflicts: self.totals.conflict,
            gaps: self.totals.gap,
        }
    }

    /// All four components as currently placed.
    #[inline]
    pub fn penalty_breakdown(&self) -> PenaltyBreakdown {
        self.totals
    }

    /// Sums every component and stores the result as the model's score.
    pub fn calc_total_penalty(&mut self) -> u64 {
        let total = self.totals.total();
        self.penalty_points = Some(total);
        total
    }

    /// Score stored by the last [`Model::calc_total_penalty`].
    #[inline]
    pub fn penalty_points(&self) -> Option<u64> {
        self.penalty_points
    }

    /// [`Model::penalty_points`] as a float, infinite when never evaluated.
    #[inline]
    pub fn score(&self) -> f64 {
        self.penalty_points.map_or(f64::INFINITY, |p| p as f64)
    }

    /// Capacity plus evening penalty of the activity at each index.
    #[inline]
    pub fn penalty_per_index(&self) -> &[u32] {
        &self.penalty_per_index
    }

    #[inline]
    pub fn penalty_at_index(&self, index: SlotIndex) -> u32 {
        self.penalty_per_index[index]
    }

    #[inline]
    pub fn penalties_of_student(&self, student: StudentId) -> &[DayPenalty; DAYS] {
        &self.penalties_per_student[student]
    }

    /// Sum of one student penalty type per day.
    pub fn penalties_per_day(&self, kind: PenaltyKind) -> [u64; DAYS] {
        let mut per_day = [0u64; DAYS];
        for days in &self.penalties_per_student {
            for (day, penalty) in days.iter().enumerate() {
                per_day[day] += penalty.get(kind) as u64;
            }
        }
        per_day
    }

    /// Day with the most conflict penalty and day with the most gap penalty.
    /// The earliest day wins ties.
    pub fn worst_days(&self) -> WorstDays {
        let worst = |per_day: [u64; DAYS]| {
            (0..DAYS).fold(0, |best, day| {
                if per_day[day] > per_day[best] {
                    day
                } else {
                    best
                }
            })
        };
        WorstDays {
            conflict_day: worst(self.penalties_per_day(PenaltyKind::Conflict)),
            gap_day: worst(self.penalties_per_day(PenaltyKind::Gap)),
        }
    }

    /// The `n` indices with the highest (or lowest) index penalty, ordered
    /// from most to least extreme.
    pub fn penalty_extremes(&self, n: usize, highest: bool) -> Vec<(SlotIndex, Option<ActivityId>)> {
        let mut indices: Vec<SlotIndex> = (0..SLOT_COUNT).collect();
        indices.sort_by(|&a, &b| {
            let ordering = self.penalty_per_index[a].cmp(&self.penalty_per_index[b]);
            if highest {
                ordering.reverse()
            } else {
                ordering
            }
        });
        indices
            .into_iter()
            .take(n)
            .map(|i| (i, self.solution[i]))
            .collect()
    }

    // ------------------------------------------------------------------
    // Validity
    // ------------------------------------------------------------------

    /// Number of distinct activities placed at least once.
    pub fn placed_count(&self) -> usize {
        self.placements.iter().filter(|&&p| p > 0).count()
    }

    /// True if the activities the student is enrolled in are exactly the
    /// activities of their courses.
    pub fn check_valid_schedule_of_student(&self, student: StudentId) -> bool {
        let scheduled: HashSet<ActivityId> =
            self.student_schedule(student).into_values().collect();
        scheduled == self.catalog.activities_of_student(student)
    }

    /// Legacy validity check.
    ///
    /// Checks one representative student (the one taking the most courses)
    /// and that at least as many distinct activities are placed as the catalog
    /// defines. Use [`Model::is_complete`] for a check over every student.
    pub fn is_solution(&self) -> bool {
        let representative_valid = self
            .representative_student()
            .is_none_or(|student| self.check_valid_schedule_of_student(student));
        representative_valid && self.placed_count() >= self.catalog.activity_count()
    }

    /// Every activity placed and every student's schedule complete.
    pub fn is_complete(&self) -> bool {
        self.placed_count() == self.catalog.activity_count()
            && (0..self.catalog.students().len())
                .all(|student| self.check_valid_schedule_of_student(student))
    }

    fn representative_student(&self) -> Option<StudentId> {
        (0..self.catalog.students().len()).fold(None, |best, student| match best {
            Some(b)
                if self.catalog.courses_of_student(b).len()
                    >= self.catalog.courses_of_student(student).len() =>
            {
                Some(b)
            }
            _ => Some(student),
        })
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    /// Placed activities in index order, for renderers.
    pub fn assignments(&self) -> Vec<PlacedActivity> {
        self.solution
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let activity_id = (*slot)?;
                let info = translate_index(index);
                let activity = self.catalog.activity(activity_id);
                Some(PlacedActivity {
                    index,
                    day: info.day,
                    day_name: DAY_NAMES[info.day].to_string(),
                    timeslot: info.timeslot,
                    start_hour: TIMESLOT_START_HOURS[info.timeslot],
                    hall: self.catalog.halls()[info.hall].name.clone(),
                    course: activity.course.clone(),
                    category: activity.category.clone(),
                    enrolled: self.student_count_in_activity(activity_id),
                })
            })
            .collect()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.penalty_points {
            Some(points) => write!(f, "Model penalty points: {}", points),
            None => write!(f, "Model penalty points: inf"),
        }
    }
}

// Models compare by score only; unevaluated models rank last.
impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Model {}

impl PartialOrd for Model {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Model {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.penalty_points, other.penalty_points) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}
