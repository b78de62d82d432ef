//! Best-first beam search over partial schedules.
//!
//! Each expansion fixes one empty slot and spawns up to `beam_width` children,
//! one per chosen unassigned activity. Partial states are ranked by their
//! penalty plus a fixed weight per activity still to place, so deeper states
//! are preferred and the first complete state popped is the result.

use crate::data::ActivityId;
use crate::error::ScheduleError;
use crate::grid::SlotIndex;
use crate::model::Model;
use crate::penalty::capacity_penalty;
use log::{debug, info, warn};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// How the activities for the children of a state are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChildSelection {
    /// Uniformly at random.
    #[default]
    Random,
    /// Activities whose enrollment best fits the slot's hall.
    CapacityFit,
    /// Activities whose placement costs the least.
    Penalty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BeamSearchConfig {
    pub beam_width: usize,
    pub runs: usize,
    pub selection: ChildSelection,
    /// Priority added for every activity not yet placed.
    pub unassigned_weight: u64,
    /// Open states kept after each expansion.
    pub max_queue: usize,
}

impl Default for BeamSearchConfig {
    fn default() -> Self {
        Self {
            beam_width: 2,
            runs: 1,
            selection: ChildSelection::Random,
            unassigned_weight: 100,
            max_queue: 256,
        }
    }
}

impl BeamSearchConfig {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.beam_width == 0 || self.runs == 0 || self.max_queue == 0 {
            return Err(ScheduleError::InvalidParameter(format!(
                "beam width ({}), runs ({}) and queue size ({}) must be positive",
                self.beam_width, self.runs, self.max_queue
            )));
        }
        Ok(())
    }
}

/// Open state ordered so that the heap pops the lowest priority first and,
/// among equal priorities, the oldest state.
struct Candidate {
    priority: u64,
    sequence: u64,
    model: Model,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Debug, Clone)]
pub struct BeamSearch<R> {
    rng: R,
    config: BeamSearchConfig,
}

impl<R: Rng> BeamSearch<R> {
    pub fn new(rng: R, config: BeamSearchConfig) -> Result<Self, ScheduleError> {
        config.validate()?;
        Ok(Self { rng, config })
    }

    /// Best complete schedule over all runs.
    pub fn run(&mut self, empty: &Model) -> Result<Model, ScheduleError> {
        info!(
            "Starting beam search (width {}, {:?} selection, {} run(s))...",
            self.config.beam_width, self.config.selection, self.config.runs
        );
        let mut best: Option<Model> = None;
        for run in 0..self.config.runs {
            match self.search(empty) {
                Some(model) => {
                    debug!("Beam search run {} finished. {}", run, model);
                    if best.as_ref().is_none_or(|b| model < *b) {
                        best = Some(model);
                    }
                }
                None => warn!("Beam search run {} found no complete schedule.", run),
            }
        }
        let best = best.ok_or(ScheduleError::NoTerminalState {
            runs: self.config.runs,
        })?;
        info!("Beam search finished. {}", best);
        Ok(best)
    }

    fn search(&mut self, empty: &Model) -> Option<Model> {
        let mut queue = BinaryHeap::new();
        let mut sequence = 0;
        let mut expansions = 0usize;
        let root = empty.copy();
        queue.push(self.candidate(root, &mut sequence));

        while let Some(Candidate { model, .. }) = queue.pop() {
            let unassigned = model.unassigned_activities();
            if unassigned.is_empty() {
                return Some(model);
            }
            // Alternate between a random slot and the largest free hall.
            let index = if expansions % 2 == 0 {
                model.get_random_index(&mut self.rng, true, None)
            } else {
                model.high_capacity_empty_index()
            };
            expansions += 1;
            let Some(index) = index else {
                debug!("Dropping a state without empty slots.");
                continue;
            };

            for child in self.children(&model, index, &unassigned) {
                let candidate = self.candidate(child, &mut sequence);
                queue.push(candidate);
            }
            if queue.len() > self.config.max_queue {
                let mut open = queue.into_sorted_vec();
                // Ascending order puts the worst states first.
                open.drain(..open.len() - self.config.max_queue);
                queue = BinaryHeap::from(open);
            }
        }
        None
    }

    fn candidate(&self, mut model: Model, sequence: &mut u64) -> Candidate {
        let unassigned = model.unassigned_activities().len() as u64;
        let priority = model.calc_total_penalty() + unassigned * self.config.unassigned_weight;
        *sequence += 1;
        Candidate {
            priority,
            sequence: *sequence,
            model,
        }
    }

    fn children(&mut self, model: &Model, index: SlotIndex, unassigned: &[ActivityId]) -> Vec<Model> {
        let BeamSearchConfig {
            beam_width: width,
            selection,
            ..
        } = self.config;
        let place = |activity: ActivityId| {
            let mut child = model.copy();
            child.add_activity(index, activity);
            child.calc_total_penalty();
            child
        };
        match selection {
            ChildSelection::Random => unassigned
                .choose_multiple(&mut self.rng, width)
                .map(|&a| place(a))
                .collect(),
            ChildSelection::CapacityFit => {
                let capacity = model.hall_capacity(index);
                let mut ranked = unassigned.to_vec();
                ranked.sort_by_key(|&a| {
                    let enrolled = model.student_count_in_activity(a);
                    (
                        capacity_penalty(enrolled, capacity),
                        (capacity as usize).saturating_sub(enrolled),
                    )
                });
                ranked.into_iter().take(width).map(place).collect()
            }
            ChildSelection::Penalty => {
                let mut children: Vec<Model> = unassigned.iter().map(|&a| place(a)).collect();
                children.sort();
                children.truncate(width);
                children
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{single_course, small_faculty};
    use crate::penalty::evaluate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    fn beam(config: BeamSearchConfig) -> BeamSearch<ChaCha8Rng> {
        BeamSearch::new(ChaCha8Rng::seed_from_u64(8), config).unwrap()
    }

    #[test]
    fn test_candidates_pop_lowest_priority_then_oldest() {
        let model = Model::new(Arc::new(single_course(1, 10)));
        let mut heap = BinaryHeap::new();
        for (priority, sequence) in [(5, 1), (3, 2), (3, 3), (9, 4)] {
            heap.push(Candidate {
                priority,
                sequence,
                model: model.copy(),
            });
        }
        let order: Vec<(u64, u64)> = std::iter::from_fn(|| heap.pop())
            .map(|c| (c.priority, c.sequence))
            .collect();
        assert_eq!(order, vec![(3, 2), (3, 3), (5, 1), (9, 4)]);
    }

    #[test]
    fn test_every_selection_reaches_complete_schedule() {
        let empty = Model::new(Arc::new(small_faculty()));
        for selection in [
            ChildSelection::Random,
            ChildSelection::CapacityFit,
            ChildSelection::Penalty,
        ] {
            let model = beam(BeamSearchConfig {
                selection,
                ..Default::default()
            })
            .run(&empty)
            .unwrap();
            assert!(model.is_complete(), "{:?}", selection);
            assert_eq!(model.penalty_points(), Some(evaluate(&model).total()));
        }
    }

    #[test]
    fn test_wider_beam_and_tiny_queue_still_terminate() {
        let empty = Model::new(Arc::new(small_faculty()));
        let model = beam(BeamSearchConfig {
            beam_width: 5,
            runs: 3,
            max_queue: 4,
            ..Default::default()
        })
        .run(&empty)
        .unwrap();
        assert!(model.is_complete());
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let empty = Model::new(Arc::new(small_faculty()));
        let a = beam(BeamSearchConfig::default()).run(&empty).unwrap();
        let b = beam(BeamSearchConfig::default()).run(&empty).unwrap();
        assert_eq!(a.solution(), b.solution());
    }

    #[test]
    fn test_capacity_fit_prefers_snug_activity() {
        // Lecture 25 students, tutorial 25 students, all halls hold 30:
        // both fit, so the one listed first wins the tie.
        let model = Model::new(Arc::new(single_course(25, 30)));
        let mut search = beam(BeamSearchConfig {
            beam_width: 1,
            selection: ChildSelection::CapacityFit,
            ..Default::default()
        });
        let children = search.children(&model, 0, &model.unassigned_activities());
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].activity_at(0), Some(ActivityId(0)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = BeamSearch::new(
            ChaCha8Rng::seed_from_u64(0),
            BeamSearchConfig {
                beam_width: 0,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(ScheduleError::InvalidParameter(_))));
    }
}
