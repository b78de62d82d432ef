//! Greedy construction and its randomized variant.
//!
//! Activities are inserted one at a time, each at the empty slot that yields
//! the lowest total penalty. With exploration enabled, step `k` instead picks
//! a random empty slot with probability `start_probability * decay^k`.

use crate::data::ActivityId;
use crate::error::ScheduleError;
use crate::grid::SlotIndex;
use crate::model::Model;
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Order in which activities are offered to the greedy insertion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityOrdering {
    /// Catalog order.
    #[default]
    Catalog,
    Shuffle,
    /// Largest enrollment first.
    Enrollment,
    /// Activities sharing the most courses with the others first.
    Overlap,
    /// Activities sharing the most students with the others first.
    StudentOverlap,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Exploration {
    pub start_probability: f64,
    pub decay: f64,
}

impl Default for Exploration {
    fn default() -> Self {
        Self {
            start_probability: 0.5,
            decay: 0.9,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GreedyConfig {
    pub ordering: ActivityOrdering,
    /// Enables the random-greedy variant.
    pub exploration: Option<Exploration>,
}

#[derive(Debug, Clone)]
pub struct Greedy<R> {
    rng: R,
    config: GreedyConfig,
}

impl<R: Rng> Greedy<R> {
    pub fn new(rng: R, config: GreedyConfig) -> Result<Self, ScheduleError> {
        if let Some(exploration) = config.exploration {
            let valid = |p: f64| (0.0..=1.0).contains(&p);
            if !valid(exploration.start_probability) || !valid(exploration.decay) {
                return Err(ScheduleError::InvalidParameter(format!(
                    "exploration probability and decay must lie in [0, 1], got {} and {}",
                    exploration.start_probability, exploration.decay
                )));
            }
        }
        Ok(Self { rng, config })
    }

    /// Shorthand for the random-greedy variant in catalog order.
    pub fn random_greedy(rng: R, exploration: Exploration) -> Result<Self, ScheduleError> {
        Self::new(
            rng,
            GreedyConfig {
                ordering: ActivityOrdering::Catalog,
                exploration: Some(exploration),
            },
        )
    }

    pub fn run(&mut self, empty: &Model) -> Result<Model, ScheduleError> {
        let mut model = empty.copy();
        match self.config.ordering {
            ActivityOrdering::Catalog => {}
            ActivityOrdering::Shuffle => model.shuffle_activities(&mut self.rng),
            ActivityOrdering::Enrollment => model.sort_activities_on_enrollments(true),
            ActivityOrdering::Overlap => model.sort_activities_on_overlap(false),
            ActivityOrdering::StudentOverlap => model.sort_activities_on_overlap(true),
        }
        info!(
            "Starting greedy construction ({:?} order, exploration {:?})...",
            self.config.ordering, self.config.exploration
        );

        let mut empty_slots = model.empty_indices();
        let mut explore = self.config.exploration.map(|e| e.start_probability);

        for activity in model.unassigned_activities() {
            if empty_slots.is_empty() {
                return Err(ScheduleError::NoEmptySlot {
                    activity: model.catalog().activity(activity).to_string(),
                });
            }
            let position = match explore {
                Some(p) if self.rng.random_bool(p) => {
                    debug!("Exploring a random slot for {}", activity);
                    self.rng.random_range(0..empty_slots.len())
                }
                _ => best_position(&mut model, activity, &empty_slots),
            };
            if let (Some(p), Some(exploration)) = (explore.as_mut(), self.config.exploration) {
                *p *= exploration.decay;
            }
            let index = empty_slots.remove(position);
            model.add_activity(index, activity);
        }

        let total = model.calc_total_penalty();
        info!("Greedy construction finished with {} penalty points.", total);
        Ok(model)
    }
}

/// Position in `candidates` whose slot gives the lowest total penalty for
/// `activity`. Stops early at a slot that adds no penalty at all.
fn best_position(model: &mut Model, activity: ActivityId, candidates: &[SlotIndex]) -> usize {
    let previous = model.calc_total_penalty();
    let mut best = (0, u64::MAX);
    for (position, &index) in candidates.iter().enumerate() {
        model.add_activity(index, activity);
        let penalty = model.calc_total_penalty();
        model.remove_activity(Some(activity), Some(index));
        if penalty == previous {
            return position;
        }
        if penalty < best.1 {
            best = (position, penalty);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{halls, single_course, small_faculty, student};
    use crate::data::{Catalog, CatalogInput, Course, Hall};
    use crate::grid::{SLOT_COUNT, translate_index};
    use crate::penalty::evaluate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    fn greedy(config: GreedyConfig) -> Greedy<ChaCha8Rng> {
        Greedy::new(ChaCha8Rng::seed_from_u64(3), config).unwrap()
    }

    #[test]
    fn test_greedy_fills_first_penalty_free_slots() {
        // Every hall fits all 25 students.
        let empty = Model::new(Arc::new(single_course(25, 30)));
        let model = greedy(GreedyConfig::default()).run(&empty).unwrap();
        assert_eq!(model.activity_at(0), Some(ActivityId(0)));
        // Same timeslot would conflict, so the tutorial moves on to the next
        // timeslot of the same day.
        let tutorial = model.index_of_activity(ActivityId(1)).unwrap();
        assert_eq!(translate_index(tutorial).timeslot, 1);
        assert_eq!(model.penalty_points(), Some(0));
    }

    #[test]
    fn test_greedy_prefers_large_halls() {
        let mut hall_list = halls(5);
        hall_list[3] = Hall {
            name: "Aula".to_string(),
            capacity: 40,
        };
        let catalog = Catalog::new(CatalogInput {
            courses: vec![Course::from_counts("Big", 1, 0, 0, 0, 0, 40)],
            students: (0..40)
                .map(|i| student(&i.to_string(), &["Big"]))
                .collect(),
            halls: hall_list,
        })
        .unwrap();
        let empty = Model::new(Arc::new(catalog));
        let model = greedy(GreedyConfig::default()).run(&empty).unwrap();
        let index = model.index_of_activity(ActivityId(0)).unwrap();
        assert_eq!(translate_index(index).hall, 3);
        assert_eq!(model.penalty_points(), Some(0));
    }

    #[test]
    fn test_enrollment_order_puts_largest_activity_in_largest_hall() {
        let empty = Model::new(Arc::new(small_faculty()));
        let model = greedy(GreedyConfig {
            ordering: ActivityOrdering::Enrollment,
            exploration: None,
        })
        .run(&empty)
        .unwrap();
        assert!(model.is_complete());
        assert_eq!(model.penalty_points(), Some(evaluate(&model).total()));
        // 13 students; R5 (capacity 12) is the best fit and index 5 is its
        // first daytime slot.
        let first = model.activity_order()[0];
        assert_eq!(model.student_count_in_activity(first), 13);
        assert_eq!(model.index_of_activity(first), Some(5));
    }

    #[test]
    fn test_every_ordering_completes() {
        let empty = Model::new(Arc::new(small_faculty()));
        for ordering in [
            ActivityOrdering::Catalog,
            ActivityOrdering::Shuffle,
            ActivityOrdering::Enrollment,
            ActivityOrdering::Overlap,
            ActivityOrdering::StudentOverlap,
        ] {
            let model = greedy(GreedyConfig {
                ordering,
                exploration: None,
            })
            .run(&empty)
            .unwrap();
            assert!(model.is_complete(), "{:?}", ordering);
        }
    }

    #[test]
    fn test_zero_exploration_equals_plain_greedy() {
        let empty = Model::new(Arc::new(small_faculty()));
        let plain = greedy(GreedyConfig::default()).run(&empty).unwrap();
        let explored = Greedy::random_greedy(
            ChaCha8Rng::seed_from_u64(77),
            Exploration {
                start_probability: 0.0,
                decay: 0.5,
            },
        )
        .unwrap()
        .run(&empty)
        .unwrap();
        assert_eq!(plain.solution(), explored.solution());
    }

    #[test]
    fn test_exploration_decays_after_first_insertion() {
        let empty = Model::new(Arc::new(small_faculty()));
        let mut first_slots = Vec::new();
        for seed in 0..10 {
            let explored = Greedy::random_greedy(
                ChaCha8Rng::seed_from_u64(seed),
                Exploration {
                    start_probability: 1.0,
                    decay: 0.0,
                },
            )
            .unwrap()
            .run(&empty)
            .unwrap();
            let first = empty.activity_order()[0];
            let slot = explored.index_of_activity(first).unwrap();
            first_slots.push(slot);

            // With the probability at zero from step one on, the rest is
            // plain greedy around the randomly placed first activity.
            let mut seeded = empty.copy();
            seeded.add_activity(slot, first);
            let plain = greedy(GreedyConfig::default()).run(&seeded).unwrap();
            assert_eq!(plain.solution(), explored.solution(), "seed {}", seed);
        }
        first_slots.sort();
        first_slots.dedup();
        assert!(first_slots.len() > 1);
    }

    #[test]
    fn test_random_greedy_is_seeded() {
        let empty = Model::new(Arc::new(small_faculty()));
        let run = |seed| {
            Greedy::random_greedy(ChaCha8Rng::seed_from_u64(seed), Exploration::default())
                .unwrap()
                .run(&empty)
                .unwrap()
        };
        let a = run(11);
        let b = run(11);
        assert_eq!(a.solution(), b.solution());
        assert!(a.is_complete());
    }

    #[test]
    fn test_invalid_exploration_rejected() {
        let result = Greedy::random_greedy(
            ChaCha8Rng::seed_from_u64(0),
            Exploration {
                start_probability: 1.5,
                decay: 0.9,
            },
        );
        assert!(matches!(result, Err(ScheduleError::InvalidParameter(_))));
    }

    #[test]
    fn test_no_empty_slot_error() {
        let catalog = Catalog::new(CatalogInput {
            courses: vec![Course::from_counts("Huge", SLOT_COUNT as u32 + 1, 0, 0, 0, 0, 1)],
            students: vec![],
            halls: halls(1),
        })
        .unwrap();
        let empty = Model::new(Arc::new(catalog));
        let err = greedy(GreedyConfig::default()).run(&empty).unwrap_err();
        assert!(matches!(err, ScheduleError::NoEmptySlot { .. }));
    }
}
