//! Random construction.
//!
//! Every activity is dropped into a uniformly drawn slot, retrying on occupied
//! slots. The multi-run mode keeps the cheapest of several independent
//! constructions without any mutation in between.

use crate::data::ActivityId;
use crate::error::ScheduleError;
use crate::grid::{SLOT_COUNT, SlotIndex};
use crate::model::Model;
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Draws per activity before construction gives up.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RandomConfig {
    /// Number of independent constructions; the cheapest is kept.
    pub runs: usize,
    /// Shuffle the insertion order before each construction.
    pub shuffle: bool,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            runs: 1,
            shuffle: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RandomConstruction<R> {
    rng: R,
    config: RandomConfig,
}

impl<R: Rng> RandomConstruction<R> {
    pub fn new(rng: R, config: RandomConfig) -> Result<Self, ScheduleError> {
        if config.runs == 0 {
            return Err(ScheduleError::InvalidParameter(
                "random construction needs at least one run".to_string(),
            ));
        }
        Ok(Self { rng, config })
    }

    /// Fills a copy of `empty` with every unplaced activity.
    pub fn construct(&mut self, empty: &Model) -> Result<Model, ScheduleError> {
        let mut model = empty.copy();
        if self.config.shuffle {
            model.shuffle_activities(&mut self.rng);
        }
        for activity in model.unassigned_activities() {
            place_randomly(&mut model, activity, &mut self.rng)?;
        }
        model.calc_total_penalty();
        Ok(model)
    }

    /// Runs [`RandomConstruction::construct`] `runs` times and keeps the best.
    pub fn run(&mut self, empty: &Model) -> Result<Model, ScheduleError> {
        info!(
            "Starting random construction with {} run(s)...",
            self.config.runs
        );
        let mut best = self.construct(empty)?;
        for run in 1..self.config.runs {
            let model = self.construct(empty)?;
            debug!("Random run {} scored {}", run, model);
            if model < best {
                best = model;
            }
        }
        info!("Random construction finished. {}", best);
        Ok(best)
    }
}

/// Inserts `activity` at a uniformly drawn empty slot.
pub fn place_randomly<R: Rng>(
    model: &mut Model,
    activity: ActivityId,
    rng: &mut R,
) -> Result<SlotIndex, ScheduleError> {
    for _ in 0..MAX_PLACEMENT_ATTEMPTS {
        let index = rng.random_range(0..SLOT_COUNT);
        if model.add_activity(index, activity) {
            return Ok(index);
        }
    }
    Err(ScheduleError::PlacementExhausted {
        activity: model.catalog().activity(activity).to_string(),
        attempts: MAX_PLACEMENT_ATTEMPTS,
    })
}
