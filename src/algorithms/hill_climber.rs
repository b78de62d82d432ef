use crate::algorithms::local_search::{AcceptancePolicy, LocalSearch, LocalSearchConfig};
use crate::error::ScheduleError;
use crate::model::Model;
use rand::Rng;

/// Moves only to strictly better schedules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HillClimber;

impl HillClimber {
    pub fn search<R: Rng>(
        model: Model,
        rng: R,
        config: LocalSearchConfig,
    ) -> Result<LocalSearch<HillClimber, R>, ScheduleError> {
        LocalSearch::new(model, HillClimber, rng, config)
    }
}

impl AcceptancePolicy for HillClimber {
    fn name(&self) -> &str {
        "HillClimber"
    }

    #[inline]
    fn accept<R: Rng>(&mut self, current: u64, candidate: u64, _rng: &mut R) -> bool {
        candidate < current
    }
}
