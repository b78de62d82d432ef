//! Random-restart driver.
//!
//! Every run builds a fresh random schedule and improves it with the
//! configured local search. Run `k` draws from its own generator seeded with
//! `seed + k`, so any single run can be replayed on its own.

use crate::algorithms::hill_climber::HillClimber;
use crate::algorithms::local_search::{LocalSearchConfig, LocalSearchOutcome};
use crate::algorithms::random::{RandomConfig, RandomConstruction};
use crate::algorithms::simulated_annealing::{AnnealingConfig, SimulatedAnnealing};
use crate::error::ScheduleError;
use crate::model::Model;
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LocalSearchKind {
    #[default]
    HillClimber,
    SimulatedAnnealing(AnnealingConfig),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RandomRestartConfig {
    pub runs: usize,
    pub local_search: LocalSearchKind,
    pub search: LocalSearchConfig,
    /// Keep the score trace of every run in the outcome.
    pub store_runs: bool,
}

impl Default for RandomRestartConfig {
    fn default() -> Self {
        Self {
            runs: 20,
            local_search: LocalSearchKind::default(),
            search: LocalSearchConfig::default(),
            store_runs: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestartOutcome {
    pub best: Model,
    /// Best penalty of each run, in run order.
    pub run_scores: Vec<u64>,
    /// Per-run score traces, empty unless `store_runs` is set.
    pub traces: Vec<Vec<u64>>,
}

#[derive(Debug, Clone)]
pub struct RandomRestart {
    config: RandomRestartConfig,
}

/// Seed of run `run` for a driver seeded with `seed`.
#[inline]
pub fn run_seed(seed: u64, run: usize) -> u64 {
    seed.wrapping_add(run as u64)
}

impl RandomRestart {
    pub fn new(config: RandomRestartConfig) -> Result<Self, ScheduleError> {
        if config.runs == 0 {
            return Err(ScheduleError::InvalidParameter(
                "random restart needs at least one run".to_string(),
            ));
        }
        config.search.validate()?;
        if let LocalSearchKind::SimulatedAnnealing(annealing) = config.local_search {
            annealing.schedule()?;
        }
        Ok(Self { config })
    }

    pub fn run(&self, empty: &Model, seed: u64) -> Result<RestartOutcome, ScheduleError> {
        info!(
            "Starting random restart with {} runs of {:?}...",
            self.config.runs, self.config.local_search
        );
        let mut best: Option<Model> = None;
        let mut run_scores = Vec::with_capacity(self.config.runs);
        let mut traces = Vec::new();

        for run in 0..self.config.runs {
            let mut outcome = self.single_run(empty, run_seed(seed, run))?;
            let score = outcome.best.calc_total_penalty();
            info!("Run {} finished with {} penalty points.", run, score);
            run_scores.push(score);
            if self.config.store_runs {
                traces.push(outcome.scores);
            }
            if best.as_ref().is_none_or(|b| outcome.best < *b) {
                best = Some(outcome.best);
            }
        }

        let best = best.ok_or(ScheduleError::InvalidParameter(
            "random restart needs at least one run".to_string(),
        ))?;
        info!("Random restart finished. {}", best);
        Ok(RestartOutcome {
            best,
            run_scores,
            traces,
        })
    }

    /// One construction plus local search, fully determined by `seed`.
    pub fn single_run(&self, empty: &Model, seed: u64) -> Result<LocalSearchOutcome, ScheduleError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let start = RandomConstruction::new(&mut rng, RandomConfig::default())?.construct(empty)?;
        let outcome = match self.config.local_search {
            LocalSearchKind::HillClimber => {
                HillClimber::search(start, &mut rng, self.config.search)?.run()
            }
            LocalSearchKind::SimulatedAnnealing(annealing) => {
                SimulatedAnnealing::new(annealing.schedule()?)
                    .search(start, &mut rng, self.config.search)?
                    .run()
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::simulated_annealing::Cooling;
    use crate::data::fixtures::small_faculty;
    use std::sync::Arc;

    fn config(runs: usize) -> RandomRestartConfig {
        RandomRestartConfig {
            runs,
            search: LocalSearchConfig {
                iterations: 100,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_best_is_minimum_over_runs() {
        let empty = Model::new(Arc::new(small_faculty()));
        let outcome = RandomRestart::new(config(4))
            .unwrap()
            .run(&empty, 10)
            .unwrap();
        assert_eq!(outcome.run_scores.len(), 4);
        assert_eq!(
            outcome.best.penalty_points(),
            outcome.run_scores.iter().min().copied()
        );
        assert!(outcome.traces.is_empty());
        assert!(outcome.best.is_complete());
    }

    #[test]
    fn test_runs_are_reproducible_in_isolation() {
        let empty = Model::new(Arc::new(small_faculty()));
        let driver = RandomRestart::new(config(3)).unwrap();
        let outcome = driver.run(&empty, 40).unwrap();
        let replay = driver.single_run(&empty, run_seed(40, 2)).unwrap();
        assert_eq!(replay.best.penalty_points(), Some(outcome.run_scores[2]));

        let again = driver.run(&empty, 40).unwrap();
        assert_eq!(outcome.run_scores, again.run_scores);
        assert_eq!(outcome.best.solution(), again.best.solution());
    }

    #[test]
    fn test_store_runs_keeps_traces() {
        let empty = Model::new(Arc::new(small_faculty()));
        let outcome = RandomRestart::new(RandomRestartConfig {
            store_runs: true,
            local_search: LocalSearchKind::SimulatedAnnealing(AnnealingConfig {
                temperature: 2.0,
                cooling: Cooling::Linear,
            }),
            ..config(2)
        })
        .unwrap()
        .run(&empty, 0)
        .unwrap();
        assert_eq!(outcome.traces.len(), 2);
        assert!(outcome.traces.iter().all(|t| t.len() == 100));
    }

    #[test]
    fn test_seed_wraps() {
        assert_eq!(run_seed(u64::MAX, 1), 0);
        assert_eq!(run_seed(5, 3), 8);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        assert!(RandomRestart::new(config(0)).is_err());
        let bad_annealing = RandomRestartConfig {
            local_search: LocalSearchKind::SimulatedAnnealing(AnnealingConfig {
                temperature: 1.0,
                cooling: Cooling::Exponential { alpha: 1.0 },
            }),
            ..config(1)
        };
        assert!(matches!(
            RandomRestart::new(bad_annealing),
            Err(ScheduleError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_config_from_json() {
        let config: RandomRestartConfig = serde_json::from_str(
            r#"{
                "runs": 3,
                "localSearch": { "kind": "simulatedAnnealing", "temperature": 4.0 },
                "search": { "iterations": 10, "heuristics": ["balance"] }
            }"#,
        )
        .unwrap();
        assert_eq!(config.runs, 3);
        assert_eq!(config.search.iterations, 10);
        assert_eq!(config.search.modifier, 1.5);
        match config.local_search {
            LocalSearchKind::SimulatedAnnealing(annealing) => {
                assert_eq!(annealing.temperature, 4.0);
                assert_eq!(annealing.cooling, Cooling::Exponential { alpha: 0.99 });
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
