use crate::algorithms::beam_search::{BeamSearch, BeamSearchConfig};
use crate::algorithms::greedy::{Greedy, GreedyConfig};
use crate::algorithms::random::{RandomConfig, RandomConstruction};
use crate::algorithms::random_restart::{RandomRestart, RandomRestartConfig};
use crate::data::{Catalog, CatalogInput, SchedulingOutput};
use crate::error::ScheduleError;
use crate::model::Model;
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

/// Algorithm and parameters of one solve, tagged by `name`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum AlgorithmRequest {
    Random(RandomConfig),
    Greedy(GreedyConfig),
    BeamSearch(BeamSearchConfig),
    RandomRestart(RandomRestartConfig),
}

impl Default for AlgorithmRequest {
    fn default() -> Self {
        AlgorithmRequest::RandomRestart(RandomRestartConfig::default())
    }
}

impl AlgorithmRequest {
    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmRequest::Random(_) => "random",
            AlgorithmRequest::Greedy(c) if c.exploration.is_some() => "randomGreedy",
            AlgorithmRequest::Greedy(_) => "greedy",
            AlgorithmRequest::BeamSearch(_) => "beamSearch",
            AlgorithmRequest::RandomRestart(_) => "randomRestart",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub catalog: CatalogInput,
    #[serde(default)]
    pub algorithm: AlgorithmRequest,
    #[serde(default)]
    pub seed: u64,
}

/// Builds the catalog, runs the requested algorithm and reports the best
/// schedule it found.
pub fn solve(request: &SolveRequest) -> Result<SchedulingOutput, ScheduleError> {
    let start_time = Instant::now();
    let catalog = Arc::new(Catalog::new(request.catalog.clone())?);
    info!(
        "Scheduling {} activities of {} courses for {} students with {}...",
        catalog.activity_count(),
        catalog.courses().len(),
        catalog.students().len(),
        request.algorithm.name()
    );

    let empty = Model::new(catalog);
    let rng = ChaCha8Rng::seed_from_u64(request.seed);
    let mut run_scores = Vec::new();
    let mut best = match request.algorithm {
        AlgorithmRequest::Random(config) => RandomConstruction::new(rng, config)?.run(&empty)?,
        AlgorithmRequest::Greedy(config) => Greedy::new(rng, config)?.run(&empty)?,
        AlgorithmRequest::BeamSearch(config) => BeamSearch::new(rng, config)?.run(&empty)?,
        AlgorithmRequest::RandomRestart(config) => {
            let outcome = RandomRestart::new(config)?.run(&empty, request.seed)?;
            run_scores = outcome.run_scores;
            outcome.best
        }
    };

    let total = best.calc_total_penalty();
    info!(
        "Solution with {} penalty points found in {:.2?}",
        total,
        start_time.elapsed()
    );
    Ok(SchedulingOutput {
        algorithm: request.algorithm.name().to_string(),
        assignments: best.assignments(),
        penalties: best.penalty_breakdown(),
        total,
        run_scores,
    })
}
