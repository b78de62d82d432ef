//! Swap-based local search over complete schedules.
//!
//! [`LocalSearch`] owns the loop: it mutates a copy of the current state,
//! asks its [`AcceptancePolicy`] whether to move there and tracks the best
//! state seen. Hill climbing and simulated annealing differ only in the
//! policy they plug in.

use crate::error::ScheduleError;
use crate::heuristics::{HeuristicSet, WeightMaps, weight_maps};
use crate::model::Model;
use log::{debug, info, trace};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocalSearchConfig {
    pub iterations: usize,
    /// Stop after this many iterations without a new best state.
    pub convergence: Option<usize>,
    /// Swaps per candidate.
    pub mutations: usize,
    pub heuristics: HeuristicSet,
    /// Weight of the slots a heuristic favours.
    pub modifier: f64,
}

impl Default for LocalSearchConfig {
    fn default() -> Self {
        Self {
            iterations: 2812,
            convergence: None,
            mutations: 1,
            heuristics: HeuristicSet::empty(),
            modifier: 1.5,
        }
    }
}

impl LocalSearchConfig {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.mutations == 0 {
            return Err(ScheduleError::InvalidParameter(
                "at least one swap per iteration is required".to_string(),
            ));
        }
        if !(self.modifier.is_finite() && self.modifier > 0.0) {
            return Err(ScheduleError::InvalidParameter(format!(
                "heuristic modifier must be positive, got {}",
                self.modifier
            )));
        }
        Ok(())
    }
}

/// Decides whether the search moves to a candidate.
pub trait AcceptancePolicy {
    fn name(&self) -> &str;

    fn on_start(&mut self, _config: &LocalSearchConfig) {}

    fn accept<R: Rng>(&mut self, current: u64, candidate: u64, rng: &mut R) -> bool;

    /// Called once per evaluated candidate, accepted or not.
    fn on_iteration_end(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    IterationLimit,
    Converged,
}

#[derive(Debug, Clone)]
pub struct LocalSearchState {
    pub current: Model,
    pub best: Model,
    pub iteration: usize,
    /// Iterations since the last new best state.
    pub stale_iterations: usize,
    /// Penalty of the current state after every iteration.
    pub scores: Vec<u64>,
}

#[derive(Debug, Clone)]
pub struct LocalSearchOutcome {
    pub best: Model,
    pub iterations: usize,
    pub scores: Vec<u64>,
    pub termination: Termination,
}

#[derive(Debug, Clone)]
pub struct LocalSearch<P, R> {
    policy: P,
    rng: R,
    config: LocalSearchConfig,
    state: LocalSearchState,
}

impl<P: AcceptancePolicy, R: Rng> LocalSearch<P, R> {
    /// Starts from `model`, which must already be a complete schedule.
    pub fn new(
        model: Model,
        policy: P,
        rng: R,
        config: LocalSearchConfig,
    ) -> Result<Self, ScheduleError> {
        config.validate()?;
        if !model.is_solution() {
            return Err(ScheduleError::IncompleteSolution {
                placed: model.placed_count(),
                expected: model.catalog().activity_count(),
            });
        }
        let mut current = model;
        current.calc_total_penalty();
        let best = current.copy();
        Ok(Self {
            policy,
            rng,
            config,
            state: LocalSearchState {
                current,
                best,
                iteration: 0,
                stale_iterations: 0,
                scores: Vec::with_capacity(config.iterations.min(1 << 16)),
            },
        })
    }

    #[inline]
    pub fn state(&self) -> &LocalSearchState {
        &self.state
    }

    pub fn run(mut self) -> LocalSearchOutcome {
        info!(
            "Starting {} for {} iterations from {}",
            self.policy.name(),
            self.config.iterations,
            self.state.current
        );
        self.policy.on_start(&self.config);
        let termination = loop {
            if self.state.iteration >= self.config.iterations {
                break Termination::IterationLimit;
            }
            if self
                .config
                .convergence
                .is_some_and(|limit| self.state.stale_iterations > limit)
            {
                break Termination::Converged;
            }
            self.step();
        };
        info!(
            "{} stopped after {} iterations ({:?}). Best: {}",
            self.policy.name(),
            self.state.iteration,
            termination,
            self.state.best
        );
        LocalSearchOutcome {
            best: self.state.best,
            iterations: self.state.iteration,
            scores: self.state.scores,
            termination,
        }
    }

    /// One mutate-evaluate-accept round. Returns whether the candidate was
    /// accepted.
    pub fn step(&mut self) -> bool {
        let maps = weight_maps(
            &self.state.current,
            self.config.heuristics,
            self.config.modifier,
        );
        let mut candidate = self.state.current.copy();
        mutate(
            &mut candidate,
            &mut self.rng,
            maps.as_ref(),
            self.config.mutations,
        );
        let candidate_penalty = candidate.calc_total_penalty();
        let current_penalty = self.state.current.calc_total_penalty();
        let best_penalty = self.state.best.calc_total_penalty();

        let accepted = self
            .policy
            .accept(current_penalty, candidate_penalty, &mut self.rng);
        trace!(
            "Iteration {}: candidate {} against current {} ({})",
            self.state.iteration,
            candidate_penalty,
            current_penalty,
            if accepted { "accepted" } else { "rejected" }
        );

        if accepted && candidate_penalty < best_penalty {
            debug!(
                "New best at iteration {}: {} penalty points",
                self.state.iteration, candidate_penalty
            );
            self.state.best = candidate.copy();
            self.state.stale_iterations = 0;
        } else {
            self.state.stale_iterations += 1;
        }
        if accepted {
            self.state.current = candidate;
        }

        self.policy.on_iteration_end();
        self.state.scores.push(self.state.current.calc_total_penalty());
        self.state.iteration += 1;
        accepted
    }
}

/// Applies `swaps` random swaps to `model`.
///
/// The first index of each swap is drawn from the push map and the second
/// from the pull map; without maps both are uniform.
pub fn mutate<R: Rng>(
    model: &mut Model,
    rng: &mut R,
    maps: Option<&WeightMaps>,
    swaps: usize,
) {
    let push = maps.map(|m| m.push.as_slice());
    let pull = maps.map(|m| m.pull.as_slice());
    for _ in 0..swaps {
        let first = model.get_random_index(rng, false, push);
        let second = model.get_random_index(rng, false, pull);
        if let (Some(first), Some(second)) = (first, second) {
            model.swap_activities(first, second);
        }
    }
}
