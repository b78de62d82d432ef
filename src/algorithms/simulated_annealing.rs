//! Simulated annealing acceptance.
//!
//! A worse candidate is accepted with probability `exp(-delta / T)`. The
//! temperature follows a [`CoolingSchedule`] and is lowered after every
//! evaluated candidate. Once frozen, only strict improvements pass.

use crate::algorithms::local_search::{AcceptancePolicy, LocalSearch, LocalSearchConfig};
use crate::error::ScheduleError;
use crate::model::Model;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Temperatures at or below this count as frozen.
pub const MIN_TEMPERATURE: f64 = 1e-9;

pub trait CoolingSchedule: std::fmt::Debug {
    /// Resets to the initial temperature for a search of `iterations` steps.
    fn on_start(&mut self, iterations: usize);

    fn update(&mut self);

    fn current(&self) -> f64;

    #[inline]
    fn is_frozen(&self) -> bool {
        self.current() <= MIN_TEMPERATURE
    }
}

/// Subtracts `initial / iterations` per step, reaching zero at the end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearCooling {
    initial: f64,
    current: f64,
    decrement: f64,
}

impl LinearCooling {
    #[inline]
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            current: initial,
            decrement: 0.0,
        }
    }
}

impl CoolingSchedule for LinearCooling {
    #[inline]
    fn on_start(&mut self, iterations: usize) {
        self.current = self.initial;
        self.decrement = self.initial / iterations.max(1) as f64;
    }

    #[inline]
    fn update(&mut self) {
        self.current = (self.current - self.decrement).max(0.0);
    }

    #[inline]
    fn current(&self) -> f64 {
        self.current
    }
}

/// Multiplies the temperature by `alpha` per step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialCooling {
    initial: f64,
    current: f64,
    alpha: f64,
}

impl ExponentialCooling {
    pub fn new(initial: f64, alpha: f64) -> Result<Self, ScheduleError> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ScheduleError::InvalidParameter(format!(
                "cooling rate must lie in (0, 1), got {}",
                alpha
            )));
        }
        Ok(Self {
            initial,
            current: initial,
            alpha,
        })
    }
}

impl CoolingSchedule for ExponentialCooling {
    #[inline]
    fn on_start(&mut self, _iterations: usize) {
        self.current = self.initial;
    }

    #[inline]
    fn update(&mut self) {
        self.current *= self.alpha;
    }

    #[inline]
    fn current(&self) -> f64 {
        self.current
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Cooling {
    Linear,
    Exponential { alpha: f64 },
}

impl Default for Cooling {
    fn default() -> Self {
        Cooling::Exponential { alpha: 0.99 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnnealingConfig {
    pub temperature: f64,
    pub cooling: Cooling,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            cooling: Cooling::default(),
        }
    }
}

impl AnnealingConfig {
    pub fn schedule(&self) -> Result<AnyCooling, ScheduleError> {
        if !(self.temperature.is_finite() && self.temperature >= 0.0) {
            return Err(ScheduleError::InvalidParameter(format!(
                "initial temperature must be finite and non-negative, got {}",
                self.temperature
            )));
        }
        Ok(match self.cooling {
            Cooling::Linear => AnyCooling::Linear(LinearCooling::new(self.temperature)),
            Cooling::Exponential { alpha } => {
                AnyCooling::Exponential(ExponentialCooling::new(self.temperature, alpha)?)
            }
        })
    }
}

/// Cooling schedule picked at runtime from an [`AnnealingConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnyCooling {
    Linear(LinearCooling),
    Exponential(ExponentialCooling),
}

impl CoolingSchedule for AnyCooling {
    fn on_start(&mut self, iterations: usize) {
        match self {
            AnyCooling::Linear(c) => c.on_start(iterations),
            AnyCooling::Exponential(c) => c.on_start(iterations),
        }
    }

    fn update(&mut self) {
        match self {
            AnyCooling::Linear(c) => c.update(),
            AnyCooling::Exponential(c) => c.update(),
        }
    }

    fn current(&self) -> f64 {
        match self {
            AnyCooling::Linear(c) => c.current(),
            AnyCooling::Exponential(c) => c.current(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedAnnealing<C> {
    cooling: C,
}

impl<C: CoolingSchedule> SimulatedAnnealing<C> {
    #[inline]
    pub fn new(cooling: C) -> Self {
        Self { cooling }
    }

    #[inline]
    pub fn temperature(&self) -> f64 {
        self.cooling.current()
    }

    pub fn search<R: Rng>(
        self,
        model: Model,
        rng: R,
        config: LocalSearchConfig,
    ) -> Result<LocalSearch<Self, R>, ScheduleError> {
        LocalSearch::new(model, self, rng, config)
    }
}

impl<C: CoolingSchedule> AcceptancePolicy for SimulatedAnnealing<C> {
    fn name(&self) -> &str {
        "SimulatedAnnealing"
    }

    fn on_start(&mut self, config: &LocalSearchConfig) {
        self.cooling.on_start(config.iterations);
    }

    fn accept<R: Rng>(&mut self, current: u64, candidate: u64, rng: &mut R) -> bool {
        if candidate < current {
            return true;
        }
        if self.cooling.is_frozen() {
            return false;
        }
        let delta = (candidate - current) as f64;
        let probability = (-delta / self.cooling.current()).exp();
        rng.random_bool(probability.clamp(0.0, 1.0))
    }

    #[inline]
    fn on_iteration_end(&mut self) {
        self.cooling.update();
    }
}
