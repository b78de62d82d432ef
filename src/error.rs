use thiserror::Error;

/// Failures of catalog construction and of the search algorithms.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
    #[error("model is not a complete solution: {placed} of {expected} activities placed")]
    IncompleteSolution { placed: usize, expected: usize },
    #[error("no empty slot found for activity {activity} after {attempts} attempts")]
    PlacementExhausted { activity: String, attempts: usize },
    #[error("no empty slot left for activity {activity}")]
    NoEmptySlot { activity: String },
    #[error("beam search found no complete schedule in {runs} run(s)")]
    NoTerminalState { runs: usize },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
