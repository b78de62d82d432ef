pub mod beam_search;
pub mod greedy;
pub mod hill_climber;
pub mod local_search;
pub mod random;
pub mod random_restart;
pub mod simulated_annealing;
