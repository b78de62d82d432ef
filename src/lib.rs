//! Course timetabling on a fixed weekly grid of lecture halls.
//!
//! A [`model::Model`] assigns the activities of a [`data::Catalog`] to the
//! 145 slots of [`grid`], scored by [`penalty`]. Construction algorithms build
//! complete schedules; local search improves them.

pub mod algorithms;
pub mod data;
pub mod error;
pub mod grid;
pub mod heuristics;
pub mod model;
pub mod penalty;
pub mod server;
pub mod solver;

pub use error::ScheduleError;
pub use model::Model;
