//! Endless lane runner variant
//!
//! The player runs forward over seeded, procedurally generated tiles with
//! three lanes. Obstacles are jumped, slid under or side-stepped; junction
//! tiles demand a turn queued inside their decision window.

pub mod selectors;
pub mod state;
pub mod tick;
pub mod track;

pub use state::{
    Heading, Lane, ObstacleKind, RunnerCommand, RunnerEvent, RunnerState, RunnerStatus, TurnDirection,
};
pub use tick::step;
